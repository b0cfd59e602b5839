//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;

pub use messages::{
    Acknowledgement, Direction, OutboundMessage, RelayEvent, RelayStatus, ResponseRecord,
    TELL_CHAT_TYPE,
};
