//! Message routing between the relay files and Discord.
//!
//! ## Module Structure
//!
//! - `channels`: Communication channel structures
//! - `outbound`: Game -> Discord routing (`OutboundRouter`, `RelaySink`)
//! - `inbound`: Discord -> Game routing (`InboundRouter`)

pub mod channels;
pub mod inbound;
pub mod outbound;

pub use channels::ChannelBundle;
pub use inbound::{InboundMessage, InboundRouter};
pub use outbound::{OutboundRouter, RelaySink};
