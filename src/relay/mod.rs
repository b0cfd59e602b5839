//! Relay file interface with the game-side addon.
//!
//! ## Module Structure
//!
//! - `line`: relay log line grammar
//! - `position`: persisted read cursor
//! - `reader`: polling tailer with truncation detection and rotation
//! - `response`: append-only response log

pub mod line;
pub mod position;
pub mod reader;
pub mod response;

pub use reader::RelayReader;
pub use response::ResponseLog;
