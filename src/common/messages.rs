//! Canonical message types for relay communication.
//!
//! This module defines the single source of truth for message types
//! passed between the relay log, the bridge routers and Discord.

use std::fmt;

use chrono::{DateTime, Local};

/// Chat type that carries addressed private messages.
pub const TELL_CHAT_TYPE: &str = "Tell";

/// Direction marker of a relay log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Game -> Discord traffic.
    Out,
    /// Anything else. Still relayed.
    Unknown,
}

impl Direction {
    /// Parse the direction label that follows the `] ` of the first field.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "OUT" => Direction::Out,
            _ => Direction::Unknown,
        }
    }

    /// Emoji shown in front of the chat type in Discord embeds.
    pub fn marker(&self) -> &'static str {
        match self {
            Direction::Out => "📤",
            Direction::Unknown => "📥",
        }
    }

    /// Embed accent colour.
    pub fn accent(&self) -> u32 {
        match self {
            Direction::Out => 0x00ff00,
            Direction::Unknown => 0x0099ff,
        }
    }
}

/// One parsed line of the relay log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEvent {
    /// Free-form timestamp, kept as written.
    pub timestamp: String,
    pub direction: Direction,
    /// Chat type label (e.g. "Party", "Tell").
    pub chat_type: String,
    pub sender: String,
    /// Message body. May contain the field delimiter.
    pub message: String,
}

/// Structured message pushed to a Discord channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub title: String,
    pub body: String,
    pub accent: u32,
}

impl OutboundMessage {
    /// Build the embed content for a relay event.
    pub fn from_event(event: &RelayEvent) -> Self {
        Self {
            title: format!("{} {}", event.direction.marker(), event.chat_type),
            body: format!("**{}:** {}", event.sender, event.message),
            accent: event.direction.accent(),
        }
    }
}

/// One record of the response log, consumed by the game-side addon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseRecord {
    /// `<ChatType>|<content>`
    Chat { chat_type: String, content: String },
    /// `Tell|<target>|<message>`
    Tell { target: String, message: String },
}

impl fmt::Display for ResponseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseRecord::Chat { chat_type, content } => write!(f, "{}|{}", chat_type, content),
            ResponseRecord::Tell { target, message } => {
                write!(f, "{}|{}|{}", TELL_CHAT_TYPE, target, message)
            }
        }
    }
}

/// Feedback attached to a Discord message after inbound processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    Accepted,
    Rejected,
}

impl Acknowledgement {
    /// Reaction emoji for this acknowledgement.
    pub fn reaction(&self) -> char {
        match self {
            Acknowledgement::Accepted => '✅',
            Acknowledgement::Rejected => '❌',
        }
    }
}

/// Snapshot of the relay reader, published after every tick.
#[derive(Debug, Clone, Default)]
pub struct RelayStatus {
    /// Current cursor into the relay log.
    pub cursor: u64,
    /// Events parsed since startup.
    pub events_relayed: u64,
    /// Rotations performed since startup.
    pub rotations: u64,
    /// When the last event was read.
    pub last_event_at: Option<DateTime<Local>>,
}
