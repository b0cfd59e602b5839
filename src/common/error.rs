//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
///
/// Any of these is fatal at startup: the relay never connects without a
/// usable token and channel map.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file '{path}' not found")]
    Missing { path: String },

    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {message}")]
    Malformed { message: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Errors raised while tailing the relay log or writing the response log.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to read relay log '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rotate relay log '{path}': {source}")]
    Rotate {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save position to '{path}': {source}")]
    SavePosition {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to append to response log '{path}': {source}")]
    Append {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while pushing a message to the remote platform.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Channel not found: {channel_id}")]
    ChannelNotFound { channel_id: u64 },

    #[error("Send to channel {channel_id} timed out after {seconds}s")]
    Timeout { channel_id: u64, seconds: u64 },

    #[error("Failed to send message: {message}")]
    SendFailed { message: String },
}

impl From<serenity::Error> for DeliveryError {
    fn from(e: serenity::Error) -> Self {
        DeliveryError::SendFailed {
            message: e.to_string(),
        }
    }
}

/// Result type alias for relay file operations.
pub type RelayResult<T> = std::result::Result<T, RelayError>;

/// Result type alias for remote deliveries.
pub type DeliveryResult<T> = std::result::Result<T, DeliveryError>;
