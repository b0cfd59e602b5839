//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use tracing::warn;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Token value shipped in the configuration template.
const PLACEHOLDER_TOKEN: &str = "YOUR_BOT_TOKEN_HERE";

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Discord
    if config.token.trim().is_empty() {
        errors.push("BOT_TOKEN is required".to_string());
    }
    if config.token == PLACEHOLDER_TOKEN {
        errors.push("BOT_TOKEN has not been configured (still using placeholder)".to_string());
    }

    // Channel mappings
    for (chat_type, channel_id) in config.channels.iter() {
        if chat_type.trim().is_empty() {
            errors.push("CHANNEL_MAP contains an empty chat type".to_string());
        }
        if channel_id == 0 {
            errors.push(format!("CHANNEL_MAP['{}'] must be non-zero", chat_type));
        }
    }
    if config.channels.is_empty() {
        warn!("CHANNEL_MAP is empty - no messages will be relayed");
    }

    // Relay files and timings
    let relay = &config.relay;
    if relay.check_interval_secs == 0 {
        errors.push("CHECK_INTERVAL must be non-zero".to_string());
    }
    if relay.rotate_threshold == 0 {
        errors.push("ROTATE_THRESHOLD must be non-zero".to_string());
    }
    if relay.rotate_keep_lines == 0 {
        errors.push("ROTATE_KEEP_LINES must be non-zero".to_string());
    }
    if relay.send_timeout_secs == 0 {
        errors.push("SEND_TIMEOUT must be non-zero".to_string());
    }
    if relay.relay_file == relay.response_file {
        errors.push(format!(
            "RELAY_FILE and RESPONSE_FILE must differ (both '{}')",
            relay.relay_file.display()
        ));
    }
    if relay.position_file == relay.relay_file || relay.position_file == relay.response_file {
        errors.push(format!(
            "POSITION_FILE '{}' must not be a relay or response log",
            relay.position_file.display()
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            message: errors.join("\n"),
        })
    }
}
