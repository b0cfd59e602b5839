//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `LINKSHELL_CONFIG` - Path of the configuration file
//! - `LINKSHELL_DISCORD_TOKEN` - Discord bot token
//! - `LINKSHELL_RELAY_FILE` - Relay log written by the game addon
//! - `LINKSHELL_RESPONSE_FILE` - Response log read by the game addon
//! - `LINKSHELL_POSITION_FILE` - Persisted read cursor

use std::env;
use std::path::PathBuf;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "LINKSHELL";

/// Default configuration file name.
const DEFAULT_CONFIG_PATH: &str = "linkshell_config.txt";

/// Apply environment variable overrides to a config.
///
/// Lets the token stay out of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.token = token;
    }

    if let Ok(path) = env::var(format!("{}_RELAY_FILE", ENV_PREFIX)) {
        config.relay.relay_file = PathBuf::from(path);
    }
    if let Ok(path) = env::var(format!("{}_RESPONSE_FILE", ENV_PREFIX)) {
        config.relay.response_file = PathBuf::from(path);
    }
    if let Ok(path) = env::var(format!("{}_POSITION_FILE", ENV_PREFIX)) {
        config.relay.position_file = PathBuf::from(path);
    }

    config
}

/// Get the config file path from environment or use default.
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}
