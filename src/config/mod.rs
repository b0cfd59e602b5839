//! Configuration parsing and types.

pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

use std::path::Path;

pub use parser::load_config;
pub use types::*;

use crate::common::error::ConfigError;

/// Load the config file, apply environment overrides and validate.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let config = env::apply_env_overrides(load_config(path)?);
    validate::validate_config(&config)?;
    Ok(config)
}

/// Mask a secret for logging, keeping only its last few characters.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{}{}", "*".repeat(20), visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefgh"), format!("{}efgh", "*".repeat(20)));
        assert_eq!(mask_secret("ab"), format!("{}ab", "*".repeat(20)));
    }

    #[test]
    fn test_load_and_validate_rejects_placeholder() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("linkshell_config.txt");
        std::fs::write(&path, "BOT_TOKEN = \"YOUR_BOT_TOKEN_HERE\"\n").unwrap();

        std::env::remove_var("LINKSHELL_DISCORD_TOKEN");
        let result = load_and_validate(&path);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }
}
