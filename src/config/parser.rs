//! Configuration file parsing.
//!
//! The on-disk format is a loose `KEY = value` text convention with one
//! `CHANNEL_MAP = { 'Type': id, ... }` block:
//!
//! ```text
//! BOT_TOKEN = "your-token"
//! CHANNEL_MAP = {
//!     'Tell': 123456789012345678,
//!     'Party': 234567890123456789,
//! }
//! ```
//!
//! The text is scanned into a JSON object and deserialized against the
//! [`Config`] schema, so defaults and field names live in one place.

use std::collections::BTreeMap;
use std::path::Path;

use fancy_regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::common::error::ConfigError;
use crate::config::types::Config;

const TOKEN_KEY: &str = "BOT_TOKEN";
const CHANNEL_MAP_KEY: &str = "CHANNEL_MAP";

/// Keys whose values must be non-negative integers.
const NUMERIC_KEYS: &[&str] = &[
    "CHECK_INTERVAL",
    "ROTATE_THRESHOLD",
    "ROTATE_KEEP_LINES",
    "SEND_TIMEOUT",
];

/// Keys whose values are strings.
const STRING_KEYS: &[&str] = &[TOKEN_KEY, "RELAY_FILE", "RESPONSE_FILE", "POSITION_FILE"];

/// Load configuration from a file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::Missing {
            path: path.display().to_string(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    load_config_str(&content)
}

/// Load configuration from a string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    let scanner = Scanner::new()?;
    let value = scanner.scan(content)?;

    serde_json::from_value(value).map_err(|e| ConfigError::Malformed {
        message: e.to_string(),
    })
}

/// Compiled patterns for the text format.
struct Scanner {
    channel_block: Regex,
    channel_entry: Regex,
    assignment: Regex,
}

impl Scanner {
    fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            channel_block: compile(r"(?s)CHANNEL_MAP\s*=\s*\{(.*?)\}")?,
            channel_entry: compile(r#"^['"]([^'"]+)['"]\s*:\s*(\S+)$"#)?,
            assignment: compile(concat!(
                r#"^([A-Za-z_][A-Za-z0-9_]*)\s*=\s*"#,
                r#"(?:"([^"]*)"|'([^']*)'|([^\s#"'{]+))\s*(?:#.*)?$"#,
            ))?,
        })
    }

    fn scan(&self, content: &str) -> Result<Value, ConfigError> {
        let content = strip_comments(content);
        let mut object = Map::new();

        let remainder = match self.find_channel_block(&content)? {
            Some((start, end, body)) => {
                let channels = self.scan_channels(&body)?;
                object.insert(CHANNEL_MAP_KEY.to_string(), Value::Object(channels));
                format!("{}{}", &content[..start], &content[end..])
            }
            None if content.contains(CHANNEL_MAP_KEY) => {
                return Err(ConfigError::Malformed {
                    message: format!("{} block is not closed with '}}'", CHANNEL_MAP_KEY),
                });
            }
            None => content.clone(),
        };

        for line in remainder.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let captures = self
                .assignment
                .captures(line)
                .map_err(regex_failure)?;

            let Some(captures) = captures else {
                warn!("Ignoring unrecognised config line: {}", line);
                continue;
            };

            let key = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let quoted = captures.get(2).or_else(|| captures.get(3)).map(|m| m.as_str());
            let bare = captures.get(4).map(|m| m.as_str());

            let value = if NUMERIC_KEYS.contains(&key) {
                let raw = quoted.or(bare).unwrap_or_default();
                let number = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    field: key.to_string(),
                    message: format!("expected a non-negative integer, got '{}'", raw),
                })?;
                Value::from(number)
            } else if STRING_KEYS.contains(&key) {
                match (quoted, bare) {
                    (Some(s), _) => Value::String(s.to_string()),
                    (None, Some(s)) if key != TOKEN_KEY => Value::String(s.to_string()),
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            field: key.to_string(),
                            message: "expected a quoted string".to_string(),
                        });
                    }
                }
            } else {
                warn!("Ignoring unknown config key: {}", key);
                continue;
            };

            if object.insert(key.to_string(), value).is_some() {
                return Err(ConfigError::InvalidValue {
                    field: key.to_string(),
                    message: "defined more than once".to_string(),
                });
            }
        }

        if !object.contains_key(TOKEN_KEY) {
            return Err(ConfigError::Malformed {
                message: format!("{} is required", TOKEN_KEY),
            });
        }

        Ok(Value::Object(object))
    }

    /// Parse the body of the channel map block into `{ "Type": id }`.
    fn scan_channels(&self, body: &str) -> Result<Map<String, Value>, ConfigError> {
        let mut channels: BTreeMap<String, u64> = BTreeMap::new();

        for entry in body.split([',', '\n']).map(str::trim).filter(|e| !e.is_empty()) {
            let captures = self
                .channel_entry
                .captures(entry)
                .map_err(regex_failure)?
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: CHANNEL_MAP_KEY.to_string(),
                    message: format!("unrecognised entry '{}'", entry),
                })?;

            let chat_type = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let raw_id = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
            let field = format!("{}['{}']", CHANNEL_MAP_KEY, chat_type);

            let channel_id = raw_id.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                field: field.clone(),
                message: format!("expected a numeric channel ID, got '{}'", raw_id),
            })?;

            if channels.insert(chat_type.to_string(), channel_id).is_some() {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: "chat type listed more than once".to_string(),
                });
            }
        }

        Ok(channels
            .into_iter()
            .map(|(chat_type, id)| (chat_type, Value::from(id)))
            .collect())
    }

    /// Find the channel block, returning its span and captured body.
    fn find_channel_block(
        &self,
        text: &str,
    ) -> Result<Option<(usize, usize, String)>, ConfigError> {
        let Some(captures) = self.channel_block.captures(text).map_err(regex_failure)? else {
            return Ok(None);
        };
        let (Some(whole), Some(body)) = (captures.get(0), captures.get(1)) else {
            return Ok(None);
        };
        Ok(Some((whole.start(), whole.end(), body.as_str().to_string())))
    }
}

/// Drop `#` comments, whole-line or trailing. A `#` inside quotes is kept.
fn strip_comments(content: &str) -> String {
    content
        .lines()
        .map(strip_line_comment)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_line_comment(line: &str) -> &str {
    let mut quote = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '#') => return &line[..i],
            (None, '\'' | '"') => quote = Some(c),
            (Some(open), _) if c == open => quote = None,
            _ => {}
        }
    }
    line
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(regex_failure)
}

fn regex_failure(e: fancy_regex::Error) -> ConfigError {
    ConfigError::Malformed {
        message: format!("config scanner failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const LEGACY: &str = r#"# Relay configuration
BOT_TOKEN = "abc.def.ghi"

CHANNEL_MAP = {
    'Tell': 111111111111111111,
    'Party': 222222222222222222,
    'Linkshell': 333333333333333333
}
"#;

    #[test]
    fn test_parse_legacy_format() {
        let config = load_config_str(LEGACY).unwrap();

        assert_eq!(config.token, "abc.def.ghi");
        assert_eq!(config.channels.len(), 3);
        assert_eq!(config.channels.channel_for("Tell"), Some(111111111111111111));
        assert_eq!(config.channels.chat_type_for(333333333333333333), Some("Linkshell"));
        // Unset keys fall back to defaults
        assert_eq!(config.relay.relay_file, PathBuf::from("chat_relay.txt"));
        assert_eq!(config.relay.rotate_keep_lines, 100);
    }

    #[test]
    fn test_parse_optional_keys() {
        let content = r#"
BOT_TOKEN = "token"
CHANNEL_MAP = { 'Party': 42, }
RELAY_FILE = "logs/relay.txt"  # addon output
CHECK_INTERVAL = 2
ROTATE_THRESHOLD = 1024
ROTATE_KEEP_LINES = 10
SEND_TIMEOUT = 5
"#;
        let config = load_config_str(content).unwrap();

        assert_eq!(config.channels.channel_for("Party"), Some(42));
        assert_eq!(config.relay.relay_file, PathBuf::from("logs/relay.txt"));
        assert_eq!(config.relay.check_interval_secs, 2);
        assert_eq!(config.relay.rotate_threshold, 1024);
        assert_eq!(config.relay.rotate_keep_lines, 10);
        assert_eq!(config.relay.send_timeout_secs, 5);
    }

    #[test]
    fn test_missing_token_is_malformed() {
        let result = load_config_str("CHANNEL_MAP = { 'Party': 42 }");
        assert!(matches!(result, Err(ConfigError::Malformed { .. })));
    }

    #[test]
    fn test_missing_channel_map_is_empty() {
        let config = load_config_str(r#"BOT_TOKEN = "token""#).unwrap();
        assert!(config.channels.is_empty());
    }

    #[test]
    fn test_unclosed_channel_map() {
        let content = "BOT_TOKEN = \"token\"\nCHANNEL_MAP = {\n    'Party': 42,\n";
        let err = load_config_str(content).unwrap_err();
        assert!(err.to_string().contains("not closed"));
    }

    #[test]
    fn test_non_numeric_channel_id() {
        let content = "BOT_TOKEN = \"token\"\nCHANNEL_MAP = {\n    'Party': abc,\n}";
        match load_config_str(content) {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "CHANNEL_MAP['Party']")
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_comments_in_channel_map() {
        let content = r#"BOT_TOKEN = "tok#en"  # keep the hash in quotes
CHANNEL_MAP = {
    'Tell': 111,  # whispers
    'Party': 222,   # group {chat}
    # 'Guild': 333,
}
"#;
        let config = load_config_str(content).unwrap();

        assert_eq!(config.token, "tok#en");
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels.channel_for("Tell"), Some(111));
        assert_eq!(config.channels.channel_for("Party"), Some(222));
        assert_eq!(config.channels.channel_for("Guild"), None);
    }

    #[test]
    fn test_strip_line_comment() {
        assert_eq!(strip_line_comment("'Tell': 111,  # whispers"), "'Tell': 111,  ");
        assert_eq!(strip_line_comment("# full line"), "");
        assert_eq!(strip_line_comment(r#"RELAY_FILE = "a#b.txt""#), r#"RELAY_FILE = "a#b.txt""#);
    }

    #[test]
    fn test_duplicate_chat_type() {
        let content = "BOT_TOKEN = \"token\"\nCHANNEL_MAP = {\n 'Party': 1,\n 'Party': 2,\n}";
        let err = load_config_str(content).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_duplicate_channel_id_rejected() {
        let content = "BOT_TOKEN = \"token\"\nCHANNEL_MAP = {\n 'Party': 7,\n 'Tell': 7,\n}";
        let err = load_config_str(content).unwrap_err();
        assert!(err.to_string().contains("mapped by both"));
    }

    #[test]
    fn test_invalid_numeric_option() {
        let content = "BOT_TOKEN = \"token\"\nCHECK_INTERVAL = soon";
        match load_config_str(content) {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "CHECK_INTERVAL"),
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_unquoted_token_rejected() {
        let err = load_config_str("BOT_TOKEN = token").unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = load_config_str("BOT_TOKEN = \"token\"\nCOLOR = \"blue\"").unwrap();
        assert_eq!(config.token, "token");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = load_config(dir.path().join("nope.txt"));
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("linkshell_config.txt");
        std::fs::write(&path, LEGACY).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.channels.len(), 3);
    }
}
