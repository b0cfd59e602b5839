//! Configuration type definitions.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Root configuration structure.
///
/// Field names follow the keys of the on-disk text format.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Discord bot token.
    #[serde(rename = "BOT_TOKEN")]
    pub token: String,
    /// Chat type -> Discord channel ID.
    #[serde(rename = "CHANNEL_MAP", default)]
    pub channels: ChannelMap,
    /// Relay file locations and timings.
    #[serde(flatten)]
    pub relay: RelayConfig,
}

/// Relay file locations, polling and rotation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Log written by the game-side addon, tailed by the relay reader.
    #[serde(rename = "RELAY_FILE", default = "default_relay_file")]
    pub relay_file: PathBuf,
    /// Log written by us, read by the game-side addon.
    #[serde(rename = "RESPONSE_FILE", default = "default_response_file")]
    pub response_file: PathBuf,
    /// Persisted read cursor.
    #[serde(rename = "POSITION_FILE", default = "default_position_file")]
    pub position_file: PathBuf,
    /// Poll interval in seconds.
    #[serde(rename = "CHECK_INTERVAL", default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Relay log size (bytes) above which it is rotated.
    #[serde(rename = "ROTATE_THRESHOLD", default = "default_rotate_threshold")]
    pub rotate_threshold: u64,
    /// Lines kept when the relay log is rotated.
    #[serde(rename = "ROTATE_KEEP_LINES", default = "default_rotate_keep_lines")]
    pub rotate_keep_lines: usize,
    /// Upper bound for a single Discord send, in seconds.
    #[serde(rename = "SEND_TIMEOUT", default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

fn default_relay_file() -> PathBuf {
    PathBuf::from("chat_relay.txt")
}

fn default_response_file() -> PathBuf {
    PathBuf::from("discord_responses.txt")
}

fn default_position_file() -> PathBuf {
    PathBuf::from("bot_position.txt")
}

fn default_check_interval() -> u64 {
    1
}

fn default_rotate_threshold() -> u64 {
    50_000
}

fn default_rotate_keep_lines() -> usize {
    100
}

fn default_send_timeout() -> u64 {
    10
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            relay_file: default_relay_file(),
            response_file: default_response_file(),
            position_file: default_position_file(),
            check_interval_secs: default_check_interval(),
            rotate_threshold: default_rotate_threshold(),
            rotate_keep_lines: default_rotate_keep_lines(),
            send_timeout_secs: default_send_timeout(),
        }
    }
}

impl RelayConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

/// Bidirectional chat type <-> Discord channel association.
///
/// Built once at startup and never mutated. A channel ID may belong to at
/// most one chat type, so the reverse lookup is unambiguous.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "BTreeMap<String, u64>")]
pub struct ChannelMap {
    by_chat_type: BTreeMap<String, u64>,
    by_channel: HashMap<u64, String>,
}

impl TryFrom<BTreeMap<String, u64>> for ChannelMap {
    type Error = String;

    fn try_from(by_chat_type: BTreeMap<String, u64>) -> Result<Self, Self::Error> {
        let mut by_channel: HashMap<u64, String> = HashMap::new();

        for (chat_type, &channel_id) in &by_chat_type {
            if let Some(existing) = by_channel.insert(channel_id, chat_type.clone()) {
                return Err(format!(
                    "channel {} is mapped by both '{}' and '{}'",
                    channel_id, existing, chat_type
                ));
            }
        }

        Ok(Self {
            by_chat_type,
            by_channel,
        })
    }
}

impl ChannelMap {
    /// Discord channel for a chat type.
    pub fn channel_for(&self, chat_type: &str) -> Option<u64> {
        self.by_chat_type.get(chat_type).copied()
    }

    /// Chat type for a Discord channel.
    pub fn chat_type_for(&self, channel_id: u64) -> Option<&str> {
        self.by_channel.get(&channel_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_chat_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_chat_type.is_empty()
    }

    /// Iterate mappings ordered by chat type.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.by_chat_type.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_channel_map_lookups() {
        let channels = ChannelMap::try_from(map(&[("Tell", 111), ("Party", 222)])).unwrap();

        assert_eq!(channels.len(), 2);
        assert_eq!(channels.channel_for("Party"), Some(222));
        assert_eq!(channels.channel_for("Linkshell"), None);
        assert_eq!(channels.chat_type_for(111), Some("Tell"));
        assert_eq!(channels.chat_type_for(333), None);
    }

    #[test]
    fn test_channel_map_rejects_duplicate_channel() {
        let result = ChannelMap::try_from(map(&[("Tell", 111), ("Party", 111)]));
        let err = result.unwrap_err();
        assert!(err.contains("111"));
        assert!(err.contains("Tell"));
        assert!(err.contains("Party"));
    }

    #[test]
    fn test_relay_config_defaults() {
        let relay = RelayConfig::default();
        assert_eq!(relay.relay_file, PathBuf::from("chat_relay.txt"));
        assert_eq!(relay.check_interval(), Duration::from_secs(1));
        assert_eq!(relay.rotate_threshold, 50_000);
        assert_eq!(relay.rotate_keep_lines, 100);
    }
}
