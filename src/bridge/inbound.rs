//! Discord -> Game routing.
//!
//! Filters out echoes of our own traffic, maps the source channel back to
//! a chat type and appends one record to the response log.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::common::{Acknowledgement, ResponseRecord, TELL_CHAT_TYPE};
use crate::config::ChannelMap;
use crate::relay::ResponseLog;

/// Prefixes that mark an addressed tell in the Tell channel.
const TELL_PREFIXES: [&str; 2] = ["/tell ", "/t "];

/// A remote message, stripped of platform details.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub author_id: u64,
    pub author_name: String,
    /// Author is an automated account.
    pub is_bot: bool,
    /// Posted through a webhook rather than by a user.
    pub via_webhook: bool,
    pub channel_id: u64,
    pub content: String,
}

/// Why a message was not relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OwnMessage,
    Webhook,
    Bot,
    UnmappedChannel,
    Empty,
}

/// Result of routing one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    Ignored(IgnoreReason),
    Written(ResponseRecord),
    /// The content was not a valid record; nothing was written.
    Rejected(String),
    /// The response log could not be written.
    Failed(String),
}

impl InboundOutcome {
    /// Reaction to attach to the source message, if any.
    pub fn acknowledgement(&self) -> Option<Acknowledgement> {
        match self {
            InboundOutcome::Ignored(_) => None,
            InboundOutcome::Written(_) => Some(Acknowledgement::Accepted),
            InboundOutcome::Rejected(_) | InboundOutcome::Failed(_) => {
                Some(Acknowledgement::Rejected)
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TellError {
    #[error("Invalid tell format. Use: /tell TargetName message or /t TargetName message")]
    MissingMessage,
}

/// Routes Discord messages into the response log.
#[derive(Debug, Clone)]
pub struct InboundRouter {
    channels: Arc<ChannelMap>,
    response_log: ResponseLog,
}

impl InboundRouter {
    pub fn new(channels: Arc<ChannelMap>, response_log: ResponseLog) -> Self {
        Self {
            channels,
            response_log,
        }
    }

    /// Route one message. `self_id` is the bot's own user id.
    pub async fn route(&self, self_id: u64, message: &InboundMessage) -> InboundOutcome {
        if let Some(reason) = self.filter(self_id, message) {
            return InboundOutcome::Ignored(reason);
        }

        let Some(chat_type) = self.channels.chat_type_for(message.channel_id) else {
            return InboundOutcome::Ignored(IgnoreReason::UnmappedChannel);
        };

        let content = collapse_lines(&message.content);
        if content.is_empty() {
            debug!("Ignoring empty message in {} channel", chat_type);
            return InboundOutcome::Ignored(IgnoreReason::Empty);
        }

        let record = match build_record(chat_type, &content) {
            Ok(record) => record,
            Err(e) => {
                warn!("Rejected tell from {}: {}", message.author_name, e);
                return InboundOutcome::Rejected(e.to_string());
            }
        };

        match self.response_log.append(&record).await {
            Ok(()) => {
                info!(
                    "Discord -> Game [{}] {}: {}",
                    chat_type, message.author_name, content
                );
                InboundOutcome::Written(record)
            }
            Err(e) => {
                error!(error = %e, "Failed to write response");
                InboundOutcome::Failed(e.to_string())
            }
        }
    }

    /// Anti-echo: drop our own, webhook and bot traffic.
    fn filter(&self, self_id: u64, message: &InboundMessage) -> Option<IgnoreReason> {
        if message.author_id == self_id {
            return Some(IgnoreReason::OwnMessage);
        }
        if message.via_webhook {
            debug!("Ignoring webhook message in channel {}", message.channel_id);
            return Some(IgnoreReason::Webhook);
        }
        if message.is_bot {
            return Some(IgnoreReason::Bot);
        }
        None
    }
}

/// Build the record for `content` posted in the `chat_type` channel.
///
/// In the Tell channel a `/tell ` or `/t ` prefix selects the addressed
/// form, which needs both a target and a message.
pub fn build_record(chat_type: &str, content: &str) -> Result<ResponseRecord, TellError> {
    if chat_type == TELL_CHAT_TYPE {
        if let Some(rest) = strip_tell_prefix(content) {
            let (target, message) = rest
                .trim()
                .split_once(' ')
                .ok_or(TellError::MissingMessage)?;
            return Ok(ResponseRecord::Tell {
                target: target.to_string(),
                message: message.to_string(),
            });
        }
    }

    Ok(ResponseRecord::Chat {
        chat_type: chat_type.to_string(),
        content: content.to_string(),
    })
}

fn strip_tell_prefix(content: &str) -> Option<&str> {
    TELL_PREFIXES
        .iter()
        .find_map(|prefix| content.strip_prefix(prefix))
}

/// Trim and join the lines of `content` with single spaces.
fn collapse_lines(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const SELF_ID: u64 = 1;
    const TELL_CHANNEL: u64 = 111;
    const PARTY_CHANNEL: u64 = 222;

    fn router(dir: &TempDir) -> InboundRouter {
        let channels: BTreeMap<String, u64> = [
            ("Tell".to_string(), TELL_CHANNEL),
            ("Party".to_string(), PARTY_CHANNEL),
        ]
        .into_iter()
        .collect();
        InboundRouter::new(
            Arc::new(ChannelMap::try_from(channels).unwrap()),
            ResponseLog::new(dir.path().join("responses.txt")),
        )
    }

    fn message(channel_id: u64, content: &str) -> InboundMessage {
        InboundMessage {
            author_id: 42,
            author_name: "Carol".to_string(),
            channel_id,
            content: content.to_string(),
            ..Default::default()
        }
    }

    fn responses(dir: &TempDir) -> String {
        std::fs::read_to_string(dir.path().join("responses.txt")).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_chat_message_is_written() {
        let dir = TempDir::new().unwrap();

        let outcome = router(&dir).route(SELF_ID, &message(PARTY_CHANNEL, "omw")).await;
        assert_eq!(outcome.acknowledgement(), Some(Acknowledgement::Accepted));
        assert_eq!(responses(&dir), "Party|omw\n");
    }

    #[tokio::test]
    async fn test_tell_forms() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);

        for content in ["/tell Bob go east", "/t Bob go east"] {
            let outcome = router.route(SELF_ID, &message(TELL_CHANNEL, content)).await;
            assert_eq!(
                outcome,
                InboundOutcome::Written(ResponseRecord::Tell {
                    target: "Bob".to_string(),
                    message: "go east".to_string(),
                })
            );
        }
        assert_eq!(responses(&dir), "Tell|Bob|go east\nTell|Bob|go east\n");
    }

    #[tokio::test]
    async fn test_tell_without_message_is_rejected() {
        let dir = TempDir::new().unwrap();

        let outcome = router(&dir).route(SELF_ID, &message(TELL_CHANNEL, "/tell Bob")).await;
        assert!(matches!(outcome, InboundOutcome::Rejected(_)));
        assert_eq!(outcome.acknowledgement(), Some(Acknowledgement::Rejected));
        assert!(!dir.path().join("responses.txt").exists());
    }

    #[tokio::test]
    async fn test_tell_channel_without_prefix_is_plain_chat() {
        let dir = TempDir::new().unwrap();

        router(&dir).route(SELF_ID, &message(TELL_CHANNEL, "hello there")).await;
        assert_eq!(responses(&dir), "Tell|hello there\n");
    }

    #[tokio::test]
    async fn test_tell_prefix_outside_tell_channel_is_plain_chat() {
        let dir = TempDir::new().unwrap();

        router(&dir).route(SELF_ID, &message(PARTY_CHANNEL, "/t Bob hi")).await;
        assert_eq!(responses(&dir), "Party|/t Bob hi\n");
    }

    #[tokio::test]
    async fn test_own_message_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut own = message(PARTY_CHANNEL, "echo");
        own.author_id = SELF_ID;

        let outcome = router(&dir).route(SELF_ID, &own).await;
        assert_eq!(outcome, InboundOutcome::Ignored(IgnoreReason::OwnMessage));
        assert_eq!(outcome.acknowledgement(), None);
        assert!(responses(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_webhook_and_bot_messages_are_ignored() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);

        let mut webhook = message(PARTY_CHANNEL, "relayed");
        webhook.via_webhook = true;
        assert_eq!(
            router.route(SELF_ID, &webhook).await,
            InboundOutcome::Ignored(IgnoreReason::Webhook)
        );

        let mut bot = message(PARTY_CHANNEL, "beep");
        bot.is_bot = true;
        assert_eq!(
            router.route(SELF_ID, &bot).await,
            InboundOutcome::Ignored(IgnoreReason::Bot)
        );

        assert!(responses(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_unmapped_channel_is_ignored() {
        let dir = TempDir::new().unwrap();

        let outcome = router(&dir).route(SELF_ID, &message(999, "hi")).await;
        assert_eq!(outcome, InboundOutcome::Ignored(IgnoreReason::UnmappedChannel));
    }

    #[tokio::test]
    async fn test_empty_content_is_ignored() {
        let dir = TempDir::new().unwrap();

        let outcome = router(&dir).route(SELF_ID, &message(PARTY_CHANNEL, "  \n ")).await;
        assert_eq!(outcome, InboundOutcome::Ignored(IgnoreReason::Empty));
    }

    #[tokio::test]
    async fn test_multiline_content_is_one_record() {
        let dir = TempDir::new().unwrap();

        router(&dir)
            .route(SELF_ID, &message(PARTY_CHANNEL, " first\r\nsecond \n\nthird "))
            .await;
        assert_eq!(responses(&dir), "Party|first second third\n");
    }

    #[tokio::test]
    async fn test_write_failure_is_negative_ack() {
        let dir = TempDir::new().unwrap();
        let channels: BTreeMap<String, u64> =
            [("Party".to_string(), PARTY_CHANNEL)].into_iter().collect();
        let router = InboundRouter::new(
            Arc::new(ChannelMap::try_from(channels).unwrap()),
            ResponseLog::new(dir.path().join("missing").join("responses.txt")),
        );

        let outcome = router.route(SELF_ID, &message(PARTY_CHANNEL, "hi")).await;
        assert!(matches!(outcome, InboundOutcome::Failed(_)));
        assert_eq!(outcome.acknowledgement(), Some(Acknowledgement::Rejected));
    }

    #[test]
    fn test_build_record() {
        assert_eq!(
            build_record("Tell", "/tell Bob  spaced"),
            Ok(ResponseRecord::Tell {
                target: "Bob".to_string(),
                message: " spaced".to_string(),
            })
        );
        assert_eq!(build_record("Tell", "/t Bob"), Err(TellError::MissingMessage));
        assert_eq!(
            build_record("Guild", "gz"),
            Ok(ResponseRecord::Chat {
                chat_type: "Guild".to_string(),
                content: "gz".to_string(),
            })
        );
    }
}
