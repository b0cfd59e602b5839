//! Discord bot commands (!help, !status).
//!
//! Handles command parsing and execution for Discord commands.

use std::path::PathBuf;

use serenity::model::channel::Message;
use serenity::prelude::*;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::common::RelayStatus;

const HELP_TEXT: &str = r#"**Available Commands:**
• `!status` - Show relay status
• `!help` - Show this help message"#;

/// Commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Help,
    Status,
}

impl BotCommand {
    /// Parse `!name [args]`. Unknown commands yield `None`.
    pub fn parse(content: &str) -> Option<Self> {
        if content.len() > 100 {
            return None;
        }
        let rest = content.strip_prefix('!')?;
        let command = rest.split_whitespace().next()?.to_lowercase();

        match command.as_str() {
            "help" => Some(BotCommand::Help),
            "status" => Some(BotCommand::Status),
            _ => None,
        }
    }
}

/// Command handler for Discord bot.
pub struct CommandHandler {
    relay_file: PathBuf,
    status_rx: watch::Receiver<RelayStatus>,
}

impl CommandHandler {
    pub fn new(relay_file: PathBuf, status_rx: watch::Receiver<RelayStatus>) -> Self {
        Self {
            relay_file,
            status_rx,
        }
    }

    /// Parse and execute a command from Discord.
    ///
    /// Returns `true` if the message was a command, `false` otherwise.
    pub async fn handle_command(
        &self,
        ctx: &Context,
        msg: &Message,
        content: &str,
    ) -> anyhow::Result<bool> {
        let Some(command) = BotCommand::parse(content) else {
            return Ok(false);
        };
        debug!("Processing command: {:?}", command);

        let reply = match command {
            BotCommand::Help => HELP_TEXT.to_string(),
            BotCommand::Status => {
                info!("!status command from {}", msg.author.name);
                let status = self.status_rx.borrow().clone();
                render_status(&self.relay_file, &status)
            }
        };

        msg.channel_id.say(&ctx.http, reply).await?;
        Ok(true)
    }
}

/// Status reply for `!status`.
pub fn render_status(relay_file: &std::path::Path, status: &RelayStatus) -> String {
    let last_event = status
        .last_event_at
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        "**Relay Status**\n\
         • Relay file: `{}`\n\
         • Position: {}\n\
         • Events relayed: {}\n\
         • Rotations: {}\n\
         • Last relay: {}",
        relay_file.display(),
        status.cursor,
        status.events_relayed,
        status.rotations,
        last_event
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use std::path::Path;

    #[test]
    fn test_parse_commands() {
        assert_eq!(BotCommand::parse("!help"), Some(BotCommand::Help));
        assert_eq!(BotCommand::parse("!STATUS please"), Some(BotCommand::Status));
        assert_eq!(BotCommand::parse("!who"), None);
        assert_eq!(BotCommand::parse("status"), None);
        assert_eq!(BotCommand::parse("!"), None);
    }

    #[test]
    fn test_long_content_is_not_a_command() {
        let content = format!("!help {}", "x".repeat(100));
        assert_eq!(BotCommand::parse(&content), None);
    }

    #[test]
    fn test_render_status() {
        let status = RelayStatus {
            cursor: 1234,
            events_relayed: 5,
            rotations: 1,
            last_event_at: Local.with_ymd_and_hms(2024, 3, 1, 18, 30, 0).single(),
        };

        let text = render_status(Path::new("chat_relay.txt"), &status);
        assert!(text.contains("`chat_relay.txt`"));
        assert!(text.contains("Position: 1234"));
        assert!(text.contains("Events relayed: 5"));
        assert!(text.contains("Rotations: 1"));
        assert!(text.contains("Last relay: 2024-03-01 18:30:00"));
    }

    #[test]
    fn test_render_status_without_events() {
        let text = render_status(Path::new("relay.txt"), &RelayStatus::default());
        assert!(text.contains("Last relay: never"));
    }
}
