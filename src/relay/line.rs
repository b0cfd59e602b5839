//! Relay log line grammar.
//!
//! ```text
//! [<timestamp>] <DIRECTION> | <chat_type> | <sender> | <message>
//! ```
//!
//! The message is the remainder after the third delimiter, so it may itself
//! contain `" | "`.

use crate::common::{Direction, RelayEvent};

/// Separator between the four fields.
pub const FIELD_DELIMITER: &str = " | ";

/// Separator between the bracketed timestamp and the direction.
const TIMESTAMP_END: &str = "] ";

/// Parse one trimmed, non-blank line.
///
/// Returns `None` for lines that do not have the four-field shape; those are
/// noise (partial writes, addon debug output) rather than errors.
pub fn parse_line(line: &str) -> Option<RelayEvent> {
    let mut fields = line.splitn(4, FIELD_DELIMITER);
    let head = fields.next()?;
    let chat_type = fields.next()?;
    let sender = fields.next()?;
    let message = fields.next()?;

    let (timestamp, direction) = if head.contains(TIMESTAMP_END) {
        let mut parts = head.split(TIMESTAMP_END);
        let timestamp = parts.next().unwrap_or_default();
        let label = parts.next().unwrap_or_default();
        (timestamp, Direction::from_label(label))
    } else {
        (head, Direction::Unknown)
    };

    Some(RelayEvent {
        timestamp: timestamp.trim_start_matches('[').to_string(),
        direction,
        chat_type: chat_type.to_string(),
        sender: sender.to_string(),
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outbound_line() {
        let event = parse_line("[12:00] OUT | Party | Alice | hello world").unwrap();

        assert_eq!(event.timestamp, "12:00");
        assert_eq!(event.direction, Direction::Out);
        assert_eq!(event.chat_type, "Party");
        assert_eq!(event.sender, "Alice");
        assert_eq!(event.message, "hello world");
    }

    #[test]
    fn test_message_keeps_delimiter() {
        let event = parse_line("[12:00] OUT | Say | Bob | a | b | c").unwrap();
        assert_eq!(event.message, "a | b | c");
    }

    #[test]
    fn test_other_direction_is_unknown() {
        let event = parse_line("[2024-01-01 10:00:00] IN | Tell | Carol | hi").unwrap();
        assert_eq!(event.direction, Direction::Unknown);
        assert_eq!(event.timestamp, "2024-01-01 10:00:00");
    }

    #[test]
    fn test_missing_timestamp_separator() {
        let event = parse_line("OUT | Party | Alice | hi").unwrap();
        assert_eq!(event.direction, Direction::Unknown);
        assert_eq!(event.chat_type, "Party");
    }

    #[test]
    fn test_short_lines_are_noise() {
        assert_eq!(parse_line("[12:00] OUT | Party | Alice"), None);
        assert_eq!(parse_line("addon loaded"), None);
        assert_eq!(parse_line("[12:00] OUT|Party|Alice|hi"), None);
    }

    #[test]
    fn test_empty_message_field() {
        let event = parse_line("[12:00] OUT | Party | Alice | ").unwrap();
        assert_eq!(event.message, "");
    }
}
