//! Game -> Discord routing.
//!
//! Maps relay events onto their configured Discord channel and pushes an
//! embed through a [`RelaySink`]. Sends are bounded by a timeout and never
//! retried: a failed send is logged and the event is dropped.

use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use tracing::{debug, info, warn};

use crate::common::error::{DeliveryError, DeliveryResult};
use crate::common::{OutboundMessage, RelayEvent};
use crate::config::ChannelMap;

/// Destination for outbound messages (Discord in production).
#[async_trait]
pub trait RelaySink: Send + Sync {
    /// Push one message to a channel.
    async fn deliver(&self, channel_id: u64, message: &OutboundMessage) -> DeliveryResult<()>;
}

/// Result of dispatching one relay event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Sent to the mapped channel.
    Delivered { channel_id: u64 },
    /// The chat type is not monitored.
    Unmapped,
    /// The send failed or timed out; the event is lost.
    Failed { channel_id: u64 },
}

/// Routes relay events to Discord channels.
#[derive(Debug, Clone)]
pub struct OutboundRouter {
    channels: Arc<ChannelMap>,
    send_timeout: Duration,
}

impl OutboundRouter {
    pub fn new(channels: Arc<ChannelMap>, send_timeout: Duration) -> Self {
        Self {
            channels,
            send_timeout,
        }
    }

    /// Deliver one event to its mapped channel, if any.
    pub async fn dispatch(&self, sink: &dyn RelaySink, event: &RelayEvent) -> DispatchOutcome {
        let Some(channel_id) = self.channels.channel_for(&event.chat_type) else {
            debug!("No Discord channel mapping for chat type {}", event.chat_type);
            return DispatchOutcome::Unmapped;
        };

        let message = OutboundMessage::from_event(event);

        let send = sink.deliver(channel_id, &message);
        let result = match tokio::time::timeout(self.send_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout {
                channel_id,
                seconds: self.send_timeout.as_secs(),
            }),
        };

        match result {
            Ok(()) => {
                info!(
                    "Game -> Discord [{}]: {}: {}",
                    event.chat_type, event.sender, event.message
                );
                DispatchOutcome::Delivered { channel_id }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Dropping {} message from {}",
                    event.chat_type, event.sender
                );
                DispatchOutcome::Failed { channel_id }
            }
        }
    }
}
