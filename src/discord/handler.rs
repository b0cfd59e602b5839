//! Discord message event handling.
//!
//! Connects the routers to serenity: relay events go out as embeds,
//! channel messages come in through the inbound router and get a reaction.

use std::sync::Arc;

use serenity::async_trait;
use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::ChannelId;
use serenity::prelude::*;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::bridge::{InboundMessage, InboundRouter, OutboundRouter, RelaySink};
use crate::common::error::{DeliveryError, DeliveryResult};
use crate::common::{OutboundMessage, RelayEvent};
use crate::discord::commands::CommandHandler;

/// Sends outbound messages as Discord embeds.
pub struct DiscordSink {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl DiscordSink {
    pub fn new(ctx: &Context) -> Self {
        Self {
            http: ctx.http.clone(),
            cache: ctx.cache.clone(),
        }
    }
}

#[async_trait]
impl RelaySink for DiscordSink {
    async fn deliver(&self, channel_id: u64, message: &OutboundMessage) -> DeliveryResult<()> {
        let channel = ChannelId::new(channel_id);
        if self.cache.channel(channel).is_none() {
            return Err(DeliveryError::ChannelNotFound { channel_id });
        }

        let embed = CreateEmbed::new()
            .title(&message.title)
            .description(&message.body)
            .colour(message.accent);

        channel
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await?;
        Ok(())
    }
}

/// Discord-side state of the relay.
pub struct RelayHandler {
    outbound: OutboundRouter,
    inbound: InboundRouter,
    command_handler: CommandHandler,
    /// Fired on the first Ready so the relay reader can start.
    ready_tx: Option<oneshot::Sender<()>>,
}

impl RelayHandler {
    pub fn new(
        outbound: OutboundRouter,
        inbound: InboundRouter,
        command_handler: CommandHandler,
        ready_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            command_handler,
            ready_tx: Some(ready_tx),
        }
    }

    pub fn handle_ready(&mut self, ready: &Ready) {
        info!("Discord bot connected as {}", ready.user.name);

        if let Some(ready_tx) = self.ready_tx.take() {
            if ready_tx.send(()).is_err() {
                warn!("Relay reader is no longer waiting for Discord");
            }
        }
    }

    /// Game -> Discord.
    pub async fn handle_relay_event(&self, ctx: &Context, event: RelayEvent) {
        let sink = DiscordSink::new(ctx);
        let outcome = self.outbound.dispatch(&sink, &event).await;
        debug!("Relay event dispatched: {:?}", outcome);
    }

    /// Discord -> Game, then bot commands.
    pub async fn handle_message(&self, ctx: &Context, msg: Message) {
        let self_id = ctx.cache.current_user().id.get();
        let inbound = inbound_message(&msg);

        let outcome = self.inbound.route(self_id, &inbound).await;
        if let Some(ack) = outcome.acknowledgement() {
            if let Err(e) = msg.react(&ctx.http, ack.reaction()).await {
                warn!(error = %e, "Failed to add reaction");
            }
        }

        if inbound.author_id == self_id || inbound.is_bot || inbound.via_webhook {
            return;
        }

        let content = msg.content.trim();
        if content.starts_with('!') {
            if let Err(e) = self.command_handler.handle_command(ctx, &msg, content).await {
                error!("Command handler error: {}", e);
            }
        }
    }
}

fn inbound_message(msg: &Message) -> InboundMessage {
    InboundMessage {
        author_id: msg.author.id.get(),
        author_name: msg.author.name.clone(),
        is_bot: msg.author.bot,
        via_webhook: msg.webhook_id.is_some(),
        channel_id: msg.channel_id.get(),
        content: msg.content.clone(),
    }
}
