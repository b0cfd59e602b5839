//! Discord bot client abstraction.
//!
//! Provides a high-level interface for creating and running the Discord bot,
//! hiding serenity implementation details from the rest of the application.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use serenity::async_trait;
use serenity::gateway::GatewayError;
use serenity::http::HttpBuilder;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::bridge::channels::DiscordSideChannels;
use crate::bridge::{InboundRouter, OutboundRouter};
use crate::common::RelayEvent;
use crate::config::Config;
use crate::discord::commands::CommandHandler;
use crate::discord::handler::RelayHandler;
use crate::relay::ResponseLog;

/// Longest reconnect delay.
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub enum DiscordBotEvent {
    /// Bot connected and ready.
    Ready { context: Context, ready: Ready },
    /// Message received.
    Message { context: Context, message: Message },
    Disconnected,
}

struct DiscordBotEvents {
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
}

impl DiscordBotEvents {
    fn new(discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>) -> Self {
        Self { discord_events_tx }
    }
}

#[async_trait]
impl EventHandler for DiscordBotEvents {
    async fn ready(&self, context: Context, ready: Ready) {
        if let Err(error) = self
            .discord_events_tx
            .send(DiscordBotEvent::Ready { context, ready })
        {
            warn!("Failed to process discord event: {}", error);
        }
    }

    async fn message(&self, context: Context, message: Message) {
        if let Err(error) = self
            .discord_events_tx
            .send(DiscordBotEvent::Message { context, message })
        {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

/// Builder for creating the Discord bot.
pub struct DiscordBotBuilder {
    config: Arc<Config>,
    channels: DiscordSideChannels,
}

impl DiscordBotBuilder {
    pub fn new(config: Arc<Config>, channels: DiscordSideChannels) -> Self {
        Self { config, channels }
    }

    /// Build the Discord bot.
    pub async fn build(self) -> anyhow::Result<DiscordBot> {
        let channel_map = Arc::new(self.config.channels.clone());
        let relay = &self.config.relay;

        for (chat_type, channel_id) in channel_map.iter() {
            info!("  {} -> channel {}", chat_type, channel_id);
        }
        info!("Configured {} channel mappings", channel_map.len());

        let outbound = OutboundRouter::new(channel_map.clone(), relay.send_timeout());
        let inbound = InboundRouter::new(channel_map, ResponseLog::new(&relay.response_file));
        let command_handler =
            CommandHandler::new(relay.relay_file.clone(), self.channels.status_rx);
        let handler = RelayHandler::new(outbound, inbound, command_handler, self.channels.ready_tx);

        let (discord_events_tx, discord_events_rx) = mpsc::unbounded_channel::<DiscordBotEvent>();
        let token = self.config.token.clone();
        let client = build_client(&token, discord_events_tx.clone()).await?;

        Ok(DiscordBot {
            client: Some(client),
            token,
            handler,
            discord_events_rx,
            discord_events_tx,
            relay_rx: self.channels.events_rx,
            shutdown_rx: self.channels.shutdown_rx,
        })
    }
}

async fn build_client(
    token: &str,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
) -> anyhow::Result<Client> {
    let intents =
        GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT | GatewayIntents::GUILDS;

    // Build a custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let events = DiscordBotEvents::new(discord_events_tx);
    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(events)
        .await?;
    Ok(client)
}

/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn discord_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(MAX_RECONNECT_DELAY)
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

/// Gateway failures that reconnecting cannot fix.
fn is_fatal(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Gateway(
            GatewayError::InvalidAuthentication
                | GatewayError::InvalidGatewayIntents
                | GatewayError::DisallowedGatewayIntents
        )
    )
}

pub struct DiscordBot {
    client: Option<Client>,
    token: String,
    handler: RelayHandler,
    discord_events_rx: mpsc::UnboundedReceiver<DiscordBotEvent>,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
    relay_rx: mpsc::UnboundedReceiver<RelayEvent>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBot {
    /// Run until shutdown. Fails only on unrecoverable gateway errors.
    pub async fn run(mut self) -> anyhow::Result<()> {
        // Extract shard manager before we move client into run_connection
        let shard_manager = self.client.as_ref().map(|c| c.shard_manager.clone());
        let mut shutdown_rx = self.shutdown_rx.clone();

        let result = tokio::select! {
            result = Self::run_connection(
                &mut self.client,
                &self.token,
                &self.discord_events_tx,
            ) => result,
            _ = Self::process_events(
                &mut self.discord_events_rx,
                &mut self.handler,
                &mut self.relay_rx,
                &mut self.shutdown_rx,
            ) => Ok(()),
            _ = async {
                loop {
                    if shutdown_rx.changed().await.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            } => Ok(()),
        };

        if let Some(manager) = shard_manager {
            info!("Initiating graceful Discord shutdown...");
            manager.shutdown_all().await;
            info!("Discord shutdown complete");
        }

        info!("Discord task ended");
        result
    }

    async fn run_connection(
        client: &mut Option<Client>,
        token: &str,
        discord_events_tx: &mpsc::UnboundedSender<DiscordBotEvent>,
    ) -> anyhow::Result<()> {
        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let mut client = match client.take() {
                Some(client) => client,
                None => {
                    // serenity mostly handles reconnections itself.
                    match build_client(token, discord_events_tx.clone()).await {
                        Ok(client) => {
                            backoff = discord_backoff();
                            client
                        }
                        Err(e) => {
                            error!("Failed to rebuild Discord client: {}", e);
                            let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                            warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                            sleep(delay).await;
                            continue;
                        }
                    }
                }
            };

            let result = client.start().await;
            if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                warn!("Failed to process discord event: {}", error);
            }

            match result {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    return Ok(());
                }
                Err(e) if is_fatal(&e) => {
                    error!("Discord rejected the connection: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64(),
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn process_events(
        discord_events_rx: &mut mpsc::UnboundedReceiver<DiscordBotEvent>,
        handler: &mut RelayHandler,
        relay_rx: &mut mpsc::UnboundedReceiver<RelayEvent>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) {
        let mut discord_connection: Option<Context> = None;

        loop {
            tokio::select! {
                // Discord events
                event = discord_events_rx.recv() => {
                    match event {
                        Some(DiscordBotEvent::Ready { context, ready }) => {
                            handler.handle_ready(&ready);
                            discord_connection = Some(context);
                        }
                        Some(DiscordBotEvent::Message { context, message }) => {
                            handler.handle_message(&context, message).await;
                        }
                        Some(DiscordBotEvent::Disconnected) => {
                            discord_connection = None;
                        }
                        None => {
                            debug!("Discord events channel closed.");
                            break;
                        }
                    }
                }

                // Game -> Discord (drop if not connected)
                event = relay_rx.recv() => {
                    match event {
                        Some(event) => {
                            if let Some(ref context) = discord_connection {
                                handler.handle_relay_event(context, event).await;
                            } else {
                                warn!(
                                    "Dropping {} message from {} - Discord not connected",
                                    event.chat_type, event.sender
                                );
                            }
                        }
                        None => {
                            warn!("Relay event channel closed");
                            break;
                        }
                    }
                }

                // Shutdown signal
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping event processing");
                        break;
                    }
                }
            }
        }
    }
}
