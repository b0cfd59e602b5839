//! Linkshell - relay between a game chat log and Discord.
//!
//! Tails the relay log written by the game-side addon, posts each line to
//! its mapped Discord channel, and appends Discord replies to the response
//! log the addon reads back.

mod bridge;
mod common;
mod config;
mod discord;
mod relay;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing::{debug, error, info, warn};

use bridge::ChannelBundle;
use config::{env::get_config_path, load_and_validate, mask_secret};
use discord::DiscordBotBuilder;
use relay::RelayReader;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Linkshell v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;
    let config = Arc::new(config);

    info!("Configuration loaded successfully");
    info!("  Token: {}", mask_secret(&config.token));
    info!("  Relay file: {}", config.relay.relay_file.display());
    info!("  Response file: {}", config.relay.response_file.display());
    info!("  Position file: {}", config.relay.position_file.display());

    let channels = ChannelBundle::new();
    let ChannelBundle {
        reader: reader_channels,
        discord: discord_channels,
        control,
    } = channels;

    // ============================================================
    // Start Discord bot
    // ============================================================
    info!("Starting Discord bot...");

    let discord_bot = DiscordBotBuilder::new(config.clone(), discord_channels)
        .build()
        .await?;
    let mut discord_task = tokio::spawn(discord_bot.run());

    // ============================================================
    // Start relay reader once Discord is ready
    // ============================================================
    let relay_config = config.relay.clone();
    let ready_rx = control.ready_rx;
    let mut reader_task = tokio::spawn(async move {
        let mut shutdown_rx = reader_channels.shutdown_rx.clone();

        info!("Waiting for Discord before reading the relay log...");
        tokio::select! {
            ready = ready_rx => {
                if ready.is_err() {
                    warn!("Discord stopped before becoming ready, relay reader not started");
                    return;
                }
            }
            _ = shutdown_rx.wait_for(|stop| *stop) => return,
        }

        let reader = RelayReader::open(&relay_config).await;
        reader
            .run(
                reader_channels.events_tx,
                reader_channels.status_tx,
                reader_channels.shutdown_rx,
            )
            .await;
    });

    // ============================================================
    // Run until a signal or a task exits
    // ============================================================
    let mut exit = Ok(());
    tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping relay...");
        }
        result = &mut discord_task => {
            match result {
                Ok(Ok(())) => warn!("Discord task exited"),
                Ok(Err(e)) => {
                    error!("Discord connection failed: {}", e);
                    exit = Err(e);
                }
                Err(e) => error!("Discord task panicked: {}", e),
            }
        }
        _ = &mut reader_task => {
            warn!("Relay reader exited");
        }
    }

    // Stop whatever is still running; the reader saves its position on the way out.
    if let Err(e) = control.shutdown_tx.send(true) {
        debug!("Shutdown channel closed: {}", e);
    }
    let timeout = Duration::from_secs(5);
    if !reader_task.is_finished() {
        match tokio::time::timeout(timeout, reader_task).await {
            Ok(Ok(())) => info!("Relay reader stopped"),
            Ok(Err(e)) => warn!("Relay reader task panicked: {}", e),
            Err(_) => warn!("Relay reader shutdown timed out"),
        }
    }
    if !discord_task.is_finished() && tokio::time::timeout(timeout, discord_task).await.is_err() {
        warn!("Discord shutdown timed out");
    }

    info!("Exiting...");
    exit
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
