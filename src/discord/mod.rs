//! Discord bot integration.
//!
//! This module provides the Discord side of the relay: gateway connection,
//! embeds for relay events, reactions and bot commands.

pub mod client;
pub mod commands;
pub mod handler;

pub use client::DiscordBotBuilder;
