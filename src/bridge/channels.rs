//! Bridge channel management.
//!
//! Groups the channels connecting the relay reader task, the Discord
//! client and the shutdown coordinator.

use tokio::sync::{mpsc, oneshot, watch};

use crate::common::{RelayEvent, RelayStatus};

/// Channels for the relay reader task.
pub struct ReaderChannels {
    /// Sender for parsed relay events (Game -> Discord).
    pub events_tx: mpsc::UnboundedSender<RelayEvent>,
    /// Sender for reader status snapshots.
    pub status_tx: watch::Sender<RelayStatus>,
    /// Receiver for shutdown signal.
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Channels for the Discord handler.
pub struct DiscordSideChannels {
    /// Receiver for parsed relay events.
    pub events_rx: mpsc::UnboundedReceiver<RelayEvent>,
    /// Latest reader status, for `!status`.
    pub status_rx: watch::Receiver<RelayStatus>,
    /// Fired once the gateway session is ready.
    pub ready_tx: oneshot::Sender<()>,
    /// Receiver for shutdown signal.
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Control channels for startup and shutdown coordination.
pub struct ControlChannels {
    /// Sender to trigger shutdown.
    pub shutdown_tx: watch::Sender<bool>,
    /// Resolves when Discord is ready; the reader starts after it.
    pub ready_rx: oneshot::Receiver<()>,
}

/// Bundle of all channels created for the bridge.
pub struct ChannelBundle {
    pub reader: ReaderChannels,
    pub discord: DiscordSideChannels,
    pub control: ControlChannels,
}

impl ChannelBundle {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(RelayStatus::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = oneshot::channel();

        Self {
            reader: ReaderChannels {
                events_tx,
                status_tx,
                shutdown_rx: shutdown_rx.clone(),
            },
            discord: DiscordSideChannels {
                events_rx,
                status_rx,
                ready_tx,
                shutdown_rx,
            },
            control: ControlChannels {
                shutdown_tx,
                ready_rx,
            },
        }
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new()
    }
}
