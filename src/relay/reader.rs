//! Relay log tailing.
//!
//! Each tick reads the bytes appended since the cursor, parses them into
//! [`RelayEvent`]s and bounds the log size by rotating it down to its most
//! recent lines. The cursor is persisted after every change so a restart
//! neither replays nor skips lines.

use std::io::{ErrorKind, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::common::error::{RelayError, RelayResult};
use crate::common::{RelayEvent, RelayStatus};
use crate::config::RelayConfig;
use crate::relay::line::parse_line;
use crate::relay::position::PositionTracker;

/// What a single tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Bytes consumed from the relay log.
    pub bytes_read: u64,
    /// Parsed events, in file order.
    pub events: Vec<RelayEvent>,
    /// Non-blank lines that did not match the line grammar.
    pub skipped: usize,
    /// The log was smaller than the cursor and was re-read from the start.
    pub truncated: bool,
    /// The log was rewritten down to its most recent lines.
    pub rotated: bool,
}

/// Stateful tailer of the relay log. Owns the cursor exclusively.
#[derive(Debug)]
pub struct RelayReader {
    relay_file: PathBuf,
    tracker: PositionTracker,
    cursor: u64,
    poll_interval: Duration,
    rotate_threshold: u64,
    rotate_keep_lines: usize,
    status: RelayStatus,
}

impl RelayReader {
    /// Create a reader with the cursor restored from the position file.
    pub async fn open(config: &RelayConfig) -> Self {
        let tracker = PositionTracker::new(&config.position_file, &config.relay_file);
        let cursor = tracker.load().await;
        Self::with_cursor(config, cursor)
    }

    /// Create a reader starting at a known cursor.
    pub fn with_cursor(config: &RelayConfig, cursor: u64) -> Self {
        Self {
            relay_file: config.relay_file.clone(),
            tracker: PositionTracker::new(&config.position_file, &config.relay_file),
            cursor,
            poll_interval: config.check_interval(),
            rotate_threshold: config.rotate_threshold,
            rotate_keep_lines: config.rotate_keep_lines,
            status: RelayStatus {
                cursor,
                ..RelayStatus::default()
            },
        }
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn status(&self) -> &RelayStatus {
        &self.status
    }

    /// Poll the relay log once.
    ///
    /// A missing log is a no-op. Only a failed read of the log is returned as
    /// an error; cursor persistence and rotation failures are logged and the
    /// events read so far are still returned.
    pub async fn tick(&mut self) -> RelayResult<TickReport> {
        let mut report = TickReport::default();

        let size = match fs::metadata(&self.relay_file).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(self.read_error(e)),
        };

        if size < self.cursor {
            info!(
                "Relay log shrank to {} bytes (cursor {}), starting from beginning",
                size, self.cursor
            );
            self.cursor = 0;
            report.truncated = true;
        }

        let data = self.read_from(self.cursor).await?;
        let complete = &data[..complete_lines_len(&data)];
        if complete.len() < data.len() {
            debug!(
                "Waiting for the rest of a partial line ({} bytes)",
                data.len() - complete.len()
            );
        }
        if !complete.is_empty() || report.truncated {
            self.cursor += complete.len() as u64;
            report.bytes_read = complete.len() as u64;
            self.persist().await;
        }
        self.parse_into(complete, &mut report);

        if self.cursor > self.rotate_threshold {
            match self.rotate(&mut report).await {
                Ok(rotated) => report.rotated = rotated,
                Err(e) => warn!(error = %e, "Relay log rotation failed"),
            }
        }

        self.record(&report);
        Ok(report)
    }

    /// Poll until shutdown, forwarding parsed events.
    pub async fn run(
        mut self,
        events_tx: mpsc::UnboundedSender<RelayEvent>,
        status_tx: watch::Sender<RelayStatus>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Watching relay log '{}' every {:.1}s from position {}",
            self.relay_file.display(),
            self.poll_interval.as_secs_f64(),
            self.cursor
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(report) => {
                            for event in report.events {
                                if events_tx.send(event).is_err() {
                                    warn!("Relay event channel closed, stopping relay reader");
                                    self.persist().await;
                                    return;
                                }
                            }
                            status_tx.send_replace(self.status.clone());
                        }
                        Err(e) => warn!(error = %e, "Relay tick failed"),
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping relay reader");
                        break;
                    }
                }
            }
        }

        self.persist().await;
    }

    /// Save the cursor, logging failures.
    pub async fn persist(&self) {
        if let Err(e) = self.tracker.save(self.cursor).await {
            warn!(error = %e, "Failed to persist relay cursor");
        }
    }

    async fn read_from(&self, offset: u64) -> RelayResult<Vec<u8>> {
        let mut file = fs::File::open(&self.relay_file)
            .await
            .map_err(|e| self.read_error(e))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| self.read_error(e))?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .await
            .map_err(|e| self.read_error(e))?;
        Ok(data)
    }

    /// Rewrite the log with only its last `rotate_keep_lines` lines.
    ///
    /// Complete lines appended since the tick's read are parsed before the
    /// rewrite so they are not lost. A trailing partial line is carried over
    /// unread. Returns whether the file was rewritten.
    async fn rotate(&mut self, report: &mut TickReport) -> RelayResult<bool> {
        let rotate_error = |source: std::io::Error| RelayError::Rotate {
            path: self.relay_file.display().to_string(),
            source,
        };

        let all = fs::read(&self.relay_file).await.map_err(rotate_error)?;
        info!("Relay log is large ({} bytes), cleaning up...", all.len());

        let unseen_from = usize::try_from(self.cursor)
            .unwrap_or(usize::MAX)
            .min(all.len());
        let unseen_len = complete_lines_len(&all[unseen_from..]);
        if unseen_len > 0 {
            report.bytes_read += unseen_len as u64;
            self.parse_into(&all[unseen_from..unseen_from + unseen_len], report);
        }

        let (complete, partial) = all.split_at(unseen_from + unseen_len);
        self.cursor = complete.len() as u64;

        let lines: Vec<&[u8]> = complete.split_inclusive(|b| *b == b'\n').collect();
        if lines.len() <= self.rotate_keep_lines {
            self.persist().await;
            return Ok(false);
        }

        let mut kept = lines[lines.len() - self.rotate_keep_lines..].concat();
        self.cursor = kept.len() as u64;
        kept.extend_from_slice(partial);
        fs::write(&self.relay_file, &kept)
            .await
            .map_err(|e| RelayError::Rotate {
                path: self.relay_file.display().to_string(),
                source: e,
            })?;

        self.persist().await;
        info!(
            "Cleaned relay log, kept {} recent lines ({} bytes)",
            self.rotate_keep_lines,
            kept.len()
        );
        Ok(true)
    }

    fn parse_into(&self, data: &[u8], report: &mut TickReport) {
        let text = String::from_utf8_lossy(data);

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match parse_line(line) {
                Some(event) => report.events.push(event),
                None => {
                    debug!("Skipping unrecognised relay line: {}", line);
                    report.skipped += 1;
                }
            }
        }
    }

    fn record(&mut self, report: &TickReport) {
        self.status.cursor = self.cursor;
        if !report.events.is_empty() {
            self.status.events_relayed += report.events.len() as u64;
            self.status.last_event_at = Some(Local::now());
        }
        if report.rotated {
            self.status.rotations += 1;
        }
    }

    fn read_error(&self, source: std::io::Error) -> RelayError {
        RelayError::Read {
            path: self.relay_file.display().to_string(),
            source,
        }
    }
}

/// Length of the prefix of `data` made of newline-terminated lines.
fn complete_lines_len(data: &[u8]) -> usize {
    data.iter().rposition(|b| *b == b'\n').map_or(0, |pos| pos + 1)
}
