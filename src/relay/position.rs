//! Persisted read cursor into the relay log.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::common::error::{RelayError, RelayResult};

/// Loads and saves the byte offset the relay reader has consumed up to.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    /// File holding the offset as ASCII decimal.
    position_file: PathBuf,
    /// Relay log, used to skip to its end when nothing is persisted.
    relay_file: PathBuf,
}

impl PositionTracker {
    pub fn new(position_file: impl Into<PathBuf>, relay_file: impl Into<PathBuf>) -> Self {
        Self {
            position_file: position_file.into(),
            relay_file: relay_file.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.position_file
    }

    /// Restore the cursor.
    ///
    /// Returns the persisted offset when it exists and parses; otherwise the
    /// current size of the relay log (so history is not replayed), or 0 when
    /// there is no relay log yet. Never fails.
    pub async fn load(&self) -> u64 {
        match fs::read_to_string(&self.position_file).await {
            Ok(content) => match content.trim().parse::<u64>() {
                Ok(offset) => {
                    info!("Resuming relay log from position {}", offset);
                    return offset;
                }
                Err(e) => {
                    warn!(
                        "Position file '{}' is corrupt ({}), starting from end of relay log",
                        self.position_file.display(),
                        e
                    );
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No position file at '{}'", self.position_file.display());
            }
            Err(e) => {
                warn!(
                    "Failed to read position file '{}' ({}), starting from end of relay log",
                    self.position_file.display(),
                    e
                );
            }
        }

        let offset = self.relay_log_size().await;
        info!("Starting from end of relay log: {}", offset);
        offset
    }

    /// Persist the cursor.
    ///
    /// Writes a sibling temp file and renames it over the position file, so a
    /// crash leaves either the old or the new value.
    pub async fn save(&self, offset: u64) -> RelayResult<()> {
        let temp_path = temp_path(&self.position_file);
        let to_error = |source: std::io::Error| RelayError::SavePosition {
            path: self.position_file.display().to_string(),
            source,
        };

        fs::write(&temp_path, offset.to_string())
            .await
            .map_err(to_error)?;
        // Atomic rename
        fs::rename(&temp_path, &self.position_file)
            .await
            .map_err(to_error)?;

        Ok(())
    }

    async fn relay_log_size(&self) -> u64 {
        match fs::metadata(&self.relay_file).await {
            Ok(metadata) => metadata.len(),
            Err(_) => 0,
        }
    }
}

/// `bot_position.txt` -> `bot_position.txt.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
