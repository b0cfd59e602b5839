//! Append-only response log read by the game-side addon.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::common::error::{RelayError, RelayResult};
use crate::common::ResponseRecord;

/// Writer for the response log.
///
/// Every record is written with one append-mode `write_all`, never by
/// rewriting the file, so concurrent appends by other writers stay intact.
#[derive(Debug, Clone)]
pub struct ResponseLog {
    path: PathBuf,
}

impl ResponseLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line.
    pub async fn append(&self, record: &ResponseRecord) -> RelayResult<()> {
        let line = format!("{}\n", record);
        let to_error = |source: std::io::Error| RelayError::Append {
            path: self.path.display().to_string(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(to_error)?;

        file.write_all(line.as_bytes()).await.map_err(to_error)?;
        file.flush().await.map_err(to_error)?;
        Ok(())
    }
}
