//! History sync persistence
//!
//! Every history chunk is written to its own pretty-printed JSON file:
//! `history-{start}-{account}-{seq}-{sync_type}.json`, where `seq` counts up
//! from 1 for the lifetime of the process.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::events::{HistorySyncEvent, HistorySyncType};
use crate::{Result, storage};

/// Writes history sync chunks under a storage root
#[derive(Debug)]
pub struct HistoryWriter {
    root: PathBuf,
    started_at: i64,
    sequence: AtomicU32,
}

impl HistoryWriter {
    /// Create a writer stamped with the current time as process start
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_start_time(root, chrono::Utc::now().timestamp())
    }

    /// Create a writer with an explicit process start (unix seconds)
    #[must_use]
    pub fn with_start_time(root: impl Into<PathBuf>, started_at: i64) -> Self {
        Self {
            root: root.into(),
            started_at,
            sequence: AtomicU32::new(0),
        }
    }

    /// Storage root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Claim the next sequence number
    pub fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// File path for a chunk
    #[must_use]
    pub fn path_for(&self, account: &str, sequence: u32, sync_type: HistorySyncType) -> PathBuf {
        self.root.join(format!(
            "history-{}-{account}-{sequence}-{sync_type}.json",
            self.started_at
        ))
    }

    /// Persist a chunk and return the file path
    ///
    /// # Errors
    ///
    /// Returns error if the payload cannot be encoded or the file cannot be
    /// created (including when it already exists)
    pub async fn write(&self, account: &str, evt: &HistorySyncEvent) -> Result<PathBuf> {
        let sequence = self.next_sequence();
        let path = self.path_for(account, sequence, evt.sync_type);

        let mut body = serde_json::to_vec_pretty(&evt.data)?;
        body.push(b'\n');

        tokio::fs::create_dir_all(&self.root).await?;
        storage::write_private(&path, &body, true).await?;

        tracing::info!(path = %path.display(), sequence, "wrote history sync");
        Ok(path)
    }
}
