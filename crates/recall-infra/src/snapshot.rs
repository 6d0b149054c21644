//! JSON snapshot persistence for the history store and vector index.
//!
//! Layout under the base directory:
//! ```text
//! {base_dir}/history.json   Vec<Session>
//! {base_dir}/index.json     IndexSnapshot
//! ```
//!
//! Writes go to a sibling `.tmp` file which is then renamed over the target,
//! so a crash mid-save leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use recall_core::history::SessionHistoryStore;
use recall_core::index::VectorIndex;
use recall_types::chat::Session;
use recall_types::error::IndexError;
use recall_types::vector::IndexSnapshot;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

pub const HISTORY_FILE: &str = "history.json";
pub const INDEX_FILE: &str = "index.json";

/// Errors from saving or loading snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid snapshot JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot rejected by index: {0}")]
    Index(#[from] IndexError),
}

/// Saves and loads snapshots as JSON files under one directory.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    base_dir: PathBuf,
}

impl JsonSnapshotStore {
    /// Create a store rooted at `base_dir`. The directory is created on the
    /// first save.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn history_path(&self) -> PathBuf {
        self.base_dir.join(HISTORY_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join(INDEX_FILE)
    }

    /// Write every session in `store`. Returns the number of sessions saved.
    pub async fn save_history(&self, store: &SessionHistoryStore) -> Result<usize, SnapshotError> {
        let sessions = store.snapshot();
        write_json(&self.history_path(), &sessions).await?;
        info!(sessions = sessions.len(), path = %self.history_path().display(), "history snapshot saved");
        Ok(sessions.len())
    }

    /// Replace the contents of `store` with the saved sessions.
    ///
    /// A missing file counts as an empty snapshot. Returns the number of
    /// sessions loaded.
    pub async fn load_history(&self, store: &SessionHistoryStore) -> Result<usize, SnapshotError> {
        let sessions: Vec<Session> = read_json(&self.history_path()).await?.unwrap_or_default();
        let count = sessions.len();
        store.restore(sessions);
        info!(sessions = count, path = %self.history_path().display(), "history snapshot loaded");
        Ok(count)
    }

    /// Write every record in `index`. Returns the number of records saved.
    pub async fn save_index(&self, index: &VectorIndex) -> Result<usize, SnapshotError> {
        let snapshot = index.snapshot();
        write_json(&self.index_path(), &snapshot).await?;
        info!(
            records = snapshot.records.len(),
            dimensionality = ?snapshot.dimensionality,
            path = %self.index_path().display(),
            "index snapshot saved"
        );
        Ok(snapshot.records.len())
    }

    /// Replace the contents of `index` with the saved records.
    ///
    /// A missing file counts as an empty snapshot. The snapshot is validated
    /// before anything is replaced; on error the index is unchanged.
    pub async fn load_index(&self, index: &VectorIndex) -> Result<usize, SnapshotError> {
        let snapshot: IndexSnapshot = read_json(&self.index_path()).await?.unwrap_or_default();
        let count = snapshot.records.len();
        index.restore(snapshot)?;
        info!(records = count, path = %self.index_path().display(), "index snapshot loaded");
        Ok(count)
    }

    /// Save both the history store and the index.
    pub async fn save_all(
        &self,
        store: &SessionHistoryStore,
        index: &VectorIndex,
    ) -> Result<(), SnapshotError> {
        self.save_history(store).await?;
        self.save_index(index).await?;
        Ok(())
    }

    /// Load both the history store and the index.
    pub async fn load_all(
        &self,
        store: &SessionHistoryStore,
        index: &VectorIndex,
    ) -> Result<(), SnapshotError> {
        self.load_history(store).await?;
        self.load_index(index).await?;
        Ok(())
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let bytes = serde_json::to_vec_pretty(value).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote snapshot");
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SnapshotError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no snapshot found");
            return Ok(None);
        }
        Err(source) => {
            return Err(SnapshotError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        })
}
