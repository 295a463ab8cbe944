//! Checkpoint persistence.

use crate::atomic::{blocking, read_optional, write_atomic};
use crate::CheckpointStore;
use async_trait::async_trait;
use shopsift_core::{ProcessingCheckpoint, StorageError};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Checkpoint kept in a single JSON file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<Option<ProcessingCheckpoint>, StorageError> {
        let path = self.path.clone();
        let Some(bytes) = blocking(&self.path, move || read_optional(&path)).await? else {
            return Ok(None);
        };
        let checkpoint = serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization {
            reason: format!("checkpoint {}: {}", self.path.display(), e),
        })?;
        Ok(Some(checkpoint))
    }

    async fn save(&self, checkpoint: &ProcessingCheckpoint) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(checkpoint).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })?;
        let path = self.path.clone();
        blocking(&self.path, move || write_atomic(&path, &bytes)).await?;
        tracing::debug!(
            path = %self.path.display(),
            last_row = checkpoint.last_processed_row,
            progress = checkpoint.progress_percentage,
            "Checkpoint saved"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let path = self.path.clone();
        blocking(&self.path, move || match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        })
        .await
    }
}

/// Checkpoint held in memory; keeps every saved checkpoint for inspection.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    saved: RwLock<Vec<ProcessingCheckpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkpoint(checkpoint: ProcessingCheckpoint) -> Self {
        Self {
            saved: RwLock::new(vec![checkpoint]),
        }
    }

    pub fn history(&self) -> Vec<ProcessingCheckpoint> {
        self.saved.read().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self) -> Result<Option<ProcessingCheckpoint>, StorageError> {
        let saved = self.saved.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(saved.last().cloned())
    }

    async fn save(&self, checkpoint: &ProcessingCheckpoint) -> Result<(), StorageError> {
        self.saved
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .push(checkpoint.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.saved
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopsift_core::BatchJob;

    fn checkpoint(row: usize) -> ProcessingCheckpoint {
        let mut job = BatchJob::new("data/workbook.json#Detail", 2, None);
        job.start(10);
        job.record(true);
        ProcessingCheckpoint::for_job(&job, row, row.to_string())
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("state").join("checkpoint.json"));
        assert_eq!(store.load().await.unwrap(), None);

        store.save(&checkpoint(5)).await.unwrap();
        store.save(&checkpoint(9)).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.last_processed_row, 9);
        assert_eq!(loaded.job_id, BatchJob::job_id_for("data/workbook.json#Detail", 2, None));

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert!(raw.get("lastProcessedRow").is_some());
        assert!(raw.get("progressPercentage").is_some());

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("checkpoint.json"));
        std::fs::write(store.path(), "[]").unwrap();
        assert!(matches!(store.load().await, Err(StorageError::Serialization { .. })));
    }

    #[tokio::test]
    async fn test_in_memory_keeps_history() {
        let store = InMemoryCheckpointStore::new();
        store.save(&checkpoint(3)).await.unwrap();
        store.save(&checkpoint(4)).await.unwrap();
        assert_eq!(store.load().await.unwrap().map(|c| c.last_processed_row), Some(4));
        assert_eq!(store.history().len(), 2);
    }
}
