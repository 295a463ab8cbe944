//! Shopsift Storage - row store and checkpoint persistence
//!
//! The batch reads pending rows and writes result fields through `RowStore`;
//! the resume point lives in a `CheckpointStore`. Both have an in-memory
//! implementation for tests and a JSON-file implementation for real runs.

use async_trait::async_trait;
use shopsift_core::{BatchItem, ProcessingCheckpoint, RowUpdate, SheetRow, StorageError};

mod atomic;
mod checkpoint;
mod json_store;
mod loader;
mod mock;
mod sheet;

pub use atomic::write_atomic;
pub use checkpoint::{FileCheckpointStore, InMemoryCheckpointStore};
pub use json_store::{JsonSheetStore, Workbook};
pub use loader::{load_items, validate_items, InputFormat, InputValidation};
pub use mock::MockRowStore;
pub use sheet::{AppendOutcome, Sheet, FIRST_DATA_ROW};

/// Row-indexed tabular store. Implementations must be thread-safe.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Rows from `start_row` through `end_row` (inclusive, open when `None`)
    /// that have input text, with any prior results.
    async fn read_rows(&self, start_row: usize, end_row: Option<usize>) -> Result<Vec<SheetRow>, StorageError>;

    /// Apply a batch of per-row field writes. Returns rows written.
    async fn write_rows(&self, updates: &[RowUpdate]) -> Result<usize, StorageError>;

    /// Append items after the last row, optionally skipping duplicates.
    async fn append_rows(&self, items: &[BatchItem], avoid_duplicates: bool) -> Result<AppendOutcome, StorageError>;

    /// Stable description of the backing sheet, used to derive job ids.
    fn source(&self) -> String;
}

/// Durable resume point for batch jobs.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self) -> Result<Option<ProcessingCheckpoint>, StorageError>;

    async fn save(&self, checkpoint: &ProcessingCheckpoint) -> Result<(), StorageError>;

    async fn clear(&self) -> Result<(), StorageError>;
}
