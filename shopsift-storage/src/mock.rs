//! In-memory row store for testing.

use crate::{AppendOutcome, RowStore, Sheet};
use async_trait::async_trait;
use shopsift_core::{BatchItem, RowUpdate, SheetRow, StorageError};
use std::sync::RwLock;

/// Holds one sheet in memory and records every write batch. Can be told to
/// fail reads or writes.
#[derive(Debug, Default)]
pub struct MockRowStore {
    sheet: RwLock<Sheet>,
    write_batches: RwLock<Vec<Vec<RowUpdate>>>,
    fail_reads: RwLock<Option<StorageError>>,
    fail_writes: RwLock<Option<StorageError>>,
}

impl MockRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<SheetRow>) -> Self {
        Self {
            sheet: RwLock::new(Sheet::from_rows(rows)),
            ..Default::default()
        }
    }

    /// Rows 2.. built from input texts, ids counting from 1.
    pub fn with_inputs<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = inputs
            .into_iter()
            .enumerate()
            .map(|(i, text)| SheetRow::new(i + 2, (i + 1).to_string(), text))
            .collect();
        Self::with_rows(rows)
    }

    pub fn fail_reads_with(&self, error: StorageError) {
        if let Ok(mut slot) = self.fail_reads.write() {
            *slot = Some(error);
        }
    }

    pub fn fail_writes_with(&self, error: StorageError) {
        if let Ok(mut slot) = self.fail_writes.write() {
            *slot = Some(error);
        }
    }

    /// Current copy of a row.
    pub fn row(&self, row: usize) -> Option<SheetRow> {
        self.sheet.read().ok().and_then(|s| s.get(row).cloned())
    }

    pub fn rows(&self) -> Vec<SheetRow> {
        self.sheet
            .read()
            .map(|s| s.rows().to_vec())
            .unwrap_or_default()
    }

    /// Write batches in call order.
    pub fn write_batches(&self) -> Vec<Vec<RowUpdate>> {
        self.write_batches
            .read()
            .map(|b| b.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RowStore for MockRowStore {
    async fn read_rows(&self, start_row: usize, end_row: Option<usize>) -> Result<Vec<SheetRow>, StorageError> {
        if let Some(error) = self.fail_reads.read().map_err(|_| StorageError::LockPoisoned)?.clone() {
            return Err(error);
        }
        let sheet = self.sheet.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(sheet.read(start_row, end_row))
    }

    async fn write_rows(&self, updates: &[RowUpdate]) -> Result<usize, StorageError> {
        if let Some(error) = self.fail_writes.read().map_err(|_| StorageError::LockPoisoned)?.clone() {
            return Err(error);
        }
        let written = self
            .sheet
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .apply(updates)?;
        self.write_batches
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .push(updates.to_vec());
        Ok(written)
    }

    async fn append_rows(&self, items: &[BatchItem], avoid_duplicates: bool) -> Result<AppendOutcome, StorageError> {
        let mut sheet = self.sheet.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(sheet.append(items, avoid_duplicates))
    }

    fn source(&self) -> String {
        "mock://sheet#Detail".to_string()
    }
}
