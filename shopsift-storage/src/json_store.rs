//! File-backed row store: a JSON workbook holding named sheets.

use crate::atomic::{blocking, read_optional, write_atomic};
use crate::{AppendOutcome, RowStore, Sheet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopsift_core::{BatchItem, RowUpdate, SheetRow, StorageError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// On-disk layout: `{"sheets": {"Detail": [row, ...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(default)]
    pub sheets: BTreeMap<String, Sheet>,
}

impl Workbook {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        serde_json::to_vec_pretty(self).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })
    }
}

/// Row store over one sheet of a JSON workbook.
///
/// The workbook is loaded on every operation and rewritten atomically after
/// each change, so the file is always a complete workbook.
#[derive(Debug)]
pub struct JsonSheetStore {
    path: PathBuf,
    sheet_name: String,
    lock: Mutex<()>,
}

impl JsonSheetStore {
    pub fn new(path: impl Into<PathBuf>, sheet_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet_name: sheet_name.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    async fn load(&self) -> Result<Workbook, StorageError> {
        let path = self.path.clone();
        let bytes = blocking(&self.path, move || read_optional(&path)).await?;
        match bytes {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => Workbook::from_bytes(&bytes),
            _ => Ok(Workbook::default()),
        }
    }

    async fn store(&self, workbook: &Workbook) -> Result<(), StorageError> {
        let bytes = workbook.to_bytes()?;
        let path = self.path.clone();
        blocking(&self.path, move || write_atomic(&path, &bytes)).await
    }

    /// Load, change the sheet, persist.
    async fn modify<T, F>(&self, change: F) -> Result<T, StorageError>
    where
        T: Send,
        F: FnOnce(&mut Sheet) -> Result<T, StorageError> + Send,
    {
        let _guard = self.lock.lock().await;
        let mut workbook = self.load().await?;
        let result = change(workbook.sheets.entry(self.sheet_name.clone()).or_default())?;
        self.store(&workbook).await?;
        Ok(result)
    }
}

#[async_trait]
impl RowStore for JsonSheetStore {
    async fn read_rows(&self, start_row: usize, end_row: Option<usize>) -> Result<Vec<SheetRow>, StorageError> {
        let _guard = self.lock.lock().await;
        let workbook = self.load().await?;
        let rows = workbook
            .sheets
            .get(&self.sheet_name)
            .map(|sheet| sheet.read(start_row, end_row))
            .unwrap_or_default();
        tracing::debug!(
            path = %self.path.display(),
            sheet = %self.sheet_name,
            rows = rows.len(),
            "Read rows"
        );
        Ok(rows)
    }

    async fn write_rows(&self, updates: &[RowUpdate]) -> Result<usize, StorageError> {
        if updates.is_empty() {
            return Ok(0);
        }
        let written = self.modify(|sheet| sheet.apply(updates)).await?;
        tracing::debug!(path = %self.path.display(), rows = written, "Wrote rows");
        Ok(written)
    }

    async fn append_rows(&self, items: &[BatchItem], avoid_duplicates: bool) -> Result<AppendOutcome, StorageError> {
        let outcome = self
            .modify(|sheet| Ok(sheet.append(items, avoid_duplicates)))
            .await?;
        tracing::info!(
            added = outcome.added_rows,
            duplicates = outcome.duplicate_skipped,
            start_row = outcome.start_row,
            "Appended rows"
        );
        Ok(outcome)
    }

    fn source(&self) -> String {
        format!("{}#{}", self.path.display(), self.sheet_name)
    }
}
