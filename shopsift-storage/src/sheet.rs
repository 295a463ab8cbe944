//! In-memory sheet shared by the mock and the file-backed store.
//!
//! Row 1 is the header; data rows start at [`FIRST_DATA_ROW`].

use serde::{Deserialize, Serialize};
use shopsift_core::{BatchItem, RowUpdate, SheetRow, StorageError};
use std::collections::HashSet;

pub const FIRST_DATA_ROW: usize = 2;

/// Result of appending items to a sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendOutcome {
    pub added_rows: usize,
    pub duplicate_skipped: usize,
    /// First row written, or the row that would have been written.
    pub start_row: usize,
    pub end_row: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sheet {
    rows: Vec<SheetRow>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(mut rows: Vec<SheetRow>) -> Self {
        rows.sort_by_key(|r| r.row);
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[SheetRow] {
        &self.rows
    }

    pub fn get(&self, row: usize) -> Option<&SheetRow> {
        self.rows.iter().find(|r| r.row == row)
    }

    /// Last row holding data, or the header row when empty.
    pub fn last_row(&self) -> usize {
        self.rows.iter().map(|r| r.row).max().unwrap_or(FIRST_DATA_ROW - 1)
    }

    /// Rows in `[start_row, end_row]` that have input text.
    pub fn read(&self, start_row: usize, end_row: Option<usize>) -> Vec<SheetRow> {
        self.rows
            .iter()
            .filter(|r| r.row >= start_row && end_row.map_or(true, |end| r.row <= end))
            .filter(|r| !r.input_text.trim().is_empty())
            .cloned()
            .collect()
    }

    /// Apply every update or none: unknown rows fail the whole batch.
    pub fn apply(&mut self, updates: &[RowUpdate]) -> Result<usize, StorageError> {
        if let Some(missing) = updates.iter().find(|u| self.get(u.row).is_none()) {
            return Err(StorageError::RowNotFound { row: missing.row });
        }
        for update in updates {
            if let Some(row) = self.rows.iter_mut().find(|r| r.row == update.row) {
                update.apply_to(&mut row.results);
            }
        }
        Ok(updates.len())
    }

    /// Append items after the last row. Ids continue from the data row
    /// count; the item context (or case) fills the case column.
    pub fn append(&mut self, items: &[BatchItem], avoid_duplicates: bool) -> AppendOutcome {
        let mut existing: HashSet<String> = if avoid_duplicates {
            self.rows
                .iter()
                .filter(|r| !r.input_text.trim().is_empty())
                .map(|r| format!("{}|{}", r.input_text.trim(), r.case.trim()))
                .collect()
        } else {
            HashSet::new()
        };

        let start_row = self.last_row() + 1;
        let mut outcome = AppendOutcome {
            start_row,
            ..Default::default()
        };

        for item in items {
            let case = column_c(item);
            let key = format!("{}|{}", item.input_text.trim(), case.trim());
            if avoid_duplicates && !existing.insert(key) {
                outcome.duplicate_skipped += 1;
                tracing::debug!(input = %item.input_text, "Skipping duplicate item");
                continue;
            }
            let row = start_row + outcome.added_rows;
            let mut sheet_row = SheetRow::new(row, (row - 1).to_string(), item.input_text.trim());
            sheet_row.case = case;
            self.rows.push(sheet_row);
            outcome.added_rows += 1;
        }

        if outcome.added_rows > 0 {
            outcome.end_row = Some(start_row + outcome.added_rows - 1);
        }
        outcome
    }
}

fn column_c(item: &BatchItem) -> String {
    if !item.context.trim().is_empty() {
        item.context.trim().to_string()
    } else {
        item.case.as_deref().unwrap_or_default().trim().to_string()
    }
}
