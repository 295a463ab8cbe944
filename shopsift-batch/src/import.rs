//! `--import`: load an input file and append it to the sheet.

use shopsift_core::ShopsiftResult;
use shopsift_storage::{load_items, validate_items, AppendOutcome, InputValidation, RowStore};
use std::path::Path;

/// Load items from `path`, report validation warnings and append them with
/// duplicate avoidance.
pub async fn import_items(store: &dyn RowStore, path: &Path) -> ShopsiftResult<(InputValidation, AppendOutcome)> {
    let items = load_items(path)?;
    let validation = validate_items(&items);
    for warning in &validation.warnings {
        tracing::warn!(path = %path.display(), warning = %warning, "Input validation");
    }

    let outcome = store.append_rows(&items, true).await?;
    tracing::info!(
        path = %path.display(),
        total = validation.total_items,
        valid = validation.valid_items,
        added = outcome.added_rows,
        duplicates = outcome.duplicate_skipped,
        start_row = outcome.start_row,
        "Items imported"
    );
    Ok((validation, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopsift_storage::MockRowStore;

    #[tokio::test]
    async fn test_import_text_file_skips_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.txt");
        std::fs::write(&path, "# header\nblue shirts\n\nred shoes\nblue shirts\n").unwrap();

        let store = MockRowStore::new();
        let (validation, outcome) = import_items(&store, &path).await.unwrap();
        assert_eq!(validation.total_items, 3);
        assert_eq!(outcome.added_rows, 2);
        assert_eq!(outcome.duplicate_skipped, 1);
        assert_eq!(store.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_import_unsupported_file() {
        let store = MockRowStore::new();
        assert!(import_items(&store, Path::new("items.xlsx")).await.is_err());
    }
}
