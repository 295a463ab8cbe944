//! Input file loaders: `.csv`, `.json`, `.jsonl` and `.txt` to `BatchItem`s.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shopsift_core::{BatchItem, StorageError, DEFAULT_PRIORITY};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
    JsonLines,
    Text,
}

impl InputFormat {
    pub fn detect(path: &Path) -> Result<Self, StorageError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            "jsonl" | "ndjson" => Ok(InputFormat::JsonLines),
            "txt" => Ok(InputFormat::Text),
            _ => Err(StorageError::UnsupportedFormat { extension }),
        }
    }
}

/// Load items from `path`, picking the format by extension. Items without
/// input text are dropped.
pub fn load_items(path: &Path) -> Result<Vec<BatchItem>, StorageError> {
    let format = InputFormat::detect(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| StorageError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let items = match format {
        InputFormat::Csv => parse_csv(&content)?,
        InputFormat::Json => parse_json(&content)?,
        InputFormat::JsonLines => parse_json_lines(&content),
        InputFormat::Text => parse_text(&content),
    };
    tracing::info!(path = %path.display(), items = items.len(), "Loaded input items");
    Ok(items)
}

fn text_field(record: &Map<String, Value>, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn item_from_record(record: &Map<String, Value>, default_id: usize) -> Option<BatchItem> {
    let input_text = text_field(record, "input_text");
    if input_text.is_empty() {
        return None;
    }
    let id = match record.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => default_id.to_string(),
    };
    let description = text_field(record, "description");
    let case = text_field(record, "case");
    let priority = text_field(record, "priority");

    let mut item = BatchItem::new(id, input_text).with_context(text_field(record, "context"));
    item.description = (!description.is_empty()).then_some(description);
    item.case = (!case.is_empty()).then_some(case);
    item.priority = if priority.is_empty() {
        DEFAULT_PRIORITY.to_string()
    } else {
        priority
    };
    item.metadata = record.clone();
    Some(item)
}

fn parse_json(content: &str) -> Result<Vec<BatchItem>, StorageError> {
    let parsed: Value = serde_json::from_str(content).map_err(|e| StorageError::Serialization {
        reason: e.to_string(),
    })?;
    let records = match parsed {
        Value::Array(records) => records,
        Value::Object(mut object) => match object.remove("data").or_else(|| object.remove("items")) {
            Some(Value::Array(records)) => records,
            Some(_) => {
                return Err(StorageError::Serialization {
                    reason: "'data'/'items' must be a list".to_string(),
                })
            }
            None => vec![Value::Object(object)],
        },
        _ => {
            return Err(StorageError::Serialization {
                reason: "expected a list or an object".to_string(),
            })
        }
    };
    Ok(records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| record.as_object().and_then(|r| item_from_record(r, i + 1)))
        .collect())
}

/// Delimiters tried when reading a CSV header.
const CSV_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Most frequent candidate delimiter in the header line, `,` by default.
fn sniff_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    CSV_DELIMITERS
        .iter()
        .map(|&d| (d, header.bytes().filter(|&b| b == d).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

/// Header row names the columns; each record maps onto the same fields as a
/// JSON object. Row numbers in metadata count the header as row 1.
fn parse_csv(content: &str) -> Result<Vec<BatchItem>, StorageError> {
    let csv_error = |e: csv::Error| StorageError::Serialization {
        reason: format!("invalid CSV: {}", e),
    };
    let delimiter = sniff_delimiter(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());
    let headers = reader.headers().map_err(csv_error)?.clone();

    let mut items = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let row_number = index + 1;
        let fields: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.to_string(), Value::from(value)))
            .collect();
        if let Some(mut item) = item_from_record(&fields, row_number) {
            item.metadata.insert("row_number".to_string(), Value::from(row_number + 1));
            items.push(item);
        }
    }
    tracing::debug!(delimiter = %(delimiter as char), items = items.len(), "Parsed CSV input");
    Ok(items)
}

fn parse_json_lines(content: &str) -> Vec<BatchItem> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(record)) => item_from_record(&record, index + 1),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping invalid JSON line");
                None
            }
        })
        .collect()
}

fn parse_text(content: &str) -> Vec<BatchItem> {
    content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line_no = index + 1;
            let mut item = BatchItem::new(line_no.to_string(), line);
            item.description = Some(format!("Query from line {}", line_no));
            item.metadata.insert("line".to_string(), Value::from(line));
            item.metadata.insert("line_number".to_string(), Value::from(line_no));
            Some(item)
        })
        .collect()
}

/// Pre-import check of loaded items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputValidation {
    pub total_items: usize,
    pub valid_items: usize,
    pub empty_input_text: usize,
    pub missing_ids: usize,
    pub warnings: Vec<String>,
}

pub fn validate_items(items: &[BatchItem]) -> InputValidation {
    let mut report = InputValidation {
        total_items: items.len(),
        ..Default::default()
    };
    for item in items {
        if item.id.trim().is_empty() {
            report.missing_ids += 1;
        } else if item.input_text.trim().is_empty() {
            report.empty_input_text += 1;
        } else {
            report.valid_items += 1;
        }
    }
    if report.empty_input_text > 0 {
        report
            .warnings
            .push(format!("{} items have empty input_text", report.empty_input_text));
    }
    if report.missing_ids > 0 {
        report.warnings.push(format!("{} items have no id", report.missing_ids));
    }
    report
}
