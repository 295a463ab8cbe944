//! Batch bookkeeping: items, rows, per-item outcomes, jobs and checkpoints.

use crate::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ============================================================================
// INPUT
// ============================================================================

pub const DEFAULT_PRIORITY: &str = "normal";

/// One query to process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: String,
    pub input_text: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub case: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_priority() -> String {
    DEFAULT_PRIORITY.to_string()
}

impl BatchItem {
    pub fn new(id: impl Into<String>, input_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input_text: input_text.into(),
            description: None,
            context: String::new(),
            case: None,
            priority: default_priority(),
            metadata: Map::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_case(mut self, case: impl Into<String>) -> Self {
        self.case = Some(case.into());
        self
    }

    /// Key used to avoid appending the same query twice.
    pub fn dedup_key(&self) -> String {
        format!("{}|{}", self.input_text.trim(), self.context.trim())
    }
}

// ============================================================================
// SHEET ROWS
// ============================================================================

/// Result columns written per row, D through H.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultField {
    JsonOutput,
    ApiRequest,
    ApiResponse,
    FilteredResponse,
    ModelInfo,
}

impl ResultField {
    pub const ALL: [ResultField; 5] = [
        ResultField::JsonOutput,
        ResultField::ApiRequest,
        ResultField::ApiResponse,
        ResultField::FilteredResponse,
        ResultField::ModelInfo,
    ];

    pub fn column(&self) -> char {
        match self {
            ResultField::JsonOutput => 'D',
            ResultField::ApiRequest => 'E',
            ResultField::ApiResponse => 'F',
            ResultField::FilteredResponse => 'G',
            ResultField::ModelInfo => 'H',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultField::JsonOutput => "json_output",
            ResultField::ApiRequest => "api_request",
            ResultField::ApiResponse => "api_response",
            ResultField::FilteredResponse => "filtered_response",
            ResultField::ModelInfo => "model_info",
        }
    }
}

/// Prior output stored on a row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowResults {
    pub json_output: String,
    pub api_request: String,
    pub api_response: String,
    pub filtered_response: String,
    pub model_info: String,
}

impl RowResults {
    /// A row counts as processed once extraction or search output exists.
    pub fn is_processed(&self) -> bool {
        !self.json_output.trim().is_empty() || !self.api_response.trim().is_empty()
    }

    pub fn get(&self, field: ResultField) -> &str {
        match field {
            ResultField::JsonOutput => &self.json_output,
            ResultField::ApiRequest => &self.api_request,
            ResultField::ApiResponse => &self.api_response,
            ResultField::FilteredResponse => &self.filtered_response,
            ResultField::ModelInfo => &self.model_info,
        }
    }

    pub fn set(&mut self, field: ResultField, value: String) {
        match field {
            ResultField::JsonOutput => self.json_output = value,
            ResultField::ApiRequest => self.api_request = value,
            ResultField::ApiResponse => self.api_response = value,
            ResultField::FilteredResponse => self.filtered_response = value,
            ResultField::ModelInfo => self.model_info = value,
        }
    }
}

/// One row of the input sheet (1-based, row 1 is the header).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    pub row: usize,
    pub id: String,
    pub input_text: String,
    #[serde(default)]
    pub case: String,
    #[serde(default)]
    pub results: RowResults,
}

impl SheetRow {
    pub fn new(row: usize, id: impl Into<String>, input_text: impl Into<String>) -> Self {
        Self {
            row,
            id: id.into(),
            input_text: input_text.into(),
            case: String::new(),
            results: RowResults::default(),
        }
    }

    pub fn is_processed(&self) -> bool {
        self.results.is_processed()
    }

    pub fn to_item(&self) -> BatchItem {
        let mut item = BatchItem::new(self.id.clone(), self.input_text.clone());
        if !self.case.trim().is_empty() {
            item.case = Some(self.case.clone());
        }
        item
    }
}

/// Named field writes for one row. Fields not listed are left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowUpdate {
    pub row: usize,
    pub fields: Vec<(ResultField, String)>,
}

impl RowUpdate {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, field: ResultField, value: impl Into<String>) -> Self {
        self.fields.push((field, value.into()));
        self
    }

    pub fn from_results(row: usize, results: &RowResults) -> Self {
        let fields = ResultField::ALL
            .iter()
            .map(|field| (*field, results.get(*field).to_string()))
            .collect();
        Self { row, fields }
    }

    pub fn apply_to(&self, results: &mut RowResults) {
        for (field, value) in &self.fields {
            results.set(*field, value.clone());
        }
    }
}

// ============================================================================
// PER-ITEM OUTCOME
// ============================================================================

/// Stage an item is in. `Persisted` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStage {
    Pending,
    Extracting,
    Adapting,
    Searching,
    Reducing,
    Persisted,
    Failed,
}

impl ItemStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStage::Persisted | ItemStage::Failed)
    }
}

impl std::fmt::Display for ItemStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ItemStage::Pending => "pending",
            ItemStage::Extracting => "extracting",
            ItemStage::Adapting => "adapting",
            ItemStage::Searching => "searching",
            ItemStage::Reducing => "reducing",
            ItemStage::Persisted => "persisted",
            ItemStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub row: usize,
    pub item_id: String,
    pub success: bool,
    pub stage: ItemStage,
    pub processing_time_ms: f64,
    pub outputs: RowResults,
    pub error: Option<String>,
}

impl ProcessingResult {
    pub fn success(row: usize, item_id: impl Into<String>, outputs: RowResults, elapsed_ms: f64) -> Self {
        Self {
            row,
            item_id: item_id.into(),
            success: true,
            stage: ItemStage::Persisted,
            processing_time_ms: elapsed_ms,
            outputs,
            error: None,
        }
    }

    pub fn failure(
        row: usize,
        item_id: impl Into<String>,
        outputs: RowResults,
        error: impl Into<String>,
        elapsed_ms: f64,
    ) -> Self {
        Self {
            row,
            item_id: item_id.into(),
            success: false,
            stage: ItemStage::Failed,
            processing_time_ms: elapsed_ms,
            outputs,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// JOBS AND CHECKPOINTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Paused,
}

/// Running counters for a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStats {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub job_id: Uuid,
    pub source: String,
    pub start_row: usize,
    pub end_row: Option<usize>,
    pub total_items: usize,
    pub stats: ProcessingStats,
    pub status: JobStatus,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub error: Option<String>,
}

impl BatchJob {
    /// Job ids are derived from the data source and the row range, so a
    /// rerun over the same range resumes the same job.
    pub fn job_id_for(source: &str, start_row: usize, end_row: Option<usize>) -> Uuid {
        let end = end_row.map(|e| e.to_string()).unwrap_or_default();
        let name = format!("{}?rows={}..{}", source, start_row, end);
        Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
    }

    pub fn new(source: impl Into<String>, start_row: usize, end_row: Option<usize>) -> Self {
        let source = source.into();
        Self {
            job_id: Self::job_id_for(&source, start_row, end_row),
            source,
            start_row,
            end_row,
            total_items: 0,
            stats: ProcessingStats::default(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn start(&mut self, total_items: usize) {
        self.total_items = total_items;
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn record(&mut self, success: bool) {
        self.stats.processed += 1;
        if success {
            self.stats.successful += 1;
        } else {
            self.stats.failed += 1;
        }
    }

    pub fn record_skipped(&mut self) {
        self.stats.skipped += 1;
    }

    pub fn complete(&mut self) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn pause(&mut self) {
        self.status = JobStatus::Paused;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Share of items handled (processed or skipped), 0-100.
    pub fn progress_percentage(&self) -> f64 {
        if self.total_items == 0 {
            return 100.0;
        }
        let done = (self.stats.processed + self.stats.skipped).min(self.total_items);
        done as f64 / self.total_items as f64 * 100.0
    }

    /// Whether `row` falls inside this job's row range.
    pub fn covers_row(&self, row: usize) -> bool {
        row >= self.start_row && self.end_row.map_or(true, |end| row <= end)
    }
}

/// Durable resume point written after each persisted batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingCheckpoint {
    pub job_id: Uuid,
    /// Status of the job when the checkpoint was written.
    #[serde(default)]
    pub job_status: JobStatus,
    pub last_processed_row: usize,
    pub last_processed_id: String,
    pub progress_percentage: f64,
    pub processing_stats: ProcessingStats,
    pub timestamp: Timestamp,
}

impl ProcessingCheckpoint {
    pub fn for_job(job: &BatchJob, last_processed_row: usize, last_processed_id: impl Into<String>) -> Self {
        Self {
            job_id: job.job_id,
            job_status: job.status,
            last_processed_row,
            last_processed_id: last_processed_id.into(),
            progress_percentage: job.progress_percentage(),
            processing_stats: job.stats.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Whether `job` should continue after this checkpoint: same job, not
    /// finished, and the last row lies inside the job's range.
    pub fn resumes(&self, job: &BatchJob) -> bool {
        self.job_id == job.job_id
            && self.job_status != JobStatus::Completed
            && job.covers_row(self.last_processed_row)
    }
}
