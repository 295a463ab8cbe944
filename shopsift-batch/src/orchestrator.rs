//! Batch orchestration: read rows, run each item through the stage machine,
//! persist results in batches and checkpoint after every persisted batch.
//!
//! Processing is sequential. Item failures are recorded and the batch moves
//! on; only storage failures abort a run.

use crate::stages::ItemPipeline;
use serde::{Deserialize, Serialize};
use shopsift_core::{
    AppConfig, BatchJob, JobStatus, ProcessingCheckpoint, ProcessingConfig, ProcessingResult,
    RowUpdate, SheetRow, ShopsiftResult, StorageError,
};
use shopsift_llm::KeywordExtractor;
use shopsift_search::SearchClient;
use shopsift_storage::{CheckpointStore, RowStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Outcome of one `run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processed_count: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
    pub elapsed: Duration,
    pub job: BatchJob,
}

impl BatchSummary {
    fn from_job(job: BatchJob, elapsed: Duration) -> Self {
        Self {
            processed_count: job.stats.processed,
            success_count: job.stats.successful,
            error_count: job.stats.failed,
            skipped_count: job.stats.skipped,
            elapsed,
            job,
        }
    }
}

/// Drives the pipeline over a range of sheet rows.
pub struct BatchOrchestrator {
    store: Arc<dyn RowStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    pipeline: ItemPipeline,
    processing: ProcessingConfig,
    shutdown: Option<watch::Receiver<bool>>,
}

/// Row and id of the last item handled, for the next checkpoint.
#[derive(Debug, Default)]
struct Cursor {
    row: usize,
    id: String,
}

impl BatchOrchestrator {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn RowStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        extractor: Arc<dyn KeywordExtractor>,
        search: Arc<dyn SearchClient>,
    ) -> Self {
        Self {
            store,
            checkpoints,
            pipeline: ItemPipeline::new(config, extractor, search),
            processing: config.processing.clone(),
            shutdown: None,
        }
    }

    /// Stop between items once `true` is sent on this channel.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Sleep between requests, waking early on shutdown.
    async fn pause_between_items(&self) {
        let delay = self.processing.delay();
        if delay.is_zero() {
            return;
        }
        match &self.shutdown {
            Some(rx) => {
                let mut rx = rx.clone();
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = rx.changed() => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }

    /// Process rows `start_row..=end_row` (open-ended when `None`).
    pub async fn run(&self, start_row: usize, end_row: Option<usize>) -> ShopsiftResult<BatchSummary> {
        let started = Instant::now();
        let mut job = BatchJob::new(self.store.source(), start_row, end_row);

        let rows = match self.store.read_rows(start_row, end_row).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, source = %job.source, "Cannot read rows, aborting batch");
                return Err(e.into());
            }
        };
        let resume_after = self.resume_point(&job).await?;

        job.start(rows.len());
        tracing::info!(
            job_id = %job.job_id,
            rows = rows.len(),
            start_row,
            end_row = ?end_row,
            resume_after = ?resume_after,
            "Batch started"
        );

        let mut pending: Vec<RowUpdate> = Vec::new();
        let mut cursor = Cursor::default();
        let mut processed_any = false;

        for row in &rows {
            if self.should_skip(row, resume_after) {
                job.record_skipped();
                continue;
            }

            if processed_any {
                self.pause_between_items().await;
            }
            if self.shutdown_requested() {
                tracing::info!(row = row.row, "Shutdown requested, pausing batch");
                job.pause();
                break;
            }

            let result = self.process_row(row).await;
            processed_any = true;
            job.record(result.success);
            job.stats.elapsed_secs = started.elapsed().as_secs_f64();
            cursor = Cursor {
                row: row.row,
                id: row.id.clone(),
            };
            if let Some(update) = row_update(&result) {
                pending.push(update);
            }

            if pending.len() >= self.processing.batch_size {
                self.persist(&mut pending, &mut job, &cursor).await?;
            }
        }

        job.stats.elapsed_secs = started.elapsed().as_secs_f64();
        if job.status == JobStatus::Running {
            job.complete();
        }
        let flushed = self.persist(&mut pending, &mut job, &cursor).await?;
        if !flushed && job.status == JobStatus::Completed && cursor.row > 0 {
            self.mark_completed(&job, &cursor).await;
        }
        let summary = BatchSummary::from_job(job, started.elapsed());
        tracing::info!(
            job_id = %summary.job.job_id,
            status = ?summary.job.status,
            processed = summary.processed_count,
            successful = summary.success_count,
            failed = summary.error_count,
            skipped = summary.skipped_count,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Batch finished"
        );
        Ok(summary)
    }

    /// Last processed row of an interrupted run of this job, when resuming.
    async fn resume_point(&self, job: &BatchJob) -> ShopsiftResult<Option<usize>> {
        if !self.processing.skip_processed {
            return Ok(None);
        }
        let Some(checkpoint) = self.checkpoints.load().await? else {
            return Ok(None);
        };
        if !checkpoint.resumes(job) {
            tracing::debug!(
                checkpoint_job = %checkpoint.job_id,
                checkpoint_status = ?checkpoint.job_status,
                last_row = checkpoint.last_processed_row,
                "Checkpoint does not apply to this run"
            );
            return Ok(None);
        }
        tracing::info!(
            last_row = checkpoint.last_processed_row,
            last_id = %checkpoint.last_processed_id,
            progress = checkpoint.progress_percentage,
            "Resuming from checkpoint"
        );
        Ok(Some(checkpoint.last_processed_row))
    }

    fn should_skip(&self, row: &SheetRow, resume_after: Option<usize>) -> bool {
        if resume_after.is_some_and(|last| row.row <= last) {
            tracing::debug!(row = row.row, "Before checkpoint, skipping");
            return true;
        }
        if self.processing.skip_processed && row.is_processed() {
            tracing::debug!(row = row.row, "Already processed, skipping");
            return true;
        }
        false
    }

    async fn process_row(&self, row: &SheetRow) -> ProcessingResult {
        let started = Instant::now();
        let item = row.to_item();
        let outcome = self.pipeline.process(&item).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(outputs) => {
                tracing::info!(row = row.row, item_id = %item.id, elapsed_ms, "Item processed");
                ProcessingResult::success(row.row, item.id, outputs, elapsed_ms)
            }
            Err(failure) => {
                let message = failure.to_string();
                tracing::warn!(
                    row = row.row,
                    item_id = %item.id,
                    stage = %failure.stage,
                    error = %failure.error,
                    "Item failed"
                );
                ProcessingResult::failure(row.row, item.id, failure.partial, message, elapsed_ms)
            }
        }
    }

    /// Write pending updates, then checkpoint. Returns whether anything was
    /// written. A storage failure marks the job failed and aborts the run.
    async fn persist(&self, pending: &mut Vec<RowUpdate>, job: &mut BatchJob, cursor: &Cursor) -> ShopsiftResult<bool> {
        if pending.is_empty() {
            return Ok(false);
        }
        let write = async {
            let written = self.store.write_rows(pending.as_slice()).await?;
            let checkpoint = ProcessingCheckpoint::for_job(job, cursor.row, cursor.id.clone());
            self.checkpoints.save(&checkpoint).await?;
            Ok::<usize, StorageError>(written)
        };
        match write.await {
            Ok(written) => {
                tracing::info!(rows = written, last_row = cursor.row, status = ?job.status, "Batch persisted");
                pending.clear();
                Ok(true)
            }
            Err(e) => {
                tracing::error!(error = %e, rows = pending.len(), "Persisting batch failed");
                job.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Record that the job finished when its last batch was already
    /// checkpointed mid-run. Rows are on the sheet, so failure only warns.
    async fn mark_completed(&self, job: &BatchJob, cursor: &Cursor) {
        let checkpoint = ProcessingCheckpoint::for_job(job, cursor.row, cursor.id.clone());
        if let Err(e) = self.checkpoints.save(&checkpoint).await {
            tracing::warn!(error = %e, job_id = %job.job_id, "Cannot mark checkpoint completed");
        }
    }
}

/// Fields to write for a result. Successful items write every field; failed
/// items write only what they produced.
fn row_update(result: &ProcessingResult) -> Option<RowUpdate> {
    if result.success {
        return Some(RowUpdate::from_results(result.row, &result.outputs));
    }
    let update = shopsift_core::ResultField::ALL
        .iter()
        .filter(|field| !result.outputs.get(**field).is_empty())
        .fold(RowUpdate::new(result.row), |update, field| {
            update.with(*field, result.outputs.get(*field))
        });
    (!update.fields.is_empty()).then_some(update)
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("source", &self.store.source())
            .field("pipeline", &self.pipeline)
            .field("processing", &self.processing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopsift_core::{ResultField, RowResults};

    #[test]
    fn test_row_update_for_failure_skips_empty_fields() {
        let outputs = RowResults {
            json_output: "{}".to_string(),
            api_response: "{\"error\": \"x\"}".to_string(),
            ..Default::default()
        };
        let result = ProcessingResult::failure(4, "3", outputs, "searching failed: x", 1.0);
        let update = row_update(&result).unwrap();
        assert_eq!(update.row, 4);
        let fields: Vec<ResultField> = update.fields.iter().map(|(f, _)| *f).collect();
        assert_eq!(fields, vec![ResultField::JsonOutput, ResultField::ApiResponse]);
    }

    #[test]
    fn test_row_update_for_empty_failure_is_none() {
        let result = ProcessingResult::failure(4, "3", RowResults::default(), "boom", 1.0);
        assert!(row_update(&result).is_none());
    }

    #[test]
    fn test_row_update_for_success_writes_all_fields() {
        let result = ProcessingResult::success(2, "1", RowResults::default(), 1.0);
        assert_eq!(row_update(&result).unwrap().fields.len(), 5);
    }
}
