//! shopsift entry point.

use clap::Parser;
use shopsift_batch::{
    import_items, init_tracing, load_config, test_all_services, BatchOrchestrator, CliArgs, TelemetryConfig,
};
use shopsift_core::{AppConfig, JobStatus, ShopsiftResult};
use shopsift_llm::{KeywordExtractor, OpenAIKeywordExtractor};
use shopsift_search::{McpSearchClient, SearchClient};
use shopsift_storage::{FileCheckpointStore, JsonSheetStore};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing(&TelemetryConfig::default()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "shopsift failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn sheet_store(config: &AppConfig) -> Arc<JsonSheetStore> {
    Arc::new(JsonSheetStore::new(
        config.storage.sheet_path.clone(),
        config.storage.sheet_name.clone(),
    ))
}

fn services(config: &AppConfig) -> ShopsiftResult<(Arc<dyn SearchClient>, Arc<dyn KeywordExtractor>)> {
    let search = McpSearchClient::new(&config.api)?;
    let extractor = OpenAIKeywordExtractor::from_config(&config.llm, config.api.timeout())?;
    Ok((Arc::new(search), Arc::new(extractor)))
}

/// Returns whether the command succeeded.
async fn run(args: CliArgs) -> ShopsiftResult<bool> {
    let mut config = load_config(args.config.as_deref())?;
    if !args.skip_processed {
        config.processing.skip_processed = false;
    }
    let store = sheet_store(&config);

    if let Some(path) = &args.import {
        let (validation, outcome) = import_items(store.as_ref(), path).await?;
        println!(
            "Imported {} of {} items into rows {}..{} ({} duplicates skipped)",
            outcome.added_rows,
            validation.total_items,
            outcome.start_row,
            outcome.end_row.unwrap_or(outcome.start_row),
            outcome.duplicate_skipped
        );
        return Ok(true);
    }

    let (search, extractor) = services(&config)?;

    if args.test {
        let report = test_all_services(store.as_ref(), search.as_ref(), extractor.as_ref()).await;
        for check in &report.checks {
            println!(
                "{:<12} {:?} {}",
                check.component,
                check.status,
                check.message.as_deref().unwrap_or("")
            );
        }
        return Ok(report.all_healthy());
    }

    let checkpoints = Arc::new(FileCheckpointStore::new(config.storage.checkpoint_path.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing current item");
            let _ = shutdown_tx.send(true);
        }
    });

    let orchestrator = BatchOrchestrator::new(&config, store, checkpoints, extractor, search)
        .with_shutdown(shutdown_rx);
    let summary = orchestrator.run(args.start_row, args.end_row).await?;

    println!(
        "Processed {} rows: {} succeeded, {} failed, {} skipped in {:.1}s ({:?})",
        summary.processed_count,
        summary.success_count,
        summary.error_count,
        summary.skipped_count,
        summary.elapsed.as_secs_f64(),
        summary.job.status
    );
    Ok(summary.job.status != JobStatus::Failed)
}
