//! Shopsift Batch - resumable batch runner
//!
//! Reads pending rows from a `RowStore`, runs each item through extraction,
//! filter adaptation, two-phase search and response reduction, and writes
//! the result fields back in batches with a checkpoint after every write.
//! Also hosts the pieces of the `shopsift` binary: config loading, tracing
//! setup, argument parsing, `--import` and `--test`.

pub mod artifacts;
pub mod cli;
pub mod health;
pub mod import;
pub mod orchestrator;
pub mod settings;
pub mod stages;
pub mod telemetry;

pub use cli::CliArgs;
pub use health::test_all_services;
pub use import::import_items;
pub use orchestrator::{BatchOrchestrator, BatchSummary};
pub use settings::{load_config, parse_config, resolve_config_path};
pub use stages::{ItemPipeline, StageFailure};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
