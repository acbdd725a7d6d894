//! SwingLab Runner — data loading, parameter sweeps, trade files, summaries.
//!
//! This crate builds on `swinglab-core` to provide:
//! - CSV / Parquet loading with canonicalization and dataset hashing
//! - Single-run orchestration and trade file export
//! - Parallel (file × lag × window) sweeps with per-task error capture
//! - Trade statistics and the cross-file summary aggregator
//! - TOML sweep configuration

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod summary;
pub mod sweep;

pub use config::{ConfigError, DataSection, SweepConfig, SweepSection};
pub use data_loader::{load_series, LoadError, LoadOptions, LoadedSeries};
pub use export::{trade_file_name, ExportError, TradeRow};
pub use runner::{run_file, run_single, RunError, RunResult};
pub use summary::{generate_summary, summarize, SummaryRow};
pub use sweep::{
    run_sweep, ParamGrid, RunFailure, RunOutcome, RunRecord, SweepError, SweepProgress,
    SweepReport, TracingProgress,
};
