//! Backtest runner — wires a loaded series, the engine and the trade file together.
//!
//! Two entry points:
//! - `run_single()`: runs one grid point over a pre-loaded series. No I/O.
//!   Used by the sweep, where each input is loaded once and shared.
//! - `run_file()`: loads a file, runs, and optionally writes the trade file.
//!   Used by the CLI `run` command.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use swinglab_core::domain::{AnnotatedTrade, Position};
use swinglab_core::{run_backtest, CoreError, EngineConfig, EngineMode, SwingParams};

use crate::data_loader::{load_series, LoadError, LoadOptions, LoadedSeries};
use crate::export::{trade_file_name, write_trades_csv, ExportError};

/// Errors from one run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] CoreError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

/// Current schema version for persisted run results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single (symbol, lag, window) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub params: SwingParams,
    pub mode: EngineMode,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub bar_count: usize,
    pub long_signals: usize,
    pub short_signals: usize,
    pub trades: Vec<AnnotatedTrade>,
    /// Still-open position after the last bar. Never written as a trade.
    pub final_position: Position,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunResult {
    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.trade.pnl).sum()
    }

    /// `{symbol}_lag{L}_win{W}.csv`
    pub fn trade_file_name(&self) -> String {
        trade_file_name(&self.symbol, self.params)
    }

    /// Write the trade file into `dir`. Returns `None` without touching the
    /// filesystem when the run produced no trades.
    pub fn write_trades(&self, dir: &Path) -> Result<Option<PathBuf>, ExportError> {
        if self.trades.is_empty() {
            return Ok(None);
        }
        let path = dir.join(self.trade_file_name());
        write_trades_csv(&path, &self.trades)?;
        Ok(Some(path))
    }
}

/// Run one grid point over a pre-loaded series. No I/O.
pub fn run_single(
    series: &LoadedSeries,
    params: SwingParams,
    mode: EngineMode,
) -> Result<RunResult, RunError> {
    let output = run_backtest(&series.bars, &EngineConfig::new(params, mode))?;

    Ok(RunResult {
        schema_version: SCHEMA_VERSION,
        symbol: series.symbol.clone(),
        params,
        mode,
        dataset_hash: series.dataset_hash.clone(),
        has_synthetic: series.synthetic,
        bar_count: output.bar_count,
        long_signals: output.long_signals,
        short_signals: output.short_signals,
        trades: output.trades,
        final_position: output.final_position,
    })
}

/// Load `path`, run one grid point, and write the trade file when
/// `output_dir` is given.
pub fn run_file(
    path: &Path,
    params: SwingParams,
    mode: EngineMode,
    opts: &LoadOptions,
    output_dir: Option<&Path>,
) -> Result<(RunResult, Option<PathBuf>), RunError> {
    let series = load_series(path, opts)?;
    let result = run_single(&series, params, mode)?;
    let written = match output_dir {
        Some(dir) => result.write_trades(dir)?,
        None => None,
    };
    Ok((result, written))
}
