//! Parameter sweep over input files × (lag, window) grid.
//!
//! Every (file, lag, window) combination is an independent task. Tasks run on
//! a bounded rayon pool; each returns its own outcome, so a failing file or
//! grid point never aborts its siblings. Inputs are loaded once and shared
//! read-only across the tasks that use them.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use swinglab_core::{EngineMode, SwingParams};

use crate::config::{ConfigError, SweepConfig};
use crate::data_loader::{discover_inputs, load_series, symbol_from_path, LoadError, LoadOptions, LoadedSeries};
use crate::export::{write_json, ExportError};
use crate::runner::{run_single, RunError, SCHEMA_VERSION};
use crate::summary::parse_trade_file_name;

pub const MANIFEST_FILE: &str = "sweep_manifest.json";

/// Sweep-level errors. These abort the sweep before or after the tasks run;
/// per-task failures are reported as [`RunFailure`] instead.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("input discovery failed: {0}")]
    Discovery(#[from] LoadError),

    #[error("no .csv or .parquet inputs in {}", .dir.display())]
    NoInputs { dir: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to write sweep manifest: {0}")]
    Export(#[from] ExportError),
}

// ── Grid ─────────────────────────────────────────────────────────────

/// Cartesian (lag, window) grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    pub lags: Vec<usize>,
    pub windows: Vec<usize>,
}

impl ParamGrid {
    pub fn new(lags: Vec<usize>, windows: Vec<usize>) -> Self {
        Self { lags, windows }
    }

    /// Returns the total number of grid points.
    pub fn size(&self) -> usize {
        self.lags.len() * self.windows.len()
    }

    /// All grid points, lag-major.
    pub fn points(&self) -> Vec<SwingParams> {
        self.lags
            .iter()
            .flat_map(|&lag| self.windows.iter().map(move |&window| SwingParams::new(lag, window)))
            .collect()
    }
}

// ── Progress ─────────────────────────────────────────────────────────

/// Progress callback for a sweep. Called from worker threads.
pub trait SweepProgress: Send + Sync {
    /// Called once, after inputs are loaded and tasks are known.
    fn on_start(&self, inputs: usize, total_runs: usize);

    /// Called as each task finishes, in completion order.
    fn on_run_complete(&self, outcome: &RunOutcome, completed: usize, total: usize);

    /// Called when every task has finished.
    fn on_finish(&self, report: &SweepReport);
}

/// Progress reporter that emits `tracing` events.
pub struct TracingProgress;

impl SweepProgress for TracingProgress {
    fn on_start(&self, inputs: usize, total_runs: usize) {
        info!(inputs, runs = total_runs, "sweep started");
    }

    fn on_run_complete(&self, outcome: &RunOutcome, completed: usize, total: usize) {
        match outcome {
            RunOutcome::Completed(r) => info!(
                symbol = %r.symbol,
                lag = r.lag,
                window = r.window,
                trades = r.trades,
                progress = %format!("{completed}/{total}"),
                "run complete"
            ),
            RunOutcome::Failed(f) => error!(
                symbol = %f.symbol,
                lag = f.lag,
                window = f.window,
                error = %f.error,
                progress = %format!("{completed}/{total}"),
                "run failed"
            ),
        }
    }

    fn on_finish(&self, report: &SweepReport) {
        info!(
            completed = report.runs.len(),
            failed = report.failures.len(),
            trade_files = report.trade_file_count(),
            "sweep finished"
        );
    }
}

// ── Outcomes ─────────────────────────────────────────────────────────

/// A task that ran to completion (possibly with zero trades).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub symbol: String,
    pub lag: usize,
    pub window: usize,
    pub trades: usize,
    pub total_pnl: f64,
    /// `None` when the run produced no trades.
    pub trade_file: Option<PathBuf>,
}

/// A task that failed, with the identifying parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub symbol: String,
    pub lag: usize,
    pub window: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(RunRecord),
    Failed(RunFailure),
}

/// Provenance of one successfully loaded input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    pub symbol: String,
    pub path: PathBuf,
    pub bars: usize,
    pub dataset_hash: String,
    pub synthetic: bool,
}

impl From<&LoadedSeries> for InputRecord {
    fn from(s: &LoadedSeries) -> Self {
        Self {
            symbol: s.symbol.clone(),
            path: s.source.clone(),
            bars: s.bars.len(),
            dataset_hash: s.dataset_hash.clone(),
            synthetic: s.synthetic,
        }
    }
}

/// Everything a sweep did, sorted by (symbol, lag, window).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub mode: EngineMode,
    pub inputs: Vec<InputRecord>,
    pub runs: Vec<RunRecord>,
    pub failures: Vec<RunFailure>,
}

impl SweepReport {
    pub fn total_runs(&self) -> usize {
        self.runs.len() + self.failures.len()
    }

    pub fn trade_file_count(&self) -> usize {
        self.runs.iter().filter(|r| r.trade_file.is_some()).count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Persisted next to the trade files as `sweep_manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepManifest {
    pub schema_version: u32,
    pub created_at: String,
    pub config: SweepConfig,
    pub report: SweepReport,
}

// ── Execution ────────────────────────────────────────────────────────

/// Run a configured sweep: discover and load inputs, run every task, write
/// the manifest.
pub fn run_sweep(
    config: &SweepConfig,
    progress: Option<&dyn SweepProgress>,
) -> Result<SweepReport, SweepError> {
    config.validate()?;
    let input_dir = &config.sweep.input_dir;
    let output_dir = &config.sweep.output_dir;

    let inputs = discover_inputs(input_dir)?;
    if inputs.is_empty() {
        return Err(SweepError::NoInputs {
            dir: input_dir.clone(),
        });
    }

    prepare_output_dir(output_dir, config.sweep.clear_output)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.effective_workers())
        .build()?;

    let opts = LoadOptions {
        timestamp_format: config.data.timestamp_format.clone(),
    };
    let grid = config.grid();

    let loaded: Vec<(PathBuf, Result<LoadedSeries, LoadError>)> = pool.install(|| {
        inputs
            .par_iter()
            .map(|path| (path.clone(), load_series(path, &opts)))
            .collect()
    });

    let mut series = Vec::new();
    let mut load_failures = Vec::new();
    let mut failed_inputs = 0;
    for (path, result) in loaded {
        match result {
            Ok(s) => series.push(Arc::new(s)),
            Err(e) => {
                let symbol = symbol_from_path(&path);
                warn!(symbol = %symbol, error = %e, "input failed to load; its runs are marked failed");
                failed_inputs += 1;
                load_failures.extend(grid.points().into_iter().map(|p| RunFailure {
                    symbol: symbol.clone(),
                    lag: p.lag,
                    window: p.window,
                    error: e.to_string(),
                }));
            }
        }
    }

    let report = pool.install(|| {
        run_tasks(
            &series,
            FailedInputs {
                count: failed_inputs,
                failures: load_failures,
            },
            &grid,
            config.sweep.mode,
            output_dir,
            progress,
        )
    });

    let manifest = SweepManifest {
        schema_version: SCHEMA_VERSION,
        created_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        config: config.clone(),
        report: report.clone(),
    };
    write_json(&output_dir.join(MANIFEST_FILE), &manifest)?;

    if let Some(p) = progress {
        p.on_finish(&report);
    }
    Ok(report)
}

/// Run every (series, grid point) task on the current rayon pool and write
/// trade files into `output_dir`.
///
/// Call inside `ThreadPool::install` to bound parallelism.
pub fn sweep_series(
    series: &[Arc<LoadedSeries>],
    grid: &ParamGrid,
    mode: EngineMode,
    output_dir: &Path,
    progress: Option<&dyn SweepProgress>,
) -> SweepReport {
    run_tasks(series, FailedInputs::default(), grid, mode, output_dir, progress)
}

/// Inputs that never loaded, with one failure per grid point each.
#[derive(Default)]
struct FailedInputs {
    count: usize,
    failures: Vec<RunFailure>,
}

fn run_tasks(
    series: &[Arc<LoadedSeries>],
    failed: FailedInputs,
    grid: &ParamGrid,
    mode: EngineMode,
    output_dir: &Path,
    progress: Option<&dyn SweepProgress>,
) -> SweepReport {
    let tasks: Vec<(Arc<LoadedSeries>, SwingParams)> = series
        .iter()
        .flat_map(|s| grid.points().into_iter().map(move |p| (Arc::clone(s), p)))
        .collect();
    let total = tasks.len() + failed.failures.len();
    let completed = AtomicUsize::new(0);

    if let Some(p) = progress {
        p.on_start(series.len() + failed.count, total);
        for failure in &failed.failures {
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            p.on_run_complete(&RunOutcome::Failed(failure.clone()), done, total);
        }
    } else {
        completed.fetch_add(failed.failures.len(), Ordering::Relaxed);
    }

    let outcomes: Vec<RunOutcome> = tasks
        .par_iter()
        .map(|(s, params)| {
            let outcome = guard_task(&s.symbol, *params, || {
                execute_task(s, *params, mode, output_dir)
            });
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(p) = progress {
                p.on_run_complete(&outcome, done, total);
            }
            outcome
        })
        .collect();

    let mut report = SweepReport {
        mode,
        inputs: series.iter().map(|s| InputRecord::from(s.as_ref())).collect(),
        runs: Vec::new(),
        failures: failed.failures,
    };
    for outcome in outcomes {
        match outcome {
            RunOutcome::Completed(r) => report.runs.push(r),
            RunOutcome::Failed(f) => report.failures.push(f),
        }
    }
    sort_report(&mut report);
    report
}

/// Run one task, turning a panic into a [`RunFailure`] for that grid point.
fn guard_task(
    symbol: &str,
    params: SwingParams,
    task: impl FnOnce() -> RunOutcome,
) -> RunOutcome {
    panic::catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        error!(
            symbol = %symbol,
            lag = params.lag,
            window = params.window,
            panic = %message,
            "run panicked"
        );
        RunOutcome::Failed(RunFailure {
            symbol: symbol.to_string(),
            lag: params.lag,
            window: params.window,
            error: format!("run panicked: {message}"),
        })
    })
}

fn execute_task(
    series: &LoadedSeries,
    params: SwingParams,
    mode: EngineMode,
    output_dir: &Path,
) -> RunOutcome {
    let attempt = || -> Result<RunRecord, RunError> {
        let result = run_single(series, params, mode)?;
        let trade_file = result.write_trades(output_dir)?;
        if trade_file.is_none() {
            warn!(
                symbol = %series.symbol,
                lag = params.lag,
                window = params.window,
                "no trades generated"
            );
        }
        Ok(RunRecord {
            symbol: result.symbol.clone(),
            lag: params.lag,
            window: params.window,
            trades: result.trades.len(),
            total_pnl: result.total_pnl(),
            trade_file,
        })
    };

    match attempt() {
        Ok(record) => RunOutcome::Completed(record),
        Err(e) => RunOutcome::Failed(RunFailure {
            symbol: series.symbol.clone(),
            lag: params.lag,
            window: params.window,
            error: e.to_string(),
        }),
    }
}

fn sort_report(report: &mut SweepReport) {
    report
        .runs
        .sort_by(|a, b| (&a.symbol, a.lag, a.window).cmp(&(&b.symbol, b.lag, b.window)));
    report
        .failures
        .sort_by(|a, b| (&a.symbol, a.lag, a.window).cmp(&(&b.symbol, b.lag, b.window)));
    report.inputs.sort_by(|a, b| a.symbol.cmp(&b.symbol));
}

fn prepare_output_dir(dir: &Path, clear: bool) -> Result<(), SweepError> {
    std::fs::create_dir_all(dir).map_err(|source| SweepError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    if clear {
        let removed = clear_trade_files(dir)?;
        if removed > 0 {
            info!(removed, dir = %dir.display(), "cleared stale trade files");
        }
    }
    Ok(())
}

/// Delete `*_lag{L}_win{W}.csv` files directly under `dir`. Other files are
/// left alone. Returns how many were removed.
pub fn clear_trade_files(dir: &Path) -> Result<usize, SweepError> {
    let io_err = |path: &Path, source| SweepError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut removed = 0;
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        let is_trade_file = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .filter(|n| n.ends_with(".csv"))
                .and_then(parse_trade_file_name)
                .is_some();
        if is_trade_file {
            std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_points_are_lag_major() {
        let grid = ParamGrid::new(vec![0, 2], vec![1, 3, 5]);
        assert_eq!(grid.size(), 6);
        let points = grid.points();
        assert_eq!(points.len(), 6);
        assert_eq!(points[0], SwingParams::new(0, 1));
        assert_eq!(points[2], SwingParams::new(0, 5));
        assert_eq!(points[3], SwingParams::new(2, 1));
    }

    #[test]
    fn clear_only_removes_trade_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["A_lag1_win2.csv", "B_C_lag0_win1.csv", "notes.csv", MANIFEST_FILE] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        assert_eq!(clear_trade_files(dir.path()).unwrap(), 2);
        assert!(dir.path().join("notes.csv").exists());
        assert!(dir.path().join(MANIFEST_FILE).exists());
        assert!(!dir.path().join("A_lag1_win2.csv").exists());
    }

    #[test]
    fn sweep_series_runs_every_task() {
        let dir = tempfile::tempdir().unwrap();
        let series = vec![
            Arc::new(LoadedSeries::synthetic("AAA", 1_500, 1)),
            Arc::new(LoadedSeries::synthetic("BBB", 1_500, 2)),
        ];
        let grid = ParamGrid::new(vec![0, 1], vec![1, 2]);
        let report = sweep_series(&series, &grid, EngineMode::Scaling, dir.path(), None);

        assert_eq!(report.total_runs(), 8);
        assert!(report.is_clean());
        assert_eq!(report.runs[0].symbol, "AAA");
        assert_eq!((report.runs[0].lag, report.runs[0].window), (0, 1));
        for run in &report.runs {
            match &run.trade_file {
                Some(path) => assert!(path.exists()),
                None => assert_eq!(run.trades, 0),
            }
        }
    }

    #[test]
    fn panicking_task_becomes_a_failure() {
        let outcome = guard_task("AAA", SwingParams::new(2, 3), || {
            panic!("bar index out of range")
        });
        match outcome {
            RunOutcome::Failed(f) => {
                assert_eq!(f.symbol, "AAA");
                assert_eq!((f.lag, f.window), (2, 3));
                assert!(f.error.contains("bar index out of range"));
            }
            RunOutcome::Completed(_) => panic!("expected a failure"),
        }
    }

    #[test]
    fn formatted_panic_message_is_kept() {
        let lag = 7;
        let outcome = guard_task("BBB", SwingParams::new(lag, 1), || {
            panic!("lag {lag} too large")
        });
        let RunOutcome::Failed(f) = outcome else {
            panic!("expected a failure");
        };
        assert_eq!(f.error, "run panicked: lag 7 too large");
    }
}
