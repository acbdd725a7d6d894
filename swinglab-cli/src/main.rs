//! SwingLab CLI — single runs, parameter sweeps and summary aggregation.
//!
//! Commands:
//! - `run` — backtest one input file (or a synthetic series) at one (lag, window)
//! - `sweep` — run every input file over a TOML-configured (lag, window) grid
//! - `summary` — aggregate a folder of trade files into one CSV

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use swinglab_core::domain::Position;
use swinglab_core::{EngineMode, SwingParams};
use swinglab_runner::data_loader::DEFAULT_TIMESTAMP_FORMAT;
use swinglab_runner::summary::generate_summary;
use swinglab_runner::sweep::{run_sweep, SweepReport, TracingProgress};
use swinglab_runner::{
    load_series, run_single, LoadOptions, LoadedSeries, RunResult, SummaryRow, SweepConfig,
};

#[derive(Parser)]
#[command(
    name = "swinglab",
    about = "SwingLab CLI: swing liquidity-grab reversal backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one input file at a single (lag, window).
    Run {
        /// Input .csv or .parquet file with t,o,h,l,c columns.
        input: Option<PathBuf>,

        /// Run on a seeded random-walk series instead of an input file.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Number of synthetic bars.
        #[arg(long, default_value_t = 10_000)]
        bars: usize,

        /// Seed for the synthetic series.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Bars to wait before a swing pivot becomes visible.
        #[arg(long, default_value_t = 1)]
        lag: usize,

        /// Half-width of the swing detection window.
        #[arg(long, default_value_t = 1)]
        window: usize,

        /// Engine mode: scaling or single_unit.
        #[arg(long, default_value = "scaling")]
        mode: EngineMode,

        /// Write the trade file into this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// chrono format for string timestamps.
        #[arg(long, default_value = DEFAULT_TIMESTAMP_FORMAT)]
        timestamp_format: String,

        /// Print the full result as JSON instead of the text summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run every input file over the configured (lag, window) grid.
    Sweep {
        /// Path to a TOML sweep config.
        #[arg(long)]
        config: PathBuf,

        /// Override `sweep.input_dir`.
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Override `sweep.output_dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Override `sweep.mode`.
        #[arg(long)]
        mode: Option<EngineMode>,

        /// Override `sweep.workers`.
        #[arg(long)]
        workers: Option<usize>,

        /// Override `sweep.summary_path`.
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Keep trade files left in the output directory by earlier sweeps.
        #[arg(long, default_value_t = false)]
        keep_output: bool,
    },
    /// Aggregate a folder of `{symbol}_lag{L}_win{W}.csv` trade files.
    Summary {
        /// Folder containing trade files.
        folder: PathBuf,

        /// Output CSV path.
        #[arg(long, default_value = "summary/backtest_summary.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            synthetic,
            bars,
            seed,
            lag,
            window,
            mode,
            output_dir,
            timestamp_format,
            json,
        } => run_cmd(RunArgs {
            input,
            synthetic,
            bars,
            seed,
            params: SwingParams::new(lag, window),
            mode,
            output_dir,
            timestamp_format,
            json,
        }),
        Commands::Sweep {
            config,
            input_dir,
            output_dir,
            mode,
            workers,
            summary,
            keep_output,
        } => sweep_cmd(
            &config,
            SweepOverrides {
                input_dir,
                output_dir,
                mode,
                workers,
                summary,
                keep_output,
            },
        ),
        Commands::Summary { folder, output } => summary_cmd(&folder, &output),
    }
}

// ── run ──────────────────────────────────────────────────────────────

struct RunArgs {
    input: Option<PathBuf>,
    synthetic: bool,
    bars: usize,
    seed: u64,
    params: SwingParams,
    mode: EngineMode,
    output_dir: Option<PathBuf>,
    timestamp_format: String,
    json: bool,
}

fn run_cmd(args: RunArgs) -> Result<()> {
    let series = match (&args.input, args.synthetic) {
        (Some(_), true) => bail!("an input file and --synthetic are mutually exclusive"),
        (None, false) => bail!("one of an input file or --synthetic is required"),
        (None, true) => LoadedSeries::synthetic("SYNTHETIC", args.bars, args.seed),
        (Some(path), false) => {
            let opts = LoadOptions {
                timestamp_format: args.timestamp_format.clone(),
            };
            load_series(path, &opts)
                .with_context(|| format!("failed to load {}", path.display()))?
        }
    };

    let result = run_single(&series, args.params, args.mode)
        .with_context(|| format!("backtest failed for {} ({})", series.symbol, args.params))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_run(&result, series.bars.last().map(|b| b.close));
    }

    if let Some(dir) = &args.output_dir {
        match result.write_trades(dir)? {
            Some(path) => println!("Trades saved to: {}", path.display()),
            None => println!("No trades generated; nothing written."),
        }
    }
    Ok(())
}

fn print_run(result: &RunResult, last_close: Option<f64>) {
    let wins = result.trades.iter().filter(|t| t.trade.is_winner()).count();
    let units: usize = result.trades.iter().map(|t| t.trade.units).sum();

    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    println!("Params:         {} ({})", result.params, result.mode);
    if result.has_synthetic {
        println!("Data:           synthetic");
    }
    println!("Bars:           {}", result.bar_count);
    println!(
        "Signals:        {} long / {} short",
        result.long_signals, result.short_signals
    );
    println!("Trades:         {} ({units} units)", result.trades.len());
    if !result.trades.is_empty() {
        println!(
            "Win Rate:       {:.1}%",
            wins as f64 * 100.0 / result.trades.len() as f64
        );
        let held: usize = result.trades.iter().map(|t| t.trade.bars_held()).sum();
        println!(
            "Avg bars held:  {:.1}",
            held as f64 / result.trades.len() as f64
        );
    }
    println!("Total PnL:      {:.5}", result.total_pnl());
    match &result.final_position {
        Position::Flat => println!("Open position:  none"),
        Position::Open {
            direction, stop, ..
        } => {
            println!(
                "Open position:  {} x{} (stop {:.5})",
                direction.as_str(),
                result.final_position.units(),
                stop
            );
            if let Some(close) = last_close {
                println!(
                    "Unrealized PnL: {:.5}",
                    result.final_position.unrealized_pnl(close)
                );
            }
        }
    }
    println!("Dataset hash:   {}", &result.dataset_hash[..16.min(result.dataset_hash.len())]);
}

// ── sweep ────────────────────────────────────────────────────────────

struct SweepOverrides {
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    mode: Option<EngineMode>,
    workers: Option<usize>,
    summary: Option<PathBuf>,
    keep_output: bool,
}

impl SweepOverrides {
    fn apply(self, config: &mut SweepConfig) {
        if let Some(dir) = self.input_dir {
            config.sweep.input_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.sweep.output_dir = dir;
        }
        if let Some(mode) = self.mode {
            config.sweep.mode = mode;
        }
        if let Some(workers) = self.workers {
            config.sweep.workers = Some(workers);
        }
        if let Some(path) = self.summary {
            config.sweep.summary_path = Some(path);
        }
        if self.keep_output {
            config.sweep.clear_output = false;
        }
    }
}

fn sweep_cmd(config_path: &Path, overrides: SweepOverrides) -> Result<()> {
    let mut config = SweepConfig::load(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    overrides.apply(&mut config);

    info!(
        input = %config.sweep.input_dir.display(),
        output = %config.sweep.output_dir.display(),
        mode = %config.sweep.mode,
        grid = config.grid().size(),
        workers = config.effective_workers(),
        "starting sweep"
    );

    let report = run_sweep(&config, Some(&TracingProgress)).context("sweep failed")?;
    print_sweep(&report);

    if let Some(summary_path) = &config.sweep.summary_path {
        let rows = generate_summary(&config.sweep.output_dir, summary_path)?;
        print_summary_table(&rows);
        println!("Summary saved to: {}", summary_path.display());
    }

    if !report.is_clean() {
        for f in &report.failures {
            eprintln!("Error for {} lag={} window={}: {}", f.symbol, f.lag, f.window, f.error);
        }
        std::process::exit(1);
    }
    Ok(())
}

fn print_sweep(report: &SweepReport) {
    println!();
    println!("=== Sweep ({}) ===", report.mode);
    println!("Inputs:         {}", report.inputs.len());
    println!("Runs:           {}", report.total_runs());
    println!("Completed:      {}", report.runs.len());
    println!("Failed:         {}", report.failures.len());
    println!("Trade files:    {}", report.trade_file_count());
}

// ── summary ──────────────────────────────────────────────────────────

fn summary_cmd(folder: &Path, output: &Path) -> Result<()> {
    if !folder.is_dir() {
        bail!("not a directory: {}", folder.display());
    }
    let rows = generate_summary(folder, output)?;
    if rows.is_empty() {
        println!("No trade files found in {}", folder.display());
        return Ok(());
    }
    print_summary_table(&rows);
    println!("Summary saved to: {}", output.display());
    Ok(())
}

fn print_summary_table(rows: &[SummaryRow]) {
    println!();
    println!(
        "{:>4} {:>6} {:>8} {:>8} {:>12} {:>12} {:>10}",
        "Lag", "Window", "Trades", "Win %", "Total PnL", "Max DD", "Sharpe"
    );
    println!("{}", "-".repeat(66));
    for r in rows {
        println!(
            "{:>4} {:>6} {:>8} {:>8.1} {:>12.5} {:>12.5} {:>10}",
            r.lag,
            r.window,
            r.total_trades,
            r.win_rate,
            r.total_pnl,
            r.max_drawdown,
            fmt_opt(r.sharpe_like)
        );
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{x:.3}"))
}
