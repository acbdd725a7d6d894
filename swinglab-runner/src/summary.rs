//! Summary aggregation over a folder of trade files.
//!
//! Trade files are keyed by the `lag{L}` / `win{W}` parts at the end of their
//! name. All files sharing a key (one per symbol) are concatenated in file-name
//! order and summarized as one trade list, with the cumulative PnL rebuilt
//! over the concatenation. Rows come out sorted by (lag, window).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use swinglab_core::SwingParams;

use crate::export::{read_trades_csv, write_summary_csv, TradeRow};
use crate::metrics;

/// One aggregated row per (lag, window). `None` is written as an empty cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Lag")]
    pub lag: usize,
    #[serde(rename = "Window")]
    pub window: usize,
    #[serde(rename = "Total Trades")]
    pub total_trades: usize,
    #[serde(rename = "Total Units")]
    pub total_units: usize,
    #[serde(rename = "Win Rate (%)")]
    pub win_rate: f64,
    #[serde(rename = "Total PnL")]
    pub total_pnl: f64,
    #[serde(rename = "Average PnL")]
    pub average_pnl: f64,
    #[serde(rename = "Max Drawdown")]
    pub max_drawdown: f64,
    #[serde(rename = "Risk-Reward")]
    pub risk_reward: Option<f64>,
    #[serde(rename = "Avg Win")]
    pub avg_win: Option<f64>,
    #[serde(rename = "Avg Loss")]
    pub avg_loss: Option<f64>,
    #[serde(rename = "Average MAE")]
    pub average_mae: f64,
    #[serde(rename = "Max MAE")]
    pub max_mae: f64,
    #[serde(rename = "Average MFE")]
    pub average_mfe: f64,
    #[serde(rename = "Max MFE")]
    pub max_mfe: f64,
    #[serde(rename = "Winning PnL")]
    pub winning_pnl: f64,
    #[serde(rename = "Losing PnL")]
    pub losing_pnl: f64,
    #[serde(rename = "Avg Trade Efficiency (%)")]
    pub avg_trade_efficiency: Option<f64>,
    #[serde(rename = "Sharpe-like Ratio")]
    pub sharpe_like: Option<f64>,
    #[serde(rename = "Sortino Ratio")]
    pub sortino: Option<f64>,
    #[serde(rename = "Expectancy")]
    pub expectancy: Option<f64>,
    #[serde(rename = "Normalized PnL")]
    pub normalized_pnl: Option<f64>,
    #[serde(rename = "PnL per Unit")]
    pub pnl_per_unit: Option<f64>,
    #[serde(rename = "Efficiency Ratio")]
    pub efficiency_ratio: Option<f64>,
}

/// Parse `…_lag{L}_win{W}[.csv]` into its grid point.
///
/// Only the last two `_`-separated parts are inspected, so symbols may
/// themselves contain underscores.
pub fn parse_trade_file_name(name: &str) -> Option<SwingParams> {
    let stem = name.strip_suffix(".csv").unwrap_or(name);
    let mut parts = stem.rsplit('_');
    let window = parts.next()?.strip_prefix("win")?.parse().ok()?;
    let lag = parts.next()?.strip_prefix("lag")?.parse().ok()?;
    // A bare "lag1_win2" has no symbol part.
    parts.next()?;
    Some(SwingParams::new(lag, window))
}

/// Summarize one trade list. `None` for an empty list.
pub fn summarize(params: SwingParams, rows: &[TradeRow]) -> Option<SummaryRow> {
    if rows.is_empty() {
        return None;
    }

    let n = rows.len() as f64;
    let pnl: Vec<f64> = rows.iter().map(|r| r.pnl).collect();
    let mae: Vec<f64> = rows.iter().map(|r| r.mae).collect();
    let mfe: Vec<f64> = rows.iter().map(|r| r.mfe).collect();
    let total_units: usize = rows.iter().map(|r| r.units).sum();

    let wins = metrics::winners(&pnl);
    let losses = metrics::losers(&pnl);
    let total_pnl: f64 = pnl.iter().sum();
    let average_pnl = total_pnl / n;
    let win_rate = metrics::win_rate_pct(&pnl).unwrap_or(0.0);
    let avg_win = metrics::mean(&wins);
    let avg_loss = metrics::mean(&losses);
    let average_mae = mae.iter().sum::<f64>() / n;

    Some(SummaryRow {
        lag: params.lag,
        window: params.window,
        total_trades: rows.len(),
        total_units,
        win_rate,
        total_pnl,
        average_pnl,
        max_drawdown: metrics::max_drawdown(&metrics::cumulative(&pnl)),
        risk_reward: metrics::risk_reward(avg_win, avg_loss),
        avg_win,
        avg_loss,
        average_mae,
        max_mae: mae.iter().copied().fold(f64::INFINITY, f64::min),
        average_mfe: mfe.iter().sum::<f64>() / n,
        max_mfe: mfe.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        winning_pnl: wins.iter().fold(0.0, |acc, p| acc + p),
        losing_pnl: losses.iter().fold(0.0, |acc, p| acc + p),
        avg_trade_efficiency: metrics::trade_efficiency_pct(&pnl, &mfe),
        sharpe_like: metrics::sharpe_like(average_pnl, avg_win, avg_loss),
        sortino: metrics::sortino_like(average_pnl, &losses),
        expectancy: metrics::expectancy(win_rate, avg_win, avg_loss),
        normalized_pnl: metrics::safe_divide(total_pnl, n),
        pnl_per_unit: metrics::safe_divide(total_pnl, total_units as f64),
        efficiency_ratio: metrics::safe_divide(average_pnl, average_mae.abs()),
    })
}

/// Trade files under `dir` grouped by grid point, each group in file-name order.
pub fn group_trade_files(dir: &Path) -> Result<BTreeMap<SwingParams, Vec<PathBuf>>> {
    let mut groups: BTreeMap<SwingParams, Vec<PathBuf>> = BTreeMap::new();

    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match parse_trade_file_name(name) {
            Some(params) => groups.entry(params).or_default().push(path),
            None => debug!(file = %path.display(), "skipping file without lag/win suffix"),
        }
    }

    for files in groups.values_mut() {
        files.sort();
    }
    Ok(groups)
}

/// Aggregate every trade file under `dir`. Unreadable or empty files are
/// skipped with a warning.
pub fn collect_summary(dir: &Path) -> Result<Vec<SummaryRow>> {
    let groups = group_trade_files(dir)?;
    let mut rows = Vec::with_capacity(groups.len());

    for (params, files) in groups {
        let mut trades = Vec::new();
        for file in &files {
            match read_trades_csv(file) {
                Ok(mut t) => trades.append(&mut t),
                Err(e) => warn!(file = %file.display(), error = %e, "skipping unreadable trade file"),
            }
        }
        match summarize(params, &trades) {
            Some(row) => rows.push(row),
            None => warn!(lag = params.lag, window = params.window, "no trades for grid point"),
        }
    }

    Ok(rows)
}

/// Aggregate `dir` and write the summary CSV to `output`.
pub fn generate_summary(dir: &Path, output: &Path) -> Result<Vec<SummaryRow>> {
    let rows = collect_summary(dir)?;
    write_summary_csv(output, &rows)
        .with_context(|| format!("failed to write summary {}", output.display()))?;
    info!(rows = rows.len(), path = %output.display(), "summary written");
    Ok(rows)
}
