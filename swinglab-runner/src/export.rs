//! Trade files, summary CSV and the sweep manifest.
//!
//! Trade file columns (one row per annotated trade):
//! `EntryTime, ExitTime, Direction, EntryPrice, ExitPrice, PnL, ExitReason,
//! SLPrice, Units, CumulativePnL, DurationMinutes, MAE, MFE`
//!
//! All writes go to a `.tmp` sibling first and are renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use swinglab_core::domain::{AnnotatedTrade, Direction, ExitReason};
use swinglab_core::SwingParams;

use crate::summary::SummaryRow;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors from writing or reading persisted artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// `{symbol}_lag{L}_win{W}.csv`
pub fn trade_file_name(symbol: &str, params: SwingParams) -> String {
    format!("{symbol}_{params}.csv")
}

/// Persisted form of an [`AnnotatedTrade`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    #[serde(rename = "EntryTime")]
    pub entry_time: String,
    #[serde(rename = "ExitTime")]
    pub exit_time: String,
    #[serde(rename = "Direction")]
    pub direction: Direction,
    #[serde(rename = "EntryPrice")]
    pub entry_price: f64,
    #[serde(rename = "ExitPrice")]
    pub exit_price: f64,
    #[serde(rename = "PnL")]
    pub pnl: f64,
    #[serde(rename = "ExitReason")]
    pub exit_reason: ExitReason,
    #[serde(rename = "SLPrice")]
    pub sl_price: f64,
    #[serde(rename = "Units")]
    pub units: usize,
    #[serde(rename = "CumulativePnL")]
    pub cumulative_pnl: f64,
    #[serde(rename = "DurationMinutes")]
    pub duration_minutes: f64,
    #[serde(rename = "MAE")]
    pub mae: f64,
    #[serde(rename = "MFE")]
    pub mfe: f64,
}

impl From<&AnnotatedTrade> for TradeRow {
    fn from(t: &AnnotatedTrade) -> Self {
        Self {
            entry_time: t.trade.entry_time.format(TIMESTAMP_FORMAT).to_string(),
            exit_time: t.trade.exit_time.format(TIMESTAMP_FORMAT).to_string(),
            direction: t.trade.direction,
            entry_price: t.trade.entry_price,
            exit_price: t.trade.exit_price,
            pnl: t.trade.pnl,
            exit_reason: t.trade.exit_reason,
            sl_price: t.trade.sl_price,
            units: t.trade.units,
            cumulative_pnl: t.cumulative_pnl,
            duration_minutes: t.duration_minutes,
            mae: t.mae,
            mfe: t.mfe,
        }
    }
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Write annotated trades as a trade file.
pub fn write_trades_csv(path: &Path, trades: &[AnnotatedTrade]) -> Result<(), ExportError> {
    let rows: Vec<TradeRow> = trades.iter().map(TradeRow::from).collect();
    write_csv_rows(path, &rows)
}

/// Read a trade file back.
pub fn read_trades_csv(path: &Path) -> Result<Vec<TradeRow>, ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::Reader::from_path(path).map_err(csv_err)?;
    rdr.deserialize().collect::<Result<Vec<TradeRow>, _>>().map_err(csv_err)
}

/// Write summary rows; undefined values become empty cells.
pub fn write_summary_csv(path: &Path, rows: &[SummaryRow]) -> Result<(), ExportError> {
    write_csv_rows(path, rows)
}

pub fn read_summary_csv(path: &Path) -> Result<Vec<SummaryRow>, ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::Reader::from_path(path).map_err(csv_err)?;
    rdr.deserialize().collect::<Result<Vec<SummaryRow>, _>>().map_err(csv_err)
}

fn write_csv_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row).map_err(csv_err)?;
    }
    let data = wtr.into_inner().map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e.into_error(),
    })?;
    write_atomic(path, &data)
}

// ─── JSON ───────────────────────────────────────────────────────────

/// Serialize any artifact as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}

// ─── Filesystem helpers ─────────────────────────────────────────────

/// Write to `{path}.tmp`, then rename into place. Creates parent directories.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), ExportError> {
    let io_err = |p: &Path, source| ExportError::Io {
        path: p.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, data).map_err(|e| io_err(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        io_err(path, e)
    })
}
