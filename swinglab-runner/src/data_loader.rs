//! Input discovery and bar loading.
//!
//! Accepts `.csv` (header row) and `.parquet` files with columns
//! `t, o, h, l, c`. The `t` column is epoch milliseconds when numeric,
//! otherwise a timestamp string in the configured format (with RFC 3339 and
//! `%Y-%m-%d %H:%M:%S` as fallbacks).
//!
//! Loaded bars are canonical: sorted ascending by timestamp, duplicate
//! timestamps dropped (first row kept), every bar sane. A file that cannot be
//! brought into that shape fails on its own; other files are unaffected.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use polars::prelude::*;
use thiserror::Error;

use swinglab_core::domain::Bar;
use swinglab_core::synthetic::random_walk_bars;

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M";

const FALLBACK_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Errors from the data loading layer. Every variant names the file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Frame {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("{}: unsupported file type (expected .csv or .parquet)", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("{}: missing column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{}: null '{column}' at row {row}", .path.display())]
    NullValue {
        path: PathBuf,
        column: &'static str,
        row: usize,
    },

    #[error("{}: unparseable timestamp '{value}' at row {row}", .path.display())]
    BadTimestamp {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error(
        "{}: invalid bar at {timestamp} (o={open}, h={high}, l={low}, c={close})",
        .path.display()
    )]
    InsaneBar {
        path: PathBuf,
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// Options controlling how input files are parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// chrono format for string timestamps.
    pub timestamp_format: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// One input series, ready for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSeries {
    /// File stem of the input (used in trade file names).
    pub symbol: String,
    pub source: PathBuf,
    pub bars: Vec<Bar>,
    /// BLAKE3 over the canonical bars.
    pub dataset_hash: String,
    pub synthetic: bool,
}

impl LoadedSeries {
    /// Random-walk series for dry runs. Tagged as synthetic.
    pub fn synthetic(symbol: &str, n: usize, seed: u64) -> Self {
        let bars = random_walk_bars(n, seed);
        let dataset_hash = compute_dataset_hash(&bars);
        Self {
            symbol: symbol.to_string(),
            source: PathBuf::new(),
            bars,
            dataset_hash,
            synthetic: true,
        }
    }
}

// ── Discovery ───────────────────────────────────────────────────────

/// All `.csv` / `.parquet` files directly under `dir`, sorted by path.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && InputFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// File stem, or `"series"` when the path has none.
pub fn symbol_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("series")
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputFormat {
    Csv,
    Parquet,
}

impl InputFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(InputFormat::Csv),
            "parquet" => Some(InputFormat::Parquet),
            _ => None,
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load one input file into a canonical series.
pub fn load_series(path: &Path, opts: &LoadOptions) -> Result<LoadedSeries, LoadError> {
    let df = read_frame(path)?;
    let bars = canonicalize(frame_to_bars(&df, path, opts)?);
    validate_bars(&bars, path)?;
    let dataset_hash = compute_dataset_hash(&bars);

    Ok(LoadedSeries {
        symbol: symbol_from_path(path),
        source: path.to_path_buf(),
        bars,
        dataset_hash,
        synthetic: false,
    })
}

fn read_frame(path: &Path) -> Result<DataFrame, LoadError> {
    let frame_err = |source| LoadError::Frame {
        path: path.to_path_buf(),
        source,
    };

    match InputFormat::from_path(path) {
        Some(InputFormat::Csv) => LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()
            .and_then(|lf| lf.collect())
            .map_err(frame_err),
        Some(InputFormat::Parquet) => {
            let file = fs::File::open(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            ParquetReader::new(file).finish().map_err(frame_err)
        }
        None => Err(LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Convert a `t,o,h,l,c` frame into bars in file order.
fn frame_to_bars(df: &DataFrame, path: &Path, opts: &LoadOptions) -> Result<Vec<Bar>, LoadError> {
    let timestamps = read_timestamps(df, path, opts)?;
    let open = read_price_column(df, path, "o")?;
    let high = read_price_column(df, path, "h")?;
    let low = read_price_column(df, path, "l")?;
    let close = read_price_column(df, path, "c")?;

    Ok((0..df.height())
        .map(|i| Bar {
            timestamp: timestamps[i],
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
        })
        .collect())
}

fn column<'a>(df: &'a DataFrame, path: &Path, name: &'static str) -> Result<&'a Column, LoadError> {
    df.column(name).map_err(|_| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: name,
    })
}

fn read_price_column(df: &DataFrame, path: &Path, name: &'static str) -> Result<Vec<f64>, LoadError> {
    let frame_err = |source| LoadError::Frame {
        path: path.to_path_buf(),
        source,
    };

    let values = column(df, path, name)?
        .cast(&DataType::Float64)
        .map_err(frame_err)?;
    let ca = values.f64().map_err(frame_err)?;

    ca.into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| LoadError::NullValue {
                path: path.to_path_buf(),
                column: name,
                row,
            })
        })
        .collect()
}

fn read_timestamps(
    df: &DataFrame,
    path: &Path,
    opts: &LoadOptions,
) -> Result<Vec<NaiveDateTime>, LoadError> {
    let frame_err = |source| LoadError::Frame {
        path: path.to_path_buf(),
        source,
    };
    let null_err = |row| LoadError::NullValue {
        path: path.to_path_buf(),
        column: "t",
        row,
    };

    let t = column(df, path, "t")?;

    if is_epoch_dtype(t.dtype()) {
        let millis = t.cast(&DataType::Int64).map_err(frame_err)?;
        let ca = millis.i64().map_err(frame_err)?;
        return ca
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                let ms = v.ok_or_else(|| null_err(row))?;
                DateTime::<Utc>::from_timestamp_millis(ms)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| LoadError::BadTimestamp {
                        path: path.to_path_buf(),
                        row,
                        value: ms.to_string(),
                    })
            })
            .collect();
    }

    let text = t.cast(&DataType::String).map_err(frame_err)?;
    let ca = text.str().map_err(frame_err)?;
    ca.into_iter()
        .enumerate()
        .map(|(row, v)| {
            let raw = v.ok_or_else(|| null_err(row))?;
            parse_timestamp(raw, &opts.timestamp_format).ok_or_else(|| LoadError::BadTimestamp {
                path: path.to_path_buf(),
                row,
                value: raw.to_string(),
            })
        })
        .collect()
}

/// Numeric `t` columns hold epoch milliseconds.
fn is_epoch_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int32
            | DataType::Int64
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Parse a timestamp string: configured format first, then the fallbacks.
pub fn parse_timestamp(raw: &str, format: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    FALLBACK_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Sort ascending by timestamp and drop duplicate timestamps, keeping the
/// first occurrence in file order.
pub fn canonicalize(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    bars
}

fn validate_bars(bars: &[Bar], path: &Path) -> Result<(), LoadError> {
    match bars.iter().find(|b| !b.is_sane()) {
        Some(bar) => Err(LoadError::InsaneBar {
            path: path.to_path_buf(),
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        }),
        None => Ok(()),
    }
}

/// Deterministic BLAKE3 hash over timestamps and OHLC values.
pub fn compute_dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.and_utc().timestamp_millis().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
