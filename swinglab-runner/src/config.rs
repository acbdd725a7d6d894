//! Sweep configuration, loaded from TOML.
//!
//! ```toml
//! [sweep]
//! input_dir = "data"
//! output_dir = "results"
//! summary_path = "summary/backtest_summary.csv"
//! mode = "scaling"
//! lags = [1, 2, 3]
//! windows = [1, 2, 3]
//! workers = 8
//! clear_output = true
//!
//! [data]
//! timestamp_format = "%d-%m-%Y %H:%M"
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use swinglab_core::EngineMode;

use crate::data_loader::DEFAULT_TIMESTAMP_FORMAT;
use crate::sweep::ParamGrid;

/// Errors from loading or validating a sweep config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("parameter grid axis '{axis}' is empty")]
    EmptyGrid { axis: &'static str },

    #[error("parameter grid axis '{axis}' lists {value} more than once")]
    DuplicateValue { axis: &'static str, value: usize },

    #[error("workers must be at least 1")]
    ZeroWorkers,
}

/// Top-level sweep config document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub sweep: SweepSection,
    #[serde(default)]
    pub data: DataSection,
}

/// `[sweep]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSection {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Where the aggregated summary CSV goes. No summary when absent.
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
    #[serde(default)]
    pub mode: EngineMode,
    pub lags: Vec<usize>,
    pub windows: Vec<usize>,
    /// Worker threads; `None` means one per available core.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Delete stale `{symbol}_lag{L}_win{W}.csv` files before running. On by
    /// default; the summary reads every trade file in the output directory.
    #[serde(default = "default_clear_output")]
    pub clear_output: bool,
}

/// `[data]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            timestamp_format: default_timestamp_format(),
        }
    }
}

fn default_clear_output() -> bool {
    true
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

impl SweepConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_axis("lags", &self.sweep.lags)?;
        check_axis("windows", &self.sweep.windows)?;
        if self.sweep.workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    pub fn grid(&self) -> ParamGrid {
        ParamGrid::new(self.sweep.lags.clone(), self.sweep.windows.clone())
    }

    /// Configured worker count, or the number of available cores.
    pub fn effective_workers(&self) -> usize {
        self.sweep.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

fn check_axis(axis: &'static str, values: &[usize]) -> Result<(), ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::EmptyGrid { axis });
    }
    let mut seen = BTreeSet::new();
    for &value in values {
        if !seen.insert(value) {
            return Err(ConfigError::DuplicateValue { axis, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[sweep]
input_dir = "data"
output_dir = "results"
summary_path = "summary/backtest_summary.csv"
mode = "single_unit"
lags = [1, 2, 3]
windows = [1, 2]
workers = 4
clear_output = true

[data]
timestamp_format = "%Y-%m-%d %H:%M"
"#;

    #[test]
    fn parses_full_document() {
        let config = SweepConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.sweep.input_dir, PathBuf::from("data"));
        assert_eq!(config.sweep.mode, EngineMode::SingleUnit);
        assert_eq!(config.sweep.lags, vec![1, 2, 3]);
        assert_eq!(config.sweep.windows, vec![1, 2]);
        assert_eq!(config.effective_workers(), 4);
        assert!(config.sweep.clear_output);
        assert_eq!(config.data.timestamp_format, "%Y-%m-%d %H:%M");
        assert_eq!(config.grid().size(), 6);
    }

    #[test]
    fn defaults_apply() {
        let config = SweepConfig::from_toml_str(
            r#"
[sweep]
input_dir = "in"
output_dir = "out"
lags = [0]
windows = [1]
"#,
        )
        .unwrap();
        assert_eq!(config.sweep.mode, EngineMode::Scaling);
        assert_eq!(config.sweep.summary_path, None);
        assert!(config.sweep.clear_output);
        assert_eq!(config.data.timestamp_format, DEFAULT_TIMESTAMP_FORMAT);
        assert!(config.effective_workers() >= 1);
    }

    #[test]
    fn keeping_stale_output_is_opt_out() {
        let keep = SAMPLE.replace("clear_output = true", "clear_output = false");
        let config = SweepConfig::from_toml_str(&keep).unwrap();
        assert!(!config.sweep.clear_output);
    }

    #[test]
    fn rejects_empty_axis() {
        let err = SweepConfig::from_toml_str(
            r#"
[sweep]
input_dir = "in"
output_dir = "out"
lags = []
windows = [1]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyGrid { axis: "lags" }));
    }

    #[test]
    fn rejects_duplicates_and_zero_workers() {
        let dup = SAMPLE.replace("windows = [1, 2]", "windows = [2, 2]");
        assert!(matches!(
            SweepConfig::from_toml_str(&dup).unwrap_err(),
            ConfigError::DuplicateValue {
                axis: "windows",
                value: 2
            }
        ));

        let zero = SAMPLE.replace("workers = 4", "workers = 0");
        assert!(matches!(
            SweepConfig::from_toml_str(&zero).unwrap_err(),
            ConfigError::ZeroWorkers
        ));
    }

    #[test]
    fn rejects_unknown_mode() {
        let bad = SAMPLE.replace("single_unit", "martingale");
        assert!(matches!(
            SweepConfig::from_toml_str(&bad).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let config = SweepConfig::from_toml_str(SAMPLE).unwrap();
        let text = config.to_toml_string().unwrap();
        let back = SweepConfig::from_toml_str(&text).unwrap();
        assert_eq!(config, back);
    }
}
