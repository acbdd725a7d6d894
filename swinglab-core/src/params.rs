//! Run parameters: the (lag, window) grid point and the engine mode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One point of the (lag, window) parameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SwingParams {
    /// Extra bars a confirmed pivot stays hidden.
    pub lag: usize,
    /// Half-width of the centered pivot window.
    pub window: usize,
}

impl SwingParams {
    pub fn new(lag: usize, window: usize) -> Self {
        Self { lag, window }
    }

    /// Full centered window length, `2 * window + 1`.
    pub fn span(&self) -> usize {
        2 * self.window + 1
    }
}

impl fmt::Display for SwingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lag{}_win{}", self.lag, self.window)
    }
}

/// Engine variant.
///
/// The mode controls three things and nothing else:
/// - pivot visibility delay (`window + lag` vs `lag`)
/// - the grab-to-signal offset (`window + lag + 1` vs `1`)
/// - position behaviour: pyramiding with a pivot-trailed stop and reversal
///   exits at the stop (scaling), or one unit with reversal exits at the
///   bar's open (single-unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    SingleUnit,
    #[default]
    Scaling,
}

impl EngineMode {
    /// Bars between a raw pivot and the bar where it becomes visible.
    ///
    /// Single-unit mode does not wait for the right half of the window, so
    /// its pivots can depend on up to `window - lag` future bars.
    pub fn visibility_delay(self, params: SwingParams) -> usize {
        match self {
            EngineMode::Scaling => params.window + params.lag,
            EngineMode::SingleUnit => params.lag,
        }
    }

    /// Bars between a grab and the candle that may act on it.
    pub fn signal_offset(self, params: SwingParams) -> usize {
        match self {
            EngineMode::Scaling => params.window + params.lag + 1,
            EngineMode::SingleUnit => 1,
        }
    }

    /// Whether confirmed pivots add units to an open position.
    pub fn allows_scaling(self) -> bool {
        matches!(self, EngineMode::Scaling)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EngineMode::SingleUnit => "single_unit",
            EngineMode::Scaling => "scaling",
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "single_unit" | "single" => Ok(EngineMode::SingleUnit),
            "scaling" | "pyramiding" => Ok(EngineMode::Scaling),
            other => Err(format!(
                "unknown engine mode '{other}' (expected 'scaling' or 'single_unit')"
            )),
        }
    }
}
