//! Precompute all per-bar detection output before the simulator runs.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::CoreError;
use crate::indicators::{
    GrabEvent, LevelTracker, LiquidityGrabDetector, SwingDetector, SwingFlags, SwingLevels,
};
use crate::params::{EngineMode, SwingParams};
use crate::signal::{Signal, SignalGenerator};

/// Column-wise detection output, one entry per bar.
///
/// `swings` holds the *visible* (delayed) flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalFrame {
    pub swings: Vec<SwingFlags>,
    pub levels: Vec<SwingLevels>,
    pub grabs: Vec<GrabEvent>,
    pub signals: Vec<Signal>,
}

impl SignalFrame {
    /// Validate the series, then run swings → levels → grabs → signals.
    pub fn compute(bars: &[Bar], params: SwingParams, mode: EngineMode) -> Result<Self, CoreError> {
        validate_series(bars)?;

        let swings = SwingDetector::new(params, mode).detect(bars);
        let levels = LevelTracker::track(bars, &swings);
        let grabs = LiquidityGrabDetector::detect(bars, &levels);
        let signals = SignalGenerator::new(params, mode).generate(bars, &grabs);

        Ok(Self {
            swings,
            levels,
            grabs,
            signals,
        })
    }

    /// Frame with only signals set. Useful for driving the simulator directly.
    pub fn from_signals(signals: Vec<Signal>) -> Self {
        let n = signals.len();
        Self {
            swings: vec![SwingFlags::NONE; n],
            levels: vec![SwingLevels::default(); n],
            grabs: vec![GrabEvent::None; n],
            signals,
        }
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// (long, short) signal counts.
    pub fn signal_counts(&self) -> (usize, usize) {
        self.signals.iter().fold((0, 0), |(l, s), sig| match sig {
            Signal::Long => (l + 1, s),
            Signal::Short => (l, s + 1),
            Signal::Neutral => (l, s),
        })
    }
}

/// Reject series the detectors cannot reason about: insane bars or
/// timestamps that are not strictly increasing.
pub fn validate_series(bars: &[Bar]) -> Result<(), CoreError> {
    for (index, bar) in bars.iter().enumerate() {
        if !bar.is_sane() {
            return Err(CoreError::InsaneBar {
                index,
                timestamp: bar.timestamp,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
            });
        }
        if index > 0 {
            let previous = bars[index - 1].timestamp;
            if bar.timestamp <= previous {
                return Err(CoreError::UnorderedTimestamps {
                    index,
                    previous,
                    current: bar.timestamp,
                });
            }
        }
    }
    Ok(())
}
