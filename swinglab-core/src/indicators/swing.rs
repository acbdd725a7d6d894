//! Swing (pivot) detection over a centered window, exposed after a delay.
//!
//! A bar is a raw swing high when its high equals the maximum high of the
//! clipped window `[t - w, t + w]` (symmetric for lows). Ties are not broken:
//! every bar matching the extremum is flagged.
//!
//! The raw flag of bar t becomes *visible* at bar `t + delay`, where the delay
//! comes from [`EngineMode::visibility_delay`]. Only visible flags feed the
//! level tracker and the simulator.

use serde::{Deserialize, Serialize};

use super::rolling::{centered_max, centered_min};
use crate::domain::Bar;
use crate::params::{EngineMode, SwingParams};

/// Per-bar swing flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SwingFlags {
    pub is_swing_high: bool,
    pub is_swing_low: bool,
}

impl SwingFlags {
    pub const NONE: SwingFlags = SwingFlags {
        is_swing_high: false,
        is_swing_low: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwingDetector {
    window: usize,
    delay: usize,
}

impl SwingDetector {
    pub fn new(params: SwingParams, mode: EngineMode) -> Self {
        Self {
            window: params.window,
            delay: mode.visibility_delay(params),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Bars between a raw pivot and its visible flag.
    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Undelayed pivot flags, indexed by the pivot bar itself.
    pub fn raw(&self, bars: &[Bar]) -> Vec<SwingFlags> {
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let max_h = centered_max(&highs, self.window);
        let min_l = centered_min(&lows, self.window);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| SwingFlags {
                is_swing_high: bar.high == max_h[i],
                is_swing_low: bar.low == min_l[i],
            })
            .collect()
    }

    /// Visible pivot flags: `visible[t] = raw[t - delay]`, unset for `t < delay`.
    pub fn detect(&self, bars: &[Bar]) -> Vec<SwingFlags> {
        delay_flags(&self.raw(bars), self.delay)
    }
}

/// Shift flags forward by `delay` bars, filling the head with unset flags.
pub fn delay_flags(raw: &[SwingFlags], delay: usize) -> Vec<SwingFlags> {
    (0..raw.len())
        .map(|t| match t.checked_sub(delay) {
            Some(src) => raw[src],
            None => SwingFlags::NONE,
        })
        .collect()
}
