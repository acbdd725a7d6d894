//! Level tracking: forward-fill the price of the latest visible swing.

use serde::{Deserialize, Serialize};

use super::swing::SwingFlags;
use crate::domain::Bar;

/// Most recent swing-high / swing-low price at a bar. `None` until the first
/// visible swing of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SwingLevels {
    pub high: Option<f64>,
    pub low: Option<f64>,
}

/// Forward-fills swing prices. Each level changes only on a bar whose visible
/// flag is set, and takes that bar's own high (or low).
pub struct LevelTracker;

impl LevelTracker {
    pub fn track(bars: &[Bar], flags: &[SwingFlags]) -> Vec<SwingLevels> {
        let mut current = SwingLevels::default();
        bars.iter()
            .zip(flags)
            .map(|(bar, flag)| {
                if flag.is_swing_high {
                    current.high = Some(bar.high);
                }
                if flag.is_swing_low {
                    current.low = Some(bar.low);
                }
                current
            })
            .collect()
    }
}
