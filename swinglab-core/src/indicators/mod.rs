//! Vectorized detection stages.
//!
//! Each stage is a full-series pass over data produced by the previous one:
//! bars → swing flags → swing levels → liquidity grabs. They are computed once
//! per run, before the simulator walks the series.

pub mod grab;
pub mod levels;
pub mod rolling;
pub mod swing;

pub use grab::{GrabEvent, LiquidityGrabDetector};
pub use levels::{LevelTracker, SwingLevels};
pub use rolling::{centered_max, centered_min};
pub use swing::{SwingDetector, SwingFlags};

/// Build one-minute bars from `(open, high, low, close)` tuples for tests.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: base + chrono::Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
        })
        .collect()
}

/// Build bars from (high, low) pairs; open and close sit at the midpoint.
#[cfg(test)]
pub fn make_hl_bars(data: &[(f64, f64)]) -> Vec<crate::domain::Bar> {
    let ohlc: Vec<(f64, f64, f64, f64)> = data
        .iter()
        .map(|&(h, l)| {
            let mid = (h + l) / 2.0;
            (mid, h, l, mid)
        })
        .collect();
    make_ohlc_bars(&ohlc)
}
