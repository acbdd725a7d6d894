//! Synthetic bar series for benchmarks, tests and dry runs.
//!
//! Results on synthetic data say nothing about the rule; they only exercise it.

use chrono::{NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::Bar;

/// Deterministic random-walk minute bars starting at 100.0.
pub fn random_walk_bars(n: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = synthetic_epoch();

    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0_f64;

    for i in 0..n {
        let step: f64 = rng.gen_range(-0.004..0.004);
        let open = price;
        let close = (price * (1.0 + step)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.002));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.002));

        bars.push(Bar {
            timestamp: start + chrono::Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
        });
        price = close;
    }

    bars
}

fn synthetic_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}
