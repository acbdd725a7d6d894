//! Look-ahead tests for the detection pipeline and the simulator.
//!
//! Method: compute on a truncated series (bars 0..m) and on the full series.
//! In scaling mode everything at bars 0..m must be identical between both
//! runs. Single-unit mode is allowed to peek `window - lag` bars ahead; the
//! last test pins that behaviour down so it cannot change silently.

use chrono::NaiveDate;
use swinglab_core::domain::Bar;
use swinglab_core::engine::{run_backtest, EngineConfig, SignalFrame};
use swinglab_core::synthetic::random_walk_bars;
use swinglab_core::{EngineMode, SwingParams};

fn assert_frame_prefix(full: &SignalFrame, truncated: &SignalFrame, label: &str) {
    let m = truncated.len();
    assert_eq!(&full.swings[..m], &truncated.swings[..], "{label}: swings differ");
    assert_eq!(&full.levels[..m], &truncated.levels[..], "{label}: levels differ");
    assert_eq!(&full.grabs[..m], &truncated.grabs[..], "{label}: grabs differ");
    assert_eq!(&full.signals[..m], &truncated.signals[..], "{label}: signals differ");
}

#[test]
fn scaling_frame_has_no_lookahead() {
    let bars = random_walk_bars(600, 1234);
    for lag in 0..4 {
        for window in 1..6 {
            let params = SwingParams::new(lag, window);
            let full = SignalFrame::compute(&bars, params, EngineMode::Scaling).unwrap();
            for m in [50, 173, 400] {
                let truncated =
                    SignalFrame::compute(&bars[..m], params, EngineMode::Scaling).unwrap();
                assert_frame_prefix(&full, &truncated, &format!("{params} m={m}"));
            }
        }
    }
}

#[test]
fn single_unit_frame_is_causal_when_lag_covers_window() {
    let bars = random_walk_bars(600, 99);
    for window in 1..4 {
        let params = SwingParams::new(window, window);
        let full = SignalFrame::compute(&bars, params, EngineMode::SingleUnit).unwrap();
        let truncated = SignalFrame::compute(&bars[..300], params, EngineMode::SingleUnit).unwrap();
        assert_frame_prefix(&full, &truncated, &format!("single {params}"));
    }
}

#[test]
fn closed_trades_do_not_depend_on_later_bars() {
    let bars = random_walk_bars(1_500, 42);
    let config = EngineConfig::new(SwingParams::new(1, 2), EngineMode::Scaling);
    let full = run_backtest(&bars, &config).unwrap();

    let m = 900;
    let truncated = run_backtest(&bars[..m], &config).unwrap();
    let full_prefix: Vec<_> = full
        .trades
        .iter()
        .filter(|t| t.trade.exit_bar < m)
        .cloned()
        .collect();
    assert_eq!(truncated.trades, full_prefix);
}

#[test]
fn single_unit_pivot_depends_on_next_bar() {
    // Strictly rising highs: the last bar of any truncated series looks like
    // a swing high until the next bar arrives.
    let base = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let bars: Vec<Bar> = (0..6)
        .map(|i| {
            let high = 10.0 + i as f64;
            Bar {
                timestamp: base + chrono::Duration::minutes(i),
                open: high - 0.5,
                high,
                low: high - 1.0,
                close: high - 0.5,
            }
        })
        .collect();

    let params = SwingParams::new(0, 1);
    let m = 4;
    let full = SignalFrame::compute(&bars, params, EngineMode::SingleUnit).unwrap();
    let truncated = SignalFrame::compute(&bars[..m], params, EngineMode::SingleUnit).unwrap();

    assert!(truncated.swings[m - 1].is_swing_high);
    assert!(!full.swings[m - 1].is_swing_high);

    // Scaling mode with the same window only reveals that pivot after
    // `window + lag` bars, so the prefix stays stable.
    let full = SignalFrame::compute(&bars, params, EngineMode::Scaling).unwrap();
    let truncated = SignalFrame::compute(&bars[..m], params, EngineMode::Scaling).unwrap();
    assert_frame_prefix(&full, &truncated, "scaling lag0_win1");
}
