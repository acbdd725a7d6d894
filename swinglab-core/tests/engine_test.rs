//! Integration tests for the full pipeline on hand-computed fixtures.
//!
//! Tests:
//! 1. Detection stages on a five-bar fixture, both modes
//! 2. Entry and initial stop on the first signal
//! 3. Monotonic prices never produce short signals or short trades
//! 4. Invalid series are rejected before detection runs

use chrono::NaiveDate;
use swinglab_core::domain::{Bar, Direction, Position};
use swinglab_core::engine::{run_backtest, EngineConfig, SignalFrame};
use swinglab_core::indicators::GrabEvent;
use swinglab_core::signal::Signal;
use swinglab_core::{CoreError, EngineMode, SwingParams};

fn make_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
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

/// Five bars with a swing high at 1 and 4, swing lows at 0 and 2.
fn fixture() -> Vec<Bar> {
    make_bars(&[
        (10.0, 11.0, 9.0, 10.5),
        (10.5, 12.0, 10.0, 11.5),
        (11.5, 11.8, 8.0, 9.0),
        (9.0, 10.0, 8.5, 9.8),
        (9.8, 13.0, 9.5, 12.5),
    ])
}

fn rising_bars(n: usize) -> Vec<Bar> {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let open = 100.0 + i as f64;
            (open, open + 1.5, open - 0.5, open + 1.0)
        })
        .collect();
    make_bars(&data)
}

// ── 1. Detection fixture ─────────────────────────────────────────────

#[test]
fn scaling_frame_on_fixture() {
    let bars = fixture();
    let frame = SignalFrame::compute(&bars, SwingParams::new(0, 1), EngineMode::Scaling).unwrap();

    let highs: Vec<bool> = frame.swings.iter().map(|f| f.is_swing_high).collect();
    let lows: Vec<bool> = frame.swings.iter().map(|f| f.is_swing_low).collect();
    assert_eq!(highs, vec![false, false, true, false, false]);
    assert_eq!(lows, vec![false, true, false, true, false]);

    let level_high: Vec<Option<f64>> = frame.levels.iter().map(|l| l.high).collect();
    let level_low: Vec<Option<f64>> = frame.levels.iter().map(|l| l.low).collect();
    assert_eq!(level_high, vec![None, None, Some(11.8), Some(11.8), Some(11.8)]);
    assert_eq!(level_low, vec![None, Some(10.0), Some(10.0), Some(8.5), Some(8.5)]);

    assert_eq!(
        frame.grabs,
        vec![
            GrabEvent::None,
            GrabEvent::None,
            GrabEvent::BearishGrab,
            GrabEvent::None,
            GrabEvent::BullishGrab,
        ]
    );
    assert_eq!(
        frame.signals,
        vec![
            Signal::Neutral,
            Signal::Neutral,
            Signal::Neutral,
            Signal::Neutral,
            Signal::Long,
        ]
    );
    assert_eq!(frame.signal_counts(), (1, 0));
}

#[test]
fn single_unit_frame_on_fixture() {
    let bars = fixture();
    let frame =
        SignalFrame::compute(&bars, SwingParams::new(1, 1), EngineMode::SingleUnit).unwrap();

    // Same visibility delay as scaling with lag 0, but a one-bar signal offset.
    assert_eq!(frame.grabs[2], GrabEvent::BearishGrab);
    assert_eq!(frame.grabs[4], GrabEvent::BullishGrab);
    assert_eq!(
        frame.signals,
        vec![
            Signal::Neutral,
            Signal::Neutral,
            Signal::Neutral,
            Signal::Long,
            Signal::Neutral,
        ]
    );
}

#[test]
fn single_unit_without_lag_sees_no_grabs_on_fixture() {
    let bars = fixture();
    let frame =
        SignalFrame::compute(&bars, SwingParams::new(0, 1), EngineMode::SingleUnit).unwrap();
    assert!(frame.grabs.iter().all(|g| *g == GrabEvent::None));
    assert!(frame.signals.iter().all(|s| *s == Signal::Neutral));
}

// ── 2. Entries ───────────────────────────────────────────────────────

#[test]
fn scaling_enters_long_at_open_with_candle_stop() {
    let bars = fixture();
    let out = run_backtest(&bars, &EngineConfig::new(SwingParams::new(0, 1), EngineMode::Scaling))
        .unwrap();

    // The position opens on the last bar and is never closed.
    assert!(out.trades.is_empty());
    assert_eq!(out.long_signals, 1);
    assert_eq!(out.short_signals, 0);
    match out.final_position {
        Position::Open {
            direction,
            ref entries,
            stop,
        } => {
            assert_eq!(direction, Direction::Long);
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].price, 9.8);
            assert_eq!(entries[0].bar_index, 4);
            assert!((stop - 9.5).abs() < 1e-12);
        }
        Position::Flat => panic!("expected an open long"),
    }
}

#[test]
fn single_unit_holds_long_through_fixture() {
    let bars = fixture();
    let out = run_backtest(
        &bars,
        &EngineConfig::new(SwingParams::new(1, 1), EngineMode::SingleUnit),
    )
    .unwrap();

    assert!(out.trades.is_empty());
    assert_eq!(out.final_position.direction(), Some(Direction::Long));
    assert_eq!(out.final_position.units(), 1);
    // Entry at 9.0 with a 0.5 candle height.
    assert!((out.final_position.stop().unwrap() - 8.5).abs() < 1e-12);
}

// ── 3. Monotonic series ──────────────────────────────────────────────

#[test]
fn rising_prices_never_go_short() {
    let bars = rising_bars(300);
    for mode in [EngineMode::Scaling, EngineMode::SingleUnit] {
        for lag in 0..3 {
            for window in 1..4 {
                let config = EngineConfig::new(SwingParams::new(lag, window), mode);
                let out = run_backtest(&bars, &config).unwrap();
                assert_eq!(out.short_signals, 0, "{mode} lag{lag} win{window}");
                assert!(out
                    .trades
                    .iter()
                    .all(|t| t.trade.direction == Direction::Long));
                assert_ne!(out.final_position.direction(), Some(Direction::Short));
            }
        }
    }
}

#[test]
fn zero_length_and_single_bar_series() {
    let config = EngineConfig::new(SwingParams::new(0, 1), EngineMode::Scaling);
    let out = run_backtest(&[], &config).unwrap();
    assert!(out.trades.is_empty());

    let one = make_bars(&[(1.0, 2.0, 0.5, 1.5)]);
    let out = run_backtest(&one, &config).unwrap();
    assert!(out.trades.is_empty());
    assert!(out.final_position.is_flat());
}

#[test]
fn window_wider_than_series_is_quiet() {
    let bars = fixture();
    let out = run_backtest(&bars, &EngineConfig::new(SwingParams::new(2, 10), EngineMode::Scaling))
        .unwrap();
    assert!(out.trades.is_empty());
    assert_eq!(out.long_signals + out.short_signals, 0);
}

// ── 4. Validation ────────────────────────────────────────────────────

#[test]
fn insane_bar_is_rejected() {
    let mut bars = fixture();
    bars[3].high = 7.0;
    let err = run_backtest(&bars, &EngineConfig::new(SwingParams::new(0, 1), EngineMode::Scaling))
        .unwrap_err();
    assert!(matches!(err, CoreError::InsaneBar { index: 3, .. }));
}

#[test]
fn unordered_timestamps_are_rejected() {
    let mut bars = fixture();
    bars.swap(1, 2);
    let err = run_backtest(&bars, &EngineConfig::new(SwingParams::new(0, 1), EngineMode::Scaling))
        .unwrap_err();
    assert!(matches!(err, CoreError::UnorderedTimestamps { index: 2, .. }));
}
