//! Trade simulator — the position state machine.
//!
//! Walks the series from the second bar, advancing [`Position`] one bar at a
//! time and emitting at most one [`Trade`] per step. A reversal closes the
//! current position and opens the opposite one inside the same step, so two
//! positions never coexist.
//!
//! Per-bar transition order while a position is open:
//! 1. (scaling only) if the previous bar carries a visible pivot on the
//!    protective side, add a unit at this bar's open and move the stop to that
//!    pivot's extreme
//! 2. stop check (single-unit: always first; scaling: only without a reversal signal)
//! 3. reversal on an opposite signal
//!
//! Exit prices differ by mode: single-unit reversals exit at the bar's open,
//! scaling reversals exit at the current stop.

use serde::{Deserialize, Serialize};

use super::precompute::SignalFrame;
use crate::domain::position::average_price;
use crate::domain::{Bar, Direction, Entry, ExitReason, Position, Trade};
use crate::error::CoreError;
use crate::indicators::SwingFlags;
use crate::params::EngineMode;
use crate::signal::Signal;

/// Closed trades plus whatever position was still open after the last bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub trades: Vec<Trade>,
    pub final_position: Position,
}

#[derive(Debug, Clone)]
pub struct TradeSimulator {
    mode: EngineMode,
    position: Position,
}

impl TradeSimulator {
    pub fn new(mode: EngineMode) -> Self {
        Self {
            mode,
            position: Position::Flat,
        }
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Run over the whole series. Bar 0 is never acted on.
    pub fn run(mut self, bars: &[Bar], frame: &SignalFrame) -> Result<SimulationOutput, CoreError> {
        if frame.len() != bars.len() || frame.swings.len() != bars.len() {
            return Err(CoreError::FrameLengthMismatch {
                frame_len: frame.len(),
                bar_len: bars.len(),
            });
        }

        let mut trades = Vec::new();
        for t in 1..bars.len() {
            if let Some(trade) = self.step(bars, frame, t) {
                trades.push(trade);
            }
        }

        Ok(SimulationOutput {
            trades,
            final_position: self.position,
        })
    }

    /// Advance the state machine by bar `t` (requires `t >= 1`).
    pub fn step(&mut self, bars: &[Bar], frame: &SignalFrame, t: usize) -> Option<Trade> {
        let bar = &bars[t];
        let signal = frame.signals[t];
        if self.mode.allows_scaling() {
            let prev = t.checked_sub(1).map(|p| (&bars[p], frame.swings[p]));
            self.step_scaling(t, bar, signal, prev)
        } else {
            self.step_single_unit(t, bar, signal)
        }
    }

    fn step_single_unit(&mut self, t: usize, bar: &Bar, signal: Signal) -> Option<Trade> {
        match std::mem::take(&mut self.position) {
            Position::Flat => {
                self.position = open_on_signal(signal, t, bar);
                None
            }
            Position::Open {
                direction,
                entries,
                stop,
            } => {
                if stop_hit(direction, bar, stop) {
                    return Some(close_position(
                        direction,
                        &entries,
                        stop,
                        stop,
                        ExitReason::SlHit,
                        t,
                        bar,
                    ));
                }

                if signal.direction() == Some(direction.opposite()) {
                    let trade = close_position(
                        direction,
                        &entries,
                        bar.open,
                        stop,
                        ExitReason::SignalReversed,
                        t,
                        bar,
                    );
                    let reversed = direction.opposite();
                    // Reversal entries sit behind the bar's own extreme.
                    let new_stop = match reversed {
                        Direction::Long => bar.low,
                        Direction::Short => bar.high,
                    };
                    self.position = Position::open(reversed, entry_at_open(t, bar), new_stop);
                    return Some(trade);
                }

                self.position = Position::Open {
                    direction,
                    entries,
                    stop,
                };
                None
            }
        }
    }

    fn step_scaling(
        &mut self,
        t: usize,
        bar: &Bar,
        signal: Signal,
        prev: Option<(&Bar, SwingFlags)>,
    ) -> Option<Trade> {
        match std::mem::take(&mut self.position) {
            Position::Flat => {
                self.position = open_on_signal(signal, t, bar);
                None
            }
            Position::Open {
                direction,
                mut entries,
                mut stop,
            } => {
                if let Some(pivot) = prev.and_then(|(prev_bar, flags)| trailing_pivot(direction, prev_bar, flags)) {
                    entries.push(entry_at_open(t, bar));
                    stop = pivot;
                }

                let reversal = signal.direction() == Some(direction.opposite());

                if stop_hit(direction, bar, stop) && !reversal {
                    return Some(close_position(
                        direction,
                        &entries,
                        stop,
                        stop,
                        ExitReason::SlHit,
                        t,
                        bar,
                    ));
                }

                if reversal {
                    let reason = match direction {
                        Direction::Long => ExitReason::BearishTradeReversal,
                        Direction::Short => ExitReason::BullishTradeReversal,
                    };
                    let trade = close_position(direction, &entries, stop, stop, reason, t, bar);
                    self.position = open_on_signal(signal, t, bar);
                    return Some(trade);
                }

                self.position = Position::Open {
                    direction,
                    entries,
                    stop,
                };
                None
            }
        }
    }
}

/// Distance from the open to the adverse extreme of the signal candle.
pub fn entry_candle_height(direction: Direction, bar: &Bar) -> f64 {
    match direction {
        Direction::Long => bar.open - bar.low,
        Direction::Short => bar.high - bar.open,
    }
}

/// Initial stop for a signal-driven entry: one candle height behind the open.
pub fn initial_stop(direction: Direction, bar: &Bar) -> f64 {
    let height = entry_candle_height(direction, bar);
    match direction {
        Direction::Long => bar.open - height,
        Direction::Short => bar.open + height,
    }
}

fn open_on_signal(signal: Signal, t: usize, bar: &Bar) -> Position {
    match signal.direction() {
        Some(direction) => Position::open(direction, entry_at_open(t, bar), initial_stop(direction, bar)),
        None => Position::Flat,
    }
}

fn entry_at_open(t: usize, bar: &Bar) -> Entry {
    Entry {
        price: bar.open,
        bar_index: t,
        time: bar.timestamp,
    }
}

fn stop_hit(direction: Direction, bar: &Bar, stop: f64) -> bool {
    match direction {
        Direction::Long => bar.low <= stop,
        Direction::Short => bar.high >= stop,
    }
}

/// Pivot extreme that trails the stop: previous bar's low for longs, high for shorts.
fn trailing_pivot(direction: Direction, prev_bar: &Bar, flags: SwingFlags) -> Option<f64> {
    match direction {
        Direction::Long => flags.is_swing_low.then_some(prev_bar.low),
        Direction::Short => flags.is_swing_high.then_some(prev_bar.high),
    }
}

fn close_position(
    direction: Direction,
    entries: &[Entry],
    exit_price: f64,
    sl_price: f64,
    exit_reason: ExitReason,
    t: usize,
    bar: &Bar,
) -> Trade {
    // Open positions always hold at least one entry.
    let first = entries[0];
    let entry_price = average_price(entries);
    let units = entries.len();
    Trade {
        entry_bar: first.bar_index,
        entry_time: first.time,
        entry_price,
        exit_bar: t,
        exit_time: bar.timestamp,
        exit_price,
        direction,
        pnl: (exit_price - entry_price) * direction.sign() * units as f64,
        exit_reason,
        sl_price,
        units,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    const EPS: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "actual={actual}, expected={expected}"
        );
    }

    fn run(mode: EngineMode, bars: &[Bar], frame: &SignalFrame) -> SimulationOutput {
        TradeSimulator::new(mode).run(bars, frame).unwrap()
    }

    #[test]
    fn single_unit_stop_loss() {
        let bars = make_ohlc_bars(&[
            (10.0, 10.5, 9.5, 10.0),
            (10.0, 10.6, 9.0, 10.4),
            (10.4, 10.8, 9.8, 10.5),
            (10.5, 10.6, 8.9, 9.0),
        ]);
        let frame = SignalFrame::from_signals(vec![
            Signal::Neutral,
            Signal::Long,
            Signal::Neutral,
            Signal::Neutral,
        ]);
        let out = run(EngineMode::SingleUnit, &bars, &frame);

        assert_eq!(out.trades.len(), 1);
        let t = &out.trades[0];
        assert_eq!(t.direction, Direction::Long);
        assert_eq!((t.entry_bar, t.exit_bar), (1, 3));
        assert_eq!(t.exit_reason, ExitReason::SlHit);
        assert_close(t.entry_price, 10.0);
        assert_close(t.exit_price, 9.0);
        assert_close(t.sl_price, 9.0);
        assert_close(t.pnl, -1.0);
        assert_eq!(t.units, 1);
        assert!(out.final_position.is_flat());
    }

    #[test]
    fn single_unit_reversal_exits_at_open_and_stop_wins_over_signal() {
        let bars = make_ohlc_bars(&[
            (10.0, 10.5, 9.5, 10.0),
            (10.0, 10.6, 9.0, 10.4),
            (10.4, 11.0, 10.2, 10.3),
            (10.3, 10.5, 9.7, 9.8),
            (9.8, 11.2, 9.6, 11.0),
            (11.0, 11.5, 10.8, 11.3),
        ]);
        let frame = SignalFrame::from_signals(vec![
            Signal::Neutral,
            Signal::Long,
            Signal::Short,
            Signal::Neutral,
            Signal::Long,
            Signal::Long,
        ]);
        let out = run(EngineMode::SingleUnit, &bars, &frame);
        assert_eq!(out.trades.len(), 2);

        let rev = &out.trades[0];
        assert_eq!(rev.exit_reason, ExitReason::SignalReversed);
        assert_eq!(rev.direction, Direction::Long);
        assert_close(rev.exit_price, 10.4);
        assert_close(rev.sl_price, 9.0);
        assert_close(rev.pnl, 0.4);

        // Short opened at bar 2's open with the bar's high as stop; bar 4 hits it
        // even though it also carries a long signal.
        let sl = &out.trades[1];
        assert_eq!(sl.direction, Direction::Short);
        assert_eq!(sl.exit_reason, ExitReason::SlHit);
        assert_eq!((sl.entry_bar, sl.exit_bar), (2, 4));
        assert_close(sl.entry_price, 10.4);
        assert_close(sl.exit_price, 11.0);
        assert_close(sl.pnl, -0.6);

        // Bar 5 re-enters from flat.
        assert_eq!(out.final_position.direction(), Some(Direction::Long));
        assert_close(out.final_position.stop().unwrap(), 10.8);
    }

    #[test]
    fn single_unit_short_reversal_into_long_takes_bar_low_as_stop() {
        let bars = make_ohlc_bars(&[
            (10.0, 10.5, 9.5, 10.0),
            (10.0, 11.0, 9.7, 9.8),
            (9.8, 10.3, 9.4, 10.1),
            (10.1, 10.4, 9.9, 10.2),
        ]);
        let frame = SignalFrame::from_signals(vec![
            Signal::Neutral,
            Signal::Short,
            Signal::Long,
            Signal::Neutral,
        ]);
        let out = run(EngineMode::SingleUnit, &bars, &frame);

        assert_eq!(out.trades.len(), 1);
        let t = &out.trades[0];
        assert_eq!(t.direction, Direction::Short);
        assert_eq!(t.exit_reason, ExitReason::SignalReversed);
        assert_eq!((t.entry_bar, t.exit_bar), (1, 2));
        assert_close(t.entry_price, 10.0);
        assert_close(t.exit_price, 9.8);
        assert_close(t.sl_price, 11.0);
        assert_close(t.pnl, 0.2);

        let pos = &out.final_position;
        assert_eq!(pos.direction(), Some(Direction::Long));
        assert_eq!(pos.units(), 1);
        assert_close(pos.stop().unwrap(), bars[2].low);
        assert_close(pos.average_entry_price().unwrap(), bars[2].open);
        assert_close(pos.unrealized_pnl(bars[3].close), 0.4);
    }

    #[test]
    fn single_unit_ignores_pivots() {
        let bars = make_ohlc_bars(&[
            (10.0, 10.5, 9.5, 10.0),
            (10.0, 10.6, 9.0, 10.4),
            (10.4, 10.9, 9.6, 10.8),
            (10.8, 11.4, 10.5, 11.2),
        ]);
        let mut frame =
            SignalFrame::from_signals(vec![Signal::Neutral, Signal::Long, Signal::Neutral, Signal::Neutral]);
        frame.swings[2].is_swing_low = true;
        let out = run(EngineMode::SingleUnit, &bars, &frame);
        assert!(out.trades.is_empty());
        assert_eq!(out.final_position.units(), 1);
        assert_close(out.final_position.stop().unwrap(), 9.0);
    }

    #[test]
    fn scaling_adds_units_on_pivot_and_trails_stop() {
        let bars = make_ohlc_bars(&[
            (10.0, 10.5, 9.5, 10.0),
            (10.0, 10.6, 9.0, 10.4),
            (10.4, 10.9, 9.6, 10.8),
            (10.8, 11.4, 10.5, 11.2),
            (11.2, 11.3, 9.5, 9.7),
        ]);
        let mut frame = SignalFrame::from_signals(vec![
            Signal::Neutral,
            Signal::Long,
            Signal::Neutral,
            Signal::Neutral,
            Signal::Neutral,
        ]);
        frame.swings[2].is_swing_low = true;
        let out = run(EngineMode::Scaling, &bars, &frame);

        assert_eq!(out.trades.len(), 1);
        let t = &out.trades[0];
        assert_eq!(t.exit_reason, ExitReason::SlHit);
        assert_eq!(t.units, 2);
        assert_eq!((t.entry_bar, t.exit_bar), (1, 4));
        assert_close(t.entry_price, 10.4);
        assert_close(t.exit_price, 9.6);
        assert_close(t.sl_price, 9.6);
        assert_close(t.pnl, -1.6);
    }

    #[test]
    fn scaling_reversal_exits_at_stop_and_reopens() {
        let bars = make_ohlc_bars(&[
            (10.0, 10.5, 9.5, 10.0),
            (10.0, 10.6, 9.0, 10.4),
            (10.4, 10.7, 8.8, 10.0),
            (10.0, 10.2, 9.5, 9.6),
            (9.6, 9.9, 9.0, 9.8),
        ]);
        let mut frame = SignalFrame::from_signals(vec![
            Signal::Neutral,
            Signal::Long,
            Signal::Short,
            Signal::Neutral,
            Signal::Long,
        ]);
        frame.swings[2].is_swing_high = true;
        let out = run(EngineMode::Scaling, &bars, &frame);
        assert_eq!(out.trades.len(), 2);

        // Bar 2 breaches the stop but carries a short signal: reversal, priced at the stop.
        let first = &out.trades[0];
        assert_eq!(first.direction, Direction::Long);
        assert_eq!(first.exit_reason, ExitReason::BearishTradeReversal);
        assert_close(first.exit_price, 9.0);
        assert_close(first.pnl, -1.0);

        let second = &out.trades[1];
        assert_eq!(second.direction, Direction::Short);
        assert_eq!(second.exit_reason, ExitReason::BullishTradeReversal);
        assert_eq!(second.units, 2);
        assert_close(second.entry_price, 10.2);
        assert_close(second.exit_price, 10.7);
        assert_close(second.pnl, -1.0);

        assert_eq!(out.final_position.direction(), Some(Direction::Long));
        assert_close(out.final_position.stop().unwrap(), 9.0);
        assert_eq!(out.final_position.units(), 1);
    }

    #[test]
    fn no_action_on_first_bar() {
        let bars = make_ohlc_bars(&[(10.0, 10.5, 9.5, 10.2), (10.2, 10.4, 10.0, 10.3)]);
        let frame = SignalFrame::from_signals(vec![Signal::Long, Signal::Neutral]);
        let out = run(EngineMode::Scaling, &bars, &frame);
        assert!(out.trades.is_empty());
        assert!(out.final_position.is_flat());
    }

    #[test]
    fn frame_length_must_match() {
        let bars = make_ohlc_bars(&[(10.0, 10.5, 9.5, 10.2)]);
        let frame = SignalFrame::from_signals(vec![]);
        let err = TradeSimulator::new(EngineMode::Scaling)
            .run(&bars, &frame)
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::FrameLengthMismatch {
                frame_len: 0,
                bar_len: 1
            }
        );
    }

    #[test]
    fn initial_stop_uses_candle_height() {
        let bar = make_ohlc_bars(&[(10.0, 10.75, 9.25, 10.5)])[0];
        assert_close(entry_candle_height(Direction::Long, &bar), 0.75);
        assert_close(entry_candle_height(Direction::Short, &bar), 0.75);
        assert_close(initial_stop(Direction::Long, &bar), 9.25);
        assert_close(initial_stop(Direction::Short, &bar), 10.75);
    }
}
