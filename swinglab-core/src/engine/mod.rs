//! Backtest engine: precompute → simulate → annotate.

pub mod annotate;
pub mod precompute;
pub mod simulator;

pub use annotate::{annotate_trades, excursion, Excursion};
pub use precompute::{validate_series, SignalFrame};
pub use simulator::{entry_candle_height, initial_stop, SimulationOutput, TradeSimulator};

use serde::{Deserialize, Serialize};

use crate::domain::{AnnotatedTrade, Bar, Position};
use crate::error::CoreError;
use crate::params::{EngineMode, SwingParams};

/// Configuration for a single backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineConfig {
    pub params: SwingParams,
    pub mode: EngineMode,
}

impl EngineConfig {
    pub fn new(params: SwingParams, mode: EngineMode) -> Self {
        Self { params, mode }
    }
}

/// Result of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOutput {
    pub config: EngineConfig,
    pub trades: Vec<AnnotatedTrade>,
    /// Position still open after the last bar (not emitted as a trade).
    pub final_position: Position,
    pub bar_count: usize,
    pub long_signals: usize,
    pub short_signals: usize,
}

impl EngineOutput {
    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.trade.pnl).sum()
    }
}

/// Run the full pipeline over one bar series.
///
/// Deterministic and single-threaded; callers parallelize across runs, never
/// within one.
pub fn run_backtest(bars: &[Bar], config: &EngineConfig) -> Result<EngineOutput, CoreError> {
    let frame = SignalFrame::compute(bars, config.params, config.mode)?;
    let (long_signals, short_signals) = frame.signal_counts();

    let sim = TradeSimulator::new(config.mode).run(bars, &frame)?;
    let trades = annotate_trades(&sim.trades, bars);

    Ok(EngineOutput {
        config: *config,
        trades,
        final_position: sim.final_position,
        bar_count: bars.len(),
        long_signals,
        short_signals,
    })
}
