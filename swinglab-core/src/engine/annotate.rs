//! Performance annotation — excursion statistics and running totals per trade.
//!
//! Pure post-processing: trades + bar data → annotated trades. Trades are not
//! modified.

use serde::{Deserialize, Serialize};

use crate::domain::{AnnotatedTrade, Bar, Direction, Trade};

/// Worst and best price excursion over a trade's lifetime, signed so that
/// adverse moves are negative and favorable moves positive.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Excursion {
    pub mae: f64,
    pub mfe: f64,
}

/// Walk bars `[entry_bar, exit_bar]` (inclusive) and measure the extremes
/// relative to the trade's average entry price.
pub fn excursion(trade: &Trade, bars: &[Bar]) -> Excursion {
    let start = trade.entry_bar.min(bars.len());
    let end = trade.exit_bar.saturating_add(1).min(bars.len());
    if start >= end {
        return Excursion::default();
    }

    let (max_high, min_low) = bars[start..end]
        .iter()
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), bar| {
            (hi.max(bar.high), lo.min(bar.low))
        });

    let entry = trade.entry_price;
    match trade.direction {
        Direction::Long => Excursion {
            mae: min_low - entry,
            mfe: max_high - entry,
        },
        Direction::Short => Excursion {
            mae: entry - max_high,
            mfe: entry - min_low,
        },
    }
}

/// Annotate trades in emission order with MAE/MFE, cumulative PnL and duration.
pub fn annotate_trades(trades: &[Trade], bars: &[Bar]) -> Vec<AnnotatedTrade> {
    let mut cumulative = 0.0;
    trades
        .iter()
        .map(|trade| {
            cumulative += trade.pnl;
            let ex = excursion(trade, bars);
            AnnotatedTrade {
                trade: trade.clone(),
                cumulative_pnl: cumulative,
                duration_minutes: trade.duration_minutes(),
                mae: ex.mae,
                mfe: ex.mfe,
            }
        })
        .collect()
}
