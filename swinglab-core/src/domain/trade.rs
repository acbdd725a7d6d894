//! Trade — a closed position, and its annotated form.

use super::position::Direction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    /// Bar range reached the stop price.
    #[serde(rename = "SL Hit")]
    SlHit,
    /// Single-unit mode: opposite signal, exit at the bar's open.
    #[serde(rename = "Signal Reversed")]
    SignalReversed,
    /// Scaling mode: a short position closed by a bullish signal, exit at the stop.
    #[serde(rename = "Bullish Trade Reversal")]
    BullishTradeReversal,
    /// Scaling mode: a long position closed by a bearish signal, exit at the stop.
    #[serde(rename = "Bearish Trade Reversal")]
    BearishTradeReversal,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::SlHit => "SL Hit",
            ExitReason::SignalReversed => "Signal Reversed",
            ExitReason::BullishTradeReversal => "Bullish Trade Reversal",
            ExitReason::BearishTradeReversal => "Bearish Trade Reversal",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExitReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SL Hit" => Ok(ExitReason::SlHit),
            "Signal Reversed" => Ok(ExitReason::SignalReversed),
            "Bullish Trade Reversal" => Ok(ExitReason::BullishTradeReversal),
            "Bearish Trade Reversal" => Ok(ExitReason::BearishTradeReversal),
            other => Err(format!("unknown exit reason '{other}'")),
        }
    }
}

/// A completed round-trip trade. Created only when a position closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_bar: usize,
    /// Time of the first entry.
    pub entry_time: NaiveDateTime,
    /// Mean of all entry prices.
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,

    pub direction: Direction,
    pub pnl: f64,
    pub exit_reason: ExitReason,
    /// Stop level in force when the position closed.
    pub sl_price: f64,
    pub units: usize,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }

    /// Exit time minus entry time, in (fractional) minutes.
    pub fn duration_minutes(&self) -> f64 {
        (self.exit_time - self.entry_time).num_seconds() as f64 / 60.0
    }
}

/// A trade plus excursion statistics and running totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedTrade {
    pub trade: Trade,
    /// Running sum of PnL in emission order, including this trade.
    pub cumulative_pnl: f64,
    pub duration_minutes: f64,
    /// Maximum adverse excursion (≤ 0).
    pub mae: f64,
    /// Maximum favorable excursion (≥ 0).
    pub mfe: f64,
}
