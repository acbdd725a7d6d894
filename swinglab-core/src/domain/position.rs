//! Position — the single mutable position owned by the trade simulator.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Side of an open position or a closed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for Long, -1.0 for Short. Favorable moves multiply positively.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "Long",
            Direction::Short => "Short",
        }
    }
}

/// One fill added to an open position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub price: f64,
    pub bar_index: usize,
    pub time: NaiveDateTime,
}

/// Engine position state.
///
/// `Open.entries` is never empty; in single-unit mode it always holds exactly one entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Position {
    #[default]
    Flat,
    Open {
        direction: Direction,
        entries: Vec<Entry>,
        stop: f64,
    },
}

impl Position {
    /// Open a fresh position with a single entry.
    pub fn open(direction: Direction, entry: Entry, stop: f64) -> Self {
        Position::Open {
            direction,
            entries: vec![entry],
            stop,
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            Position::Flat => None,
            Position::Open { direction, .. } => Some(*direction),
        }
    }

    pub fn stop(&self) -> Option<f64> {
        match self {
            Position::Flat => None,
            Position::Open { stop, .. } => Some(*stop),
        }
    }

    /// Number of units held (0 when flat).
    pub fn units(&self) -> usize {
        match self {
            Position::Flat => 0,
            Position::Open { entries, .. } => entries.len(),
        }
    }

    /// Arithmetic mean of all entry prices, `None` when flat.
    pub fn average_entry_price(&self) -> Option<f64> {
        match self {
            Position::Flat => None,
            Position::Open { entries, .. } => Some(average_price(entries)),
        }
    }

    /// Unrealized PnL at `price` across all units.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Open {
                direction, entries, ..
            } => (price - average_price(entries)) * direction.sign() * entries.len() as f64,
        }
    }
}

pub(crate) fn average_price(entries: &[Entry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    entries.iter().map(|e| e.price).sum::<f64>() / entries.len() as f64
}
