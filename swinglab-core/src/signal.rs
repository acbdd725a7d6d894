//! Entry signals: a delayed grab confirmed by the direction of the acting candle.
//!
//! `signal[t] = Long`  when `grab[t - O]` is a bearish grab and bar t closes up,
//! `signal[t] = Short` when `grab[t - O]` is a bullish grab and bar t closes down,
//! neutral otherwise. `O` is [`EngineMode::signal_offset`], always at least 1, so
//! the acting candle is strictly after the grab bar.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Direction};
use crate::indicators::GrabEvent;
use crate::params::{EngineMode, SwingParams};

/// Per-bar entry signal (+1 / -1 / 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Signal {
    Long,
    Short,
    #[default]
    Neutral,
}

impl Signal {
    pub fn value(self) -> i8 {
        match self {
            Signal::Long => 1,
            Signal::Short => -1,
            Signal::Neutral => 0,
        }
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            Signal::Long => Some(Direction::Long),
            Signal::Short => Some(Direction::Short),
            Signal::Neutral => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalGenerator {
    offset: usize,
}

impl SignalGenerator {
    pub fn new(params: SwingParams, mode: EngineMode) -> Self {
        Self::with_offset(mode.signal_offset(params))
    }

    pub fn with_offset(offset: usize) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn generate(&self, bars: &[Bar], grabs: &[GrabEvent]) -> Vec<Signal> {
        bars.iter()
            .enumerate()
            .map(|(t, bar)| {
                let Some(src) = t.checked_sub(self.offset) else {
                    return Signal::Neutral;
                };
                match grabs.get(src) {
                    Some(GrabEvent::BearishGrab) if bar.is_bullish() => Signal::Long,
                    Some(GrabEvent::BullishGrab) if bar.is_bearish() => Signal::Short,
                    _ => Signal::Neutral,
                }
            })
            .collect()
    }
}
