//! Liquidity-grab detection: price piercing the tracked swing level.

use serde::{Deserialize, Serialize};

use super::levels::SwingLevels;
use crate::domain::Bar;

/// Grab classification for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GrabEvent {
    #[default]
    None,
    /// Low pierced the swing-low level (sell-side stops taken).
    BearishGrab,
    /// High pierced the swing-high level (buy-side stops taken).
    BullishGrab,
}

pub struct LiquidityGrabDetector;

impl LiquidityGrabDetector {
    /// Bearish is checked first; a bar piercing both levels is a `BearishGrab`.
    /// An undefined level never triggers its condition.
    pub fn classify(bar: &Bar, levels: &SwingLevels) -> GrabEvent {
        if levels.low.is_some_and(|low| bar.low < low) {
            GrabEvent::BearishGrab
        } else if levels.high.is_some_and(|high| bar.high > high) {
            GrabEvent::BullishGrab
        } else {
            GrabEvent::None
        }
    }

    pub fn detect(bars: &[Bar], levels: &[SwingLevels]) -> Vec<GrabEvent> {
        bars.iter()
            .zip(levels)
            .map(|(bar, lv)| Self::classify(bar, lv))
            .collect()
    }
}
