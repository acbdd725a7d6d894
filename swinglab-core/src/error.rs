//! Core error type.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors raised by the detection pipeline and the simulator.
///
/// An empty bar series is not an error: it produces an empty frame and no trades.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("bar {index} at {timestamp} fails OHLC sanity (o={open}, h={high}, l={low}, c={close})")]
    InsaneBar {
        index: usize,
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("timestamps must be strictly increasing: bar {index} at {current} follows {previous}")]
    UnorderedTimestamps {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("signal frame covers {frame_len} bars but the series has {bar_len}")]
    FrameLengthMismatch { frame_len: usize, bar_len: usize },
}
