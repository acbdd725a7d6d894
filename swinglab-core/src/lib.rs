//! SwingLab Core — swing detection, liquidity grabs, signals and the trade simulator.
//!
//! This crate contains the backtesting engine for the swing liquidity-grab
//! reversal rule:
//! - Domain types (bars, positions, trades, exit reasons)
//! - Vectorized detection stages (swing pivots, levels, grabs)
//! - Signal generation with mode-dependent offsets
//! - Bar-by-bar trade simulator (single-unit and scaling modes)
//! - MAE/MFE and cumulative PnL annotation
//!
//! Everything here is pure and deterministic. No I/O, no logging, no threads.

pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod params;
pub mod signal;
pub mod synthetic;

pub use engine::{run_backtest, EngineConfig, EngineOutput};
pub use error::CoreError;
pub use params::{EngineMode, SwingParams};
