//! Domain types for SwingLab

pub mod bar;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use position::{Direction, Entry, Position};
pub use trade::{AnnotatedTrade, ExitReason, Trade};
