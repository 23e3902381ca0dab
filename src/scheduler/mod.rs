//! Scheduler module for icing-stage.
//!
//! Provides the restartable periodic ticker that drives every actuator and
//! the stage sequencer.

mod ticker;

pub use ticker::{Ticker, TickerStatus};
