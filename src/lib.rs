//! # icing-stage
//!
//! Execution core for a cookie-icing stage: stepper actuators driven by
//! periodic tickers, grouped into a two-axis carriage and two on/off axes,
//! and sequenced through recipes loaded from pattern files.
//!
//! ## Features
//!
//! - **Actuator state machine**: one directive per tick, blocking tasks,
//!   bounds enforcement and a terminal dead state
//! - **embedded-hal 1.0**: `OutputPin` STEP/DIR/ENABLE driver, `InputPin`
//!   boundary sensor for zeroing
//! - **Straight-line carriage moves**: Bresenham rasterisation so both axes
//!   arrive together
//! - **Readiness barrier**: the sequencer only advances once every group is
//!   ready, and halts on the first dead actuator
//! - **Configuration-driven**: actuators, layout and pattern files in TOML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use icing_stage::{load_config, CookieSpec, Pattern, Recipe, SimulatedDriver, Stage};
//!
//! let config = load_config("stage.toml")?;
//! let stage = Stage::from_config(
//!     &config,
//!     |_| Box::new(SimulatedDriver::new()),
//!     icing_stage::diagnostics::default_sink(),
//! )?;
//!
//! let mut recipe = Recipe::new();
//! recipe.add_cookie(CookieSpec::new(Pattern::Square), (0, 0));
//! stage.load_recipe(&recipe)?;
//! stage.start();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Error payloads carry bounded heapless strings
#![allow(clippy::result_large_err)]

// Core modules
pub mod actuator;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod group;
pub mod scheduler;
pub mod stage;

// Re-exports for ergonomic API
pub use actuator::{
    Actuator, ActuatorBuilder, ActuatorState, Direction, Directive, PinStepDriver,
    SimulatedDriver, StepDriver, StepStyle,
};
pub use config::{load_config, parse_config, validate_config, ActuatorConfig, SystemConfig};
pub use diagnostics::{DiagnosticsSink, Level, MemorySink, NullSink, TracingSink};
pub use error::{Error, Result};
pub use group::{rasterize, ActuatorGroup, Carriage, Command, GroupId, Toggle};
pub use scheduler::{Ticker, TickerStatus};
pub use stage::{CookieSpec, GridPos, Pattern, Recipe, Stage, StageLayout, Step, TickOutcome};

// Unit types
pub use config::units::{Distance, Steps};
