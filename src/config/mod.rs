//! Configuration module for icing-stage.
//!
//! Provides types for loading and validating actuator and stage
//! configuration from TOML files.

mod actuator;
mod loader;
mod stage;
mod system;
pub mod units;
mod validation;

pub use actuator::{max_steps, tick_interval, ActuatorConfig};
pub use loader::{load_config, parse_config};
pub use stage::StageConfig;
pub use system::{SystemConfig, NOZZLE, PLATFORM, STAGE_ACTUATORS, X_AXIS, Y_AXIS};
pub use validation::{validate_actuator, validate_config};

// Re-export unit types at config level
pub use units::{Distance, Steps};
