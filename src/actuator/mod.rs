//! Actuator module for icing-stage.
//!
//! Provides the per-axis state machine, its step drivers and position tracking.

mod builder;
mod driver;
mod position;
pub mod state;
mod stepper;
mod task;

pub use builder::ActuatorBuilder;
pub use driver::{
    Direction, PinStepDriver, SimulatedDriver, SimulationLog, StepDriver, StepStyle,
    SIMULATION_HISTORY,
};
pub use position::Position;
pub use state::ActuatorState;
pub use stepper::Actuator;
pub use task::{parse_task, Directive, Task};
