//! Single-axis boolean groups (platform, nozzle).

use std::iter;
use std::sync::Arc;

use crate::actuator::{Actuator, Directive};
use crate::diagnostics::{DiagnosticsSink, Level};
use crate::error::{bounded, CommandError, Error, Result};

use super::{members_ready, ActuatorGroup, Command};

/// One actuator driven to either end of its travel.
///
/// `Switch(true)` runs to `max_steps`, `Switch(false)` runs back to zero.
/// The platform is blocking so the stage waits for it; the nozzle is not,
/// so the stage may move on while it is still extruding.
pub struct Toggle {
    name: heapless::String<32>,
    actuator: Actuator,
    blocking: bool,
    sink: Arc<dyn DiagnosticsSink>,
}

impl Toggle {
    /// Wrap `actuator`; tasks are submitted with the given blocking flag.
    pub fn new(
        name: &str,
        actuator: Actuator,
        blocking: bool,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            name: bounded(name),
            actuator,
            blocking,
            sink,
        }
    }

    /// The wrapped actuator.
    pub fn actuator(&self) -> &Actuator {
        &self.actuator
    }

    /// Whether tasks are submitted as blocking.
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn switch(&mut self, on: bool) -> Result<()> {
        let position = self.actuator.position().value();
        let (directive, count) = if on {
            (Directive::Forward, self.actuator.max_steps() - position)
        } else {
            (Directive::Backward, position)
        };
        let count = usize::try_from(count.max(0)).unwrap_or(usize::MAX);

        self.sink.record(
            Level::Debug,
            &format!("{}: switch {} ({} steps)", self.name, if on { "on" } else { "off" }, count),
        );

        self.actuator
            .set_task(iter::repeat(directive).take(count), self.blocking)
    }
}

impl ActuatorGroup for Toggle {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn send(&mut self, command: &Command) -> Result<()> {
        match *command {
            Command::Switch(on) => self.switch(on),
            Command::Move { .. } => Err(Error::Command(CommandError::WrongCommand {
                group: self.name.clone(),
                expected: "boolean",
            })),
        }
    }

    fn ready(&self) -> Result<bool> {
        members_ready([&self.actuator])
    }

    fn pause(&self) {
        self.actuator.pause();
    }

    fn unpause(&self) {
        self.actuator.unpause();
    }

    fn kill(&self) {
        self.actuator.kill();
    }
}
