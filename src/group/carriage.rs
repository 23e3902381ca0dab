//! Two-axis carriage.

use std::sync::Arc;

use crate::actuator::{Actuator, Directive};
use crate::config::Distance;
use crate::diagnostics::{DiagnosticsSink, Level};
use crate::error::{bounded, CommandError, Error, Result};

use super::{members_ready, rasterize, ActuatorGroup, Command};

/// X/Y carriage moved in straight lines.
///
/// A move is rasterised so both axes finish on the same tick, and both
/// tasks are blocking so the carriage is not ready until it has arrived.
pub struct Carriage {
    name: heapless::String<32>,
    x: Actuator,
    y: Actuator,
    last_destination: (f64, f64),
    sink: Arc<dyn DiagnosticsSink>,
}

impl Carriage {
    /// Group the two axes.
    pub fn new(x: Actuator, y: Actuator, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            name: bounded("carriage"),
            x,
            y,
            last_destination: (0.0, 0.0),
            sink,
        }
    }

    /// The x axis.
    pub fn x(&self) -> &Actuator {
        &self.x
    }

    /// The y axis.
    pub fn y(&self) -> &Actuator {
        &self.y
    }

    /// Last coordinate sent, `(0.0, 0.0)` before the first move.
    pub fn last_destination(&self) -> (f64, f64) {
        self.last_destination
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        check_travel(&self.x, x)?;
        check_travel(&self.y, y)?;

        let dx = self.x.steps_to(Distance(x));
        let dy = self.y.steps_to(Distance(y));
        let (x_task, y_task) = rasterize(dx, dy);

        self.sink.record(
            Level::Debug,
            &format!(
                "{}: move to ({}, {}) as {} ticks ({}, {} steps)",
                self.name,
                x,
                y,
                x_task.len(),
                dx,
                dy
            ),
        );

        self.x.set_task(x_task, true)?;
        if let Err(error) = self.y.set_task(y_task, true) {
            // Withdraw the x half so the axes never run apart.
            let _ = self.x.set_task(Vec::<Directive>::new(), false);
            return Err(error);
        }
        self.last_destination = (x, y);
        Ok(())
    }
}

/// Reject a coordinate that lies outside the axis travel.
fn check_travel(axis: &Actuator, coordinate: f64) -> Result<()> {
    let target = axis.target_steps(Distance(coordinate));
    let max_steps = axis.max_steps();
    if (0..=max_steps).contains(&target) {
        Ok(())
    } else {
        Err(Error::Command(CommandError::OutOfTravel {
            actuator: bounded(axis.name()),
            target,
            max_steps,
        }))
    }
}

impl ActuatorGroup for Carriage {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn send(&mut self, command: &Command) -> Result<()> {
        match *command {
            Command::Move { x, y } => self.move_to(x, y),
            Command::Switch(_) => Err(Error::Command(CommandError::WrongCommand {
                group: self.name.clone(),
                expected: "coordinate",
            })),
        }
    }

    fn ready(&self) -> Result<bool> {
        members_ready([&self.x, &self.y])
    }

    fn pause(&self) {
        self.x.pause();
        self.y.pause();
    }

    fn unpause(&self) {
        self.x.unpause();
        self.y.unpause();
    }

    fn kill(&self) {
        self.x.kill();
        self.y.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{ActuatorState, SimulatedDriver};
    use crate::config::Steps;
    use crate::diagnostics::NullSink;

    fn axis(name: &str) -> Actuator {
        Actuator::builder()
            .name(name)
            .dist_per_step(0.5)
            .max_steps(100)
            .driver(SimulatedDriver::new())
            .sink(Arc::new(NullSink))
            .start_paused(true)
            .build()
            .unwrap()
    }

    fn carriage() -> Carriage {
        Carriage::new(axis("x_axis"), axis("y_axis"), Arc::new(NullSink))
    }

    fn run(carriage: &Carriage, ticks: usize) {
        for _ in 0..ticks {
            carriage.x().tick();
            carriage.y().tick();
        }
    }

    #[test]
    fn test_move_arrives_on_both_axes_together() {
        let mut carriage = carriage();

        // (2.5, 1.0) at 0.5 per step is (5, 2) steps
        carriage.send(&Command::Move { x: 2.5, y: 1.0 }).unwrap();
        assert_eq!(carriage.x().pending_steps(), 5);
        assert_eq!(carriage.y().pending_steps(), 5);
        assert!(carriage.x().is_blocking());

        run(&carriage, 1);
        assert!(!carriage.ready().unwrap());
        assert_eq!(carriage.x().state(), ActuatorState::ExecutingBlocked);

        run(&carriage, 5);
        assert!(carriage.ready().unwrap());
        assert_eq!(carriage.x().position(), Steps(5));
        assert_eq!(carriage.y().position(), Steps(2));
        assert_eq!(carriage.last_destination(), (2.5, 1.0));
    }

    #[test]
    fn test_move_is_relative_to_current_position() {
        let mut carriage = carriage();
        carriage.send(&Command::Move { x: 2.0, y: 2.0 }).unwrap();
        run(&carriage, 5);

        carriage.send(&Command::Move { x: 1.0, y: 3.0 }).unwrap();
        run(&carriage, 3);

        assert_eq!(carriage.x().position(), Steps(2));
        assert_eq!(carriage.y().position(), Steps(6));
    }

    #[test]
    fn test_target_outside_travel_is_rejected() {
        let mut carriage = carriage();
        carriage.send(&Command::Move { x: 1.0, y: 0.0 }).unwrap();
        run(&carriage, 3);
        assert!(carriage.ready().unwrap());

        // Travel is [0, 100] steps, i.e. [0.0, 50.0]
        for (x, y) in [(-1e30, 0.0), (1e30, 0.0), (0.0, 50.5), (-0.5, 1.0)] {
            assert!(matches!(
                carriage.send(&Command::Move { x, y }),
                Err(Error::Command(CommandError::OutOfTravel { max_steps: 100, .. }))
            ));
        }
        assert_eq!(carriage.x().pending_steps(), 0);
        assert_eq!(carriage.y().pending_steps(), 0);
        assert_eq!(carriage.last_destination(), (1.0, 0.0));

        // The far edge itself is reachable
        carriage.send(&Command::Move { x: 50.0, y: 50.0 }).unwrap();
        assert_eq!(carriage.y().pending_steps(), 100);
        assert_eq!(carriage.last_destination(), (50.0, 50.0));
    }

    #[test]
    fn test_failed_second_axis_withdraws_first() {
        let mut carriage = carriage();
        carriage.y().kill();

        assert!(matches!(
            carriage.send(&Command::Move { x: 2.0, y: 2.0 }),
            Err(Error::Command(CommandError::ActuatorDead(_)))
        ));
        assert_eq!(carriage.x().pending_steps(), 0);
        assert!(!carriage.x().is_blocking());

        carriage.x().tick();
        assert_eq!(carriage.x().position(), Steps(0));
        assert_eq!(carriage.x().state(), ActuatorState::Ready);
    }

    #[test]
    fn test_rejects_switch() {
        let mut carriage = carriage();
        assert!(matches!(
            carriage.send(&Command::Switch(true)),
            Err(Error::Command(CommandError::WrongCommand { expected: "coordinate", .. }))
        ));
    }

    #[test]
    fn test_dead_axis_surfaces_as_error() {
        let carriage = carriage();
        carriage.y().kill();
        assert!(carriage.ready().is_err());

        carriage.kill();
        assert_eq!(carriage.x().state(), ActuatorState::Dead);
    }
}
