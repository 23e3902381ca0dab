//! Stepper actuator state machine.
//!
//! One `Actuator` per physical axis. Its ticker calls [`Actuator::tick`] once
//! per period; each tick consumes at most one directive from the pending
//! task. Control calls (`set_task`, `pause`, `kill`, ...) may race with a
//! firing tick and are serialised by the core mutex.

use core::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;

use crate::config::units::{Distance, Steps};
use crate::config::tick_interval;
use crate::diagnostics::{DiagnosticsSink, Level};
use crate::error::{
    bounded, CommandError, ConfigError, Error, ExecutionError, Result,
};
use crate::scheduler::Ticker;

use super::builder::ActuatorBuilder;
use super::driver::{Direction, StepDriver, StepStyle};
use super::position::Position;
use super::state::ActuatorState;
use super::task::{parse_task, Directive, Task};

/// Fixed parameters resolved by the builder.
pub(crate) struct ActuatorParams {
    pub name: heapless::String<32>,
    pub tick_interval: Duration,
    pub steps_per_revolution: u16,
    pub dist_per_step: f64,
    pub max_steps: i64,
    pub step_style: StepStyle,
    pub reversed: bool,
}

/// Mutable state shared between the ticker and control calls.
struct Core {
    name: heapless::String<32>,
    state: ActuatorState,
    position: Position,
    task: Task,
    blocking: bool,
    driver: Box<dyn StepDriver>,
    step_style: StepStyle,
    reversed: bool,
    sink: Arc<dyn DiagnosticsSink>,
}

impl Core {
    /// One evaluation of the state machine.
    fn tick(&mut self) {
        if self.state == ActuatorState::Ready && !self.task.is_empty() {
            self.state = if self.blocking {
                ActuatorState::ExecutingBlocked
            } else {
                ActuatorState::Executing
            };
        } else if self.state == ActuatorState::Executing && self.blocking && !self.task.is_empty() {
            // A blocking task replaced a non-blocking one mid-flight.
            self.state = ActuatorState::ExecutingBlocked;
        }

        if !self.state.is_executing() {
            return;
        }

        if !self.position.in_bounds() {
            let error = self.bounds_error(self.position.steps().value());
            self.fail(&error);
            return;
        }

        let Some(directive) = self.task.pop_front() else {
            self.state = ActuatorState::Ready;
            self.sink
                .record(Level::Debug, &format!("{}: done with task", self.name));
            return;
        };

        if let Err(error) = self.execute(directive) {
            self.fail(&error);
        }
    }

    fn execute(&mut self, directive: Directive) -> Result<()> {
        let next = self.position.peek(directive.delta());
        if !self.position.contains(next) {
            return Err(self.bounds_error(next));
        }

        let direction = match directive {
            Directive::Hold => return Ok(()),
            Directive::Forward => Direction::Forward,
            Directive::Backward => Direction::Backward,
        };
        self.driver.one_step(self.wire_direction(direction), self.step_style)?;
        self.position.move_steps(directive.delta());
        Ok(())
    }

    fn wire_direction(&self, direction: Direction) -> Direction {
        if self.reversed {
            direction.reversed()
        } else {
            direction
        }
    }

    fn bounds_error(&self, position: i64) -> Error {
        Error::Execution(ExecutionError::BoundsViolation {
            actuator: self.name.clone(),
            position,
            max_steps: self.position.max_steps(),
        })
    }

    fn fail(&mut self, error: &Error) {
        self.state = ActuatorState::Dead;
        self.task.clear();
        self.sink.record(
            Level::Error,
            &format!("{}: {}; setting state to dead", self.name, error),
        );
    }
}

/// Recover the core from a poisoned lock. A panic mid-tick leaves the
/// position untrustworthy, so the actuator is marked dead.
fn lock(core: &Mutex<Core>) -> MutexGuard<'_, Core> {
    match core.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            let mut guard = poisoned.into_inner();
            if !guard.state.is_dead() {
                guard.state = ActuatorState::Dead;
                guard.task.clear();
                guard.sink.record(
                    Level::Error,
                    &format!("{}: tick panicked; setting state to dead", guard.name),
                );
            }
            guard
        }
    }
}

struct Inner {
    name: heapless::String<32>,
    steps_per_revolution: u16,
    core: Arc<Mutex<Core>>,
    ticker: Ticker,
    sink: Arc<dyn DiagnosticsSink>,
}

/// A single stepper axis driven by its own periodic ticker.
///
/// Cloning yields another handle to the same actuator.
///
/// # Example
///
/// ```rust,ignore
/// let x = Actuator::builder()
///     .name("x_axis")
///     .peak_rpm(6.0)
///     .dist_per_step(0.0156)
///     .max_dist(Distance(16.0))
///     .driver(SimulatedDriver::new())
///     .build()?;
///
/// x.set_task([1, 1, 0, 1], true)?;
/// ```
#[derive(Clone)]
pub struct Actuator {
    inner: Arc<Inner>,
}

impl Actuator {
    /// Start building an actuator.
    pub fn builder() -> ActuatorBuilder {
        ActuatorBuilder::new()
    }

    pub(crate) fn spawn(
        params: ActuatorParams,
        driver: Box<dyn StepDriver>,
        sink: Arc<dyn DiagnosticsSink>,
        start: bool,
    ) -> Result<Self> {
        sink.record(
            Level::Debug,
            &format!(
                "create actuator {} with interval {:?}",
                params.name, params.tick_interval
            ),
        );

        let core = Arc::new(Mutex::new(Core {
            name: params.name.clone(),
            state: ActuatorState::Ready,
            position: Position::new(params.dist_per_step, params.max_steps),
            task: Task::new(),
            blocking: false,
            driver,
            step_style: params.step_style,
            reversed: params.reversed,
            sink: Arc::clone(&sink),
        }));

        let tick_core = Arc::clone(&core);
        let ticker = Ticker::spawn(params.name.as_str(), params.tick_interval, start, move || {
            lock(&tick_core).tick();
        })?;

        Ok(Self {
            inner: Arc::new(Inner {
                name: params.name,
                steps_per_revolution: params.steps_per_revolution,
                core,
                ticker,
                sink,
            }),
        })
    }

    fn core(&self) -> MutexGuard<'_, Core> {
        lock(&self.inner.core)
    }

    /// Get the actuator name.
    #[inline]
    pub fn name(&self) -> &str {
        self.inner.name.as_str()
    }

    /// Assign a task.
    ///
    /// The task replaces whatever is pending and starts on the next tick.
    /// An empty task is accepted and completes immediately.
    ///
    /// # Errors
    ///
    /// Returns a `CommandError` if the actuator is dead, a blocking task is
    /// still executing, or any element is outside `{-1, 0, 1}`.
    pub fn set_task<I>(&self, task: I, blocking: bool) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<i64>,
    {
        let mut core = self.core();

        if core.state.is_dead() {
            core.sink.record(
                Level::Error,
                &format!("cannot set tasks on {} because it is dead", core.name),
            );
            return Err(Error::Command(CommandError::ActuatorDead(core.name.clone())));
        }

        if core.state == ActuatorState::ExecutingBlocked {
            core.sink.record(
                Level::Warn,
                &format!("{}: cannot change task while executing a blocking task", core.name),
            );
            return Err(Error::Command(CommandError::BlockingTaskInProgress(
                core.name.clone(),
            )));
        }

        let task = parse_task(task).map_err(|(index, value)| {
            core.sink.record(
                Level::Error,
                &format!("invalid task provided to actuator {}", core.name),
            );
            Error::Command(CommandError::InvalidTask {
                actuator: core.name.clone(),
                index,
                value,
            })
        })?;

        core.task = task;
        core.blocking = blocking;
        Ok(())
    }

    /// Run one state-machine evaluation on the calling thread.
    ///
    /// The ticker calls this every period; tests and single-threaded hosts
    /// may call it directly on a paused actuator.
    pub fn tick(&self) {
        self.core().tick();
    }

    /// Stop the ticker without touching state or task. Idempotent.
    pub fn pause(&self) {
        self.inner
            .sink
            .record(Level::Trace, &format!("pausing actuator {}", self.name()));
        self.inner.ticker.stop();
    }

    /// Restart the ticker. Idempotent; no effect once dead.
    pub fn unpause(&self) {
        if self.state().is_dead() {
            return;
        }
        self.inner
            .sink
            .record(Level::Trace, &format!("unpausing actuator {}", self.name()));
        self.inner.ticker.restart();
    }

    /// Whether the ticker is stopped.
    pub fn is_paused(&self) -> bool {
        !self.inner.ticker.is_running()
    }

    /// Mark dead, stop the ticker for good and release the coils.
    ///
    /// Irreversible and idempotent. Must not be called from this actuator's
    /// own tick.
    pub fn kill(&self) {
        {
            let mut core = self.core();
            core.state = ActuatorState::Dead;
            core.task.clear();
        }
        self.inner.sink.record(
            Level::Info,
            &format!("killing actuator {} and stopping its ticker", self.name()),
        );

        self.inner.ticker.shutdown();

        let mut core = self.core();
        if let Err(error) = core.driver.release() {
            core.sink.record(
                Level::Error,
                &format!("{}: release failed: {}", core.name, error),
            );
        }
    }

    /// Current state.
    pub fn state(&self) -> ActuatorState {
        self.core().state
    }

    /// Current position in steps.
    pub fn position(&self) -> Steps {
        self.core().position.steps()
    }

    /// Current position as a real distance (`position * dist_per_step`).
    pub fn real_position(&self) -> Distance {
        self.core().position.real()
    }

    /// Steps needed to reach a real target from the current position.
    pub fn steps_to(&self, target: Distance) -> i64 {
        self.core().position.steps_to(target)
    }

    /// Absolute step count of a real target, which may lie outside the travel.
    pub fn target_steps(&self, target: Distance) -> i64 {
        self.core().position.target_steps(target)
    }

    /// Inclusive upper bound in steps.
    pub fn max_steps(&self) -> i64 {
        self.core().position.max_steps()
    }

    /// Distance covered by one step.
    pub fn dist_per_step(&self) -> f64 {
        self.core().position.dist_per_step()
    }

    /// Directives not yet executed.
    pub fn pending_steps(&self) -> usize {
        self.core().task.len()
    }

    /// Whether a new task may be sent: the state is `Ready` or `Executing`
    /// and no accepted blocking task is still waiting for its first tick.
    pub fn is_ready(&self) -> bool {
        let core = self.core();
        core.state.accepts_commands() && !(core.blocking && !core.task.is_empty())
    }

    /// Whether the pending task was submitted as blocking.
    pub fn is_blocking(&self) -> bool {
        self.core().blocking
    }

    /// Current tick period.
    pub fn tick_interval(&self) -> Duration {
        self.inner.ticker.interval()
    }

    /// Change the tick period. Position and task are untouched.
    pub fn set_tick_interval(&self, interval: Duration) {
        self.inner.ticker.set_interval(interval);
    }

    /// Change the peak speed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPeakRpm` unless `rpm` is positive and finite.
    pub fn set_peak_rpm(&self, rpm: f64) -> Result<()> {
        if !(rpm > 0.0 && rpm.is_finite()) {
            return Err(Error::Config(ConfigError::InvalidPeakRpm(rpm)));
        }
        self.set_tick_interval(tick_interval(rpm, self.inner.steps_per_revolution));
        Ok(())
    }

    /// Back up until the boundary sensor reads high, then call that position zero.
    ///
    /// The ticker is stopped for the duration and restored afterwards. One
    /// step is taken every tick period. Any pending task is discarded.
    ///
    /// # Errors
    ///
    /// - `CommandError::ActuatorDead` if the actuator is dead
    /// - `ExecutionError::HomingFailed` if the sensor has not tripped after
    ///   `max_steps + 1` steps; the actuator is then dead
    /// - `ExecutionError::DriverFault` if a step or sensor read fails; the
    ///   actuator is then dead
    pub fn go_to_zero<P, D>(&self, sensor: &mut P, delay: &mut D) -> Result<()>
    where
        P: InputPin,
        D: DelayNs,
    {
        let was_running = self.inner.ticker.is_running();
        self.inner.ticker.stop();

        let result = self.home(sensor, delay);

        if was_running && result.is_ok() {
            self.inner.ticker.restart();
        }
        result
    }

    fn home<P, D>(&self, sensor: &mut P, delay: &mut D) -> Result<()>
    where
        P: InputPin,
        D: DelayNs,
    {
        let pause_ns = u32::try_from(self.tick_interval().as_nanos()).unwrap_or(u32::MAX);
        let mut core = self.core();

        if core.state.is_dead() {
            return Err(Error::Command(CommandError::ActuatorDead(core.name.clone())));
        }
        core.task.clear();
        core.state = ActuatorState::Ready;

        let limit = core.position.max_steps().saturating_add(1);
        let backward = core.wire_direction(Direction::Backward);
        let mut taken: i64 = 0;

        loop {
            let tripped = sensor.is_high().map_err(|_| {
                Error::Execution(ExecutionError::DriverFault(bounded(
                    "boundary sensor read failed",
                )))
            });
            match tripped {
                Ok(true) => break,
                Ok(false) if taken < limit => {}
                Ok(false) => {
                    let error = Error::Execution(ExecutionError::HomingFailed {
                        actuator: core.name.clone(),
                        steps: taken,
                    });
                    core.fail(&error);
                    return Err(error);
                }
                Err(error) => {
                    core.fail(&error);
                    return Err(error);
                }
            }

            let style = core.step_style;
            if let Err(error) = core.driver.one_step(backward, style) {
                core.fail(&error);
                return Err(error);
            }
            taken += 1;
            delay.delay_ns(pause_ns);
        }

        core.position.set_origin();
        core.sink.record(
            Level::Info,
            &format!("{}: zeroed after {} steps", core.name, taken),
        );
        Ok(())
    }
}

impl fmt::Debug for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core();
        f.debug_struct("Actuator")
            .field("name", &core.name)
            .field("state", &core.state)
            .field("position", &core.position.steps())
            .field("pending", &core.task.len())
            .finish()
    }
}
