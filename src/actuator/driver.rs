//! Step driver capability.
//!
//! An actuator only ever asks its driver for one step at a time and to
//! release the coils. `PinStepDriver` does that over embedded-hal 1.0 pins;
//! `SimulatedDriver` records the calls for tests and dry runs.

use std::sync::{Arc, Mutex, PoisonError};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use serde::Deserialize;

use crate::error::{bounded, Error, ExecutionError, Result};

/// Direction of a single step, after any axis reversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Away from the zero end.
    Forward,
    /// Toward the zero end.
    Backward,
}

impl Direction {
    /// The opposite direction.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// Coil energising pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStyle {
    /// One coil at a time.
    #[default]
    Single,
    /// Two coils at a time (more torque).
    Double,
    /// Alternating single and double (half steps).
    Interleave,
    /// Microstepping.
    Microstep,
}

/// Hardware capability used by an actuator.
pub trait StepDriver: Send {
    /// Advance the physical axis by one unit in `direction`.
    fn one_step(&mut self, direction: Direction, style: StepStyle) -> Result<()>;

    /// De-energise the coils.
    fn release(&mut self) -> Result<()>;
}

impl<D: StepDriver + ?Sized> StepDriver for Box<D> {
    fn one_step(&mut self, direction: Direction, style: StepStyle) -> Result<()> {
        (**self).one_step(direction, style)
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}

fn pin_fault(what: &str) -> Error {
    Error::Execution(ExecutionError::DriverFault(bounded(what)))
}

/// STEP/DIR driver chip (A4988, DRV8825, TMC2208 ...) on embedded-hal pins.
///
/// Generic over:
/// - `STEP`: STEP pin type (must implement `OutputPin`)
/// - `DIR`: DIR pin type (must implement `OutputPin`)
/// - `EN`: active-low ENABLE pin type (must implement `OutputPin`)
/// - `DELAY`: Delay provider for the pulse width (must implement `DelayNs`)
///
/// These chips set their step mode through hardware straps, so the
/// requested [`StepStyle`] does not change the pulse.
pub struct PinStepDriver<STEP, DIR, EN, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    DELAY: DelayNs,
{
    step_pin: STEP,
    dir_pin: DIR,
    enable_pin: EN,
    delay: DELAY,
    /// Cached to avoid unnecessary DIR writes.
    current_direction: Option<Direction>,
    enabled: bool,
    pulse_width_us: u32,
}

impl<STEP, DIR, EN, DELAY> PinStepDriver<STEP, DIR, EN, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    DELAY: DelayNs,
{
    /// Create a driver. Coils stay released until the first step.
    pub fn new(step_pin: STEP, dir_pin: DIR, enable_pin: EN, delay: DELAY) -> Self {
        Self {
            step_pin,
            dir_pin,
            enable_pin,
            delay,
            current_direction: None,
            enabled: false,
            pulse_width_us: 2,
        }
    }

    /// Set the STEP pulse width (typically 1-10 microseconds is sufficient).
    pub fn with_pulse_width_us(mut self, pulse_width_us: u32) -> Self {
        self.pulse_width_us = pulse_width_us;
        self
    }

    /// Give the pins and delay back.
    pub fn into_inner(self) -> (STEP, DIR, EN, DELAY) {
        (self.step_pin, self.dir_pin, self.enable_pin, self.delay)
    }

    fn enable(&mut self) -> Result<()> {
        if !self.enabled {
            self.enable_pin
                .set_low()
                .map_err(|_| pin_fault("ENABLE pin write failed"))?;
            self.enabled = true;
        }
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<()> {
        if self.current_direction == Some(direction) {
            return Ok(());
        }

        match direction {
            Direction::Forward => self.dir_pin.set_high(),
            Direction::Backward => self.dir_pin.set_low(),
        }
        .map_err(|_| pin_fault("DIR pin write failed"))?;

        self.current_direction = Some(direction);
        Ok(())
    }
}

impl<STEP, DIR, EN, DELAY> StepDriver for PinStepDriver<STEP, DIR, EN, DELAY>
where
    STEP: OutputPin + Send,
    DIR: OutputPin + Send,
    EN: OutputPin + Send,
    DELAY: DelayNs + Send,
{
    fn one_step(&mut self, direction: Direction, _style: StepStyle) -> Result<()> {
        self.enable()?;
        self.set_direction(direction)?;

        self.step_pin
            .set_high()
            .map_err(|_| pin_fault("STEP pin write failed"))?;
        self.delay.delay_us(self.pulse_width_us);
        self.step_pin
            .set_low()
            .map_err(|_| pin_fault("STEP pin write failed"))?;

        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.enable_pin
            .set_high()
            .map_err(|_| pin_fault("ENABLE pin write failed"))?;
        self.enabled = false;
        Ok(())
    }
}

/// Number of recent steps a [`SimulatedDriver`] keeps.
pub const SIMULATION_HISTORY: usize = 64;

/// Calls seen by a [`SimulatedDriver`].
///
/// Step totals are counters, so a long dry run stays small; only the last
/// [`SIMULATION_HISTORY`] steps are kept in full.
#[derive(Debug, Clone, Default)]
pub struct SimulationLog {
    /// Most recent steps, oldest first.
    pub recent: heapless::Deque<(Direction, StepStyle), SIMULATION_HISTORY>,
    /// Forward steps taken.
    pub forward: u64,
    /// Backward steps taken.
    pub backward: u64,
    /// Number of `release` calls.
    pub releases: usize,
}

impl SimulationLog {
    /// Total steps taken in either direction.
    pub fn step_count(&self) -> u64 {
        self.forward + self.backward
    }

    /// Forward steps minus backward steps.
    pub fn net_steps(&self) -> i64 {
        self.forward as i64 - self.backward as i64
    }

    fn record(&mut self, direction: Direction, style: StepStyle) {
        match direction {
            Direction::Forward => self.forward += 1,
            Direction::Backward => self.backward += 1,
        }
        if self.recent.is_full() {
            self.recent.pop_front();
        }
        // Room was made above.
        let _ = self.recent.push_back((direction, style));
    }
}

/// Driver with no hardware behind it.
///
/// Clones share one log, so a test can keep a clone as a probe after
/// handing the driver to an actuator.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDriver {
    log: Arc<Mutex<SimulationLog>>,
    fail_after: Option<usize>,
}

impl SimulatedDriver {
    /// Create a driver that never fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a driver whose step number `steps + 1` fails.
    pub fn failing_after(steps: usize) -> Self {
        Self {
            log: Arc::default(),
            fail_after: Some(steps),
        }
    }

    /// Snapshot of the calls so far.
    pub fn log(&self) -> SimulationLog {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StepDriver for SimulatedDriver {
    fn one_step(&mut self, direction: Direction, style: StepStyle) -> Result<()> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        if self.fail_after.is_some_and(|limit| log.step_count() >= limit as u64) {
            return Err(pin_fault("simulated step failure"));
        }
        log.record(direction, style);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .releases += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    #[test]
    fn test_pin_driver_pulses_and_caches_direction() {
        let mut step = PinMock::new(&[
            Transaction::set(State::High),
            Transaction::set(State::Low),
            Transaction::set(State::High),
            Transaction::set(State::Low),
            Transaction::set(State::High),
            Transaction::set(State::Low),
        ]);
        // DIR written once per change only
        let mut dir = PinMock::new(&[Transaction::set(State::High), Transaction::set(State::Low)]);
        // Enabled once, released once
        let mut enable = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);

        let mut driver =
            PinStepDriver::new(step.clone(), dir.clone(), enable.clone(), NoopDelay::new());
        driver.one_step(Direction::Forward, StepStyle::Single).unwrap();
        driver.one_step(Direction::Forward, StepStyle::Double).unwrap();
        driver.one_step(Direction::Backward, StepStyle::Single).unwrap();
        driver.release().unwrap();
        drop(driver);

        step.done();
        dir.done();
        enable.done();
    }

    #[test]
    fn test_simulated_driver_logs_and_fails_on_demand() {
        let mut driver = SimulatedDriver::failing_after(2);
        let probe = driver.clone();

        driver.one_step(Direction::Forward, StepStyle::Single).unwrap();
        driver.one_step(Direction::Backward, StepStyle::Microstep).unwrap();
        assert!(driver.one_step(Direction::Forward, StepStyle::Single).is_err());
        driver.release().unwrap();

        let log = probe.log();
        assert_eq!(log.step_count(), 2);
        assert_eq!(log.net_steps(), 0);
        assert_eq!(log.releases, 1);
        assert_eq!(log.recent.back(), Some(&(Direction::Backward, StepStyle::Microstep)));
    }

    #[test]
    fn test_simulated_history_is_bounded() {
        let mut driver = SimulatedDriver::new();
        let probe = driver.clone();

        for _ in 0..SIMULATION_HISTORY * 3 {
            driver.one_step(Direction::Forward, StepStyle::Single).unwrap();
        }
        driver.one_step(Direction::Backward, StepStyle::Double).unwrap();

        let log = probe.log();
        assert_eq!(log.step_count(), (SIMULATION_HISTORY * 3 + 1) as u64);
        assert_eq!(log.net_steps(), (SIMULATION_HISTORY * 3 - 1) as i64);
        assert_eq!(log.recent.len(), SIMULATION_HISTORY);
        assert_eq!(log.recent.back(), Some(&(Direction::Backward, StepStyle::Double)));
    }

    #[test]
    fn test_direction_reversal() {
        assert_eq!(Direction::Forward.reversed(), Direction::Backward);
        assert_eq!(Direction::Backward.reversed().reversed(), Direction::Backward);
    }
}
