//! Builder pattern for Actuator.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{max_steps, tick_interval, ActuatorConfig, Distance};
use crate::diagnostics::{default_sink, DiagnosticsSink};
use crate::error::{bounded, ConfigError, Error, Result};

use super::driver::{StepDriver, StepStyle};
use super::stepper::{Actuator, ActuatorParams};

/// Builder for creating Actuator instances.
pub struct ActuatorBuilder {
    name: Option<heapless::String<32>>,
    steps_per_revolution: u16,
    peak_rpm: f64,
    tick_interval: Option<Duration>,
    dist_per_step: f64,
    max_steps: i64,
    step_style: StepStyle,
    reversed: bool,
    driver: Option<Box<dyn StepDriver>>,
    sink: Option<Arc<dyn DiagnosticsSink>>,
    start_paused: bool,
}

impl Default for ActuatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            name: None,
            steps_per_revolution: 200,
            peak_rpm: 30.0,
            tick_interval: None,
            dist_per_step: 1.0,
            max_steps: i64::MAX,
            step_style: StepStyle::Single,
            reversed: false,
            driver: None,
            sink: None,
            start_paused: false,
        }
    }

    /// Set the actuator name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(bounded(name));
        self
    }

    /// Set full steps per motor revolution.
    pub fn steps_per_revolution(mut self, steps: u16) -> Self {
        self.steps_per_revolution = steps;
        self
    }

    /// Set the peak speed; the tick period is one step at this speed.
    pub fn peak_rpm(mut self, rpm: f64) -> Self {
        self.peak_rpm = rpm;
        self
    }

    /// Set the tick period directly, overriding `peak_rpm`.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Set the distance covered by one step.
    pub fn dist_per_step(mut self, dist: f64) -> Self {
        self.dist_per_step = dist;
        self
    }

    /// Set the travel length; the bound becomes `floor(max_dist / dist_per_step)`.
    ///
    /// Call after [`dist_per_step`](Self::dist_per_step).
    pub fn max_dist(mut self, max_dist: Distance) -> Self {
        self.max_steps = max_steps(max_dist, self.dist_per_step);
        self
    }

    /// Set the upper bound in steps directly.
    pub fn max_steps(mut self, steps: i64) -> Self {
        self.max_steps = steps;
        self
    }

    /// Set the step style passed to the driver.
    pub fn step_style(mut self, style: StepStyle) -> Self {
        self.step_style = style;
        self
    }

    /// Swap forward and backward.
    pub fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    /// Set the step driver.
    pub fn driver<D: StepDriver + 'static>(mut self, driver: D) -> Self {
        self.driver = Some(Box::new(driver));
        self
    }

    /// Set the diagnostics sink (defaults to [`TracingSink`](crate::diagnostics::TracingSink)).
    pub fn sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Keep the ticker stopped until `unpause` is called.
    pub fn start_paused(mut self, paused: bool) -> Self {
        self.start_paused = paused;
        self
    }

    /// Configure from an actuator config entry.
    pub fn from_config(mut self, name: &str, config: &ActuatorConfig) -> Self {
        self.name = Some(bounded(name));
        self.steps_per_revolution = config.steps_per_revolution;
        self.peak_rpm = config.peak_rpm;
        self.tick_interval = None;
        self.dist_per_step = config.dist_per_step;
        self.max_steps = config.max_steps();
        self.step_style = config.step_style;
        self.reversed = config.reversed;
        self
    }

    /// Build the actuator and start its ticker (unless `start_paused`).
    ///
    /// # Errors
    ///
    /// Returns an error if no driver was given, a parameter is out of range,
    /// or the ticker thread cannot be spawned.
    pub fn build(self) -> Result<Actuator> {
        let driver = self
            .driver
            .ok_or(Error::Config(ConfigError::MissingField("driver")))?;

        if !(self.dist_per_step > 0.0 && self.dist_per_step.is_finite()) {
            return Err(Error::Config(ConfigError::InvalidDistPerStep(self.dist_per_step)));
        }

        if self.steps_per_revolution == 0 {
            return Err(Error::Config(ConfigError::InvalidStepsPerRevolution(
                self.steps_per_revolution,
            )));
        }

        let interval = match self.tick_interval {
            Some(interval) => interval,
            None => {
                if !(self.peak_rpm > 0.0 && self.peak_rpm.is_finite()) {
                    return Err(Error::Config(ConfigError::InvalidPeakRpm(self.peak_rpm)));
                }
                tick_interval(self.peak_rpm, self.steps_per_revolution)
            }
        };

        let params = ActuatorParams {
            name: self.name.unwrap_or_else(|| bounded("actuator")),
            tick_interval: interval,
            steps_per_revolution: self.steps_per_revolution,
            dist_per_step: self.dist_per_step,
            max_steps: self.max_steps.max(0),
            step_style: self.step_style,
            reversed: self.reversed,
        };

        Actuator::spawn(
            params,
            driver,
            self.sink.unwrap_or_else(default_sink),
            !self.start_paused,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::SimulatedDriver;

    #[test]
    fn test_missing_driver() {
        let result = ActuatorBuilder::new().name("x").build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::MissingField("driver")))
        ));
    }

    #[test]
    fn test_bounds_from_distance() {
        let actuator = ActuatorBuilder::new()
            .name("platform")
            .dist_per_step(0.25)
            .max_dist(Distance(3.0))
            .driver(SimulatedDriver::new())
            .start_paused(true)
            .build()
            .unwrap();

        assert_eq!(actuator.max_steps(), 12);
        assert!(actuator.is_paused());
    }

    #[test]
    fn test_interval_from_peak_rpm() {
        let actuator = ActuatorBuilder::new()
            .peak_rpm(60.0)
            .steps_per_revolution(100)
            .driver(SimulatedDriver::new())
            .start_paused(true)
            .build()
            .unwrap();

        // 60 rpm * 100 steps = 100 steps/sec
        assert!((actuator.tick_interval().as_secs_f64() - 0.01).abs() < 1e-9);
        assert_eq!(actuator.name(), "actuator");
    }

    #[test]
    fn test_rejects_zero_rpm() {
        let result = ActuatorBuilder::new()
            .peak_rpm(0.0)
            .driver(SimulatedDriver::new())
            .build();
        assert!(matches!(result, Err(Error::Config(ConfigError::InvalidPeakRpm(_)))));
    }
}
