//! Actuator configuration from TOML.

use std::time::Duration;

use serde::Deserialize;

use crate::actuator::StepStyle;

use super::units::Distance;

/// Complete actuator configuration from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ActuatorConfig {
    /// Full steps per motor revolution (typically 200 for 1.8° motors).
    #[serde(default = "default_steps_per_revolution")]
    pub steps_per_revolution: u16,

    /// Highest speed the axis is driven at, in revolutions per minute.
    pub peak_rpm: f64,

    /// Distance covered by one step.
    pub dist_per_step: f64,

    /// Length of travel from the zero end.
    pub max_dist: Distance,

    /// Coil energising pattern used for every step.
    #[serde(default)]
    pub step_style: StepStyle,

    /// Swap forward and backward.
    #[serde(default)]
    pub reversed: bool,
}

fn default_steps_per_revolution() -> u16 {
    200
}

impl ActuatorConfig {
    /// Period between ticks at peak speed.
    pub fn tick_interval(&self) -> Duration {
        tick_interval(self.peak_rpm, self.steps_per_revolution)
    }

    /// Upper travel bound in whole steps.
    pub fn max_steps(&self) -> i64 {
        max_steps(self.max_dist, self.dist_per_step)
    }
}

/// One step per tick at `peak_rpm`: `60 / (rpm * steps_per_revolution)` seconds.
pub fn tick_interval(peak_rpm: f64, steps_per_revolution: u16) -> Duration {
    let steps_per_sec = peak_rpm * f64::from(steps_per_revolution) / 60.0;
    if steps_per_sec > 0.0 && steps_per_sec.is_finite() {
        Duration::from_secs_f64(1.0 / steps_per_sec)
    } else {
        Duration::MAX
    }
}

/// Whole steps that fit in `max_dist`; unbounded travel saturates.
pub fn max_steps(max_dist: Distance, dist_per_step: f64) -> i64 {
    if dist_per_step <= 0.0 {
        return 0;
    }
    // Tolerate representation error so 3.0 / 0.00025 is 12000, not 11999.
    let steps = (max_dist.0 / dist_per_step + 1e-9).floor();
    if steps >= i64::MAX as f64 {
        i64::MAX
    } else if steps <= 0.0 {
        0
    } else {
        steps as i64
    }
}
