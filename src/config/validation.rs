//! Configuration validation.

use crate::error::{bounded, ConfigError, Error, Result};

use super::system::STAGE_ACTUATORS;
use super::{ActuatorConfig, SystemConfig};

/// Validate a system configuration.
///
/// Checks:
/// - Every actuator has positive speed, scale and steps per revolution
/// - Travel lengths are finite and non-negative
/// - The sequencer period is positive
/// - The four stage actuators are present
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    for (_, actuator) in config.actuators.iter() {
        validate_actuator(actuator)?;
    }

    if config.stage.tick_interval_ms == 0 {
        return Err(Error::Config(ConfigError::InvalidTickInterval(
            config.stage.tick_interval_ms,
        )));
    }

    for name in STAGE_ACTUATORS {
        if config.actuator(name).is_none() {
            return Err(Error::Config(ConfigError::ActuatorNotFound(bounded(name))));
        }
    }

    Ok(())
}

/// Validate one actuator entry.
pub fn validate_actuator(config: &ActuatorConfig) -> Result<()> {
    if !(config.peak_rpm > 0.0 && config.peak_rpm.is_finite()) {
        return Err(Error::Config(ConfigError::InvalidPeakRpm(config.peak_rpm)));
    }

    if !(config.dist_per_step > 0.0 && config.dist_per_step.is_finite()) {
        return Err(Error::Config(ConfigError::InvalidDistPerStep(
            config.dist_per_step,
        )));
    }

    if !(config.max_dist.0 >= 0.0 && config.max_dist.0.is_finite()) {
        return Err(Error::Config(ConfigError::InvalidMaxDist(config.max_dist.0)));
    }

    if config.steps_per_revolution == 0 {
        return Err(Error::Config(ConfigError::InvalidStepsPerRevolution(
            config.steps_per_revolution,
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::StepStyle;
    use crate::config::units::Distance;

    fn make_test_config() -> ActuatorConfig {
        ActuatorConfig {
            steps_per_revolution: 200,
            peak_rpm: 6.0,
            dist_per_step: 0.0156,
            max_dist: Distance(16.0),
            step_style: StepStyle::Single,
            reversed: false,
        }
    }

    #[test]
    fn test_valid_actuator() {
        assert!(validate_actuator(&make_test_config()).is_ok());
    }

    #[test]
    fn test_invalid_dist_per_step() {
        let mut config = make_test_config();
        config.dist_per_step = 0.0;

        let result = validate_actuator(&config);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidDistPerStep(_)))
        ));
    }

    #[test]
    fn test_invalid_peak_rpm() {
        let mut config = make_test_config();
        config.peak_rpm = -3.0;

        assert!(matches!(
            validate_actuator(&config),
            Err(Error::Config(ConfigError::InvalidPeakRpm(_)))
        ));
    }

    #[test]
    fn test_unbounded_travel_rejected() {
        let mut config = make_test_config();
        config.max_dist = Distance(f64::INFINITY);

        assert!(matches!(
            validate_actuator(&config),
            Err(Error::Config(ConfigError::InvalidMaxDist(_)))
        ));
    }
}
