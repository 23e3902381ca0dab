//! Position tracking for actuators.
//!
//! Provides absolute position in steps, travel bounds and unit conversions.

use crate::config::units::{Distance, Steps};

/// Actuator position tracker.
///
/// Maintains absolute position in steps inside `[0, max_steps]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    /// Current position in steps (from the zero end)
    steps: Steps,
    /// Distance covered by one step
    dist_per_step: f64,
    /// Inclusive upper bound in steps
    max_steps: i64,
}

impl Position {
    /// Create a new position tracker at zero.
    #[inline]
    pub fn new(dist_per_step: f64, max_steps: i64) -> Self {
        Self {
            steps: Steps::default(),
            dist_per_step,
            max_steps,
        }
    }

    /// Get current position in steps.
    #[inline]
    pub fn steps(&self) -> Steps {
        self.steps
    }

    /// Get current position as a real distance.
    #[inline]
    pub fn real(&self) -> Distance {
        self.steps.to_distance(self.dist_per_step)
    }

    /// Distance covered by one step.
    #[inline]
    pub fn dist_per_step(&self) -> f64 {
        self.dist_per_step
    }

    /// Inclusive upper bound in steps.
    #[inline]
    pub fn max_steps(&self) -> i64 {
        self.max_steps
    }

    /// Whether `steps` lies within `[0, max_steps]`.
    #[inline]
    pub fn contains(&self, steps: i64) -> bool {
        (0..=self.max_steps).contains(&steps)
    }

    /// Whether the current position is within bounds.
    #[inline]
    pub fn in_bounds(&self) -> bool {
        self.contains(self.steps.0)
    }

    /// Position after moving `delta` steps, without moving.
    #[inline]
    pub fn peek(&self, delta: i64) -> i64 {
        self.steps.0.saturating_add(delta)
    }

    /// Move by a number of steps.
    #[inline]
    pub fn move_steps(&mut self, delta: i64) {
        self.steps = Steps(self.steps.0.saturating_add(delta));
    }

    /// Set current position as the new origin.
    #[inline]
    pub fn set_origin(&mut self) {
        self.steps = Steps::default();
    }

    /// Absolute step count of a real target, rounded to the nearest step.
    #[inline]
    pub fn target_steps(&self, target: Distance) -> i64 {
        Steps::from_distance(target, self.dist_per_step).0
    }

    /// Steps needed to reach a real target, rounded to the nearest step.
    #[inline]
    pub fn steps_to(&self, target: Distance) -> i64 {
        self.target_steps(target).saturating_sub(self.steps.0)
    }
}
