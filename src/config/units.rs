//! Unit types for physical quantities.
//!
//! Keeps step counts and real-world distances apart so a distance is never
//! handed to something expecting steps.

use serde::Deserialize;

/// Real-world distance along an axis (same unit as the pattern files).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct Distance(pub f64);

impl Distance {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }
}

/// Actuator position in steps (absolute from the zero end of travel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Steps(pub i64);

impl Steps {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Convert to a distance using the distance covered by one step.
    #[inline]
    pub fn to_distance(self, dist_per_step: f64) -> Distance {
        Distance(self.0 as f64 * dist_per_step)
    }

    /// Nearest whole step count for a distance.
    #[inline]
    pub fn from_distance(distance: Distance, dist_per_step: f64) -> Self {
        Self((distance.0 / dist_per_step).round() as i64)
    }
}
