//! Stage configuration from TOML.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::stage::StageLayout;

/// Sequencer period, cookie layout and pattern location.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Period of the sequencer tick in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Carriage x coordinate of the first cookie slot.
    #[serde(default)]
    pub x_shift: f64,

    /// Distance between cookie slots along x.
    #[serde(default = "default_spacing")]
    pub x_spacing: f64,

    /// Carriage y coordinate of the first cookie slot.
    #[serde(default)]
    pub y_shift: f64,

    /// Distance between cookie slots along y.
    #[serde(default = "default_spacing")]
    pub y_spacing: f64,

    /// Directory holding the pattern files.
    #[serde(default = "default_pattern_dir")]
    pub pattern_dir: PathBuf,
}

fn default_tick_interval_ms() -> u64 {
    50
}

fn default_spacing() -> f64 {
    10.0
}

fn default_pattern_dir() -> PathBuf {
    PathBuf::from("icing_patterns")
}

impl StageConfig {
    /// Sequencer tick period.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Coordinate offset constants for cookie slots.
    pub fn layout(&self) -> StageLayout {
        StageLayout {
            x_shift: self.x_shift,
            x_spacing: self.x_spacing,
            y_shift: self.y_shift,
            y_spacing: self.y_spacing,
        }
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            x_shift: 0.0,
            x_spacing: default_spacing(),
            y_shift: 0.0,
            y_spacing: default_spacing(),
            pattern_dir: default_pattern_dir(),
        }
    }
}
