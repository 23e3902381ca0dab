//! System configuration - root configuration structure.

use std::path::PathBuf;

use heapless::{FnvIndexMap, String};
use serde::Deserialize;

use crate::stage::{Pattern, PatternLibrary};

use super::actuator::ActuatorConfig;
use super::stage::StageConfig;

/// Name of the carriage x actuator.
pub const X_AXIS: &str = "x_axis";
/// Name of the carriage y actuator.
pub const Y_AXIS: &str = "y_axis";
/// Name of the platform lift actuator.
pub const PLATFORM: &str = "platform";
/// Name of the dispensing nozzle actuator.
pub const NOZZLE: &str = "nozzle";

/// Actuators a complete stage needs.
pub const STAGE_ACTUATORS: [&str; 4] = [X_AXIS, Y_AXIS, PLATFORM, NOZZLE];

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Named actuator configurations.
    pub actuators: FnvIndexMap<String<32>, ActuatorConfig, 8>,

    /// Sequencer and layout settings.
    #[serde(default)]
    pub stage: StageConfig,

    /// Per-pattern file overrides.
    #[serde(default)]
    pub patterns: FnvIndexMap<Pattern, PathBuf, 8>,
}

impl SystemConfig {
    /// Get an actuator configuration by name.
    pub fn actuator(&self, name: &str) -> Option<&ActuatorConfig> {
        self.actuators
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// List all actuator names.
    pub fn actuator_names(&self) -> impl Iterator<Item = &str> {
        self.actuators.keys().map(|s| s.as_str())
    }

    /// Pattern directory plus any per-pattern overrides.
    pub fn pattern_library(&self) -> PatternLibrary {
        self.patterns
            .iter()
            .fold(PatternLibrary::new(&self.stage.pattern_dir), |library, (pattern, path)| {
                library.with_override(*pattern, path)
            })
    }

    /// File holding `pattern`: the override if one is configured, else
    /// `<pattern_dir>/<pattern>.txt`.
    pub fn pattern_path(&self, pattern: Pattern) -> PathBuf {
        self.pattern_library().path(pattern)
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            actuators: FnvIndexMap::new(),
            stage: StageConfig::default(),
            patterns: FnvIndexMap::new(),
        }
    }
}
