//! Builder pattern for Stage.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use heapless::FnvIndexMap;

use crate::actuator::{Actuator, StepDriver};
use crate::config::{SystemConfig, NOZZLE, PLATFORM, X_AXIS, Y_AXIS};
use crate::diagnostics::{default_sink, DiagnosticsSink};
use crate::error::{bounded, ConfigError, Error, Result};
use crate::group::{ActuatorGroup, Carriage, GroupId, Toggle};

use super::recipe::{Pattern, PatternLibrary};
use super::sequencer::{Stage, StageCore, StageLayout};
use super::step::MAX_GROUPS;

/// Builder for creating Stage instances.
pub struct StageBuilder {
    groups: FnvIndexMap<GroupId, Box<dyn ActuatorGroup>, MAX_GROUPS>,
    layout: StageLayout,
    patterns: PatternLibrary,
    tick_interval: Duration,
    sink: Option<Arc<dyn DiagnosticsSink>>,
}

impl Default for StageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StageBuilder {
    /// Create a new builder with no groups.
    pub fn new() -> Self {
        Self {
            groups: FnvIndexMap::new(),
            layout: StageLayout::default(),
            patterns: PatternLibrary::default(),
            tick_interval: Duration::from_millis(50),
            sink: None,
        }
    }

    /// Install a group under `id`, replacing any previous one.
    pub fn group<G: ActuatorGroup + 'static>(mut self, id: GroupId, group: G) -> Self {
        // One slot per GroupId fits in MAX_GROUPS.
        let _ = self.groups.insert(id, Box::new(group));
        self
    }

    /// Set the cookie slot layout.
    pub fn layout(mut self, layout: StageLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set where pattern files are found.
    pub fn patterns(mut self, patterns: PatternLibrary) -> Self {
        self.patterns = patterns;
        self
    }

    /// Shorthand for a [`PatternLibrary`] rooted at `dir` with no overrides.
    pub fn pattern_dir<P: Into<PathBuf>>(self, dir: P) -> Self {
        self.patterns(PatternLibrary::new(dir))
    }

    /// Use `path` for one pattern.
    pub fn pattern_path<P: Into<PathBuf>>(mut self, pattern: Pattern, path: P) -> Self {
        self.patterns = self.patterns.with_override(pattern, path);
        self
    }

    /// Set the sequencer period.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the diagnostics sink (defaults to [`TracingSink`](crate::diagnostics::TracingSink)).
    pub fn sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the four stage actuators and their groups from configuration.
    ///
    /// `driver` is called once per actuator name (`x_axis`, `y_axis`,
    /// `platform`, `nozzle`). Actuators start paused; [`Stage::start`]
    /// unpauses them.
    ///
    /// # Errors
    ///
    /// Returns an error if an actuator entry is missing or cannot be built.
    pub fn from_config<F>(mut self, config: &SystemConfig, mut driver: F) -> Result<Self>
    where
        F: FnMut(&str) -> Box<dyn StepDriver>,
    {
        let sink = self.sink.clone().unwrap_or_else(default_sink);
        let mut build = |name: &str| -> Result<Actuator> {
            let actuator_config = config.actuator(name).ok_or_else(|| {
                Error::Config(ConfigError::ActuatorNotFound(bounded(name)))
            })?;
            Actuator::builder()
                .from_config(name, actuator_config)
                .driver(driver(name))
                .sink(Arc::clone(&sink))
                .start_paused(true)
                .build()
        };

        let carriage = Carriage::new(build(X_AXIS)?, build(Y_AXIS)?, Arc::clone(&sink));
        let platform = Toggle::new(PLATFORM, build(PLATFORM)?, true, Arc::clone(&sink));
        let nozzle = Toggle::new(NOZZLE, build(NOZZLE)?, false, Arc::clone(&sink));

        self.layout = config.stage.layout();
        self.patterns = config.pattern_library();
        self.tick_interval = config.stage.tick_interval();
        self.sink = Some(sink);

        Ok(self
            .group(GroupId::Carriage, carriage)
            .group(GroupId::Platform, platform)
            .group(GroupId::Nozzle, nozzle))
    }

    /// Build the stage. The sequencer ticker starts stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequencer period is zero or the ticker thread
    /// cannot be spawned.
    pub fn build(self) -> Result<Stage> {
        if self.tick_interval.is_zero() {
            return Err(Error::Config(ConfigError::InvalidTickInterval(0)));
        }

        let sink = self.sink.unwrap_or_else(default_sink);
        let core = StageCore::new(self.groups, self.layout, self.patterns, Arc::clone(&sink));
        Stage::spawn(core, self.tick_interval, sink)
    }
}

impl Stage {
    /// Build a complete stage from configuration.
    ///
    /// # Errors
    ///
    /// See [`StageBuilder::from_config`] and [`StageBuilder::build`].
    pub fn from_config<F>(
        config: &SystemConfig,
        driver: F,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Result<Self>
    where
        F: FnMut(&str) -> Box<dyn StepDriver>,
    {
        StageBuilder::new()
            .sink(sink)
            .from_config(config, driver)?
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::SimulatedDriver;
    use crate::config::parse_config;
    use crate::diagnostics::NullSink;

    const CONFIG: &str = r#"
[actuators.x_axis]
peak_rpm = 60.0
dist_per_step = 0.5
max_dist = 20.0

[actuators.y_axis]
peak_rpm = 60.0
dist_per_step = 0.5
max_dist = 20.0

[actuators.platform]
peak_rpm = 60.0
dist_per_step = 1.0
max_dist = 3.0

[actuators.nozzle]
peak_rpm = 60.0
dist_per_step = 1.0
max_dist = 2.0

[stage]
tick_interval_ms = 5
"#;

    #[test]
    fn test_from_config_installs_three_groups() {
        let config = parse_config(CONFIG).unwrap();
        let mut names = Vec::new();
        let stage = Stage::from_config(
            &config,
            |name| {
                names.push(name.to_owned());
                Box::new(SimulatedDriver::new())
            },
            Arc::new(NullSink),
        )
        .unwrap();

        assert_eq!(names, vec!["x_axis", "y_axis", "platform", "nozzle"]);
        assert_eq!(
            stage.groups(),
            vec![GroupId::Carriage, GroupId::Platform, GroupId::Nozzle]
        );
        assert!(stage.is_live());
        assert!(!stage.is_running());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = StageBuilder::new().tick_interval(Duration::ZERO).build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidTickInterval(0)))
        ));
    }
}
