//! Example: run a two-cookie recipe on simulated hardware.
//!
//! This example demonstrates how to:
//! - Load the stage configuration from TOML
//! - Bind a step driver to each actuator (embedded-hal pins for x, simulated
//!   drivers for the rest)
//! - Load a recipe, start the sequencer and wait for it to finish
//!
//! Run with: `RUST_LOG=icing_stage=debug cargo run --example stage_sim`

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use icing_stage::{
    diagnostics::default_sink, parse_config, CookieSpec, Pattern, PinStepDriver, Recipe,
    SimulatedDriver, Stage, StepDriver,
};
use tracing_subscriber::EnvFilter;

/// Output pin that only remembers its level.
struct MockPin {
    state: bool,
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.state = true;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.state = false;
        Ok(())
    }
}

/// Busy-free delay backed by the OS scheduler.
struct SleepDelay;

impl embedded_hal::delay::DelayNs for SleepDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

const CONFIG: &str = r#"
[actuators.x_axis]
peak_rpm = 120.0
dist_per_step = 0.05
max_dist = 16.0

[actuators.y_axis]
peak_rpm = 120.0
dist_per_step = 0.05
max_dist = 16.0

[actuators.platform]
peak_rpm = 300.0
dist_per_step = 0.1
max_dist = 3.0
step_style = "double"

[actuators.nozzle]
peak_rpm = 60.0
dist_per_step = 0.1
max_dist = 1.0

[stage]
tick_interval_ms = 10
x_shift = 1.0
x_spacing = 5.0
y_shift = 1.0
y_spacing = 5.0
"#;

fn main() {
    let filter = EnvFilter::from_default_env()
        .add_directive("icing_stage=info".parse().expect("valid directive"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();

    let mut config = parse_config(CONFIG).expect("Failed to parse config");
    config.stage.pattern_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/patterns").into();

    let mut probes: HashMap<String, SimulatedDriver> = HashMap::new();
    let stage = Stage::from_config(
        &config,
        |name| -> Box<dyn StepDriver> {
            if name == "x_axis" {
                let pin = || MockPin { state: false };
                Box::new(PinStepDriver::new(pin(), pin(), pin(), SleepDelay))
            } else {
                let driver = SimulatedDriver::new();
                probes.insert(name.to_owned(), driver.clone());
                Box::new(driver)
            }
        },
        default_sink(),
    )
    .expect("Failed to build stage");

    let mut recipe = Recipe::new();
    recipe.add_cookie(CookieSpec::new(Pattern::Square), (0, 0));
    recipe.add_cookie(CookieSpec::new(Pattern::SpiralSquare), (1, 0));

    let steps = stage.load_recipe(&recipe).expect("Failed to load recipe");
    println!("Loaded {} cookies as {} steps", recipe.len(), steps);

    let started = Instant::now();
    stage.start();
    while stage.is_live() && !stage.recipe_done() {
        thread::sleep(Duration::from_millis(250));
        println!("progress: {:>5.1}%", stage.progress() * 100.0);
    }

    if stage.is_live() {
        println!("Recipe finished in {:.1} s", started.elapsed().as_secs_f64());
    } else {
        println!("Stage halted; see the log for the failing actuator");
    }

    stage.shutdown();

    for (name, probe) in &probes {
        let log = probe.log();
        println!("{:>8}: {} steps, net {}", name, log.step_count(), log.net_steps());
    }
}
