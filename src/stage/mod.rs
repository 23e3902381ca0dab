//! Stage module for icing-stage.
//!
//! Provides the step sequencer, recipes and the pattern file parser.

mod builder;
mod pattern;
mod recipe;
mod sequencer;
mod step;

pub use builder::StageBuilder;
pub use pattern::{load_pattern, parse_frame, parse_pattern};
pub use recipe::{CookieSpec, GridPos, Pattern, PatternLibrary, Recipe};
pub use sequencer::{Stage, StageLayout, TickOutcome};
pub use step::{Step, MAX_GROUPS};
