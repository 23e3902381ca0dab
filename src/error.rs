//! Error types for icing-stage.
//!
//! Caller mistakes (`CommandError`) are returned synchronously. Faults that
//! happen inside a tick (`ExecutionError`) are recorded as actuator state and
//! only surface when somebody polls readiness.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all icing-stage operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Rejected command (invalid or untimely)
    Command(CommandError),
    /// Fault during tick execution
    Execution(ExecutionError),
    /// Recipe or pattern file error
    Recipe(RecipeError),
    /// Stage-level error
    Stage(StageError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// File I/O error
    IoError(heapless::String<128>),
    /// Actuator name not found in configuration
    ActuatorNotFound(heapless::String<32>),
    /// Invalid peak speed (must be > 0)
    InvalidPeakRpm(f64),
    /// Invalid distance per step (must be > 0)
    InvalidDistPerStep(f64),
    /// Invalid maximum travel (must be finite and >= 0)
    InvalidMaxDist(f64),
    /// Invalid steps per revolution (must be > 0)
    InvalidStepsPerRevolution(u16),
    /// Invalid sequencer period (must be > 0)
    InvalidTickInterval(u64),
    /// A required builder field was not supplied
    MissingField(&'static str),
}

/// Rejected command errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    /// Actuator is dead and cannot be commanded
    ActuatorDead(heapless::String<32>),
    /// A blocking task is still in progress
    BlockingTaskInProgress(heapless::String<32>),
    /// Task contains something other than -1, 0 or 1
    InvalidTask {
        /// Actuator name
        actuator: heapless::String<32>,
        /// Index of the offending directive
        index: usize,
        /// Offending value
        value: i64,
    },
    /// Command kind does not match the receiving group
    WrongCommand {
        /// Group name
        group: heapless::String<32>,
        /// What the group expected
        expected: &'static str,
    },
    /// Move target lies outside an axis' travel
    OutOfTravel {
        /// Actuator name
        actuator: heapless::String<32>,
        /// Requested position in steps
        target: i64,
        /// Inclusive upper bound in steps
        max_steps: i64,
    },
}

/// Faults raised while executing a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// Position would leave `[0, max_steps]`
    BoundsViolation {
        /// Actuator name
        actuator: heapless::String<32>,
        /// Offending position in steps
        position: i64,
        /// Upper bound in steps
        max_steps: i64,
    },
    /// Step driver reported a failure
    DriverFault(heapless::String<64>),
    /// An actuator was found dead while polling readiness
    ActuatorDead(heapless::String<32>),
    /// Zeroing never saw the boundary sensor trip
    HomingFailed {
        /// Actuator name
        actuator: heapless::String<32>,
        /// Steps taken before giving up
        steps: i64,
    },
    /// Ticker worker thread could not be started
    SchedulerUnavailable(heapless::String<64>),
}

/// Recipe and pattern file errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RecipeError {
    /// Pattern file could not be read
    Io {
        /// File path
        path: heapless::String<128>,
        /// Underlying error message
        message: heapless::String<128>,
    },
    /// A pattern line could not be parsed
    Parse {
        /// 1-based line number (0 when parsing a standalone frame)
        line: usize,
        /// What went wrong
        message: heapless::String<64>,
    },
    /// Group id outside the known set
    UnknownGroup(u8),
    /// Command kind does not fit the group id
    CommandMismatch {
        /// Group id
        group: u8,
        /// What the group expected
        expected: &'static str,
    },
}

/// Stage-level errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StageError {
    /// Stage has been halted and must be torn down
    NotLive,
    /// A step references a group id the stage does not have
    MissingGroup(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Command(e) => write!(f, "Command error: {}", e),
            Error::Execution(e) => write!(f, "Execution error: {}", e),
            Error::Recipe(e) => write!(f, "Recipe error: {}", e),
            Error::Stage(e) => write!(f, "Stage error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::ActuatorNotFound(name) => write!(f, "Actuator '{}' not found", name),
            ConfigError::InvalidPeakRpm(v) => write!(f, "Invalid peak rpm: {}. Must be > 0", v),
            ConfigError::InvalidDistPerStep(v) => {
                write!(f, "Invalid distance per step: {}. Must be > 0", v)
            }
            ConfigError::InvalidMaxDist(v) => {
                write!(f, "Invalid max distance: {}. Must be finite and >= 0", v)
            }
            ConfigError::InvalidStepsPerRevolution(v) => {
                write!(f, "Invalid steps per revolution: {}. Must be > 0", v)
            }
            ConfigError::InvalidTickInterval(v) => {
                write!(f, "Invalid tick interval: {} ms. Must be > 0", v)
            }
            ConfigError::MissingField(field) => write!(f, "Missing required field: {}", field),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::ActuatorDead(name) => write!(f, "actuator '{}' is dead", name),
            CommandError::BlockingTaskInProgress(name) => {
                write!(f, "cannot override an in-progress blocking task on '{}'", name)
            }
            CommandError::InvalidTask { actuator, index, value } => write!(
                f,
                "invalid task for '{}': directive {} is {}, expected -1, 0 or 1",
                actuator, index, value
            ),
            CommandError::WrongCommand { group, expected } => {
                write!(f, "group '{}' expects a {} command", group, expected)
            }
            CommandError::OutOfTravel { actuator, target, max_steps } => write!(
                f,
                "'{}' target {} outside travel [0, {}]",
                actuator, target, max_steps
            ),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::BoundsViolation { actuator, position, max_steps } => write!(
                f,
                "'{}' position {} outside bounds [0, {}]",
                actuator, position, max_steps
            ),
            ExecutionError::DriverFault(msg) => write!(f, "step driver fault: {}", msg),
            ExecutionError::ActuatorDead(name) => write!(f, "actuator '{}' died", name),
            ExecutionError::HomingFailed { actuator, steps } => write!(
                f,
                "'{}' boundary sensor did not trip after {} steps",
                actuator, steps
            ),
            ExecutionError::SchedulerUnavailable(msg) => {
                write!(f, "could not start ticker: {}", msg)
            }
        }
    }
}

impl fmt::Display for RecipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeError::Io { path, message } => {
                write!(f, "cannot read pattern '{}': {}", path, message)
            }
            RecipeError::Parse { line, message } => write!(f, "line {}: {}", line, message),
            RecipeError::UnknownGroup(id) => write!(f, "unknown group id {}", id),
            RecipeError::CommandMismatch { group, expected } => {
                write!(f, "group {} expects a {}", group, expected)
            }
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::NotLive => write!(f, "stage is not live"),
            StageError::MissingGroup(id) => write!(f, "no group installed for id {}", id),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Error::Command(e)
    }
}

impl From<ExecutionError> for Error {
    fn from(e: ExecutionError) -> Self {
        Error::Execution(e)
    }
}

impl From<RecipeError> for Error {
    fn from(e: RecipeError) -> Self {
        Error::Recipe(e)
    }
}

impl From<StageError> for Error {
    fn from(e: StageError) -> Self {
        Error::Stage(e)
    }
}

impl std::error::Error for Error {}

impl std::error::Error for ConfigError {}

impl std::error::Error for CommandError {}

impl std::error::Error for ExecutionError {}

impl std::error::Error for RecipeError {}

impl std::error::Error for StageError {}

/// Copy `text` into a bounded string, cutting at a char boundary if it does not fit.
pub fn bounded<const N: usize>(text: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
