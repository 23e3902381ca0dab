//! Actuator lifecycle states.

use core::fmt;

/// State of an actuator's execution state machine.
///
/// `Ready -> {Executing | ExecutingBlocked} -> Ready`, and any state `-> Dead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActuatorState {
    /// Idle and accepting tasks.
    #[default]
    Ready,
    /// Running a task that may be replaced.
    Executing,
    /// Running a task that must finish before another is accepted.
    ExecutingBlocked,
    /// Terminal. Never executes or accepts a task again.
    Dead,
}

impl ActuatorState {
    /// Whether a task is being executed.
    #[inline]
    pub fn is_executing(self) -> bool {
        matches!(self, ActuatorState::Executing | ActuatorState::ExecutingBlocked)
    }

    /// Whether a new task may be issued without waiting (`Ready` or `Executing`).
    #[inline]
    pub fn accepts_commands(self) -> bool {
        matches!(self, ActuatorState::Ready | ActuatorState::Executing)
    }

    /// Whether the actuator is dead.
    #[inline]
    pub fn is_dead(self) -> bool {
        self == ActuatorState::Dead
    }

    /// State name for display/debugging.
    pub fn name(self) -> &'static str {
        match self {
            ActuatorState::Ready => "Ready",
            ActuatorState::Executing => "Executing",
            ActuatorState::ExecutingBlocked => "ExecutingBlocked",
            ActuatorState::Dead => "Dead",
        }
    }
}

impl fmt::Display for ActuatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_classification() {
        assert!(ActuatorState::Ready.accepts_commands());
        assert!(ActuatorState::Executing.accepts_commands());
        assert!(!ActuatorState::ExecutingBlocked.accepts_commands());
        assert!(!ActuatorState::Dead.accepts_commands());

        assert!(ActuatorState::ExecutingBlocked.is_executing());
        assert!(!ActuatorState::Ready.is_executing());
    }
}
