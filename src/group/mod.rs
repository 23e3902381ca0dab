//! Actuator groups.
//!
//! A group bundles the actuators behind one logical degree of freedom and
//! turns a [`Command`] into `set_task` calls on them. The stage only talks to
//! groups, never to actuators directly.

mod carriage;
mod raster;
mod toggle;

use core::fmt;

use crate::actuator::Actuator;
use crate::error::{bounded, ExecutionError, Result};

pub use carriage::Carriage;
pub use raster::rasterize;
pub use toggle::Toggle;

/// Group identifiers as they appear in pattern files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupId {
    /// Two-axis carriage (id 0).
    Carriage = 0,
    /// Cookie platform lift (id 1).
    Platform = 1,
    /// Icing nozzle (id 2).
    Nozzle = 2,
}

impl GroupId {
    /// Every group, in id order.
    pub const ALL: [GroupId; 3] = [GroupId::Carriage, GroupId::Platform, GroupId::Nozzle];

    /// Numeric id.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            GroupId::Carriage => "carriage",
            GroupId::Platform => "platform",
            GroupId::Nozzle => "nozzle",
        }
    }
}

impl TryFrom<u8> for GroupId {
    type Error = u8;

    fn try_from(id: u8) -> core::result::Result<Self, Self::Error> {
        match id {
            0 => Ok(GroupId::Carriage),
            1 => Ok(GroupId::Platform),
            2 => Ok(GroupId::Nozzle),
            other => Err(other),
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A logical command for one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Drive the carriage to a real-world coordinate.
    Move {
        /// Target x
        x: f64,
        /// Target y
        y: f64,
    },
    /// Drive a boolean group to its far bound (`true`) or to zero (`false`).
    Switch(bool),
}

/// The contract between the stage and a bundle of actuators.
pub trait ActuatorGroup: Send {
    /// Group name for diagnostics.
    fn name(&self) -> &str;

    /// Translate `command` into tasks on the owned actuators.
    ///
    /// Only call while [`ready`](Self::ready) is `Ok(true)`.
    fn send(&mut self, command: &Command) -> Result<()>;

    /// Whether every owned actuator is `Ready` or `Executing` with no
    /// blocking task still queued.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::ActuatorDead` if any owned actuator is dead.
    fn ready(&self) -> Result<bool>;

    /// Pause every owned actuator.
    fn pause(&self);

    /// Unpause every owned actuator.
    fn unpause(&self);

    /// Kill every owned actuator.
    fn kill(&self);
}

/// Readiness of a set of actuators, with death reported as an error.
pub(crate) fn members_ready<'a, I>(members: I) -> Result<bool>
where
    I: IntoIterator<Item = &'a Actuator>,
{
    let mut ready = true;
    for actuator in members {
        if actuator.state().is_dead() {
            return Err(ExecutionError::ActuatorDead(bounded(actuator.name())).into());
        }
        ready &= actuator.is_ready();
    }
    Ok(ready)
}
