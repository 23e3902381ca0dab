//! One entry of the stage queue.

use heapless::FnvIndexMap;

use crate::group::{Command, GroupId};

/// Capacity of a step's command table.
pub const MAX_GROUPS: usize = 4;

/// Commands that start together, at most one per group.
///
/// Groups without an entry keep doing whatever they were doing.
#[derive(Debug, Clone, Default)]
pub struct Step {
    commands: FnvIndexMap<GroupId, Command, MAX_GROUPS>,
}

impl Step {
    /// Create an empty step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, group: GroupId, command: Command) -> Self {
        self.insert(group, command);
        self
    }

    /// Set the command for `group`, returning the one it replaces.
    pub fn insert(&mut self, group: GroupId, command: Command) -> Option<Command> {
        // One slot per GroupId fits in MAX_GROUPS.
        self.commands.insert(group, command).ok().flatten()
    }

    /// Command for `group`, if any.
    pub fn get(&self, group: GroupId) -> Option<&Command> {
        self.commands.get(&group)
    }

    /// Groups referenced by this step.
    pub fn groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.commands.keys().copied()
    }

    /// `(group, command)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &Command)> {
        self.commands.iter().map(|(group, command)| (*group, command))
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the step has no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Copy of this step with every carriage coordinate shifted by `(dx, dy)`.
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        let mut shifted = self.clone();
        for (_, command) in shifted.commands.iter_mut() {
            if let Command::Move { x, y } = command {
                *x += dx;
                *y += dy;
            }
        }
        shifted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_command() {
        let mut step = Step::new().with(GroupId::Nozzle, Command::Switch(true));
        let old = step.insert(GroupId::Nozzle, Command::Switch(false));

        assert_eq!(old, Some(Command::Switch(true)));
        assert_eq!(step.len(), 1);
        assert_eq!(step.get(GroupId::Nozzle), Some(&Command::Switch(false)));
        assert!(step.get(GroupId::Carriage).is_none());
    }

    #[test]
    fn test_offset_only_moves_coordinates() {
        let step = Step::new()
            .with(GroupId::Carriage, Command::Move { x: 1.0, y: 2.0 })
            .with(GroupId::Platform, Command::Switch(true));

        let shifted = step.offset(10.0, -1.0);
        assert_eq!(
            shifted.get(GroupId::Carriage),
            Some(&Command::Move { x: 11.0, y: 1.0 })
        );
        assert_eq!(shifted.get(GroupId::Platform), Some(&Command::Switch(true)));
        assert_eq!(shifted.groups().collect::<Vec<_>>(), vec![GroupId::Carriage, GroupId::Platform]);
    }
}
