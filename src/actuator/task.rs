//! Step directives and tasks.

use std::collections::VecDeque;

/// A single unit step command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// One step toward zero (-1).
    Backward,
    /// No movement this tick (0).
    Hold,
    /// One step away from zero (+1).
    Forward,
}

impl Directive {
    /// Signed step delta.
    #[inline]
    pub fn delta(self) -> i64 {
        match self {
            Directive::Backward => -1,
            Directive::Hold => 0,
            Directive::Forward => 1,
        }
    }

    /// Directive moving one step in the direction of `sign`.
    #[inline]
    pub fn from_sign(sign: i64) -> Self {
        match sign.signum() {
            -1 => Directive::Backward,
            0 => Directive::Hold,
            _ => Directive::Forward,
        }
    }
}

impl TryFrom<i64> for Directive {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Directive::Backward),
            0 => Ok(Directive::Hold),
            1 => Ok(Directive::Forward),
            other => Err(other),
        }
    }
}

impl From<Directive> for i64 {
    fn from(d: Directive) -> Self {
        d.delta()
    }
}

/// Ordered directives consumed front to back, one per tick.
pub type Task = VecDeque<Directive>;

/// Validate raw directive values into a task.
///
/// On failure returns the index and value of the first element outside
/// `{-1, 0, 1}`.
pub fn parse_task<I>(raw: I) -> Result<Task, (usize, i64)>
where
    I: IntoIterator,
    I::Item: Into<i64>,
{
    raw.into_iter()
        .enumerate()
        .map(|(index, value)| {
            let value = value.into();
            Directive::try_from(value).map_err(|_| (index, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_task() {
        let task = parse_task([1i8, 0, -1, 1]).unwrap();
        assert_eq!(task.len(), 4);
        assert_eq!(task.iter().map(|d| d.delta()).sum::<i64>(), 1);
        assert_eq!(task[2], Directive::Backward);
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert_eq!(parse_task([1i32, 2, 0]), Err((1, 2)));
        assert_eq!(parse_task([-3i64]), Err((0, -3)));
    }

    #[test]
    fn test_empty_task_is_valid() {
        let task = parse_task(Vec::<i32>::new()).unwrap();
        assert!(task.is_empty());
    }

    #[test]
    fn test_directives_round_trip_through_i64() {
        let task = parse_task([Directive::Forward, Directive::Hold]).unwrap();
        assert_eq!(task, Task::from(vec![Directive::Forward, Directive::Hold]));
        assert_eq!(Directive::from_sign(-7), Directive::Backward);
    }
}
