//! Integer line rasterisation for two-axis moves.

use crate::actuator::Directive;

/// Split a step displacement `(dx, dy)` into per-tick directives for each axis.
///
/// Classic Bresenham from `(0, 0)`: the dominant axis steps every tick and
/// the minor axis steps whenever the error term goes negative. Both
/// sequences have length `max(|dx|, |dy|)` and sum to exactly `dx` and `dy`.
///
/// ```rust
/// use icing_stage::group::rasterize;
/// use icing_stage::actuator::Directive::{Forward as F, Hold as H};
///
/// let (x, y) = rasterize(5, 2);
/// assert_eq!(x, [F, F, F, F, F]);
/// assert_eq!(y, [H, F, H, F, H]);
/// ```
pub fn rasterize(dx: i64, dy: i64) -> (Vec<Directive>, Vec<Directive>) {
    let major_x = dx.saturating_abs() >= dy.saturating_abs();
    let (major, minor) = if major_x { (dx, dy) } else { (dy, dx) };

    let major_abs = major.saturating_abs();
    let minor_abs = minor.saturating_abs();
    let major_dir = Directive::from_sign(major);
    let minor_dir = Directive::from_sign(minor);

    let len = usize::try_from(major_abs).unwrap_or(usize::MAX);
    let mut major_steps = Vec::with_capacity(len);
    let mut minor_steps = Vec::with_capacity(len);

    let mut error = major_abs / 2;
    for _ in 0..major_abs {
        major_steps.push(major_dir);
        error -= minor_abs;
        if error < 0 {
            minor_steps.push(minor_dir);
            error += major_abs;
        } else {
            minor_steps.push(Directive::Hold);
        }
    }

    if major_x {
        (major_steps, minor_steps)
    } else {
        (minor_steps, major_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::Directive::{Backward as B, Forward as F, Hold as H};

    fn sum(steps: &[Directive]) -> i64 {
        steps.iter().map(|d| d.delta()).sum()
    }

    #[test]
    fn test_shallow_line() {
        let (x, y) = rasterize(5, 2);
        assert_eq!(x, vec![F, F, F, F, F]);
        assert_eq!(y, vec![H, F, H, F, H]);
    }

    #[test]
    fn test_steep_negative_line() {
        let (x, y) = rasterize(-2, -5);
        assert_eq!(y, vec![B, B, B, B, B]);
        assert_eq!(x, vec![H, B, H, B, H]);
    }

    #[test]
    fn test_axis_aligned_and_diagonal() {
        let (x, y) = rasterize(0, 3);
        assert_eq!(x, vec![H, H, H]);
        assert_eq!(y, vec![F, F, F]);

        let (x, y) = rasterize(-3, 3);
        assert_eq!(x, vec![B, B, B]);
        assert_eq!(y, vec![F, F, F]);
    }

    #[test]
    fn test_zero_move_is_empty() {
        let (x, y) = rasterize(0, 0);
        assert!(x.is_empty());
        assert!(y.is_empty());
    }

    #[test]
    fn test_minor_axis_tracks_the_line() {
        let (dx, dy) = (17, 6);
        let (x, y) = rasterize(dx, dy);
        assert_eq!(sum(&x), dx);
        assert_eq!(sum(&y), dy);

        // After n major steps the minor axis is within one step of n * dy / dx
        let mut minor = 0i64;
        for (n, d) in y.iter().enumerate() {
            minor += d.delta();
            let ideal = (n as f64 + 1.0) * dy as f64 / dx as f64;
            assert!((minor as f64 - ideal).abs() <= 0.5 + 1e-9);
        }
    }
}
