//! Angle utilities used by refinement and vertex simplification.

/// Computes the unsigned angle between two 2D vectors in radians.
/// Returns a value in [0, π]. Zero if the vectors are parallel
/// and pointing in the same direction; π if they are opposite.
#[inline]
pub fn angle_between(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dot = a[0] * b[0] + a[1] * b[1];
    let cross = a[0] * b[1] - a[1] * b[0];
    cross.abs().atan2(dot)
}

/// Deviation from a straight continuation at `curr` when walking
/// `prev → curr → next`. Zero for collinear points, π for a full reversal.
#[inline]
pub fn turn_angle(prev: [f64; 2], curr: [f64; 2], next: [f64; 2]) -> f64 {
    let a = [curr[0] - prev[0], curr[1] - prev[1]];
    let b = [next[0] - curr[0], next[1] - curr[1]];
    angle_between(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn angle_between_basic() {
        assert!(approx_eq(angle_between([1.0, 0.0], [1.0, 0.0]), 0.0));
        assert!(approx_eq(angle_between([1.0, 0.0], [-1.0, 0.0]), PI));
        assert!(approx_eq(angle_between([1.0, 0.0], [0.0, 1.0]), FRAC_PI_2));
    }

    #[test]
    fn turn_angle_is_zero_for_collinear_points() {
        assert!(approx_eq(turn_angle([0.0, 0.0], [1.0, 1.0], [3.0, 3.0]), 0.0));
        assert!(approx_eq(
            turn_angle([0.0, 0.0], [1.0, 0.0], [1.0, 1.0]),
            FRAC_PI_2
        ));
    }

    #[test]
    fn turn_angle_is_tiny_for_inexact_collinear_points() {
        let t = turn_angle([0.1, 0.2], [0.4, 0.8], [1.3, 2.6]);
        assert!(t.abs() < 1e-9, "{t}");
        let t = turn_angle([1e3, 1e3], [1e3 + 1e-3, 1e3 + 2e-3], [1e3 + 5.0, 1e3 + 10.0]);
        assert!(t.abs() < 1e-9, "{t}");
    }
}
