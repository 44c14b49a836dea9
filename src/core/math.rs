//! Angular arithmetic in degrees.
//!
//! The simulator's heading is tracked in degrees in `[0, 360)`.

/// Normalize a yaw angle to `[0, 360)`.
///
/// # Example
/// ```
/// use drishti::core::math::normalize_yaw;
///
/// assert_eq!(normalize_yaw(-90.0), 270.0);
/// assert_eq!(normalize_yaw(720.0), 0.0);
/// ```
#[inline]
pub fn normalize_yaw(yaw: f64) -> f64 {
    let a = yaw.rem_euclid(360.0);
    // rem_euclid rounds up to 360.0 for tiny negative inputs
    if a >= 360.0 { 0.0 } else { a }
}

/// Signed shortest rotation from `from` to `to`, in `(-180, 180]`.
///
/// Positive deltas are reached with RIGHTROTATE, negative with LEFTROTATE.
///
/// # Example
/// ```
/// use drishti::core::math::shortest_yaw_delta;
///
/// assert_eq!(shortest_yaw_delta(350.0, 10.0), 20.0);
/// assert_eq!(shortest_yaw_delta(0.0, 270.0), -90.0);
/// assert_eq!(shortest_yaw_delta(90.0, 270.0), 180.0);
/// ```
#[inline]
pub fn shortest_yaw_delta(from: f64, to: f64) -> f64 {
    let mut delta = normalize_yaw(to) - normalize_yaw(from);
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_yaw_range() {
        for yaw in [-720.0, -405.0, -45.0, 0.0, 45.0, 359.9, 360.0, 1085.0] {
            let n = normalize_yaw(yaw);
            assert!((0.0..360.0).contains(&n), "{} -> {}", yaw, n);
        }
        assert_relative_eq!(normalize_yaw(-405.0), 315.0);
        assert_relative_eq!(normalize_yaw(1085.0), 5.0);
    }

    #[test]
    fn test_normalize_yaw_tiny_negative() {
        assert_eq!(normalize_yaw(-1e-15), 0.0);
    }

    #[test]
    fn test_shortest_delta_half_turn_is_positive() {
        assert_eq!(shortest_yaw_delta(0.0, 180.0), 180.0);
        assert_eq!(shortest_yaw_delta(180.0, 0.0), 180.0);
        assert_eq!(shortest_yaw_delta(270.0, 90.0), 180.0);
    }

    #[test]
    fn test_shortest_delta_wraps() {
        assert_relative_eq!(shortest_yaw_delta(315.0, 45.0), 90.0);
        assert_relative_eq!(shortest_yaw_delta(45.0, 315.0), -90.0);
        assert_relative_eq!(shortest_yaw_delta(0.0, -450.0), -90.0);
    }
}
