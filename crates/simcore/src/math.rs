//! Interpolation helpers shared by the tick stages.

/// Metres per second to kilometres per hour.
pub const MPS_TO_KPH: f64 = 3.6;

/// Unclamped linear interpolation from `a` to `b`.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Where `value` sits between `a` and `b`, clamped to [0, 1].
///
/// A degenerate range (a == b) yields 0 instead of dividing by zero.
#[inline]
pub fn inverse_lerp(a: f64, b: f64, value: f64) -> f64 {
    let span = b - a;
    if span.abs() < f64::EPSILON {
        return 0.0;
    }
    clamp01((value - a) / span)
}

/// Move `current` toward `target` by at most `max_delta`.
#[inline]
pub fn move_towards(current: f64, target: f64, max_delta: f64) -> f64 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta.max(0.0)
    }
}

/// Clamp to [0, 1]; NaN maps to 0.
#[inline]
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[inline]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inverse_lerp_clamps() {
        assert_relative_eq!(inverse_lerp(0.2, 1.0, 0.6), 0.5);
        assert_eq!(inverse_lerp(0.2, 1.0, 0.0), 0.0);
        assert_eq!(inverse_lerp(0.2, 1.0, 3.0), 1.0);
    }

    #[test]
    fn test_inverse_lerp_degenerate_range() {
        assert_eq!(inverse_lerp(5.0, 5.0, 7.0), 0.0);
    }

    #[test]
    fn test_move_towards_limits_step() {
        assert_relative_eq!(move_towards(0.0, 1.0, 0.1), 0.1);
        assert_relative_eq!(move_towards(0.0, -1.0, 0.1), -0.1);
        assert_relative_eq!(move_towards(0.95, 1.0, 0.1), 1.0);
    }

    #[test]
    fn test_move_towards_negative_delta_holds() {
        assert_eq!(move_towards(0.3, 1.0, -0.5), 0.3);
    }

    #[test]
    fn test_clamp01_nan() {
        assert_eq!(clamp01(f64::NAN), 0.0);
        assert_eq!(clamp01(f64::INFINITY), 1.0);
    }
}
