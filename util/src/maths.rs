//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// Due to floating point round-off the result can equal `rhs.abs()` when
/// `lhs` is negative and much smaller in magnitude than `rhs`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the half-open range (-pi, pi].
pub fn wrap_to_pi<T>(angle_rad: T) -> T
where
    T: Float
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    let wrapped = rem_euclid(angle_rad + pi_t, tau_t) - pi_t;

    // rem_euclid lands on [-pi, pi), so move the closed end across
    if wrapped <= -pi_t {
        pi_t
    }
    else {
        wrapped
    }
}

/// Get the signed angle from bearing `from_rad` to bearing `to_rad`, wrapped
/// into (-pi, pi].
pub fn ang_diff<T>(to_rad: T, from_rad: T) -> T
where
    T: Float
{
    wrap_to_pi(to_rad - from_rad)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_rem_euclid() {
        assert_eq!(rem_euclid(7f64, 4f64), 3f64);
        assert_eq!(rem_euclid(-1f64, 4f64), 3f64);
        assert_eq!(rem_euclid(0f64, 4f64), 0f64);
    }

    #[test]
    fn test_wrap_to_pi() {
        assert_eq!(wrap_to_pi(0f64), 0f64);
        assert_eq!(wrap_to_pi(PI), PI);
        assert_eq!(wrap_to_pi(-PI), PI);
        assert!((wrap_to_pi(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_to_pi(PI / 2.0 + 2.0 * PI) - PI / 2.0).abs() < 1e-12);
        assert!((wrap_to_pi(-PI / 2.0 - 2.0 * PI) + PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_ang_diff() {
        assert!((ang_diff(0.1f64, -0.1f64) - 0.2).abs() < 1e-12);
        assert!((ang_diff(-PI + 0.1, PI - 0.1) - 0.2).abs() < 1e-12);
        assert!((ang_diff(PI - 0.1, -PI + 0.1) + 0.2).abs() < 1e-12);
    }
}
