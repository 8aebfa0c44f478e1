//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Floor a f64 and clamp it to the i64 range, returning 0 for non-finite values.
#[must_use]
pub fn floor_f64_to_i64(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).floor();
    cast::<f64, i64>(clamped).unwrap_or(0)
}

/// Round to one decimal place for display.
#[must_use]
pub fn round_to_tenth(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 10.0).round() / 10.0
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Convert a count to f64 for multiplier arithmetic.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Clamp a stat into `[0, 100]`.
#[must_use]
pub const fn clamp_stat(value: i32) -> i32 {
    if value < 0 {
        0
    } else if value > 100 {
        100
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_handles_non_finite_and_negative() {
        assert_eq!(floor_f64_to_i64(f64::NAN), 0);
        assert_eq!(floor_f64_to_i64(f64::INFINITY), 0);
        assert_eq!(floor_f64_to_i64(142.5), 142);
        assert_eq!(floor_f64_to_i64(-0.5), -1);
    }

    #[test]
    fn tenth_rounding_is_display_only() {
        assert!((round_to_tenth(2.849_999) - 2.8).abs() < f64::EPSILON);
        assert!((round_to_tenth(95.04) - 95.0).abs() < f64::EPSILON);
        assert!((round_to_tenth(f64::NAN) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stat_clamp_bounds() {
        assert_eq!(clamp_stat(-4), 0);
        assert_eq!(clamp_stat(140), 100);
        assert_eq!(clamp_stat(55), 55);
    }
}
