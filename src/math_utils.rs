//! Numeric helpers shared by the composers, converters and the domain sizer
//!
//! All persisted values are rounded to a fixed number of decimals; the helpers
//! here keep that rounding in one place.

/// Assert that the percentage deviation between two values is below a threshold
///
/// Used by tests that compare a derived specific gravity or fraction against
/// a hand-computed reference.
#[macro_export]
macro_rules! assert_deviation {
    ($actual:expr, $expected:expr, $max_deviation:expr) => {
        {
            let actual_val = $actual;
            let expected_val = $expected;
            let max_dev = $max_deviation;
            let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

            if actual_deviation >= max_dev {
                panic!(
                    "assertion failed: deviation {:.4}% >= {:.4}%\n  \
                     actual: {:?},\n  expected: {:?}",
                    actual_deviation, max_dev, actual_val, expected_val
                );
            }
        }
    };
    ($actual:expr, $expected:expr, $max_deviation:expr, $($arg:tt)+) => {
        {
            let actual_val = $actual;
            let expected_val = $expected;
            let max_dev = $max_deviation;
            let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

            if actual_deviation >= max_dev {
                panic!(
                    "assertion failed: deviation {:.4}% >= {:.4}%: {}\n  \
                     actual: {:?},\n  expected: {:?}",
                    actual_deviation, max_dev, format_args!($($arg)+), actual_val, expected_val
                );
            }
        }
    };
}

/// Round half away from zero to `decimals` places
///
/// # Examples
/// ```
/// use vcctl_mix::math_utils::round_to;
///
/// assert_eq!(round_to(3.14159, 4), 3.1416);
/// assert_eq!(round_to(0.31034, 3), 0.31);
/// ```
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Round toward zero to `decimals` places
///
/// The small nudge absorbs representation error, so `0.3 / 3.0` still floors to `0.1`.
///
/// # Examples
/// ```
/// use vcctl_mix::math_utils::floor_to;
///
/// assert_eq!(floor_to(0.0375, 2), 0.03);
/// assert_eq!(floor_to(0.3 / 3.0, 2), 0.1);
/// ```
pub fn floor_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    ((value * scale) + 1e-9).floor() / scale
}

/// True when `sum` is within `tolerance` of 1.0
pub fn sums_to_one(sum: f64, tolerance: f64) -> bool {
    (sum - 1.0).abs() <= tolerance
}

/// Percentage deviation of `actual` from `expected`
///
/// # Examples
/// ```
/// use vcctl_mix::math_utils::deviation;
///
/// assert_eq!(deviation(105.0, 100.0), 5.0);
/// assert_eq!(deviation(95.0, 100.0), 5.0);
/// ```
pub fn deviation(actual: f64, expected: f64) -> f64 {
    if expected.abs() < f64::EPSILON {
        if actual.abs() < f64::EPSILON {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        ((actual - expected).abs() / expected.abs()) * 100.0
    }
}
