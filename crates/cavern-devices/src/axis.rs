//! Axis normalization law.
//!
//! Every analog axis of every device kind goes through the same law:
//!
//! ```text
//! v' = v - offset,  min' = min - offset,  max' = max - offset
//!
//! v' > 0:  t = max' * pos% / 100;  out = v' <= t ? 0 : clamp((v' - t) / (max' - t), 0, 1)
//! v' < 0:  t = min' * neg% / 100;  out = v' >= t ? 0 : -clamp((v' - t) / (min' - t), 0, 1)
//! v' = 0:  out = 0
//! ```
//!
//! The thresholds form a deadzone around the rest position; outside it the
//! value ramps linearly to full deflection. Incremental axes (dials, mouse
//! motion) skip the law and pass their offset-corrected delta through.

use serde::{Deserialize, Serialize};

/// Calibration of one analog axis: `(offset, min, max, negThresh, posThresh)`.
///
/// Thresholds are percentages of the respective interval half.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisCalibration {
    /// Rest position reported by the device.
    pub offset: f64,
    /// Value at full negative deflection.
    pub min: f64,
    /// Value at full positive deflection.
    pub max: f64,
    /// Negative deadzone in percent of `min - offset`.
    pub neg_threshold: f64,
    /// Positive deadzone in percent of `max - offset`.
    pub pos_threshold: f64,
}

impl AxisCalibration {
    /// Create a calibration.
    #[must_use]
    pub const fn new(offset: f64, min: f64, max: f64, neg_threshold: f64, pos_threshold: f64) -> Self {
        Self {
            offset,
            min,
            max,
            neg_threshold,
            pos_threshold,
        }
    }

    /// Symmetric calibration around zero with equal deadzones.
    #[must_use]
    pub const fn symmetric(range: f64, threshold: f64) -> Self {
        Self::new(0.0, -range, range, threshold, threshold)
    }

    /// Normalize a raw axis value into `[-1, 1]`.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        normalize_axis(value, self)
    }
}

impl Default for AxisCalibration {
    fn default() -> Self {
        Self::symmetric(1.0, 0.0)
    }
}

/// Apply the normalization law to a raw axis value.
#[must_use]
pub fn normalize_axis(value: f64, cal: &AxisCalibration) -> f64 {
    let v = value - cal.offset;
    let min = cal.min - cal.offset;
    let max = cal.max - cal.offset;

    if v > 0.0 {
        let threshold = max * cal.pos_threshold / 100.0;
        ramp(v, threshold, max)
    } else if v < 0.0 {
        let threshold = min * cal.neg_threshold / 100.0;
        -ramp(v, threshold, min)
    } else {
        0.0
    }
}

/// Linear ramp from the deadzone edge to the interval bound.
///
/// Works for both signs: `v`, `threshold` and `bound` share the same sign.
fn ramp(v: f64, threshold: f64, bound: f64) -> f64 {
    if v.abs() <= threshold.abs() {
        return 0.0;
    }
    let span = bound - threshold;
    if span.abs() < f64::EPSILON {
        // Deadzone covers the whole interval
        return 0.0;
    }
    ((v - threshold) / span).clamp(0.0, 1.0)
}

/// Offset-corrected pass-through for incremental axes, scaled by `gain`.
#[must_use]
pub fn incremental_axis(value: f64, offset: f64, gain: f64) -> f64 {
    (value - offset) * gain
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_zero_and_rest() {
        let cal = AxisCalibration::new(0.2, -1.0, 1.0, 10.0, 10.0);
        assert!(normalize_axis(0.2, &cal).abs() < EPS);
        assert!(normalize_axis(0.0, &AxisCalibration::default()).abs() < EPS);
    }

    #[test]
    fn test_deadzone() {
        let cal = AxisCalibration::symmetric(100.0, 10.0);
        assert!(normalize_axis(10.0, &cal).abs() < EPS);
        assert!(normalize_axis(-10.0, &cal).abs() < EPS);
        assert!(normalize_axis(10.5, &cal) > 0.0);
        assert!(normalize_axis(-10.5, &cal) < 0.0);
    }

    #[test]
    fn test_linear_ramp_after_deadzone() {
        let cal = AxisCalibration::symmetric(100.0, 10.0);
        // (55 - 10) / (100 - 10) = 0.5
        assert!((normalize_axis(55.0, &cal) - 0.5).abs() < EPS);
        assert!((normalize_axis(-55.0, &cal) + 0.5).abs() < EPS);
        assert!((normalize_axis(100.0, &cal) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_saturation() {
        let cal = AxisCalibration::symmetric(1.0, 5.0);
        assert!((normalize_axis(3.0, &cal) - 1.0).abs() < EPS);
        assert!((normalize_axis(-3.0, &cal) + 1.0).abs() < EPS);
    }

    #[test]
    fn test_asymmetric_offset() {
        // Rest at 0.5 on a [0, 1] axis
        let cal = AxisCalibration::new(0.5, 0.0, 1.0, 0.0, 20.0);
        // Shifted: v = 0.3, max = 0.5, threshold = 0.1 -> (0.3 - 0.1) / 0.4
        assert!((normalize_axis(0.8, &cal) - 0.5).abs() < EPS);
        // Shifted: v = -0.25, min = -0.5, no deadzone -> -0.5
        assert!((normalize_axis(0.25, &cal) + 0.5).abs() < EPS);
    }

    #[test]
    fn test_full_deadzone_is_silent() {
        let cal = AxisCalibration::symmetric(1.0, 100.0);
        assert!(normalize_axis(0.99, &cal).abs() < EPS);
        assert!(normalize_axis(5.0, &cal).abs() < EPS);
    }

    #[test]
    fn test_incremental() {
        assert!((incremental_axis(3.0, 1.0, 0.5) - 1.0).abs() < EPS);
    }

    proptest! {
        #[test]
        fn normalized_values_stay_in_unit_interval(
            v in -1.0e4f64..1.0e4,
            range in 0.01f64..1.0e3,
            neg in 0.0f64..99.0,
            pos in 0.0f64..99.0,
        ) {
            let cal = AxisCalibration::new(0.0, -range, range, neg, pos);
            let out = normalize_axis(v, &cal);
            prop_assert!((-1.0..=1.0).contains(&out));
            prop_assert!(out == 0.0 || out.signum() == v.signum());
        }
    }
}
