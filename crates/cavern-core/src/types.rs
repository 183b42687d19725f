//! Core navigation types.
//!
//! Platforms, navigation modes, frame timing and the identifiers the engine
//! hands out for navigations, portals and display groups.

use std::fmt;

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::math::{rotation_of, translation_of, Mat4};
use crate::{DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE};

// ============================================================================
// Identifiers
// ============================================================================

/// Handle of a navigation inside an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NavId(pub usize);

/// Handle of a portal inside an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortalId(pub usize);

/// Handle of a display group inside an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DisplayGroupId(pub usize);

impl fmt::Display for NavId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nav#{}", self.0)
    }
}

impl fmt::Display for PortalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "portal#{}", self.0)
    }
}

impl fmt::Display for DisplayGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "display-group#{}", self.0)
    }
}

// ============================================================================
// Navigation mode
// ============================================================================

/// Input constraint applied by a navigation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigationMode {
    /// 3-DOF: yaw plus planar translation, ground-locked.
    #[default]
    Realistic,
    /// 6-DOF free flight.
    Unrealistic,
}

impl NavigationMode {
    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Realistic => Self::Unrealistic,
            Self::Unrealistic => Self::Realistic,
        }
    }

    /// Whether this is the 3-DOF mode.
    #[must_use]
    pub const fn is_realistic(self) -> bool {
        matches!(self, Self::Realistic)
    }

    /// Get a human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Realistic => "realistic",
            Self::Unrealistic => "unrealistic",
        }
    }
}

// ============================================================================
// Scale limits
// ============================================================================

/// Closed interval a platform scale is clamped into.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleLimits {
    /// Smallest allowed scale.
    pub min: f64,
    /// Largest allowed scale.
    pub max: f64,
}

impl ScaleLimits {
    /// Create validated limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidScaleLimits`] unless `0 < min <= max`
    /// and both bounds are finite.
    pub fn new(min: f64, max: f64) -> ConfigResult<Self> {
        if !(min.is_finite() && max.is_finite()) || min <= 0.0 || min > max {
            return Err(ConfigError::InvalidScaleLimits { min, max });
        }
        Ok(Self { min, max })
    }

    /// Clamp a scale into the limits. NaN maps to the lower bound.
    #[must_use]
    pub fn clamp(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            return self.min;
        }
        scale.clamp(self.min, self.max)
    }

    /// Whether `scale` lies inside the limits.
    #[must_use]
    pub fn contains(&self, scale: f64) -> bool {
        scale >= self.min && scale <= self.max
    }
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_SCALE,
            max: DEFAULT_MAX_SCALE,
        }
    }
}

// ============================================================================
// Platform
// ============================================================================

/// The locomotion frame a user rides: one absolute pose plus a scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    matrix: Mat4,
    scale: f64,
}

impl Platform {
    /// Create a platform. The scale is taken as given; use
    /// [`Platform::set_scale`] to clamp it.
    #[must_use]
    pub fn new(matrix: Mat4, scale: f64) -> Self {
        Self { matrix, scale }
    }

    /// Absolute pose.
    #[must_use]
    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    /// Replace the absolute pose.
    pub fn set_matrix(&mut self, matrix: Mat4) {
        self.matrix = matrix;
    }

    /// Current scale.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Set the scale, clamped into `limits`. Returns the stored value.
    pub fn set_scale(&mut self, scale: f64, limits: &ScaleLimits) -> f64 {
        self.scale = limits.clamp(scale);
        self.scale
    }

    /// World position of the platform origin.
    #[must_use]
    pub fn translation(&self) -> Vector3<f64> {
        translation_of(&self.matrix)
    }

    /// World orientation of the platform.
    #[must_use]
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        rotation_of(&self.matrix)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new(Mat4::identity(), 1.0)
    }
}

// ============================================================================
// Frame timing
// ============================================================================

/// Frame timing supplied by the external frame clock.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameTime {
    /// Frame number since simulation start.
    pub frame_number: u64,
    /// Time since simulation start (seconds).
    pub now: f64,
    /// Delta time since last frame (seconds).
    pub dt: f64,
}

impl FrameTime {
    /// Create a new frame time.
    #[must_use]
    pub fn new(frame_number: u64, now: f64, dt: f64) -> Self {
        Self { frame_number, now, dt }
    }

    /// Create the first frame at time zero.
    #[must_use]
    pub fn first(target_hz: f64) -> Self {
        Self {
            frame_number: 0,
            now: 0.0,
            dt: 1.0 / target_hz,
        }
    }

    /// Advance to the next frame.
    #[must_use]
    pub fn next(&self) -> Self {
        Self {
            frame_number: self.frame_number + 1,
            now: self.now + self.dt,
            dt: self.dt,
        }
    }
}

impl Default for FrameTime {
    fn default() -> Self {
        Self::first(60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::make_trans;
    use proptest::prelude::*;

    #[test]
    fn test_mode_toggle() {
        assert_eq!(NavigationMode::Realistic.toggled(), NavigationMode::Unrealistic);
        assert_eq!(NavigationMode::Unrealistic.toggled(), NavigationMode::Realistic);
        assert!(NavigationMode::default().is_realistic());
    }

    #[test]
    fn test_scale_limits_validation() {
        assert!(ScaleLimits::new(0.1, 10.0).is_ok());
        assert!(ScaleLimits::new(0.0, 10.0).is_err());
        assert!(ScaleLimits::new(10.0, 0.1).is_err());
        assert!(ScaleLimits::new(0.1, f64::INFINITY).is_err());
    }

    #[test]
    fn test_scale_clamping() {
        let limits = ScaleLimits::default();
        let mut platform = Platform::default();

        assert!((platform.set_scale(1e6, &limits) - DEFAULT_MAX_SCALE).abs() < 1e-12);
        assert!((platform.set_scale(0.0, &limits) - DEFAULT_MIN_SCALE).abs() < 1e-12);
        assert!((platform.set_scale(f64::NAN, &limits) - DEFAULT_MIN_SCALE).abs() < 1e-12);
        assert!((platform.set_scale(2.5, &limits) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_platform_translation() {
        let platform = Platform::new(make_trans(&Vector3::new(1.0, 2.0, 3.0)), 1.0);
        assert!((platform.translation() - Vector3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
    }

    #[test]
    fn test_frame_advance() {
        let frame = FrameTime::first(64.0);
        assert_eq!(frame.frame_number, 0);

        let next = frame.next();
        assert_eq!(next.frame_number, 1);
        assert!((next.now - 1.0 / 64.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn clamped_scale_stays_within_limits(
            min in 1e-6f64..1.0,
            span in 0.0f64..1e4,
            scale in proptest::num::f64::ANY,
        ) {
            let limits = ScaleLimits::new(min, min + span).expect("valid limits");
            let clamped = limits.clamp(scale);
            prop_assert!(limits.contains(clamped));
            if limits.contains(scale) {
                prop_assert_eq!(clamped, scale);
            }
        }
    }
}
