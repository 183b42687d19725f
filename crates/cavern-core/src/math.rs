//! Transform math for platform navigation.
//!
//! All matrices are 4x4 homogeneous transforms acting on column vectors, so
//! `a * b` applies `b` first. The world is right-handed with +Y up; devices
//! look down their local -Z axis.
//!
//! This module provides:
//! - Construction of translation / rotation / scale matrices
//! - Decomposition of rigid (optionally uniformly scaled) matrices
//! - Yaw-only ("fixed angle") rotation extraction with NaN recovery
//! - Quaternion helpers used by animated transitions

use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Homogeneous 4x4 transform in double precision.
pub type Mat4 = Matrix4<f64>;

/// Below this horizontal projection length the yaw angle is undefined.
const YAW_EPSILON: f64 = 1e-9;

/// Column length below which a matrix column is treated as degenerate.
const COLUMN_EPSILON: f64 = 1e-12;

// ============================================================================
// Construction
// ============================================================================

/// Translation matrix.
#[must_use]
pub fn make_trans(v: &Vector3<f64>) -> Mat4 {
    Matrix4::new_translation(v)
}

/// Rotation matrix from a unit quaternion.
#[must_use]
pub fn make_rot(q: &UnitQuaternion<f64>) -> Mat4 {
    q.to_homogeneous()
}

/// Uniform scale matrix.
#[must_use]
pub fn make_scale(s: f64) -> Mat4 {
    Matrix4::new_scaling(s)
}

/// Rigid pose `T(translation) * R(rotation)`.
#[must_use]
pub fn compose_pose(translation: &Vector3<f64>, rotation: &UnitQuaternion<f64>) -> Mat4 {
    make_trans(translation) * make_rot(rotation)
}

/// Rotation about +Y by `yaw` radians.
#[must_use]
pub fn yaw_rotation(yaw: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw)
}

/// Rotation delta from per-frame device angles in degrees.
///
/// Applied as `R_y(yaw) * R_x(pitch) * R_z(roll)`, where the angle vector is
/// `(pitch, yaw, roll)` in channel order.
#[must_use]
pub fn euler_delta_deg(angles: &Vector3<f64>) -> UnitQuaternion<f64> {
    let pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angles.x.to_radians());
    let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angles.y.to_radians());
    let roll = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angles.z.to_radians());
    yaw * pitch * roll
}

/// Build a matrix from 16 column-major values.
#[must_use]
pub fn mat4_from_columns(values: &[f64; 16]) -> Mat4 {
    Matrix4::from_column_slice(values)
}

/// Flatten a matrix into 16 column-major values.
#[must_use]
pub fn mat4_to_columns(m: &Mat4) -> [f64; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

/// Column-major identity values, used as a serde default.
#[must_use]
pub fn identity_columns() -> [f64; 16] {
    mat4_to_columns(&Mat4::identity())
}

// ============================================================================
// Decomposition
// ============================================================================

/// Translation part of a transform.
#[must_use]
pub fn translation_of(m: &Mat4) -> Vector3<f64> {
    Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
}

/// Uniform scale of a transform (length of the first basis column).
#[must_use]
pub fn scale_of(m: &Mat4) -> f64 {
    m.fixed_view::<3, 1>(0, 0).norm()
}

/// Rotation part of a transform, with any uniform scale removed.
///
/// Degenerate columns are left untouched; the result is always a valid unit
/// quaternion, although a degenerate input yields a meaningless rotation.
#[must_use]
pub fn rotation_of(m: &Mat4) -> UnitQuaternion<f64> {
    let mut basis: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
    for mut column in basis.column_iter_mut() {
        let n = column.norm();
        if n > COLUMN_EPSILON {
            column.unscale_mut(n);
        }
    }
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis))
}

/// Re-orthonormalize a rigid transform to remove accumulated drift.
#[must_use]
pub fn orthonormalize(m: &Mat4) -> Mat4 {
    compose_pose(&translation_of(m), &rotation_of(m))
}

/// Apply a transform to a point.
#[must_use]
pub fn transform_point(m: &Mat4, p: &Vector3<f64>) -> Vector3<f64> {
    let h = m * Vector4::new(p.x, p.y, p.z, 1.0);
    if h.w.abs() > COLUMN_EPSILON && (h.w - 1.0).abs() > f64::EPSILON {
        Vector3::new(h.x / h.w, h.y / h.w, h.z / h.w)
    } else {
        Vector3::new(h.x, h.y, h.z)
    }
}

/// Apply the linear part of a transform to a direction.
#[must_use]
pub fn transform_vector(m: &Mat4, v: &Vector3<f64>) -> Vector3<f64> {
    m.fixed_view::<3, 3>(0, 0) * v
}

// ============================================================================
// Quaternion helpers
// ============================================================================

/// Euclidean distance between quaternion components.
#[must_use]
pub fn quat_distance(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>) -> f64 {
    (a.coords - b.coords).norm()
}

/// Return `q` or its negation, whichever lies in the hemisphere of `reference`.
///
/// Both represent the same rotation; picking the near one keeps component
/// distances and interpolation on the short arc.
#[must_use]
pub fn align_hemisphere(reference: &UnitQuaternion<f64>, q: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    if reference.coords.dot(&q.coords) < 0.0 {
        UnitQuaternion::new_unchecked(-q.into_inner())
    } else {
        *q
    }
}

/// Spherical interpolation that never panics; falls back to `to`.
#[must_use]
pub fn slerp(from: &UnitQuaternion<f64>, to: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    if t >= 1.0 {
        return *to;
    }
    from.try_slerp(to, t.max(0.0), 1e-12).unwrap_or(*to)
}

/// Round to a fixed number of decimals.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ============================================================================
// Yaw extraction
// ============================================================================

/// Extracts the heading (rotation about +Y) of an orientation.
///
/// The heading is read from the rotated -Z axis projected onto the ground
/// plane. When that projection vanishes (the orientation looks straight up or
/// down) or the input contains NaN, the angle is undefined and the last valid
/// heading is reused instead of propagating NaN into transforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct YawExtractor {
    last_valid: f64,
}

impl YawExtractor {
    /// Create an extractor whose fallback heading is zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { last_valid: 0.0 }
    }

    /// Heading of `rotation` in radians, in `(-pi, pi]`.
    pub fn extract(&mut self, rotation: &UnitQuaternion<f64>) -> f64 {
        let r = rotation.to_rotation_matrix();
        let m = r.matrix();
        let (s, c) = (m[(0, 2)], m[(2, 2)]);

        let yaw = if s.hypot(c) > YAW_EPSILON {
            s.atan2(c)
        } else {
            f64::NAN
        };

        if yaw.is_finite() {
            self.last_valid = yaw;
            yaw
        } else {
            tracing::trace!(fallback = self.last_valid, "undefined yaw, reusing last heading");
            self.last_valid
        }
    }

    /// Heading-only rotation of `rotation`.
    pub fn yaw_only(&mut self, rotation: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
        yaw_rotation(self.extract(rotation))
    }

    /// Last valid heading in radians.
    #[must_use]
    pub fn last_valid(&self) -> f64 {
        self.last_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    const EPS: f64 = 1e-9;

    #[test]
    fn test_pose_roundtrip_components() {
        let t = Vector3::new(1.0, 2.0, 3.0);
        let q = yaw_rotation(0.3);
        let m = compose_pose(&t, &q);

        assert!((translation_of(&m) - t).norm() < EPS);
        assert!(quat_distance(&align_hemisphere(&q, &rotation_of(&m)), &q) < EPS);
    }

    #[test]
    fn test_rotation_of_removes_scale() {
        let q = yaw_rotation(FRAC_PI_4);
        let m = make_rot(&q) * make_scale(3.0);

        assert!((scale_of(&m) - 3.0).abs() < EPS);
        assert!(rotation_of(&m).angle_to(&q) < 1e-7);
    }

    #[test]
    fn test_transform_point() {
        let m = make_trans(&Vector3::new(0.0, 1.0, 0.0)) * make_scale(2.0);
        let p = transform_point(&m, &Vector3::new(1.0, 1.0, 1.0));
        assert!((p - Vector3::new(2.0, 3.0, 2.0)).norm() < EPS);
    }

    #[test]
    fn test_yaw_extraction() {
        let mut yaw = YawExtractor::new();
        let q = yaw_rotation(0.7) * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.4);

        assert!((yaw.extract(&q) - 0.7).abs() < 1e-9);
        assert!((yaw.extract(&UnitQuaternion::identity())).abs() < EPS);
    }

    #[test]
    fn test_yaw_recovers_from_undefined_heading() {
        let mut yaw = YawExtractor::new();
        yaw.extract(&yaw_rotation(1.2));

        // Looking straight down: heading is undefined
        let down = yaw_rotation(0.5) * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2);
        assert!((yaw.extract(&down) - 1.2).abs() < EPS);

        let nan = UnitQuaternion::new_unchecked(nalgebra::Quaternion::new(f64::NAN, 0.0, 0.0, 0.0));
        assert!((yaw.extract(&nan) - 1.2).abs() < EPS);
    }

    #[test]
    fn test_euler_delta_order() {
        let q = euler_delta_deg(&Vector3::new(0.0, 90.0, 0.0));
        let forward = q * Vector3::new(0.0, 0.0, -1.0);
        assert!((forward - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_align_hemisphere_and_distance() {
        let q = yaw_rotation(0.2);
        let neg = UnitQuaternion::new_unchecked(-q.into_inner());

        assert!(quat_distance(&q, &neg) > 1.9);
        assert!(quat_distance(&q, &align_hemisphere(&q, &neg)) < EPS);
    }

    #[test]
    fn test_slerp_endpoints() {
        let a = UnitQuaternion::identity();
        let b = yaw_rotation(1.0);

        assert!(slerp(&a, &b, 0.0).angle_to(&a) < EPS);
        assert!(slerp(&a, &b, 1.0).angle_to(&b) < EPS);
        assert!((slerp(&a, &b, 0.5).angle() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_round_to() {
        assert!((round_to(0.123_456, 3) - 0.123).abs() < EPS);
        assert!((round_to(-0.000_4, 3)).abs() < EPS);
    }

    #[test]
    fn test_columns_roundtrip() {
        let m = compose_pose(&Vector3::new(4.0, 5.0, 6.0), &yaw_rotation(0.1));
        assert_eq!(mat4_from_columns(&mat4_to_columns(&m)), m);
        assert_eq!(mat4_from_columns(&identity_columns()), Mat4::identity());
    }
}
