//! Motion integration.
//!
//! The [`MotionIntegrator`] accumulates normalized device deltas onto a
//! platform's absolute matrix:
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────────┐   ┌────────────────┐
//! │ DeviceSample │──▶│ scale detent │──▶│ 3-DOF constraint  │──▶│ pivoted delta  │
//! └──────────────┘   └──────────────┘   │ invert, shaping   │   │ D * M          │
//!                                       └───────────────────┘   └───────┬────────┘
//!                                                                       ▼
//!                                                             ┌────────────────────┐
//!                                        public matrix ◀──────│ GroundFollower     │
//!                                                             └────────────────────┘
//! ```
//!
//! The ground follower's output *is* the public matrix, and the next frame
//! accumulates onto it. Coupling and portal transit only ever see the
//! corrected matrix.

use cavern_core::collision::SurfacePicker;
use cavern_core::math::{
    align_hemisphere, compose_pose, euler_delta_deg, make_rot, make_scale, make_trans, orthonormalize,
    quat_distance, rotation_of, round_to, slerp, transform_point, translation_of, yaw_rotation,
};
use cavern_core::{
    DeviceSample, FrameTime, Mat4, NavigationMode, Platform, ScaleLimits, YawExtractor, MIN_ANIMATION_TIME,
    SCALE_SNAP_LEVELS,
};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ground::{GroundFollower, GroundQuery};

/// Relative scale change per unit of the scale channel.
pub const SCALE_STEP: f64 = 0.015;

/// Per-navigation integration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegratorSettings {
    /// Scale clamp.
    pub limits: ScaleLimits,
    /// Scale detent duration (seconds).
    pub scale_stop_duration: f64,
    /// Device translation amplification.
    pub translation_factor: f64,
    /// Device rotation amplification.
    pub rotation_factor: f64,
    /// Invert translation and rotation input.
    pub invert: bool,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            limits: ScaleLimits::default(),
            scale_stop_duration: 0.5,
            translation_factor: 1.0,
            rotation_factor: 1.0,
            invert: false,
        }
    }
}

/// Transform applied by one integration step, for coupled partners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionDelta {
    /// World-space delta `D` with `M' = D * M`.
    pub transform: Mat4,
    /// New scale, if the scale changed this frame.
    pub scale: Option<f64>,
}

/// Animated transition from free flight back to a level pose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DofChangeAnimation {
    /// Rotation when the animation started.
    pub start_rot: UnitQuaternion<f64>,
    /// Yaw-only target rotation.
    pub target_rot: UnitQuaternion<f64>,
    /// Translation held during the animation.
    pub translation: Vector3<f64>,
    /// Frame time at activation.
    pub start_time: f64,
    /// Animation length (seconds).
    pub duration: f64,
}

impl DofChangeAnimation {
    /// Progress at `now`, in `[0, inf)`.
    #[must_use]
    pub fn ratio(&self, now: f64) -> f64 {
        ((now - self.start_time) / self.duration).max(0.0)
    }
}

/// Accumulates device input onto one platform.
#[derive(Clone, Debug)]
pub struct MotionIntegrator {
    platform: Platform,
    settings: IntegratorSettings,
    mode: NavigationMode,
    blocked: bool,
    scale_stop_time: Option<f64>,
    platform_yaw: YawExtractor,
    device_yaw: YawExtractor,
    dof_animation: Option<DofChangeAnimation>,
    ground: GroundFollower,
}

impl MotionIntegrator {
    /// Create an integrator. The scale is clamped into the limits.
    #[must_use]
    pub fn new(matrix: Mat4, scale: f64, mode: NavigationMode, settings: IntegratorSettings) -> Self {
        let mut platform = Platform::new(matrix, scale);
        platform.set_scale(scale, &settings.limits);
        Self {
            platform,
            settings,
            mode,
            blocked: false,
            scale_stop_time: None,
            platform_yaw: YawExtractor::new(),
            device_yaw: YawExtractor::new(),
            dof_animation: None,
            ground: GroundFollower::disabled(),
        }
    }

    /// Attach a ground follower.
    #[must_use]
    pub fn with_ground_follower(mut self, ground: GroundFollower) -> Self {
        self.ground = ground;
        self
    }

    /// Public (ground-corrected) absolute matrix.
    #[must_use]
    pub fn matrix(&self) -> &Mat4 {
        self.platform.matrix()
    }

    /// Current scale.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.platform.scale()
    }

    /// The driven platform.
    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> NavigationMode {
        self.mode
    }

    /// Integration parameters.
    #[must_use]
    pub fn settings(&self) -> &IntegratorSettings {
        &self.settings
    }

    /// Ground follower.
    #[must_use]
    pub fn ground(&self) -> &GroundFollower {
        &self.ground
    }

    /// Whether input is gated off.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Gate input on or off.
    pub fn set_blocked(&mut self, blocked: bool) {
        self.blocked = blocked;
    }

    /// Start time of the active scale detent.
    #[must_use]
    pub fn scale_stop_time(&self) -> Option<f64> {
        self.scale_stop_time
    }

    /// Drop an active scale detent.
    pub fn cancel_scale_stop(&mut self) {
        self.scale_stop_time = None;
    }

    /// Whether the mode-change animation is running.
    #[must_use]
    pub fn in_dofchange_animation(&self) -> bool {
        self.dof_animation.is_some()
    }

    /// The running mode-change animation.
    #[must_use]
    pub fn dof_animation(&self) -> Option<&DofChangeAnimation> {
        self.dof_animation.as_ref()
    }

    /// Overwrite the absolute matrix.
    pub fn set_abs_mat(&mut self, matrix: Mat4) {
        self.platform.set_matrix(matrix);
    }

    /// Set the scale.
    ///
    /// With `consider_snapping`, a change that strictly crosses one of the
    /// snap levels lands exactly on it and starts a detent; while the detent
    /// is active (and on the call that ends it) snapping writes are ignored.
    /// Writes without snapping always apply and end any detent.
    ///
    /// Returns whether the call was applied.
    pub fn set_scale(&mut self, value: f64, now: f64, consider_snapping: bool) -> bool {
        if consider_snapping {
            if let Some(stop) = self.scale_stop_time {
                if now - stop > self.settings.scale_stop_duration {
                    self.scale_stop_time = None;
                }
                return false;
            }
        }

        let limits = self.settings.limits;
        let old = round_to(self.platform.scale(), 6);
        let mut new = limits.clamp(round_to(limits.clamp(value), 6));

        if consider_snapping {
            let crossed = SCALE_SNAP_LEVELS
                .iter()
                .copied()
                .filter(|&level| (old < level && new > level) || (old > level && new < level))
                .min_by(|a, b| (a - old).abs().total_cmp(&(b - old).abs()));
            if let Some(level) = crossed {
                debug!(from = old, to = new, level, "scale snapped");
                new = level;
                self.scale_stop_time = Some(now);
            }
        } else {
            self.scale_stop_time = None;
        }

        self.platform.set_scale(new, &limits);
        true
    }

    /// Switch to free flight immediately, cancelling a level animation.
    pub fn activate_unrealistic_mode(&mut self) {
        if self.dof_animation.take().is_some() {
            debug!("mode-change animation cancelled");
        }
        self.mode = NavigationMode::Unrealistic;
    }

    /// Start the animated return to realistic mode.
    ///
    /// The rotation slerps to the yaw-only rotation at the current heading
    /// over `2 * |dq|` seconds (at least [`MIN_ANIMATION_TIME`]); the mode
    /// flips when the animation completes.
    pub fn activate_realistic_mode(&mut self, now: f64) {
        if self.mode.is_realistic() || self.dof_animation.is_some() {
            return;
        }

        let start_rot = rotation_of(self.platform.matrix());
        let target_rot = align_hemisphere(&start_rot, &self.platform_yaw.yaw_only(&start_rot));
        let duration = (2.0 * quat_distance(&start_rot, &target_rot)).max(MIN_ANIMATION_TIME);

        info!(duration, "mode-change animation started");
        self.dof_animation = Some(DofChangeAnimation {
            start_rot,
            target_rot,
            translation: self.platform.translation(),
            start_time: now,
            duration,
        });
    }

    /// Request a mode. Realistic animates; unrealistic is immediate.
    pub fn set_mode(&mut self, mode: NavigationMode, now: f64) {
        match mode {
            NavigationMode::Realistic => self.activate_realistic_mode(now),
            NavigationMode::Unrealistic => self.activate_unrealistic_mode(),
        }
    }

    /// Back to a pose, scale and mode without animation.
    pub fn reset_to(&mut self, matrix: Mat4, scale: f64, mode: NavigationMode) {
        self.dof_animation = None;
        self.platform.set_matrix(matrix);
        self.set_scale(scale, 0.0, false);
        self.mode = mode;
        self.ground.reset();
    }

    /// Apply a coupled partner's motion.
    pub fn apply_external(&mut self, delta: &MotionDelta) {
        if delta.transform != Mat4::identity() {
            let moved = orthonormalize(&(delta.transform * self.platform.matrix()));
            self.platform.set_matrix(moved);
        }
        if let Some(scale) = delta.scale {
            self.set_scale(scale, 0.0, false);
        }
    }

    /// One frame of integration.
    ///
    /// Returns the applied motion when the platform moved or scaled through
    /// input; ground correction alone is not reported.
    pub fn update(
        &mut self,
        sample: &DeviceSample,
        station: &Mat4,
        time: &FrameTime,
        picker: &dyn SurfacePicker,
    ) -> Option<MotionDelta> {
        if self.blocked {
            return None;
        }

        if self.dof_animation.is_some() {
            self.step_dof_animation(time.now);
            return None;
        }

        let mut scale_change = None;
        if sample.scale() != 0.0 {
            let before = self.platform.scale();
            if self.set_scale(before * (1.0 + sample.scale() * SCALE_STEP), time.now, true)
                && self.platform.scale() != before
            {
                scale_change = Some(self.platform.scale());
            }
        }

        let mut translation = sample.translation();
        let mut rotation = sample.rotation();
        if self.settings.invert {
            translation = -translation;
            rotation = -rotation;
        }
        if self.mode.is_realistic() {
            translation.y = 0.0;
            rotation.x = 0.0;
            rotation.z = 0.0;
        }

        let mut transform = None;
        if translation != Vector3::zeros() || rotation != Vector3::zeros() {
            let delta = self.world_delta(&translation, &rotation, station);
            let moved = orthonormalize(&(delta * self.platform.matrix()));
            self.platform.set_matrix(moved);
            transform = Some(delta);
        }

        let query = GroundQuery {
            scale: self.platform.scale(),
            device_position: translation_of(station),
            mode: self.mode,
        };
        let corrected = self.ground.update(self.platform.matrix(), &query, picker);
        self.platform.set_matrix(corrected);

        if transform.is_none() && scale_change.is_none() {
            return None;
        }
        Some(MotionDelta {
            transform: transform.unwrap_or_else(Mat4::identity),
            scale: scale_change,
        })
    }

    /// World-space delta `T(t) * T(pivot) * R(dr) * T(-pivot)`.
    fn world_delta(&mut self, translation: &Vector3<f64>, rotation: &Vector3<f64>, station: &Mat4) -> Mat4 {
        let scale = self.platform.scale();
        let norm = translation.norm();
        let shaped = if norm > 0.0 {
            translation / norm * norm.min(1.0).powi(3) * self.settings.translation_factor * scale
        } else {
            Vector3::zeros()
        };
        let angles = rotation * self.settings.rotation_factor;

        let platform_yaw = self.platform_yaw.extract(&self.platform.rotation());
        let device_yaw = self.device_yaw.extract(&rotation_of(station));
        let frame = yaw_rotation(platform_yaw + device_yaw);

        let world_translation = frame * shaped;
        let world_rotation = frame * euler_delta_deg(&angles) * frame.inverse();

        let pivot = transform_point(
            &(self.platform.matrix() * make_scale(scale)),
            &translation_of(station),
        );

        make_trans(&world_translation) * make_trans(&pivot) * make_rot(&world_rotation) * make_trans(&-pivot)
    }

    fn step_dof_animation(&mut self, now: f64) {
        let Some(animation) = self.dof_animation else {
            return;
        };

        let ratio = animation.ratio(now);
        if ratio >= 1.0 {
            self.platform
                .set_matrix(compose_pose(&animation.translation, &animation.target_rot));
            self.dof_animation = None;
            self.mode = NavigationMode::Realistic;
            info!("mode-change animation finished");
        } else {
            let rotation = slerp(&animation.start_rot, &animation.target_rot, ratio);
            self.platform
                .set_matrix(compose_pose(&animation.translation, &rotation));
        }
    }
}
