//! Ground following.
//!
//! Keeps a realistic-mode platform anchored to the nearest surface below the
//! device. Every enabled frame casts one ray from the device's platform-local
//! position, raised by the start height, and compares the hit distance with
//! the expected height:
//!
//! ```text
//! difference = round3(hit * L - h * s)
//!
//!   difference < 0          surface above expected height   climb up by -difference * k
//!   0 < difference <= h*s   surface slightly below          climb down by difference * k
//!   difference > h*s        surface far below               fall by fall_velocity, then accelerate
//!   difference == 0         on the ground                   pass through
//!   no hit                  off the mapped terrain          pass through, stop falling
//! ```

use cavern_core::collision::{PickMask, Ray, SurfacePicker};
use cavern_core::math::{make_trans, round_to, transform_point};
use cavern_core::{Mat4, NavigationMode};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::EngineSettings;

/// Ray and speed parameters of ground following.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundSettings {
    /// Fixed ray length.
    pub ray_length: f64,
    /// Fraction of the height difference corrected per frame.
    pub height_modification_factor: f64,
    /// Fall velocity gained per falling frame.
    pub fall_acceleration: f64,
    /// Fall velocity of the first falling frame.
    pub initial_fall_velocity: f64,
    /// World direction of the ray.
    pub pick_direction: Vector3<f64>,
    /// Surfaces considered ground.
    pub mask: PickMask,
}

impl Default for GroundSettings {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for GroundSettings {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            ray_length: settings.ground_ray_length,
            height_modification_factor: settings.height_modification_factor,
            fall_acceleration: settings.fall_acceleration,
            initial_fall_velocity: settings.initial_fall_velocity,
            pick_direction: Vector3::new(0.0, -1.0, 0.0),
            mask: PickMask::ground(),
        }
    }
}

/// Per-frame ground following state, derived from geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroundState {
    /// Pass-through: disabled or not in realistic mode.
    #[default]
    Disabled,
    /// On the ground, or no ground found.
    Grounded,
    /// Converging toward a nearby surface.
    Climbing,
    /// Falling toward a surface far below.
    Falling,
}

/// What the follower needs to know about the navigation this frame.
#[derive(Clone, Copy, Debug)]
pub struct GroundQuery {
    /// Platform scale.
    pub scale: f64,
    /// Device position in platform coordinates.
    pub device_position: Vector3<f64>,
    /// Navigation mode.
    pub mode: NavigationMode,
}

/// Raycast-based vertical correction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundFollower {
    enabled: bool,
    ray_start_height: f64,
    settings: GroundSettings,
    falling: bool,
    fall_velocity: f64,
    state: GroundState,
}

impl GroundFollower {
    /// Create a follower.
    #[must_use]
    pub fn new(enabled: bool, ray_start_height: f64, settings: GroundSettings) -> Self {
        let fall_velocity = settings.initial_fall_velocity;
        Self {
            enabled,
            ray_start_height,
            settings,
            falling: false,
            fall_velocity,
            state: GroundState::Disabled,
        }
    }

    /// A follower that always passes through.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(false, 0.0, GroundSettings::default())
    }

    /// Whether ground following is switched on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch ground following on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.land();
            self.state = GroundState::Disabled;
        }
    }

    /// State of the last update.
    #[must_use]
    pub fn state(&self) -> GroundState {
        self.state
    }

    /// Whether the last update was a falling frame.
    #[must_use]
    pub fn is_falling(&self) -> bool {
        self.falling
    }

    /// Velocity of the next falling frame.
    #[must_use]
    pub fn fall_velocity(&self) -> f64 {
        self.fall_velocity
    }

    /// Stop falling.
    pub fn reset(&mut self) {
        self.land();
    }

    /// Correct `input` toward the ground.
    pub fn update(&mut self, input: &Mat4, query: &GroundQuery, picker: &dyn SurfacePicker) -> Mat4 {
        if !self.enabled || !query.mode.is_realistic() {
            self.state = GroundState::Disabled;
            return *input;
        }

        let expected = self.ray_start_height * query.scale;
        let local = Vector3::new(query.device_position.x, self.ray_start_height, query.device_position.z) * query.scale;
        let origin = transform_point(input, &local);
        let ray = Ray::new(origin, self.settings.pick_direction, self.settings.ray_length);

        let Some(hit) = picker.pick(&ray, &self.settings.mask) else {
            self.land();
            self.state = GroundState::Grounded;
            return *input;
        };

        let difference = round_to(hit.distance * self.settings.ray_length - expected, 3);

        if difference < 0.0 || (difference > 0.0 && difference <= expected) {
            self.land();
            self.state = GroundState::Climbing;
            let step = ray.direction * difference * self.settings.height_modification_factor;
            make_trans(&step) * input
        } else if difference > expected {
            self.falling = true;
            self.state = GroundState::Falling;
            let step = ray.direction * self.fall_velocity;
            trace!(velocity = self.fall_velocity, difference, "falling");
            self.fall_velocity += self.settings.fall_acceleration;
            make_trans(&step) * input
        } else {
            self.land();
            self.state = GroundState::Grounded;
            *input
        }
    }

    fn land(&mut self) {
        self.falling = false;
        self.fall_velocity = self.settings.initial_fall_velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cavern_core::collision::{BoxTerrain, NoSurfaces};
    use cavern_core::math::translation_of;

    const EPS: f64 = 1e-9;

    fn query(mode: NavigationMode) -> GroundQuery {
        GroundQuery {
            scale: 1.0,
            device_position: Vector3::zeros(),
            mode,
        }
    }

    fn at_height(y: f64) -> Mat4 {
        make_trans(&Vector3::new(0.0, y, 0.0))
    }

    fn follower() -> GroundFollower {
        GroundFollower::new(true, 1.0, GroundSettings::default())
    }

    #[test]
    fn test_disabled_and_unrealistic_pass_through() {
        let terrain = BoxTerrain::flat(0.0);
        let input = at_height(5.0);

        let mut off = GroundFollower::disabled();
        assert_eq!(off.update(&input, &query(NavigationMode::Realistic), &terrain), input);
        assert_eq!(off.state(), GroundState::Disabled);

        let mut on = follower();
        assert_eq!(on.update(&input, &query(NavigationMode::Unrealistic), &terrain), input);
        assert_eq!(on.state(), GroundState::Disabled);
    }

    #[test]
    fn test_no_hit_passes_through() {
        let mut ground = follower();
        let input = at_height(3.0);
        assert_eq!(ground.update(&input, &query(NavigationMode::Realistic), &NoSurfaces), input);
        assert_eq!(ground.state(), GroundState::Grounded);
        assert!(!ground.is_falling());
    }

    #[test]
    fn test_on_ground_is_stable() {
        let mut ground = follower();
        let input = at_height(0.0);
        assert_eq!(ground.update(&input, &query(NavigationMode::Realistic), &BoxTerrain::flat(0.0)), input);
        assert_eq!(ground.state(), GroundState::Grounded);
    }

    #[test]
    fn test_climb_up_when_surface_is_above() {
        let mut ground = follower();
        // Platform 0.4 below the surface: difference = 0.6 - 1.0 = -0.4
        let out = ground.update(&at_height(-0.4), &query(NavigationMode::Realistic), &BoxTerrain::flat(0.0));
        assert_eq!(ground.state(), GroundState::Climbing);
        assert!((translation_of(&out).y - (-0.4 + 0.4 * 0.15)).abs() < EPS);
    }

    #[test]
    fn test_climb_down_when_surface_is_slightly_below() {
        let mut ground = follower();
        let out = ground.update(&at_height(0.5), &query(NavigationMode::Realistic), &BoxTerrain::flat(0.0));
        assert_eq!(ground.state(), GroundState::Climbing);
        assert!((translation_of(&out).y - (0.5 - 0.5 * 0.15)).abs() < EPS);
    }

    #[test]
    fn test_converges_and_settles() {
        let mut ground = follower();
        let terrain = BoxTerrain::flat(0.0);
        let mut m = at_height(0.8);
        for _ in 0..200 {
            m = ground.update(&m, &query(NavigationMode::Realistic), &terrain);
        }
        assert!(translation_of(&m).y.abs() < 0.01);
        assert_eq!(ground.state(), GroundState::Grounded);
    }

    #[test]
    fn test_fall_accelerates_monotonically() {
        let mut ground = follower();
        let terrain = BoxTerrain::flat(0.0);
        let mut m = at_height(30.0);

        for i in 0..20 {
            let before = translation_of(&m).y;
            let velocity = ground.fall_velocity();
            assert!((velocity - (0.05 + 0.005 * f64::from(i))).abs() < EPS);

            m = ground.update(&m, &query(NavigationMode::Realistic), &terrain);
            assert!(ground.is_falling());
            assert!((before - translation_of(&m).y - velocity).abs() < EPS);
        }
    }

    #[test]
    fn test_landing_resets_velocity() {
        let mut ground = follower();
        let terrain = BoxTerrain::flat(0.0);
        let mut m = at_height(20.0);
        for _ in 0..5 {
            m = ground.update(&m, &query(NavigationMode::Realistic), &terrain);
        }
        assert!(ground.fall_velocity() > 0.05);

        ground.update(&at_height(0.5), &query(NavigationMode::Realistic), &terrain);
        assert!(!ground.is_falling());
        assert!((ground.fall_velocity() - 0.05).abs() < EPS);
    }

    #[test]
    fn test_ray_starts_at_scaled_device_position() {
        // Step only under x in [1, 3]
        let terrain = BoxTerrain::new().with_box(
            "step",
            cavern_core::BoundingBox::new(Vector3::new(1.0, -1.0, -1.0), Vector3::new(3.0, 0.0, 1.0)),
        );
        let input = at_height(0.3);
        let device_position = Vector3::new(1.0, 1.7, 0.0);

        // Scale 2: ray starts at x = 2, above the step
        let mut ground = follower();
        let big = GroundQuery {
            scale: 2.0,
            device_position,
            mode: NavigationMode::Realistic,
        };
        let out = ground.update(&input, &big, &terrain);
        assert_eq!(ground.state(), GroundState::Climbing);
        assert!((translation_of(&out).y - (0.3 - 0.3 * 0.15)).abs() < EPS);

        // Scale 0.5: ray starts at x = 0.5, beside the step
        let mut ground = follower();
        let small = GroundQuery { scale: 0.5, ..big };
        assert_eq!(ground.update(&input, &small, &terrain), input);
        assert_eq!(ground.state(), GroundState::Grounded);
    }
}
