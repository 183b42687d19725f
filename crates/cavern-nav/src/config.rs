//! Navigation, portal and engine configuration.
//!
//! All structures deserialize from JSON with sensible defaults, so a scene
//! only has to spell out what differs from them.
//!
//! # Example
//!
//! ```rust
//! use cavern_nav::config::{EngineSettings, NavigationConfig};
//!
//! let settings = EngineSettings::default()
//!     .with_coupling_distance(5.0)
//!     .with_scale_stop_duration(0.0);
//!
//! let nav = NavigationConfig::new("alice", "SpaceMouse", "spacemouse-0")
//!     .with_starting_scale(2.0)
//!     .with_ground_following(true, 0.75);
//!
//! assert!(settings.validate().is_ok());
//! assert!(nav.validate().is_ok());
//! ```

use cavern_core::math::{identity_columns, mat4_from_columns};
use cavern_core::{ConfigError, ConfigResult, Mat4, NavigationMode, ScaleLimits, BUTTON_COUNT};
use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::portal::ViewingMode;

// ============================================================================
// Engine settings
// ============================================================================

/// Engine-wide tuning shared by every navigation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Smallest platform scale.
    pub min_scale: f64,
    /// Largest platform scale.
    pub max_scale: f64,
    /// Length of the scale detent after snapping onto a level (seconds).
    pub scale_stop_duration: f64,
    /// World distance within which coupling candidates are found.
    pub coupling_distance: f64,
    /// Animate newly coupled navigations toward their nearest partner.
    pub animate_coupling: bool,
    /// Length of the ground-following ray.
    pub ground_ray_length: f64,
    /// Fraction of the height difference corrected per frame.
    pub height_modification_factor: f64,
    /// Fall velocity gained per falling frame.
    pub fall_acceleration: f64,
    /// Fall velocity of the first falling frame.
    pub initial_fall_velocity: f64,
    /// Maximum number of points in a movement trace.
    pub trace_length: usize,
    /// Minimum distance between consecutive trace points.
    pub trace_spacing: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            min_scale: cavern_core::DEFAULT_MIN_SCALE,
            max_scale: cavern_core::DEFAULT_MAX_SCALE,
            scale_stop_duration: 0.5,
            coupling_distance: 7.0,
            animate_coupling: true,
            ground_ray_length: 100.0,
            height_modification_factor: 0.15,
            fall_acceleration: 0.005,
            initial_fall_velocity: 0.05,
            trace_length: 50,
            trace_spacing: 0.05,
        }
    }
}

impl EngineSettings {
    /// Validated scale limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidScaleLimits`] for inverted or
    /// non-positive bounds.
    pub fn scale_limits(&self) -> ConfigResult<ScaleLimits> {
        ScaleLimits::new(self.min_scale, self.max_scale)
    }

    /// Check every setting.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.scale_limits()?;
        Ok(())
    }

    /// Set the scale limits.
    #[must_use]
    pub fn with_scale_limits(mut self, min: f64, max: f64) -> Self {
        self.min_scale = min;
        self.max_scale = max;
        self
    }

    /// Set the scale detent duration.
    #[must_use]
    pub fn with_scale_stop_duration(mut self, seconds: f64) -> Self {
        self.scale_stop_duration = seconds.max(0.0);
        self
    }

    /// Set the coupling search radius.
    #[must_use]
    pub fn with_coupling_distance(mut self, distance: f64) -> Self {
        self.coupling_distance = distance.max(0.0);
        self
    }

    /// Enable or disable coupling animations.
    #[must_use]
    pub fn with_coupling_animation(mut self, animate: bool) -> Self {
        self.animate_coupling = animate;
        self
    }

    /// Set the ground-following ray length.
    #[must_use]
    pub fn with_ground_ray_length(mut self, length: f64) -> Self {
        self.ground_ray_length = length.max(0.0);
        self
    }

    /// Set the height modification factor.
    #[must_use]
    pub fn with_height_modification_factor(mut self, factor: f64) -> Self {
        self.height_modification_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Set the movement trace shape.
    #[must_use]
    pub fn with_trace(mut self, length: usize, spacing: f64) -> Self {
        self.trace_length = length;
        self.trace_spacing = spacing.max(0.0);
        self
    }
}

// ============================================================================
// Navigation configuration
// ============================================================================

/// Ground following switch and ray start height `[enabled, start_height]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundFollowingSettings(pub bool, pub f64);

impl GroundFollowingSettings {
    /// Whether ground following is enabled.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.0
    }

    /// Height above the platform at which the ray starts.
    #[must_use]
    pub fn start_height(&self) -> f64 {
        self.1
    }
}

impl Default for GroundFollowingSettings {
    fn default() -> Self {
        Self(false, 0.75)
    }
}

/// Configuration of one navigation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Unique navigation name.
    pub name: String,
    /// Initial platform pose, 16 column-major values.
    #[serde(default = "identity_columns")]
    pub starting_matrix: [f64; 16],
    /// Initial platform scale.
    #[serde(default = "default_scale")]
    pub starting_scale: f64,
    /// Device kind name.
    pub device_type: String,
    /// Device name as delivered by the device daemon.
    pub device_name: String,
    /// Station pose used without tracking data.
    #[serde(default = "identity_columns")]
    pub no_tracking_matrix: [f64; 16],
    /// `[enabled, start_height]`.
    #[serde(default)]
    pub ground_following: GroundFollowingSettings,
    /// Invert translation and rotation input.
    #[serde(default)]
    pub invert: bool,
    /// Tracking target supplying the device station.
    #[serde(default)]
    pub tracking_target_name: Option<String>,
    /// May take over display groups on request.
    #[serde(default)]
    pub is_requestable: bool,
    /// Logical button slot of the request button.
    #[serde(default)]
    pub request_button_index: Option<usize>,
    /// Whether portals may teleport this navigation.
    #[serde(default = "default_true")]
    pub transit_enabled: bool,
    /// Mode after creation and reset.
    #[serde(default)]
    pub starting_mode: NavigationMode,
}

fn default_scale() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl NavigationConfig {
    /// Configuration with defaults for everything but the identity fields.
    #[must_use]
    pub fn new(name: impl Into<String>, device_type: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            starting_matrix: identity_columns(),
            starting_scale: 1.0,
            device_type: device_type.into(),
            device_name: device_name.into(),
            no_tracking_matrix: identity_columns(),
            ground_following: GroundFollowingSettings::default(),
            invert: false,
            tracking_target_name: None,
            is_requestable: false,
            request_button_index: None,
            transit_enabled: true,
            starting_mode: NavigationMode::Realistic,
        }
    }

    /// Set the starting pose.
    #[must_use]
    pub fn with_starting_matrix(mut self, matrix: &Mat4) -> Self {
        self.starting_matrix = cavern_core::math::mat4_to_columns(matrix);
        self
    }

    /// Set the starting scale.
    #[must_use]
    pub fn with_starting_scale(mut self, scale: f64) -> Self {
        self.starting_scale = scale;
        self
    }

    /// Set the starting mode.
    #[must_use]
    pub fn with_starting_mode(mut self, mode: NavigationMode) -> Self {
        self.starting_mode = mode;
        self
    }

    /// Set the no-tracking station pose.
    #[must_use]
    pub fn with_no_tracking_matrix(mut self, matrix: &Mat4) -> Self {
        self.no_tracking_matrix = cavern_core::math::mat4_to_columns(matrix);
        self
    }

    /// Configure ground following.
    #[must_use]
    pub fn with_ground_following(mut self, enabled: bool, start_height: f64) -> Self {
        self.ground_following = GroundFollowingSettings(enabled, start_height);
        self
    }

    /// Take the station from a tracking target.
    #[must_use]
    pub fn with_tracking_target(mut self, target: impl Into<String>) -> Self {
        self.tracking_target_name = Some(target.into());
        self
    }

    /// Invert input.
    #[must_use]
    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Make the navigation requestable through a logical button slot.
    #[must_use]
    pub fn with_request_button(mut self, index: usize) -> Self {
        self.is_requestable = true;
        self.request_button_index = Some(index);
        self
    }

    /// Allow or forbid portal transit.
    #[must_use]
    pub fn with_transit(mut self, enabled: bool) -> Self {
        self.transit_enabled = enabled;
        self
    }

    /// Starting pose as a matrix.
    #[must_use]
    pub fn starting_matrix(&self) -> Mat4 {
        mat4_from_columns(&self.starting_matrix)
    }

    /// No-tracking station pose as a matrix.
    #[must_use]
    pub fn no_tracking_matrix(&self) -> Mat4 {
        mat4_from_columns(&self.no_tracking_matrix)
    }

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// Rejects non-finite matrices, a non-positive starting scale, a
    /// non-finite ground start height and out-of-range request buttons.
    /// The device type is checked when the device is created.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.starting_matrix.iter().all(|v| v.is_finite()) {
            return Err(ConfigError::MalformedMatrix {
                field: "starting_matrix",
            });
        }
        if !self.no_tracking_matrix.iter().all(|v| v.is_finite()) {
            return Err(ConfigError::MalformedMatrix {
                field: "no_tracking_matrix",
            });
        }
        if !(self.starting_scale.is_finite() && self.starting_scale > 0.0) {
            return Err(ConfigError::InvalidScale {
                navigation: self.name.clone(),
                scale: self.starting_scale,
            });
        }
        if !self.ground_following.start_height().is_finite() {
            return Err(ConfigError::MalformedMatrix {
                field: "ground_following",
            });
        }
        if let Some(index) = self.request_button_index {
            if index >= BUTTON_COUNT {
                return Err(ConfigError::InvalidButtonIndex {
                    index,
                    max: BUTTON_COUNT - 1,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Portals and display groups
// ============================================================================

/// Configuration of one portal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Unique portal name.
    pub name: String,
    /// Portal plane pose, 16 column-major values.
    #[serde(default = "identity_columns")]
    pub matrix: [f64; 16],
    /// Extent along local X.
    pub width: f64,
    /// Extent along local Y.
    pub height: f64,
    /// Viewing mode; only 3D portals can be transited.
    #[serde(default)]
    pub viewing_mode: ViewingMode,
    /// Whether crossing the portal teleports.
    #[serde(default = "default_true")]
    pub transitable: bool,
    /// Exit screen translation.
    #[serde(default)]
    pub exit_translate: [f64; 3],
    /// Exit screen rotation `[angle_deg, axis_x, axis_y, axis_z]`.
    #[serde(default = "default_exit_rotate")]
    pub exit_rotate: [f64; 4],
}

fn default_exit_rotate() -> [f64; 4] {
    [0.0, 0.0, 1.0, 0.0]
}

impl PortalConfig {
    /// Portal of the given size at the origin.
    #[must_use]
    pub fn new(name: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            name: name.into(),
            matrix: identity_columns(),
            width,
            height,
            viewing_mode: ViewingMode::ThreeD,
            transitable: true,
            exit_translate: [0.0; 3],
            exit_rotate: default_exit_rotate(),
        }
    }

    /// Set the portal pose.
    #[must_use]
    pub fn with_matrix(mut self, matrix: &Mat4) -> Self {
        self.matrix = cavern_core::math::mat4_to_columns(matrix);
        self
    }

    /// Set the viewing mode.
    #[must_use]
    pub fn with_viewing_mode(mut self, mode: ViewingMode) -> Self {
        self.viewing_mode = mode;
        self
    }

    /// Set the exit screen offset.
    #[must_use]
    pub fn with_exit(mut self, translate: [f64; 3], rotate: [f64; 4]) -> Self {
        self.exit_translate = translate;
        self.exit_rotate = rotate;
        self
    }

    /// Portal pose as a matrix.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        mat4_from_columns(&self.matrix)
    }

    /// Exit translation as a vector.
    #[must_use]
    pub fn exit_translation(&self) -> Vector3<f64> {
        Vector3::from(self.exit_translate)
    }

    /// Exit rotation as a quaternion. A zero axis yields identity.
    #[must_use]
    pub fn exit_rotation(&self) -> UnitQuaternion<f64> {
        let [angle, x, y, z] = self.exit_rotate;
        Unit::try_new(Vector3::new(x, y, z), 1e-12)
            .map_or_else(UnitQuaternion::identity, |axis| {
                UnitQuaternion::from_axis_angle(&axis, angle.to_radians())
            })
    }

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// Rejects non-positive extents and non-finite matrices.
    pub fn validate(&self) -> ConfigResult<()> {
        let finite = |v: &f64| v.is_finite();
        if !(self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()) {
            return Err(ConfigError::InvalidPortalSize {
                portal: self.name.clone(),
                width: self.width,
                height: self.height,
            });
        }
        if !self.matrix.iter().all(finite) {
            return Err(ConfigError::MalformedMatrix { field: "matrix" });
        }
        if !(self.exit_translate.iter().all(finite) && self.exit_rotate.iter().all(finite)) {
            return Err(ConfigError::MalformedMatrix { field: "exit_screen" });
        }
        Ok(())
    }
}

/// Configuration of one display group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayGroupConfig {
    /// Unique display group name.
    pub name: String,
    /// Member navigation names.
    pub navigations: Vec<String>,
    /// Initially active navigation; defaults to the first member.
    #[serde(default)]
    pub active: Option<String>,
    /// Portals shown on the group's screens.
    #[serde(default)]
    pub portals: Vec<PortalConfig>,
}

impl DisplayGroupConfig {
    /// Display group with the given members and no portals.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, navigations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            navigations: navigations.into_iter().map(Into::into).collect(),
            active: None,
            portals: Vec::new(),
        }
    }

    /// Add a portal.
    #[must_use]
    pub fn with_portal(mut self, portal: PortalConfig) -> Self {
        self.portals.push(portal);
        self
    }
}

// ============================================================================
// Scene
// ============================================================================

/// Error loading a scene description.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The document is not valid scene JSON.
    #[error("Invalid scene JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The scene is well-formed but inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything needed to build an engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Engine-wide settings.
    #[serde(default)]
    pub settings: EngineSettings,
    /// Navigations in creation order.
    #[serde(default)]
    pub navigations: Vec<NavigationConfig>,
    /// Display groups with their portals.
    #[serde(default)]
    pub display_groups: Vec<DisplayGroupConfig>,
}

impl SceneConfig {
    /// Parse a scene from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Json`] on malformed input and
    /// [`SceneError::Config`] when a setting, navigation or portal is invalid.
    pub fn from_json_str(text: &str) -> Result<Self, SceneError> {
        let scene: Self = serde_json::from_str(text)?;
        scene.validate()?;
        Ok(scene)
    }

    /// Check the settings, every navigation and every portal.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.settings.validate()?;
        for nav in &self.navigations {
            nav.validate()?;
        }
        for portal in self.display_groups.iter().flat_map(|g| &g.portals) {
            portal.validate()?;
        }
        Ok(())
    }

    /// Serialize the scene as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Json`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = EngineSettings::default();
        assert!((settings.coupling_distance - 7.0).abs() < 1e-12);
        assert!((settings.initial_fall_velocity - 0.05).abs() < 1e-12);
        assert!(settings.animate_coupling);
        assert!(settings.validate().is_ok());
        assert!(settings.with_scale_limits(10.0, 1.0).validate().is_err());
    }

    #[test]
    fn test_navigation_validation() {
        let nav = NavigationConfig::new("a", "SpaceMouse", "dev");
        assert!(nav.validate().is_ok());

        let bad_scale = nav.clone().with_starting_scale(0.0);
        assert!(matches!(bad_scale.validate(), Err(ConfigError::InvalidScale { .. })));

        let bad_button = nav.clone().with_request_button(BUTTON_COUNT);
        assert!(matches!(bad_button.validate(), Err(ConfigError::InvalidButtonIndex { .. })));

        let mut bad_matrix = nav;
        bad_matrix.starting_matrix[3] = f64::NAN;
        assert_eq!(
            bad_matrix.validate(),
            Err(ConfigError::MalformedMatrix {
                field: "starting_matrix"
            })
        );
    }

    #[test]
    fn test_portal_validation() {
        assert!(PortalConfig::new("p", 4.0, 2.6).validate().is_ok());
        assert!(matches!(
            PortalConfig::new("p", 0.0, 2.6).validate(),
            Err(ConfigError::InvalidPortalSize { .. })
        ));
    }

    #[test]
    fn test_exit_rotation() {
        let portal = PortalConfig::new("p", 1.0, 1.0).with_exit([0.0; 3], [90.0, 0.0, 1.0, 0.0]);
        assert!((portal.exit_rotation().angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);

        let degenerate = PortalConfig::new("p", 1.0, 1.0).with_exit([0.0; 3], [90.0, 0.0, 0.0, 0.0]);
        assert!(degenerate.exit_rotation().angle().abs() < 1e-12);
    }

    #[test]
    fn test_scene_from_json_uses_defaults() {
        let scene = SceneConfig::from_json_str(
            r#"{
                "navigations": [
                    { "name": "alice", "device_type": "SpaceMouse", "device_name": "sm0",
                      "ground_following": [true, 0.75] }
                ],
                "display_groups": [
                    { "name": "wall", "navigations": ["alice"],
                      "portals": [{ "name": "door", "width": 4.0, "height": 2.6, "viewing_mode": "3D" }] }
                ]
            }"#,
        )
        .expect("valid scene");

        let nav = &scene.navigations[0];
        assert!(nav.ground_following.enabled());
        assert!(nav.transit_enabled);
        assert_eq!(nav.starting_matrix(), Mat4::identity());
        assert_eq!(scene.display_groups[0].portals[0].viewing_mode, ViewingMode::ThreeD);
        assert_eq!(scene.settings, EngineSettings::default());
    }

    #[test]
    fn test_scene_json_error() {
        assert!(matches!(SceneConfig::from_json_str("{ nope"), Err(SceneError::Json(_))));
    }

    #[test]
    fn test_scene_rejects_invalid_portal() {
        let result = SceneConfig::from_json_str(
            r#"{
                "navigations": [{ "name": "alice", "device_type": "SpaceMouse", "device_name": "sm0" }],
                "display_groups": [
                    { "name": "wall", "navigations": ["alice"],
                      "portals": [{ "name": "door", "width": 0.0, "height": 2.6 }] }
                ]
            }"#,
        );
        assert!(matches!(
            result,
            Err(SceneError::Config(ConfigError::InvalidPortalSize { .. }))
        ));
    }
}
