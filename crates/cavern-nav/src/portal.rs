//! Portals, display groups and transit detection.
//!
//! A portal is a bounded rectangle in its own XY plane. A navigation transits
//! when its device point sits inside the rectangle just behind the plane
//! while the point one unit further along the platform's +Z lies on or in
//! front of it:
//!
//! ```text
//!              portal local space
//!                    z = 0
//!          z < 0       │       z >= 0
//!     device ● ────────┼──────▶ ● device + platform Z
//!                      │
//!        |x| < w/2, |y| < h/2, viewing mode 3D
//! ```
//!
//! The test is re-derived from the two points every frame; nothing is cached
//! between frames. On crossing, the traveler is remapped next to the active
//! navigation of the portal's display group.

use std::fmt;

use cavern_core::math::{
    make_rot, make_scale, make_trans, orthonormalize, rotation_of, transform_point, transform_vector,
    translation_of,
};
use cavern_core::{ConfigResult, DisplayGroupId, Mat4, NavId, PortalId};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PortalConfig;
use crate::navigation::{Navigation, NavigationSet};

/// How a portal presents the space behind it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewingMode {
    /// Flat picture; cannot be transited.
    #[serde(rename = "2D")]
    TwoD,
    /// Stereoscopic window into the target space.
    #[default]
    #[serde(rename = "3D")]
    ThreeD,
}

impl fmt::Display for ViewingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwoD => f.write_str("2D"),
            Self::ThreeD => f.write_str("3D"),
        }
    }
}

/// Offset between the portal and the arrival point in the target space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExitScreen {
    /// Applied in world space before the active navigation's pose.
    pub translate: Vector3<f64>,
    /// Applied in the active navigation's platform space.
    pub rotate: UnitQuaternion<f64>,
}

impl Default for ExitScreen {
    fn default() -> Self {
        Self {
            translate: Vector3::zeros(),
            rotate: UnitQuaternion::identity(),
        }
    }
}

/// A virtual doorway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    name: String,
    display_group: DisplayGroupId,
    matrix: Mat4,
    width: f64,
    height: f64,
    viewing_mode: ViewingMode,
    transitable: bool,
    exit: ExitScreen,
    screen_transform: Mat4,
}

impl Portal {
    /// Build a portal shown by `display_group`.
    ///
    /// # Errors
    ///
    /// Returns the validation error of `config`.
    pub fn from_config(config: &PortalConfig, display_group: DisplayGroupId) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            name: config.name.clone(),
            display_group,
            matrix: config.matrix(),
            width: config.width,
            height: config.height,
            viewing_mode: config.viewing_mode,
            transitable: config.transitable,
            exit: ExitScreen {
                translate: config.exit_translation(),
                rotate: config.exit_rotation(),
            },
            screen_transform: Mat4::identity(),
        })
    }

    /// Portal name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display group whose active navigation defines the target space.
    #[must_use]
    pub fn display_group(&self) -> DisplayGroupId {
        self.display_group
    }

    /// Portal pose relative to its screen.
    #[must_use]
    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    /// Extent along local X.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Extent along local Y.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Viewing mode.
    #[must_use]
    pub fn viewing_mode(&self) -> ViewingMode {
        self.viewing_mode
    }

    /// Whether crossing teleports.
    #[must_use]
    pub fn is_transitable(&self) -> bool {
        self.transitable
    }

    /// Exit screen offset.
    #[must_use]
    pub fn exit(&self) -> &ExitScreen {
        &self.exit
    }

    /// Transform of the screen the portal is parented to.
    #[must_use]
    pub fn screen_transform(&self) -> &Mat4 {
        &self.screen_transform
    }

    /// Re-parent the portal onto another screen.
    pub fn reparent(&mut self, screen_transform: Mat4) {
        self.screen_transform = screen_transform;
    }

    /// Portal frame in world coordinates.
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        self.screen_transform * self.matrix
    }

    /// Whether the point pair crosses the portal rectangle.
    ///
    /// `near` is the device point, `far` the point one unit further along
    /// the platform's +Z, both in world coordinates.
    #[must_use]
    pub fn is_crossed(&self, near: &Vector3<f64>, far: &Vector3<f64>) -> bool {
        if self.viewing_mode != ViewingMode::ThreeD {
            return false;
        }
        let Some(inverse) = self.world_matrix().try_inverse() else {
            return false;
        };
        let a = transform_point(&inverse, near);
        let b = transform_point(&inverse, far);

        a.x.abs() < self.width / 2.0 && a.y.abs() < self.height / 2.0 && a.z < 0.0 && b.z >= 0.0
    }

    /// Device pose relative to the portal frame.
    #[must_use]
    pub fn local_pose(&self, device_world: &Mat4) -> Option<(Vector3<f64>, UnitQuaternion<f64>)> {
        let local = self.world_matrix().try_inverse()? * device_world;
        Some((translation_of(&local), rotation_of(&local)))
    }
}

/// Screens sharing one active navigation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayGroup {
    name: String,
    navigations: Vec<NavId>,
    active: NavId,
    portals: Vec<PortalId>,
}

impl DisplayGroup {
    /// Create a group; `active` must be one of `navigations`.
    #[must_use]
    pub fn new(name: impl Into<String>, navigations: Vec<NavId>, active: NavId) -> Self {
        Self {
            name: name.into(),
            navigations,
            active,
            portals: Vec::new(),
        }
    }

    /// Group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member navigations.
    #[must_use]
    pub fn navigations(&self) -> &[NavId] {
        &self.navigations
    }

    /// Whether `id` is a member.
    #[must_use]
    pub fn contains(&self, id: NavId) -> bool {
        self.navigations.contains(&id)
    }

    /// Active navigation.
    #[must_use]
    pub fn active(&self) -> NavId {
        self.active
    }

    /// Make a member active. Returns whether the active navigation changed.
    pub fn set_active(&mut self, id: NavId) -> bool {
        if self.active == id || !self.contains(id) {
            return false;
        }
        self.active = id;
        true
    }

    /// Portals shown by this group.
    #[must_use]
    pub fn portals(&self) -> &[PortalId] {
        &self.portals
    }

    /// Attach a portal.
    pub fn add_portal(&mut self, portal: PortalId) {
        self.portals.push(portal);
    }

    /// Drop a member. If it was active, the first remaining member takes
    /// over; returns the new active navigation in that case.
    pub fn remove_navigation(&mut self, id: NavId) -> Option<NavId> {
        self.navigations.retain(|n| *n != id);
        if self.active != id {
            return None;
        }
        let next = self.navigations.first().copied()?;
        self.active = next;
        Some(next)
    }
}

/// One detected crossing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitRecord {
    /// Display group of the portal.
    pub display_group: DisplayGroupId,
    /// Crossed portal.
    pub portal: PortalId,
    /// Teleported navigation.
    pub navigation: NavId,
}

/// Portal crossing test and remap.
pub struct PortalTransitDetector;

impl PortalTransitDetector {
    /// Whether a navigation may be tested this frame.
    #[must_use]
    pub fn can_transit(navigation: &Navigation) -> bool {
        navigation.config().transit_enabled
            && !navigation.is_blocked()
            && !navigation.integrator().in_dofchange_animation()
    }

    /// Device point and forward test point of a navigation in world space.
    #[must_use]
    pub fn test_points(navigation: &Navigation) -> (Vector3<f64>, Vector3<f64>) {
        let near = navigation.device_world_position();
        let forward = transform_vector(navigation.matrix(), &Vector3::z());
        (near, near + forward)
    }

    /// Remapped matrix of a traveler crossing `portal` into the space of
    /// `active` (pose `active_matrix`, scale `active_scale`).
    ///
    /// `T(exit.t) * Ma * R(exit.r) * S(sa) * T(lp) * R(lr) * T(-station) * S(sa)^-1`
    #[must_use]
    pub fn remap(
        portal: &Portal,
        traveler: &Navigation,
        active_matrix: &Mat4,
        active_scale: f64,
    ) -> Option<Mat4> {
        let (local_position, local_rotation) = portal.local_pose(&traveler.device_world_matrix())?;
        let station = traveler.device().station_position();
        let exit = portal.exit();

        let matrix = make_trans(&exit.translate)
            * active_matrix
            * make_rot(&exit.rotate)
            * make_scale(active_scale)
            * make_trans(&local_position)
            * make_rot(&local_rotation)
            * make_trans(&-station)
            * make_scale(1.0 / active_scale);
        Some(orthonormalize(&matrix))
    }

    /// Test every transitable portal against every eligible navigation and
    /// teleport the travelers. Each navigation transits at most once.
    pub fn detect_and_transit(
        navigations: &mut NavigationSet,
        portals: &[Portal],
        groups: &[DisplayGroup],
    ) -> Vec<TransitRecord> {
        let mut records = Vec::new();

        for traveler_id in navigations.ids() {
            let Some(record) = Self::find_crossing(navigations, portals, groups, traveler_id) else {
                continue;
            };
            let Some((matrix, scale)) = Self::target_pose(navigations, portals, groups, &record) else {
                continue;
            };

            if let Some(traveler) = navigations.get_mut(traveler_id) {
                let integrator = traveler.integrator_mut();
                integrator.set_abs_mat(matrix);
                integrator.set_scale(scale, 0.0, false);
                integrator.cancel_scale_stop();
                traveler.clear_trace();
                info!(
                    navigation = %traveler_id,
                    portal = %portals[record.portal.0].name(),
                    "portal transit"
                );
                records.push(record);
            }
        }

        records
    }

    fn find_crossing(
        navigations: &NavigationSet,
        portals: &[Portal],
        groups: &[DisplayGroup],
        traveler_id: NavId,
    ) -> Option<TransitRecord> {
        let traveler = navigations.get(traveler_id)?;
        if !Self::can_transit(traveler) {
            return None;
        }
        let (near, far) = Self::test_points(traveler);

        portals.iter().enumerate().find_map(|(index, portal)| {
            if !portal.is_transitable() {
                return None;
            }
            let group = groups.get(portal.display_group().0)?;
            if group.active() == traveler_id || !portal.is_crossed(&near, &far) {
                return None;
            }
            debug!(navigation = %traveler_id, portal = portal.name(), "portal crossed");
            Some(TransitRecord {
                display_group: portal.display_group(),
                portal: PortalId(index),
                navigation: traveler_id,
            })
        })
    }

    fn target_pose(
        navigations: &NavigationSet,
        portals: &[Portal],
        groups: &[DisplayGroup],
        record: &TransitRecord,
    ) -> Option<(Mat4, f64)> {
        let portal = portals.get(record.portal.0)?;
        let active = navigations.get(groups.get(record.display_group.0)?.active())?;
        let traveler = navigations.get(record.navigation)?;
        let matrix = Self::remap(portal, traveler, active.matrix(), active.scale())?;
        Some((matrix, active.scale()))
    }
}
