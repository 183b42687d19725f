//! Frame driver tying devices, integrators, coupling and portals together.
//!
//! # Frame order
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ read devices │──▶│   buttons    │──▶│  integrate   │──▶│   coupling   │
//! │ (normalize,  │   │ (reset, dof, │   │ (scale, move,│   │ (propagate,  │
//! │  stations)   │   │  couple, req)│   │  ground)     │   │  animate)    │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                                                 │
//!                    ┌──────────────┐   ┌──────────────┐          │
//!                    │ mode events  │◀──│    traces    │◀── portal transit
//!                    └──────────────┘   └──────────────┘
//! ```
//!
//! Everything runs synchronously inside [`NavigationEngine::tick`]; device
//! samples, tracking matrices and the surface picker are supplied by the
//! caller for each frame.

use std::collections::{BTreeMap, HashMap};

use cavern_core::collision::SurfacePicker;
use cavern_core::{
    ConfigError, ConfigResult, DisplayGroupId, FrameTime, Mat4, NavError, NavId, NavResult, NavigationMode, PortalId,
    RawSample,
};
use cavern_devices::ButtonEvent;
use tracing::{debug, info};

use crate::colors::ColorPool;
use crate::config::{DisplayGroupConfig, EngineSettings, NavigationConfig, PortalConfig, SceneConfig};
use crate::coupling::{CouplingGraph, TriggerOutcome};
use crate::events::{FrameReport, NavigationEvent};
use crate::navigation::{Navigation, NavigationSet};
use crate::portal::{DisplayGroup, Portal, PortalTransitDetector};

/// Per-frame data supplied by the host.
#[derive(Clone, Debug, Default)]
pub struct FrameInput {
    /// Raw samples keyed by device name.
    pub samples: HashMap<String, RawSample>,
    /// Tracked matrices keyed by tracking target name.
    pub tracking: HashMap<String, Mat4>,
}

impl FrameInput {
    /// Empty input: no device data, nothing tracked.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device sample.
    #[must_use]
    pub fn with_sample(mut self, device: impl Into<String>, sample: RawSample) -> Self {
        self.samples.insert(device.into(), sample);
        self
    }

    /// Add a tracked matrix.
    #[must_use]
    pub fn with_tracking(mut self, target: impl Into<String>, matrix: Mat4) -> Self {
        self.tracking.insert(target.into(), matrix);
        self
    }
}

/// Multi-user navigation engine.
#[derive(Debug)]
pub struct NavigationEngine {
    settings: EngineSettings,
    navigations: NavigationSet,
    coupling: CouplingGraph,
    portals: Vec<Portal>,
    display_groups: Vec<DisplayGroup>,
    colors: ColorPool,
    reported_modes: BTreeMap<NavId, NavigationMode>,
    pending: Vec<NavigationEvent>,
}

impl NavigationEngine {
    /// Create an empty engine.
    ///
    /// # Errors
    ///
    /// Returns the validation error of `settings`.
    pub fn new(settings: EngineSettings) -> ConfigResult<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            navigations: NavigationSet::new(),
            coupling: CouplingGraph::new(),
            portals: Vec::new(),
            display_groups: Vec::new(),
            colors: ColorPool::default(),
            reported_modes: BTreeMap::new(),
            pending: Vec::new(),
        })
    }

    /// Replace the trail color service.
    #[must_use]
    pub fn with_color_pool(mut self, colors: ColorPool) -> Self {
        self.colors = colors;
        self
    }

    /// Build an engine with every navigation and display group of a scene.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error of the scene.
    pub fn from_scene(scene: &SceneConfig) -> ConfigResult<Self> {
        let mut engine = Self::new(scene.settings.clone())?;
        for navigation in &scene.navigations {
            engine.add_navigation(navigation.clone())?;
        }
        for group in &scene.display_groups {
            engine.add_display_group(group)?;
        }
        info!(
            navigations = engine.navigations.len(),
            display_groups = engine.display_groups.len(),
            portals = engine.portals.len(),
            "scene loaded"
        );
        Ok(engine)
    }

    /// Engine-wide settings.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Add a navigation.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate name or an invalid configuration.
    pub fn add_navigation(&mut self, config: NavigationConfig) -> ConfigResult<NavId> {
        if self.navigations.find_by_name(&config.name).is_some() {
            return Err(ConfigError::DuplicateName {
                kind: "navigation",
                name: config.name,
            });
        }

        let color = self.colors.acquire();
        let settings = &self.settings;
        let id = match self
            .navigations
            .insert_with(|id| Navigation::new(id, config, settings, color))
        {
            Ok(id) => id,
            Err(err) => {
                self.colors.release(color);
                return Err(err);
            }
        };

        if let Some(nav) = self.navigations.get(id) {
            self.reported_modes.insert(id, nav.mode());
        }
        Ok(id)
    }

    /// Remove a navigation, dissolving its couplings and returning its color.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::NavigationNotFound`] for an unknown handle.
    pub fn remove_navigation(&mut self, id: NavId) -> NavResult<Navigation> {
        if !self.navigations.contains(id) {
            return Err(NavError::NavigationNotFound(id));
        }

        let members = self.coupling.clear_couplings(&mut self.navigations, id);
        if members.len() > 1 {
            self.pending.push(NavigationEvent::CouplingChanged { members, coupled: false });
        }

        for (index, group) in self.display_groups.iter_mut().enumerate() {
            if let Some(next) = group.remove_navigation(id) {
                self.pending.push(NavigationEvent::ActiveNavigationChanged {
                    display_group: DisplayGroupId(index),
                    navigation: next,
                });
            }
        }

        let navigation = self.navigations.remove(id).ok_or(NavError::NavigationNotFound(id))?;
        self.colors.release(navigation.color());
        self.reported_modes.remove(&id);
        info!(navigation = %navigation.name(), "navigation removed");
        Ok(navigation)
    }

    /// Add a display group and its portals.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate or empty group, unresolved navigation names or
    /// an invalid portal.
    pub fn add_display_group(&mut self, config: &DisplayGroupConfig) -> ConfigResult<DisplayGroupId> {
        if self.display_groups.iter().any(|g| g.name() == config.name) {
            return Err(ConfigError::DuplicateName {
                kind: "display group",
                name: config.name.clone(),
            });
        }
        if config.navigations.is_empty() {
            return Err(ConfigError::EmptyDisplayGroup(config.name.clone()));
        }

        let members = config
            .navigations
            .iter()
            .map(|name| self.resolve_navigation(name))
            .collect::<ConfigResult<Vec<NavId>>>()?;
        let active = match &config.active {
            Some(name) => {
                let id = self.resolve_navigation(name)?;
                if !members.contains(&id) {
                    return Err(ConfigError::UnknownReference {
                        kind: "display group member",
                        name: name.clone(),
                    });
                }
                id
            }
            None => members[0],
        };

        for portal in &config.portals {
            portal.validate()?;
            self.check_portal_name(&portal.name)?;
        }

        let id = DisplayGroupId(self.display_groups.len());
        self.display_groups.push(DisplayGroup::new(config.name.clone(), members, active));
        for portal in &config.portals {
            self.add_portal(id, portal)?;
        }
        debug!(display_group = %config.name, active = %active, "display group added");
        Ok(id)
    }

    /// Add a portal to a display group.
    ///
    /// # Errors
    ///
    /// Fails on an unknown group, a duplicate name or an invalid portal.
    pub fn add_portal(&mut self, group: DisplayGroupId, config: &PortalConfig) -> ConfigResult<PortalId> {
        self.check_portal_name(&config.name)?;
        let portal = Portal::from_config(config, group)?;
        let Some(display_group) = self.display_groups.get_mut(group.0) else {
            return Err(ConfigError::UnknownReference {
                kind: "display group",
                name: group.to_string(),
            });
        };

        let id = PortalId(self.portals.len());
        display_group.add_portal(id);
        self.portals.push(portal);
        debug!(portal = %config.name, display_group = %group, "portal added");
        Ok(id)
    }

    fn resolve_navigation(&self, name: &str) -> ConfigResult<NavId> {
        self.navigations
            .find_by_name(name)
            .map(Navigation::id)
            .ok_or_else(|| ConfigError::UnknownReference {
                kind: "navigation",
                name: name.to_string(),
            })
    }

    fn check_portal_name(&self, name: &str) -> ConfigResult<()> {
        if self.portals.iter().any(|p| p.name() == name) {
            return Err(ConfigError::DuplicateName {
                kind: "portal",
                name: name.to_string(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Navigation by handle.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::NavigationNotFound`] for an unknown handle.
    pub fn navigation(&self, id: NavId) -> NavResult<&Navigation> {
        self.navigations.get(id).ok_or(NavError::NavigationNotFound(id))
    }

    /// Navigation by configured name.
    #[must_use]
    pub fn navigation_by_name(&self, name: &str) -> Option<&Navigation> {
        self.navigations.find_by_name(name)
    }

    /// All navigations.
    #[must_use]
    pub fn navigations(&self) -> &NavigationSet {
        &self.navigations
    }

    /// Portal by handle.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::PortalNotFound`] for an unknown handle.
    pub fn portal(&self, id: PortalId) -> NavResult<&Portal> {
        self.portals.get(id.0).ok_or(NavError::PortalNotFound(id))
    }

    /// All portals.
    #[must_use]
    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }

    /// Move a portal onto another screen.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::PortalNotFound`] for an unknown handle.
    pub fn reparent_portal(&mut self, id: PortalId, screen_transform: Mat4) -> NavResult<()> {
        let portal = self.portals.get_mut(id.0).ok_or(NavError::PortalNotFound(id))?;
        portal.reparent(screen_transform);
        Ok(())
    }

    /// Display group by handle.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::DisplayGroupNotFound`] for an unknown handle.
    pub fn display_group(&self, id: DisplayGroupId) -> NavResult<&DisplayGroup> {
        self.display_groups.get(id.0).ok_or(NavError::DisplayGroupNotFound(id))
    }

    /// All display groups.
    #[must_use]
    pub fn display_groups(&self) -> &[DisplayGroup] {
        &self.display_groups
    }

    /// Coupling relation.
    #[must_use]
    pub fn coupling(&self) -> &CouplingGraph {
        &self.coupling
    }

    fn ensure(&self, id: NavId) -> NavResult<()> {
        if self.navigations.contains(id) {
            Ok(())
        } else {
            Err(NavError::NavigationNotFound(id))
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Couple two navigations. Reported with the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::NavigationNotFound`] for an unknown handle.
    pub fn couple(&mut self, a: NavId, b: NavId) -> NavResult<bool> {
        self.ensure(a)?;
        self.ensure(b)?;
        let changed = self.coupling.couple(&mut self.navigations, a, b);
        if changed {
            self.pending.push(NavigationEvent::CouplingChanged {
                members: self.coupling.group(a),
                coupled: true,
            });
        }
        Ok(changed)
    }

    /// Remove the edge between two navigations.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::NavigationNotFound`] for an unknown handle.
    pub fn decouple(&mut self, a: NavId, b: NavId) -> NavResult<bool> {
        self.ensure(a)?;
        self.ensure(b)?;
        let changed = self.coupling.decouple(a, b);
        if changed {
            self.pending.push(NavigationEvent::CouplingChanged {
                members: vec![a, b],
                coupled: false,
            });
        }
        Ok(changed)
    }

    /// Remove every coupling of a navigation.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::NavigationNotFound`] for an unknown handle.
    pub fn clear_couplings(&mut self, id: NavId) -> NavResult<Vec<NavId>> {
        self.ensure(id)?;
        let members = self.coupling.clear_couplings(&mut self.navigations, id);
        if members.len() > 1 {
            self.pending.push(NavigationEvent::CouplingChanged {
                members: members.clone(),
                coupled: false,
            });
        }
        Ok(members)
    }

    /// Coupling toggle, as if the navigation pressed its coupling button.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::NavigationNotFound`] for an unknown handle.
    pub fn trigger_coupling(&mut self, id: NavId, now: f64) -> NavResult<TriggerOutcome> {
        self.ensure(id)?;
        let outcome = self
            .coupling
            .trigger_coupling(&mut self.navigations, id, now, &self.settings);
        self.pending.push(Self::coupling_event(id, &outcome));
        Ok(outcome)
    }

    /// Request a mode on a navigation and its coupling group.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::NavigationNotFound`] for an unknown handle.
    pub fn set_mode(&mut self, id: NavId, mode: NavigationMode, now: f64) -> NavResult<()> {
        self.ensure(id)?;
        let members = self.coupling.propagate_mode(&mut self.navigations, id, mode, now);
        info!(navigation = %id, mode = mode.name(), members = ?members, "mode requested");
        Ok(())
    }

    /// Make a navigation the active one of every display group it belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::NavigationNotFound`] for an unknown handle.
    pub fn request_active(&mut self, id: NavId) -> NavResult<Vec<DisplayGroupId>> {
        self.ensure(id)?;
        Ok(self.set_active_groups(id))
    }

    fn set_active_groups(&mut self, id: NavId) -> Vec<DisplayGroupId> {
        let mut changed = Vec::new();
        for (index, group) in self.display_groups.iter_mut().enumerate() {
            if group.set_active(id) {
                let display_group = DisplayGroupId(index);
                info!(display_group = group.name(), navigation = %id, "active navigation changed");
                self.pending.push(NavigationEvent::ActiveNavigationChanged {
                    display_group,
                    navigation: id,
                });
                changed.push(display_group);
            }
        }
        changed
    }

    fn coupling_event(id: NavId, outcome: &TriggerOutcome) -> NavigationEvent {
        match outcome {
            TriggerOutcome::Coupled(members) => NavigationEvent::CouplingChanged {
                members: members.clone(),
                coupled: true,
            },
            TriggerOutcome::Decoupled(members) => NavigationEvent::CouplingChanged {
                members: members.clone(),
                coupled: false,
            },
            TriggerOutcome::NoCandidates => NavigationEvent::CouplingUnavailable { navigation: id },
        }
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Run one frame.
    pub fn tick(&mut self, time: &FrameTime, input: &FrameInput, picker: &dyn SurfacePicker) -> FrameReport {
        let mut report = FrameReport::new(time.frame_number);

        let mut samples = Vec::with_capacity(self.navigations.len());
        for nav in self.navigations.iter_mut() {
            let raw = input.samples.get(nav.device().name());
            let tracked = nav.device().tracking_target().and_then(|t| input.tracking.get(t));
            let (sample, buttons) = nav.read_device(raw, tracked);
            samples.push((nav.id(), sample, buttons));
        }

        for (id, _, buttons) in &samples {
            if let Some(event) = buttons {
                self.handle_buttons(*id, event, time.now);
            }
        }

        let mut deltas = Vec::new();
        for (id, sample, _) in &samples {
            if let Some(nav) = self.navigations.get_mut(*id) {
                if let Some(delta) = nav.integrate(sample, time, picker) {
                    deltas.push((*id, delta));
                }
            }
        }

        self.coupling.propagate(&mut self.navigations, &deltas);
        self.coupling.step(&mut self.navigations, time.now);

        for record in
            PortalTransitDetector::detect_and_transit(&mut self.navigations, &self.portals, &self.display_groups)
        {
            self.pending.push(NavigationEvent::Transited(record));
        }

        for nav in self.navigations.iter_mut() {
            nav.record_trace();
        }

        for nav in self.navigations.iter() {
            let mode = nav.mode();
            if self.reported_modes.insert(nav.id(), mode) != Some(mode) {
                info!(navigation = %nav.name(), mode = mode.name(), "dof mode changed");
                self.pending.push(NavigationEvent::DofModeChanged {
                    navigation: nav.id(),
                    mode,
                });
            }
        }

        report.events = std::mem::take(&mut self.pending);
        report
    }

    fn handle_buttons(&mut self, id: NavId, event: &ButtonEvent, now: f64) {
        let Some(nav) = self.navigations.get_mut(id) else {
            return;
        };
        let map = nav.device().profile().buttons;
        let request = nav
            .config()
            .is_requestable
            .then_some(nav.config().request_button_index)
            .flatten();

        if event.was_pressed(map.reset) {
            nav.reset();
            self.pending.push(NavigationEvent::Reset { navigation: id });
        }

        if event.was_pressed(map.dof) {
            let target = if nav.integrator().in_dofchange_animation() {
                NavigationMode::Unrealistic
            } else {
                nav.mode().toggled()
            };
            let members = self.coupling.propagate_mode(&mut self.navigations, id, target, now);
            info!(navigation = %id, mode = target.name(), members = ?members, "dof toggle");
        }

        if event.was_pressed(map.coupling) {
            let outcome = self
                .coupling
                .trigger_coupling(&mut self.navigations, id, now, &self.settings);
            self.pending.push(Self::coupling_event(id, &outcome));
        }

        if request.is_some_and(|slot| event.was_pressed(slot)) {
            self.set_active_groups(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cavern_core::math::{make_trans, translation_of};
    use cavern_core::NoSurfaces;
    use nalgebra::Vector3;

    fn engine_with(names: &[&str]) -> (NavigationEngine, Vec<NavId>) {
        let mut engine = NavigationEngine::new(EngineSettings::default()).expect("valid settings");
        let ids = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                #[allow(clippy::cast_precision_loss)]
                let x = i as f64;
                let config = NavigationConfig::new(*name, "SpaceMouse", format!("{name}-dev"))
                    .with_starting_matrix(&make_trans(&Vector3::new(x, 0.0, 0.0)));
                engine.add_navigation(config).expect("valid navigation")
            })
            .collect();
        (engine, ids)
    }

    /// Raw sample holding down the raw button behind a logical slot.
    fn press(engine: &NavigationEngine, id: NavId, slot: usize) -> RawSample {
        let raw = engine
            .navigation(id)
            .ok()
            .and_then(|n| n.device().profile().button_sources[slot])
            .expect("slot has a raw button");
        let mut buttons = vec![false; 16];
        buttons[raw] = true;
        RawSample::new(vec![0.0; 8], buttons)
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let (mut engine, _) = engine_with(&["a"]);
        let err = engine
            .add_navigation(NavigationConfig::new("a", "SpaceMouse", "other"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName { kind: "navigation", .. }));
    }

    #[test]
    fn test_unknown_handles() {
        let (mut engine, _) = engine_with(&["a"]);
        assert_eq!(engine.navigation(NavId(5)).unwrap_err(), NavError::NavigationNotFound(NavId(5)));
        assert_eq!(engine.portal(PortalId(0)).unwrap_err(), NavError::PortalNotFound(PortalId(0)));
        assert!(engine.couple(NavId(0), NavId(9)).is_err());
        assert!(engine.remove_navigation(NavId(9)).is_err());
    }

    #[test]
    fn test_display_group_resolution() {
        let (mut engine, ids) = engine_with(&["a", "b"]);

        let empty = DisplayGroupConfig::new("empty", Vec::<String>::new());
        assert_eq!(
            engine.add_display_group(&empty).unwrap_err(),
            ConfigError::EmptyDisplayGroup("empty".into())
        );

        let unknown = DisplayGroupConfig::new("wall", ["a", "ghost"]);
        assert!(matches!(
            engine.add_display_group(&unknown).unwrap_err(),
            ConfigError::UnknownReference { kind: "navigation", .. }
        ));

        let group = DisplayGroupConfig::new("wall", ["a", "b"]).with_portal(PortalConfig::new("door", 2.0, 2.0));
        let id = engine.add_display_group(&group).expect("valid group");
        let group = engine.display_group(id).expect("group");
        assert_eq!(group.navigations(), &ids[..]);
        assert_eq!(group.active(), ids[0]);
        assert_eq!(group.portals(), &[PortalId(0)]);
    }

    #[test]
    fn test_coupling_button_toggles() {
        let (mut engine, ids) = engine_with(&["a", "b"]);
        let mut time = FrameTime::first(60.0);
        let coupling_slot = engine.navigation(ids[0]).expect("live").device().profile().buttons.coupling;

        let input = FrameInput::new().with_sample("a-dev", press(&engine, ids[0], coupling_slot));
        let report = engine.tick(&time, &input, &NoSurfaces);
        assert!(report.events.contains(&NavigationEvent::CouplingChanged {
            members: ids.clone(),
            coupled: true,
        }));
        assert!(engine.coupling().are_linked(ids[0], ids[1]));

        // Held button does not re-trigger
        time = time.next();
        let report = engine.tick(&time, &input, &NoSurfaces);
        assert!(!report
            .events
            .iter()
            .any(|e| matches!(e, NavigationEvent::CouplingChanged { .. })));
    }

    #[test]
    fn test_reset_button() {
        let mut engine = NavigationEngine::new(EngineSettings::default()).expect("valid settings");
        let id = engine
            .add_navigation(NavigationConfig::new("kb", "KeyboardMouse", "kb-dev").with_starting_scale(2.0))
            .expect("valid");
        let reset_slot = engine.navigation(id).expect("live").device().profile().buttons.reset;

        let input = FrameInput::new().with_sample("kb-dev", press(&engine, id, reset_slot));
        let report = engine.tick(&FrameTime::first(60.0), &input, &NoSurfaces);
        assert!(report.events.contains(&NavigationEvent::Reset { navigation: id }));
        assert!((engine.navigation(id).expect("live").scale() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_dof_button_reports_mode_change() {
        let (mut engine, ids) = engine_with(&["a"]);
        let time = FrameTime::first(60.0);
        let dof_slot = engine.navigation(ids[0]).expect("live").device().profile().buttons.dof;

        let input = FrameInput::new().with_sample("a-dev", press(&engine, ids[0], dof_slot));
        let report = engine.tick(&time, &input, &NoSurfaces);
        assert!(report.events.contains(&NavigationEvent::DofModeChanged {
            navigation: ids[0],
            mode: NavigationMode::Unrealistic,
        }));
    }

    #[test]
    fn test_request_button_switches_active_navigation() {
        let mut engine = NavigationEngine::new(EngineSettings::default()).expect("valid settings");
        let a = engine
            .add_navigation(NavigationConfig::new("a", "SpaceMouse", "a-dev"))
            .expect("valid");
        let b = engine
            .add_navigation(NavigationConfig::new("b", "XBoxController", "b-dev").with_request_button(3))
            .expect("valid");
        let group = engine
            .add_display_group(&DisplayGroupConfig::new("wall", ["a", "b"]))
            .expect("valid group");
        assert_eq!(engine.display_group(group).map(DisplayGroup::active), Ok(a));

        let input = FrameInput::new().with_sample("b-dev", press(&engine, b, 3));
        let report = engine.tick(&FrameTime::first(60.0), &input, &NoSurfaces);
        assert_eq!(engine.display_group(group).map(DisplayGroup::active), Ok(b));
        assert!(report.events.contains(&NavigationEvent::ActiveNavigationChanged {
            display_group: group,
            navigation: b,
        }));
    }

    #[test]
    fn test_remove_navigation_releases_partners_and_color() {
        let (mut engine, ids) = engine_with(&["a", "b"]);
        let color = engine.navigation(ids[0]).expect("live").color();
        engine.trigger_coupling(ids[0], 0.0).expect("live");
        assert!(engine.navigation(ids[1]).expect("live").is_blocked());

        engine.remove_navigation(ids[0]).expect("live");
        assert!(!engine.coupling().is_coupled(ids[1]));

        // The former anchor finishes its own short animation, then resumes
        let report = engine.tick(&FrameTime::new(1, 0.02, 0.02), &FrameInput::new(), &NoSurfaces);
        assert!(!engine.navigation(ids[1]).expect("live").is_blocked());
        assert!(report.events.contains(&NavigationEvent::CouplingChanged {
            members: ids.clone(),
            coupled: false,
        }));

        let c = engine
            .add_navigation(NavigationConfig::new("c", "SpaceMouse", "c-dev"))
            .expect("valid");
        assert_eq!(engine.navigation(c).expect("live").color(), color);
    }

    #[test]
    fn test_tracking_target_moves_station() {
        let mut engine = NavigationEngine::new(EngineSettings::default()).expect("valid settings");
        let id = engine
            .add_navigation(NavigationConfig::new("a", "SpaceMouse", "a-dev").with_tracking_target("wand"))
            .expect("valid");
        let input = FrameInput::new().with_tracking("wand", make_trans(&Vector3::new(0.0, 1.2, -0.5)));

        engine.tick(&FrameTime::first(60.0), &input, &NoSurfaces);
        let nav = engine.navigation(id).expect("live");
        assert!((nav.device_world_position() - Vector3::new(0.0, 1.2, -0.5)).norm() < 1e-12);
        assert_eq!(translation_of(nav.matrix()), Vector3::zeros());
    }
}
