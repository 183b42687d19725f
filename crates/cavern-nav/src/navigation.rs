//! Navigations and the arena that owns them.
//!
//! A [`Navigation`] bundles one device, one motion integrator (with its
//! ground follower and platform), a movement trace and a trail color. The
//! engine keeps navigations in a [`NavigationSet`] and refers to them by
//! [`NavId`]; handles stay valid until the navigation is removed and are
//! never reused.

use cavern_core::collision::SurfacePicker;
use cavern_core::math::{make_scale, transform_point, translation_of};
use cavern_core::{ConfigResult, DeviceSample, FrameTime, Mat4, NavId, NavigationMode, RawSample};
use cavern_devices::{ButtonEvent, Device};
use nalgebra::Vector3;
use tracing::info;

use crate::colors::Color;
use crate::config::{EngineSettings, NavigationConfig};
use crate::ground::{GroundFollower, GroundSettings};
use crate::integrator::{IntegratorSettings, MotionDelta, MotionIntegrator};
use crate::trace::MovementTrace;

/// The control, device and integration bundle driving one platform.
#[derive(Clone, Debug)]
pub struct Navigation {
    id: NavId,
    config: NavigationConfig,
    device: Device,
    integrator: MotionIntegrator,
    trace: MovementTrace,
    color: Color,
}

impl Navigation {
    /// Build a navigation from configuration.
    ///
    /// # Errors
    ///
    /// Returns the configuration error for invalid values or an unknown
    /// device type.
    pub fn new(id: NavId, config: NavigationConfig, settings: &EngineSettings, color: Color) -> ConfigResult<Self> {
        config.validate()?;
        let limits = settings.scale_limits()?;

        let device = Device::from_config(
            config.device_name.clone(),
            &config.device_type,
            config.tracking_target_name.clone(),
            config.no_tracking_matrix(),
        )?;

        let integrator_settings = IntegratorSettings {
            limits,
            scale_stop_duration: settings.scale_stop_duration,
            translation_factor: device.profile().translation_factor,
            rotation_factor: device.profile().rotation_factor,
            invert: config.invert,
        };
        let ground = GroundFollower::new(
            config.ground_following.enabled(),
            config.ground_following.start_height(),
            GroundSettings::from(settings),
        );
        let integrator = MotionIntegrator::new(
            config.starting_matrix(),
            config.starting_scale,
            config.starting_mode,
            integrator_settings,
        )
        .with_ground_follower(ground);

        info!(
            navigation = %config.name,
            id = %id,
            device = %device.kind(),
            mode = config.starting_mode.name(),
            "navigation created"
        );

        Ok(Self {
            id,
            device,
            integrator,
            trace: MovementTrace::new(settings.trace_length, settings.trace_spacing),
            color,
            config,
        })
    }

    /// Engine handle.
    #[must_use]
    pub fn id(&self) -> NavId {
        self.id
    }

    /// Configured name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configuration the navigation was built from.
    #[must_use]
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Input device.
    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Motion integrator.
    #[must_use]
    pub fn integrator(&self) -> &MotionIntegrator {
        &self.integrator
    }

    /// Mutable motion integrator.
    pub fn integrator_mut(&mut self) -> &mut MotionIntegrator {
        &mut self.integrator
    }

    /// Movement trace.
    #[must_use]
    pub fn trace(&self) -> &MovementTrace {
        &self.trace
    }

    /// Drop the movement trace.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    /// Trail color.
    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    /// Public absolute platform matrix.
    #[must_use]
    pub fn matrix(&self) -> &Mat4 {
        self.integrator.matrix()
    }

    /// Platform scale.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.integrator.scale()
    }

    /// Navigation mode.
    #[must_use]
    pub fn mode(&self) -> NavigationMode {
        self.integrator.mode()
    }

    /// Whether input is gated off.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.integrator.is_blocked()
    }

    /// Device pose in world coordinates: `M * S(s) * station`.
    #[must_use]
    pub fn device_world_matrix(&self) -> Mat4 {
        self.platform_world_matrix() * self.device.station()
    }

    /// Device position in world coordinates.
    #[must_use]
    pub fn device_world_position(&self) -> Vector3<f64> {
        transform_point(&self.platform_world_matrix(), &self.device.station_position())
    }

    /// Platform pose including its scale.
    #[must_use]
    pub fn platform_world_matrix(&self) -> Mat4 {
        self.matrix() * make_scale(self.scale())
    }

    /// Read this frame's device data.
    pub fn read_device(&mut self, raw: Option<&RawSample>, tracked: Option<&Mat4>) -> (DeviceSample, Option<ButtonEvent>) {
        self.device.update_station(tracked);
        self.device.sample(raw)
    }

    /// Integrate this frame's sample.
    pub fn integrate(&mut self, sample: &DeviceSample, time: &FrameTime, picker: &dyn SurfacePicker) -> Option<MotionDelta> {
        let station = *self.device.station();
        self.integrator.update(sample, &station, time, picker)
    }

    /// Back to the starting pose, scale and mode.
    pub fn reset(&mut self) {
        self.integrator.reset_to(
            self.config.starting_matrix(),
            self.config.starting_scale,
            self.config.starting_mode,
        );
        self.trace.clear();
        info!(navigation = %self.config.name, "navigation reset");
    }

    /// Record the platform position into the trace.
    pub fn record_trace(&mut self) {
        let position = translation_of(self.matrix());
        self.trace.record(position);
    }
}

/// Arena of navigations indexed by [`NavId`].
#[derive(Clone, Debug, Default)]
pub struct NavigationSet {
    slots: Vec<Option<Navigation>>,
}

impl NavigationSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a navigation built for the next free handle.
    ///
    /// # Errors
    ///
    /// Propagates the builder's error; no handle is consumed on failure.
    pub fn insert_with<F>(&mut self, build: F) -> ConfigResult<NavId>
    where
        F: FnOnce(NavId) -> ConfigResult<Navigation>,
    {
        let id = NavId(self.slots.len());
        let navigation = build(id)?;
        self.slots.push(Some(navigation));
        Ok(id)
    }

    /// Remove a navigation; its handle is retired.
    pub fn remove(&mut self, id: NavId) -> Option<Navigation> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    /// Navigation by handle.
    #[must_use]
    pub fn get(&self, id: NavId) -> Option<&Navigation> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable navigation by handle.
    pub fn get_mut(&mut self, id: NavId) -> Option<&mut Navigation> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Whether the handle refers to a live navigation.
    #[must_use]
    pub fn contains(&self, id: NavId) -> bool {
        self.get(id).is_some()
    }

    /// Navigation by configured name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Navigation> {
        self.iter().find(|n| n.name() == name)
    }

    /// Live navigations in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &Navigation> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Mutable live navigations in handle order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Navigation> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Handles of live navigations.
    #[must_use]
    pub fn ids(&self) -> Vec<NavId> {
        self.iter().map(Navigation::id).collect()
    }

    /// Number of live navigations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no navigation is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
