//! Input device bound to one navigation.
//!
//! A [`Device`] combines a kind's [`DeviceProfile`], a [`ButtonLatch`] and
//! the tracking station: the device's pose in platform coordinates, used as
//! rotation pivot, heading reference and portal test point.

use cavern_core::math::translation_of;
use cavern_core::{ConfigResult, DeviceSample, Mat4, RawSample};
use nalgebra::Vector3;
use tracing::{debug, trace};

use crate::buttons::{ButtonEvent, ButtonLatch};
use crate::kind::DeviceKind;
use crate::profile::DeviceProfile;

/// A physical input device and its tracking station.
#[derive(Clone, Debug)]
pub struct Device {
    name: String,
    kind: DeviceKind,
    profile: DeviceProfile,
    latch: ButtonLatch,
    tracking_target: Option<String>,
    no_tracking_matrix: Mat4,
    station: Mat4,
    tracked: bool,
}

impl Device {
    /// Create a device of a known kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            profile: kind.profile(),
            latch: ButtonLatch::new(),
            tracking_target: None,
            no_tracking_matrix: Mat4::identity(),
            station: Mat4::identity(),
            tracked: false,
        }
    }

    /// Factory from configuration strings.
    ///
    /// # Errors
    ///
    /// Returns [`cavern_core::ConfigError::UnknownDeviceType`] if `device_type`
    /// does not name a supported kind.
    pub fn from_config(
        name: impl Into<String>,
        device_type: &str,
        tracking_target: Option<String>,
        no_tracking_matrix: Mat4,
    ) -> ConfigResult<Self> {
        let kind: DeviceKind = device_type.parse()?;
        let device = Self::new(name, kind)
            .with_tracking_target(tracking_target)
            .with_no_tracking_matrix(no_tracking_matrix);
        debug!(device = %device.name, kind = %kind, "device created");
        Ok(device)
    }

    /// Name of the tracking target that supplies the station pose.
    #[must_use]
    pub fn with_tracking_target(mut self, target: Option<String>) -> Self {
        self.tracking_target = target.filter(|t| !t.is_empty());
        self
    }

    /// Station pose used when no tracking data is available.
    #[must_use]
    pub fn with_no_tracking_matrix(mut self, matrix: Mat4) -> Self {
        self.no_tracking_matrix = matrix;
        self.station = matrix;
        self
    }

    /// Replace the channel mapping.
    #[must_use]
    pub fn with_profile(mut self, profile: DeviceProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Device name as delivered by the device daemon.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device kind.
    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Channel mapping.
    #[must_use]
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Configured tracking target, if any.
    #[must_use]
    pub fn tracking_target(&self) -> Option<&str> {
        self.tracking_target.as_deref()
    }

    /// Normalize this frame's raw values.
    ///
    /// A missing sample reads as all axes at rest and all buttons released.
    /// The button event is present only when some button changed.
    pub fn sample(&mut self, raw: Option<&RawSample>) -> (DeviceSample, Option<ButtonEvent>) {
        let sample = raw.map_or_else(DeviceSample::zero, |raw| self.profile.map(raw));
        let event = self.latch.update(sample.buttons);
        if let Some(event) = &event {
            trace!(device = %self.name, state = ?event.state, "buttons changed");
        }
        (sample, event)
    }

    /// Update the station from this frame's tracking data.
    ///
    /// Without a configured target, or when the target is missing this
    /// frame, the station falls back to the no-tracking matrix.
    pub fn update_station(&mut self, tracked: Option<&Mat4>) {
        match (self.tracking_target.is_some(), tracked) {
            (true, Some(matrix)) => {
                self.station = *matrix;
                self.tracked = true;
            }
            _ => {
                if self.tracked {
                    debug!(device = %self.name, "tracking lost, using no-tracking matrix");
                }
                self.station = self.no_tracking_matrix;
                self.tracked = false;
            }
        }
    }

    /// Whether the station came from tracking data this frame.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Station pose in platform coordinates.
    #[must_use]
    pub fn station(&self) -> &Mat4 {
        &self.station
    }

    /// Station position in platform coordinates.
    #[must_use]
    pub fn station_position(&self) -> Vector3<f64> {
        translation_of(&self.station)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cavern_core::math::make_trans;
    use cavern_core::sample::Channel;
    use cavern_core::ConfigError;

    fn space_mouse_raw(axes: [f64; 6], buttons: [bool; 2]) -> RawSample {
        RawSample::new(axes.to_vec(), buttons.to_vec())
    }

    #[test]
    fn test_factory_rejects_unknown_kind() {
        let err = Device::from_config("dev", "Joystick3000", None, Mat4::identity()).unwrap_err();
        assert_eq!(err, ConfigError::UnknownDeviceType("Joystick3000".into()));
    }

    #[test]
    fn test_missing_sample_is_zero() {
        let mut device = Device::new("spacemouse", DeviceKind::SpaceMouse);
        let (sample, event) = device.sample(None);
        assert!(sample.is_still());
        assert!(event.is_none());
    }

    #[test]
    fn test_sample_and_button_edges() {
        let mut device = Device::new("spacemouse", DeviceKind::SpaceMouse);
        assert_eq!(DeviceKind::SpaceMouse.axis_count(), 6);

        let raw = space_mouse_raw([175.0, 0.0, 0.0, 0.0, 0.0, 0.0], [true, false]);
        let (sample, event) = device.sample(Some(&raw));
        assert!(sample.channel(Channel::X) > 0.4);
        let event = event.expect("first press");
        assert!(event.was_pressed(device.profile().buttons.dof));

        let (_, event) = device.sample(Some(&raw));
        assert!(event.is_none());

        let (_, event) = device.sample(None);
        assert!(event.expect("release").was_released(1));
    }

    #[test]
    fn test_station_fallback() {
        let fallback = make_trans(&Vector3::new(0.0, 1.2, 0.0));
        let tracked = make_trans(&Vector3::new(0.5, 1.7, -0.3));
        let mut device = Device::from_config("dev", "NewSpheron", Some("head".into()), fallback)
            .expect("known kind");

        assert!((device.station_position().y - 1.2).abs() < 1e-12);

        device.update_station(Some(&tracked));
        assert!(device.is_tracked());
        assert!((device.station_position() - Vector3::new(0.5, 1.7, -0.3)).norm() < 1e-12);

        device.update_station(None);
        assert!(!device.is_tracked());
        assert!((device.station_position().y - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_untracked_device_ignores_tracking_data() {
        let mut device = Device::from_config("dev", "XBoxController", Some(String::new()), Mat4::identity())
            .expect("known kind");
        assert!(device.tracking_target().is_none());

        device.update_station(Some(&make_trans(&Vector3::new(1.0, 0.0, 0.0))));
        assert!(!device.is_tracked());
        assert_eq!(device.station(), &Mat4::identity());
    }
}
