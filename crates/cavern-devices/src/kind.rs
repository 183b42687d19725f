//! Supported device kinds and their calibration tables.
//!
//! | Kind | Axes | Buttons |
//! |------|------|---------|
//! | `KeyboardMouse` | mouse dx, mouse dy, wheel | W A S D Q E R F C Space |
//! | `SpaceMouse` | tx, ty, tz, rx, ry, rz (raw ±350) | left, right |
//! | `XBoxController` | left x/y, right x/y (±1) | A B X Y LB RB Start Back |
//! | `OldSpheron` | tx ty tz rx ry rz scale (10 bit, offset) | 4 buttons |
//! | `NewSpheron` | tx ty tz (±1), 3 rotation dials | 4 buttons |

use std::fmt;
use std::str::FromStr;

use cavern_core::sample::Channel;
use cavern_core::ConfigError;
use serde::{Deserialize, Serialize};

use crate::profile::{ChannelSource, DeviceProfile};

/// Calibration constants per device kind.
mod tables {
    use crate::axis::AxisCalibration;

    // SpaceMouse: symmetric ±350 counts, 3% deadzone
    pub const SPACEMOUSE: AxisCalibration = AxisCalibration::symmetric(350.0, 3.0);

    // XBox sticks: ±1, 15% deadzone against stick drift
    pub const XBOX_STICK: AxisCalibration = AxisCalibration::symmetric(1.0, 15.0);

    // Old Spheron: 10 bit ADC, rest position off-center
    pub const OLD_SPHERON_TRANS: AxisCalibration = AxisCalibration::new(512.0, 0.0, 1023.0, 5.0, 5.0);
    pub const OLD_SPHERON_ROT: AxisCalibration = AxisCalibration::new(500.0, 20.0, 1000.0, 8.0, 10.0);
    pub const OLD_SPHERON_SCALE: AxisCalibration = AxisCalibration::new(490.0, 0.0, 1023.0, 10.0, 10.0);

    // New Spheron: ±1 translation ball, 5% deadzone
    pub const NEW_SPHERON_TRANS: AxisCalibration = AxisCalibration::symmetric(1.0, 5.0);

    pub const KEYBOARD_MOUSE_GAIN: f64 = 0.1;
    pub const NEW_SPHERON_DIAL_GAIN: f64 = 1.0;
}

/// Physical device kind, selected by the `device_type` configuration string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Desktop keyboard plus mouse.
    KeyboardMouse,
    /// 3Dconnexion SpaceMouse.
    SpaceMouse,
    /// XBox gamepad.
    XBoxController,
    /// First-generation Spheron ball.
    OldSpheron,
    /// Second-generation Spheron ball with rotation dials.
    NewSpheron,
}

impl DeviceKind {
    /// All supported kinds.
    pub const ALL: [DeviceKind; 5] = [
        Self::KeyboardMouse,
        Self::SpaceMouse,
        Self::XBoxController,
        Self::OldSpheron,
        Self::NewSpheron,
    ];

    /// Configuration name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::KeyboardMouse => "KeyboardMouse",
            Self::SpaceMouse => "SpaceMouse",
            Self::XBoxController => "XBoxController",
            Self::OldSpheron => "OldSpheron",
            Self::NewSpheron => "NewSpheron",
        }
    }

    /// Number of raw axes the device reports.
    #[must_use]
    pub const fn axis_count(self) -> usize {
        match self {
            Self::KeyboardMouse => 3,
            Self::XBoxController => 4,
            Self::SpaceMouse | Self::NewSpheron => 6,
            Self::OldSpheron => 7,
        }
    }

    /// Channel mapping of the kind.
    #[must_use]
    pub fn profile(self) -> DeviceProfile {
        match self {
            Self::KeyboardMouse => keyboard_mouse(),
            Self::SpaceMouse => space_mouse(),
            Self::XBoxController => xbox_controller(),
            Self::OldSpheron => old_spheron(),
            Self::NewSpheron => new_spheron(),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownDeviceType(s.to_string()))
    }
}

fn keyboard_mouse() -> DeviceProfile {
    // Keys: W=0 A=1 S=2 D=3 Q=4 E=5 R=6 F=7 C=8 Space=9
    let gain = tables::KEYBOARD_MOUSE_GAIN;
    DeviceProfile::empty()
        .with_channel(Channel::X, ChannelSource::keys(3, 1))
        .with_channel(Channel::Y, ChannelSource::keys(5, 4))
        .with_channel(Channel::Z, ChannelSource::keys(2, 0))
        .with_channel(Channel::RotX, ChannelSource::incremental(1, -1.0, gain))
        .with_channel(Channel::RotY, ChannelSource::incremental(0, -1.0, gain))
        .with_channel(Channel::Scale, ChannelSource::incremental(2, 1.0, 1.0))
        .with_button(0, 6)
        .with_button(1, 7)
        .with_button(2, 8)
        .with_button(3, 9)
        .with_factors(0.1, 1.0)
}

fn space_mouse() -> DeviceProfile {
    let cal = tables::SPACEMOUSE;
    DeviceProfile::empty()
        .with_channel(Channel::X, ChannelSource::analog(0, cal))
        .with_channel(Channel::Y, ChannelSource::analog_inverted(2, cal))
        .with_channel(Channel::Z, ChannelSource::analog(1, cal))
        .with_channel(Channel::RotX, ChannelSource::analog(3, cal))
        .with_channel(Channel::RotY, ChannelSource::analog_inverted(5, cal))
        .with_channel(Channel::RotZ, ChannelSource::analog(4, cal))
        .with_button(1, 0)
        .with_button(2, 1)
        .with_factors(0.1, 1.0)
}

fn xbox_controller() -> DeviceProfile {
    // Buttons: A=0 B=1 X=2 Y=3 LB=4 RB=5 Start=6 Back=7
    let cal = tables::XBOX_STICK;
    DeviceProfile::empty()
        .with_channel(Channel::X, ChannelSource::analog(0, cal))
        .with_channel(Channel::Y, ChannelSource::keys(5, 4))
        .with_channel(Channel::Z, ChannelSource::analog(1, cal))
        .with_channel(Channel::RotX, ChannelSource::analog_inverted(3, cal))
        .with_channel(Channel::RotY, ChannelSource::analog_inverted(2, cal))
        .with_channel(Channel::Scale, ChannelSource::keys(3, 2))
        .with_button(0, 7)
        .with_button(1, 0)
        .with_button(2, 1)
        .with_button(3, 6)
        .with_factors(0.1, 1.5)
}

fn old_spheron() -> DeviceProfile {
    let (t, r) = (tables::OLD_SPHERON_TRANS, tables::OLD_SPHERON_ROT);
    DeviceProfile::empty()
        .with_channel(Channel::X, ChannelSource::analog(0, t))
        .with_channel(Channel::Y, ChannelSource::analog(1, t))
        .with_channel(Channel::Z, ChannelSource::analog_inverted(2, t))
        .with_channel(Channel::RotX, ChannelSource::analog(3, r))
        .with_channel(Channel::RotY, ChannelSource::analog_inverted(4, r))
        .with_channel(Channel::RotZ, ChannelSource::analog(5, r))
        .with_channel(Channel::Scale, ChannelSource::analog(6, tables::OLD_SPHERON_SCALE))
        .with_button(0, 2)
        .with_button(1, 0)
        .with_button(2, 1)
        .with_button(3, 3)
        .with_factors(0.2, 1.0)
}

fn new_spheron() -> DeviceProfile {
    let t = tables::NEW_SPHERON_TRANS;
    let gain = tables::NEW_SPHERON_DIAL_GAIN;
    DeviceProfile::empty()
        .with_channel(Channel::X, ChannelSource::analog(0, t))
        .with_channel(Channel::Y, ChannelSource::analog(1, t))
        .with_channel(Channel::Z, ChannelSource::analog(2, t))
        .with_channel(Channel::RotX, ChannelSource::incremental(3, 1.0, gain))
        .with_channel(Channel::RotY, ChannelSource::incremental(4, 1.0, gain))
        .with_channel(Channel::RotZ, ChannelSource::incremental(5, 1.0, gain))
        .with_button(0, 2)
        .with_button(1, 0)
        .with_button(2, 1)
        .with_button(3, 3)
        .with_factors(0.15, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cavern_core::RawSample;

    #[test]
    fn test_parse_kind() {
        assert_eq!("SpaceMouse".parse::<DeviceKind>().ok(), Some(DeviceKind::SpaceMouse));
        assert_eq!("xboxcontroller".parse::<DeviceKind>().ok(), Some(DeviceKind::XBoxController));
        for kind in DeviceKind::ALL {
            assert_eq!(kind.to_string().parse::<DeviceKind>().ok(), Some(kind));
        }
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let err = "Wiimote".parse::<DeviceKind>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownDeviceType("Wiimote".into()));
    }

    #[test]
    fn test_space_mouse_deadzone() {
        let profile = DeviceKind::SpaceMouse.profile();
        // 3% of 350 = 10.5 counts
        let sample = profile.map(&RawSample::new(vec![10.0, 0.0, 0.0, 0.0, 0.0, 0.0], vec![]));
        assert!(sample.is_still());

        let sample = profile.map(&RawSample::new(vec![350.0, 0.0, 350.0, 0.0, 0.0, 0.0], vec![]));
        assert!((sample.channel(Channel::X) - 1.0).abs() < 1e-12);
        assert!((sample.channel(Channel::Y) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_keyboard_forward_is_negative_z() {
        let profile = DeviceKind::KeyboardMouse.profile();
        let mut keys = vec![false; 10];
        keys[0] = true;
        let sample = profile.map(&RawSample::new(vec![0.0; 3], keys));
        assert!((sample.channel(Channel::Z) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_old_spheron_rest_is_still() {
        let profile = DeviceKind::OldSpheron.profile();
        let raw = RawSample::new(vec![512.0, 512.0, 512.0, 500.0, 500.0, 500.0, 490.0], vec![]);
        assert!(profile.map(&raw).is_still());
    }

    #[test]
    fn test_every_kind_maps_handler_slots() {
        for kind in DeviceKind::ALL {
            let profile = kind.profile();
            assert!(profile.button_sources[profile.buttons.dof].is_some(), "{kind}");
            assert!(profile.button_sources[profile.buttons.coupling].is_some(), "{kind}");
            assert!(profile.translation_factor > 0.0);
        }
    }
}
