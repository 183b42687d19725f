//! Device samples.
//!
//! A [`RawSample`] is what the device daemon delivers each tick: an arbitrary
//! number of axis floats and button booleans in device-specific order. The
//! normalizer turns it into a [`DeviceSample`], a fixed layout of seven delta
//! channels and seven logical buttons that every later stage understands.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Number of delta channels: 3 translation, 3 rotation, 1 scale.
pub const CHANNEL_COUNT: usize = 7;

/// Number of logical buttons carried by a normalized sample.
pub const BUTTON_COUNT: usize = 7;

/// Delta channel index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum Channel {
    /// Translation along X.
    X = 0,
    /// Translation along Y.
    Y = 1,
    /// Translation along Z.
    Z = 2,
    /// Rotation about X (pitch), degrees.
    RotX = 3,
    /// Rotation about Y (yaw), degrees.
    RotY = 4,
    /// Rotation about Z (roll), degrees.
    RotZ = 5,
    /// Relative scale change.
    Scale = 6,
}

impl Channel {
    /// All channels in sample order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Self::X,
        Self::Y,
        Self::Z,
        Self::RotX,
        Self::RotY,
        Self::RotZ,
        Self::Scale,
    ];

    /// Position of the channel inside a sample.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Raw per-device values delivered by the device daemon.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Axis values in device order.
    #[serde(default)]
    pub axes: Vec<f64>,
    /// Button states in device order.
    #[serde(default)]
    pub buttons: Vec<bool>,
}

impl RawSample {
    /// Create a raw sample.
    #[must_use]
    pub fn new(axes: Vec<f64>, buttons: Vec<bool>) -> Self {
        Self { axes, buttons }
    }

    /// Axis value, zero when the device did not report it.
    #[must_use]
    pub fn axis(&self, index: usize) -> f64 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }

    /// Button state, released when the device did not report it.
    #[must_use]
    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }
}

/// Normalized per-frame device delta.
///
/// Recreated every frame; never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSample {
    /// `dx, dy, dz, drx, dry, drz, dscale`.
    pub channels: [f64; CHANNEL_COUNT],
    /// Logical button states.
    pub buttons: [bool; BUTTON_COUNT],
}

impl DeviceSample {
    /// An all-zero sample with every button released.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            channels: [0.0; CHANNEL_COUNT],
            buttons: [false; BUTTON_COUNT],
        }
    }

    /// Create a sample from channel values with every button released.
    #[must_use]
    pub const fn from_channels(channels: [f64; CHANNEL_COUNT]) -> Self {
        Self {
            channels,
            buttons: [false; BUTTON_COUNT],
        }
    }

    /// Value of one channel.
    #[must_use]
    pub fn channel(&self, channel: Channel) -> f64 {
        self.channels[channel.index()]
    }

    /// Set one channel.
    pub fn set_channel(&mut self, channel: Channel, value: f64) {
        self.channels[channel.index()] = value;
    }

    /// Translation channels.
    #[must_use]
    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.channels[0], self.channels[1], self.channels[2])
    }

    /// Rotation channels (pitch, yaw, roll) in degrees.
    #[must_use]
    pub fn rotation(&self) -> Vector3<f64> {
        Vector3::new(self.channels[3], self.channels[4], self.channels[5])
    }

    /// Scale channel.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.channels[Channel::Scale.index()]
    }

    /// Whether every channel is exactly zero.
    #[must_use]
    pub fn is_still(&self) -> bool {
        self.channels.iter().all(|c| *c == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_sample_defaults() {
        let raw = RawSample::new(vec![0.5], vec![true]);
        assert!((raw.axis(0) - 0.5).abs() < 1e-12);
        assert!(raw.axis(4).abs() < 1e-12);
        assert!(raw.button(0));
        assert!(!raw.button(3));
    }

    #[test]
    fn test_channel_accessors() {
        let mut sample = DeviceSample::zero();
        assert!(sample.is_still());

        sample.set_channel(Channel::RotY, 2.0);
        sample.set_channel(Channel::Scale, -1.0);

        assert!(!sample.is_still());
        assert!((sample.rotation().y - 2.0).abs() < 1e-12);
        assert!((sample.scale() + 1.0).abs() < 1e-12);
        assert_eq!(sample.translation(), Vector3::zeros());
    }

    #[test]
    fn test_channel_indices_are_dense() {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }
}
