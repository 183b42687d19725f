//! Per-device channel mapping.
//!
//! A [`DeviceProfile`] describes how the raw axis and button arrays of one
//! device kind map onto the seven delta channels and seven logical buttons of
//! a [`DeviceSample`]. Device kinds differ only in these tables; the
//! normalization law itself lives in [`crate::axis`].

use cavern_core::sample::Channel;
use cavern_core::{DeviceSample, RawSample, BUTTON_COUNT, CHANNEL_COUNT};
use serde::{Deserialize, Serialize};

use crate::axis::{incremental_axis, AxisCalibration};

/// Where one delta channel takes its value from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ChannelSource {
    /// Channel is not driven by this device.
    #[default]
    None,
    /// Absolute analog axis passed through the normalization law.
    Analog {
        /// Raw axis index.
        axis: usize,
        /// Sign flip applied after normalization (`1.0` or `-1.0`).
        sign: f64,
        /// Axis calibration.
        calibration: AxisCalibration,
    },
    /// Relative axis (dial, mouse motion) passed through unclamped.
    Incremental {
        /// Raw axis index.
        axis: usize,
        /// Sign flip.
        sign: f64,
        /// Gain applied to the raw delta.
        gain: f64,
    },
    /// Two raw buttons acting as a key pair.
    Digital {
        /// Raw button producing `+magnitude`.
        positive: usize,
        /// Raw button producing `-magnitude`.
        negative: usize,
        /// Output while exactly one key is held.
        magnitude: f64,
    },
}

impl ChannelSource {
    /// Analog source with unit sign.
    #[must_use]
    pub const fn analog(axis: usize, calibration: AxisCalibration) -> Self {
        Self::Analog {
            axis,
            sign: 1.0,
            calibration,
        }
    }

    /// Analog source with inverted sign.
    #[must_use]
    pub const fn analog_inverted(axis: usize, calibration: AxisCalibration) -> Self {
        Self::Analog {
            axis,
            sign: -1.0,
            calibration,
        }
    }

    /// Incremental source.
    #[must_use]
    pub const fn incremental(axis: usize, sign: f64, gain: f64) -> Self {
        Self::Incremental { axis, sign, gain }
    }

    /// Key-pair source with unit magnitude.
    #[must_use]
    pub const fn keys(positive: usize, negative: usize) -> Self {
        Self::Digital {
            positive,
            negative,
            magnitude: 1.0,
        }
    }

    /// Read the channel value out of a raw sample.
    #[must_use]
    pub fn read(&self, raw: &RawSample) -> f64 {
        match *self {
            Self::None => 0.0,
            Self::Analog {
                axis,
                sign,
                calibration,
            } => sign * calibration.normalize(raw.axis(axis)),
            Self::Incremental { axis, sign, gain } => sign * incremental_axis(raw.axis(axis), 0.0, gain),
            Self::Digital {
                positive,
                negative,
                magnitude,
            } => match (raw.button(positive), raw.button(negative)) {
                (true, false) => magnitude,
                (false, true) => -magnitude,
                _ => 0.0,
            },
        }
    }
}

/// Logical button slots shared by every device kind.
///
/// Slots `0..3` carry the engine's edge-triggered handlers; the remaining
/// slots are free for device-specific use (the request button is configured
/// per navigation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonMap {
    /// Slot resetting the platform to its starting pose.
    pub reset: usize,
    /// Slot toggling realistic / unrealistic mode.
    pub dof: usize,
    /// Slot toggling coupling with nearby navigations.
    pub coupling: usize,
}

impl ButtonMap {
    /// Default slot assignment.
    pub const DEFAULT: Self = Self {
        reset: 0,
        dof: 1,
        coupling: 2,
    };
}

impl Default for ButtonMap {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Complete mapping table of one device kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Source of each delta channel, in channel order.
    pub channels: [ChannelSource; CHANNEL_COUNT],
    /// Raw button feeding each logical button slot.
    pub button_sources: [Option<usize>; BUTTON_COUNT],
    /// Handler slot assignment.
    pub buttons: ButtonMap,
    /// Translation amplification applied by the motion integrator.
    pub translation_factor: f64,
    /// Rotation amplification applied by the motion integrator.
    pub rotation_factor: f64,
}

impl DeviceProfile {
    /// Profile without any mapped channel or button.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            channels: [ChannelSource::None; CHANNEL_COUNT],
            button_sources: [None; BUTTON_COUNT],
            buttons: ButtonMap::DEFAULT,
            translation_factor: 1.0,
            rotation_factor: 1.0,
        }
    }

    /// Set the source of one channel.
    #[must_use]
    pub fn with_channel(mut self, channel: Channel, source: ChannelSource) -> Self {
        self.channels[channel.index()] = source;
        self
    }

    /// Route a raw button into a logical slot. Out-of-range slots are ignored.
    #[must_use]
    pub fn with_button(mut self, slot: usize, raw_button: usize) -> Self {
        if let Some(entry) = self.button_sources.get_mut(slot) {
            *entry = Some(raw_button);
        }
        self
    }

    /// Set the translation and rotation factors.
    #[must_use]
    pub fn with_factors(mut self, translation: f64, rotation: f64) -> Self {
        self.translation_factor = translation;
        self.rotation_factor = rotation;
        self
    }

    /// Map a raw sample onto the normalized layout.
    #[must_use]
    pub fn map(&self, raw: &RawSample) -> DeviceSample {
        let mut sample = DeviceSample::zero();
        for (value, source) in sample.channels.iter_mut().zip(&self.channels) {
            *value = source.read(raw);
        }
        for (state, source) in sample.buttons.iter_mut().zip(&self.button_sources) {
            *state = source.is_some_and(|b| raw.button(b));
        }
        sample
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digital_key_pair() {
        let source = ChannelSource::keys(0, 1);
        assert!((source.read(&RawSample::new(vec![], vec![true, false])) - 1.0).abs() < 1e-12);
        assert!((source.read(&RawSample::new(vec![], vec![false, true])) + 1.0).abs() < 1e-12);
        assert!(source.read(&RawSample::new(vec![], vec![true, true])).abs() < 1e-12);
        assert!(source.read(&RawSample::default()).abs() < 1e-12);
    }

    #[test]
    fn test_incremental_is_unclamped() {
        let source = ChannelSource::incremental(0, -1.0, 0.5);
        assert!((source.read(&RawSample::new(vec![10.0], vec![])) + 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_profile_mapping() {
        let profile = DeviceProfile::empty()
            .with_channel(Channel::Z, ChannelSource::analog_inverted(1, AxisCalibration::symmetric(1.0, 0.0)))
            .with_button(ButtonMap::DEFAULT.dof, 3);

        let sample = profile.map(&RawSample::new(vec![0.0, 0.5], vec![false, false, false, true]));
        assert!((sample.channel(Channel::Z) + 0.5).abs() < 1e-12);
        assert!(sample.channel(Channel::X).abs() < 1e-12);
        assert!(sample.buttons[1]);
        assert!(!sample.buttons[0]);
    }

    #[test]
    fn test_out_of_range_slot_is_ignored() {
        let profile = DeviceProfile::empty().with_button(BUTTON_COUNT, 0);
        assert!(profile.button_sources.iter().all(Option::is_none));
    }
}
