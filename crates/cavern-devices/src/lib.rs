//! Cavern Devices - input device normalization
//!
//! This crate turns the raw per-device axis and button arrays delivered by
//! the device daemon into normalized [`DeviceSample`]s:
//! - One normalization law for every analog axis ([`axis`])
//! - Per-kind channel mapping tables ([`profile`], [`kind`])
//! - Button edge detection ([`buttons`])
//! - Tracking station handling ([`device`])
//!
//! # Supported devices
//!
//! ```text
//! KeyboardMouse   keys + mouse motion + wheel
//! SpaceMouse      6 analog axes, 2 buttons
//! XBoxController  2 sticks, 8 buttons
//! OldSpheron      7 analog axes with offsets, 4 buttons
//! NewSpheron      3 analog axes + 3 rotation dials, 4 buttons
//! ```
//!
//! [`DeviceSample`]: cavern_core::DeviceSample

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod axis;
pub mod buttons;
pub mod device;
pub mod kind;
pub mod profile;

pub use axis::{normalize_axis, AxisCalibration};
pub use buttons::{ButtonEvent, ButtonLatch};
pub use device::Device;
pub use kind::DeviceKind;
pub use profile::{ButtonMap, ChannelSource, DeviceProfile};
