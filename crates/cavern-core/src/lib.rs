//! Cavern Core - shared math and data types for multi-user VR navigation
//!
//! This crate provides the foundational types used by every stage of the
//! per-frame navigation pipeline that drives CAVE-style powerwalls, touch
//! tables and head-mounted portals.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Navigation Frame (once per tick)                  │
//! │                                                                         │
//! │  RawSample ──▶ DeviceSample ──▶ Platform matrix / scale ──▶ Portal test │
//! │                    │                    ▲                               │
//! │                    │                    │                               │
//! │                    ▼                    │                               │
//! │               ┌─────────┐        ┌─────────────┐                        │
//! │               │  math   │        │  collision  │                        │
//! │               │ (poses) │        │ (Ray, pick) │                        │
//! │               └─────────┘        └─────────────┘                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`types`]: Platforms, navigation modes, frame timing and identifiers
//! - [`math`]: Transform construction and decomposition, yaw extraction
//! - [`sample`]: Raw and normalized device samples
//! - [`collision`]: Rays, bounding boxes and the surface-pick service
//! - [`error`]: Configuration and lookup errors
//!
//! # Example
//!
//! ```rust
//! use cavern_core::math::{make_trans, translation_of};
//! use cavern_core::types::{Platform, ScaleLimits};
//! use nalgebra::Vector3;
//!
//! let mut platform = Platform::new(make_trans(&Vector3::new(1.0, 0.0, 2.0)), 1.0);
//! platform.set_scale(5_000.0, &ScaleLimits::default());
//!
//! assert_eq!(platform.scale(), 1_000.0);
//! assert_eq!(translation_of(platform.matrix()).z, 2.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod collision;
pub mod error;
pub mod math;
pub mod sample;
pub mod types;

pub use collision::{BoundingBox, BoxTerrain, NoSurfaces, PickHit, PickMask, Ray, SurfacePicker};
pub use error::{ConfigError, ConfigResult, NavError, NavResult};
pub use math::{Mat4, YawExtractor};
pub use sample::{DeviceSample, RawSample, BUTTON_COUNT, CHANNEL_COUNT};
pub use types::{DisplayGroupId, FrameTime, NavId, NavigationMode, Platform, PortalId, ScaleLimits};

/// Core crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default lower scale bound of a platform.
pub const DEFAULT_MIN_SCALE: f64 = 1e-4;

/// Default upper scale bound of a platform.
pub const DEFAULT_MAX_SCALE: f64 = 1e3;

/// Scale levels that act as detents while scaling.
pub const SCALE_SNAP_LEVELS: [f64; 5] = [0.01, 0.1, 1.0, 10.0, 100.0];

/// Shortest duration of any animated transition (seconds).
///
/// Animations computed from a zero distance would otherwise divide by zero.
pub const MIN_ANIMATION_TIME: f64 = 0.01;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::assertions_on_constants)]
    fn constants_are_ordered() {
        assert!(DEFAULT_MIN_SCALE > 0.0);
        assert!(DEFAULT_MIN_SCALE < DEFAULT_MAX_SCALE);
        assert!(SCALE_SNAP_LEVELS.windows(2).all(|w| w[0] < w[1]));
        assert!(SCALE_SNAP_LEVELS[0] > DEFAULT_MIN_SCALE);
        assert!(SCALE_SNAP_LEVELS[4] < DEFAULT_MAX_SCALE);
        assert!(MIN_ANIMATION_TIME > 0.0);
    }
}
