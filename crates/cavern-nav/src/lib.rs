//! Cavern Nav - per-frame navigation engine
//!
//! This crate turns normalized device input into platform transforms for
//! every user of a multi-screen VR installation:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Navigation Engine (one tick)                     │
//! │                                                                         │
//! │  ┌──────────────┐    ┌───────────────────┐    ┌────────────────────┐   │
//! │  │ Device       │    │ MotionIntegrator  │    │ CouplingGraph      │   │
//! │  │              │───▶│                   │───▶│                    │   │
//! │  │ DeviceSample │    │ scale, move,      │    │ propagate deltas,  │   │
//! │  │ ButtonEvent  │    │ GroundFollower    │    │ converge, release  │   │
//! │  └──────────────┘    └───────────────────┘    └────────────────────┘   │
//! │                                                         │              │
//! │                                                         ▼              │
//! │                                              ┌────────────────────┐    │
//! │                                              │ PortalTransit      │    │
//! │                                              │ Detector           │    │
//! │                                              │ cross test, remap  │    │
//! │                                              └────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use cavern_core::{FrameTime, NoSurfaces, RawSample};
//! use cavern_nav::{EngineSettings, FrameInput, NavigationConfig, NavigationEngine};
//!
//! let mut engine = NavigationEngine::new(EngineSettings::default()).unwrap();
//! let id = engine
//!     .add_navigation(NavigationConfig::new("alice", "SpaceMouse", "spacemouse-1"))
//!     .unwrap();
//!
//! // Push the SpaceMouse forward (-Z) for one frame
//! let sample = RawSample::new(vec![0.0, -350.0, 0.0, 0.0, 0.0, 0.0], vec![]);
//! let input = FrameInput::new().with_sample("spacemouse-1", sample);
//! engine.tick(&FrameTime::first(60.0), &input, &NoSurfaces);
//!
//! let nav = engine.navigation(id).unwrap();
//! assert!(nav.matrix()[(2, 3)] < 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod colors;
pub mod config;
pub mod coupling;
pub mod engine;
pub mod events;
pub mod ground;
pub mod integrator;
pub mod navigation;
pub mod portal;
pub mod trace;

pub use colors::{Color, ColorPool};
pub use config::{
    DisplayGroupConfig, EngineSettings, GroundFollowingSettings, NavigationConfig, PortalConfig, SceneConfig, SceneError,
};
pub use coupling::{CouplingAnimation, CouplingGraph, TriggerOutcome};
pub use engine::{FrameInput, NavigationEngine};
pub use events::{FrameReport, NavigationEvent};
pub use ground::{GroundFollower, GroundSettings, GroundState};
pub use integrator::{IntegratorSettings, MotionDelta, MotionIntegrator};
pub use navigation::{Navigation, NavigationSet};
pub use portal::{DisplayGroup, ExitScreen, Portal, PortalTransitDetector, TransitRecord, ViewingMode};
pub use trace::MovementTrace;
