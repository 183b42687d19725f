//! Error types for cavern navigation.
//!
//! Only configuration problems and lookups of unknown handles are errors.
//! Everything the frame loop can run into at runtime (no ray hit, nothing in
//! coupling range, out-of-range scale) has a defined fallback instead.

use thiserror::Error;

use crate::types::{DisplayGroupId, NavId, PortalId};

// ============================================================================
// Configuration Errors
// ============================================================================

/// Fatal configuration error raised while setting up navigations and portals.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Device type string does not name a known device kind.
    #[error("Unknown device type '{0}'")]
    UnknownDeviceType(String),

    /// Starting scale is not a positive finite number.
    #[error("Invalid starting scale {scale} for navigation '{navigation}'")]
    InvalidScale {
        /// Navigation name
        navigation: String,
        /// Rejected scale
        scale: f64,
    },

    /// Scale limits are inverted, non-positive or non-finite.
    #[error("Invalid scale limits: min {min}, max {max}")]
    InvalidScaleLimits {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },

    /// A matrix field contains non-finite values.
    #[error("Malformed matrix in field '{field}'")]
    MalformedMatrix {
        /// Offending configuration field
        field: &'static str,
    },

    /// Portal extent is not positive.
    #[error("Invalid portal size {width} x {height} for portal '{portal}'")]
    InvalidPortalSize {
        /// Portal name
        portal: String,
        /// Width
        width: f64,
        /// Height
        height: f64,
    },

    /// Two entries share the same name.
    #[error("Duplicate {kind} name '{name}'")]
    DuplicateName {
        /// Entry kind ("navigation", "portal", ...)
        kind: &'static str,
        /// Duplicated name
        name: String,
    },

    /// A name reference does not resolve.
    #[error("Unknown {kind} '{name}'")]
    UnknownReference {
        /// Entry kind ("navigation", "portal", ...)
        kind: &'static str,
        /// Unresolved name
        name: String,
    },

    /// A display group lists no navigations.
    #[error("Display group '{0}' has no navigations")]
    EmptyDisplayGroup(String),

    /// Request button index lies outside the logical button range.
    #[error("Request button index {index} out of range (max {max})")]
    InvalidButtonIndex {
        /// Configured index
        index: usize,
        /// Largest valid index
        max: usize,
    },
}

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

// ============================================================================
// Lookup Errors
// ============================================================================

/// Lookup error on the engine's public API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    /// Referenced navigation does not exist (or was removed).
    #[error("Navigation {0} not found")]
    NavigationNotFound(NavId),

    /// Referenced portal does not exist.
    #[error("Portal {0} not found")]
    PortalNotFound(PortalId),

    /// Referenced display group does not exist.
    #[error("Display group {0} not found")]
    DisplayGroupNotFound(DisplayGroupId),
}

/// Result type for engine lookups.
pub type NavResult<T> = Result<T, NavError>;
