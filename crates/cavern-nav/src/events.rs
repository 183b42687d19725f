//! Per-frame notifications for presentation layers.

use cavern_core::{DisplayGroupId, NavId, NavigationMode};
use serde::{Deserialize, Serialize};

use crate::portal::TransitRecord;

/// Something observable happened during a frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationEvent {
    /// A coupling group formed or dissolved.
    CouplingChanged {
        /// Navigations affected.
        members: Vec<NavId>,
        /// `true` when coupled, `false` when decoupled.
        coupled: bool,
    },
    /// A coupling request found no candidate in range.
    CouplingUnavailable {
        /// Requesting navigation.
        navigation: NavId,
    },
    /// A navigation settled into a new mode.
    DofModeChanged {
        /// Navigation whose mode changed.
        navigation: NavId,
        /// New mode.
        mode: NavigationMode,
    },
    /// A navigation went through a portal.
    Transited(TransitRecord),
    /// A display group switched its active navigation.
    ActiveNavigationChanged {
        /// Display group.
        display_group: DisplayGroupId,
        /// New active navigation.
        navigation: NavId,
    },
    /// A navigation returned to its starting state.
    Reset {
        /// Navigation that was reset.
        navigation: NavId,
    },
}

/// Everything one tick produced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Frame number of the tick.
    pub frame: u64,
    /// Events in the order they happened.
    pub events: Vec<NavigationEvent>,
}

impl FrameReport {
    /// Empty report for a frame.
    #[must_use]
    pub fn new(frame: u64) -> Self {
        Self {
            frame,
            events: Vec::new(),
        }
    }

    /// Portal crossings of this frame.
    pub fn transits(&self) -> impl Iterator<Item = &TransitRecord> {
        self.events.iter().filter_map(|event| match event {
            NavigationEvent::Transited(record) => Some(record),
            _ => None,
        })
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.events.is_empty()
    }
}
