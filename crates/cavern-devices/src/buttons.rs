//! Button edge detection.
//!
//! Handlers downstream (reset, dof toggle, coupling trigger, request) are
//! edge-triggered, so a device re-emits its button vector only on frames where
//! at least one button changed state.

use cavern_core::BUTTON_COUNT;
use serde::{Deserialize, Serialize};

/// Button vector emitted on a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    /// Current level of every logical button.
    pub state: [bool; BUTTON_COUNT],
    /// Buttons that went down this frame.
    pub pressed: [bool; BUTTON_COUNT],
    /// Buttons that went up this frame.
    pub released: [bool; BUTTON_COUNT],
}

impl ButtonEvent {
    /// Whether `slot` had a rising edge. Out-of-range slots never fire.
    #[must_use]
    pub fn was_pressed(&self, slot: usize) -> bool {
        self.pressed.get(slot).copied().unwrap_or(false)
    }

    /// Whether `slot` had a falling edge.
    #[must_use]
    pub fn was_released(&self, slot: usize) -> bool {
        self.released.get(slot).copied().unwrap_or(false)
    }
}

/// Remembers the previous button vector of one device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonLatch {
    previous: [bool; BUTTON_COUNT],
}

impl ButtonLatch {
    /// Latch with every button released.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            previous: [false; BUTTON_COUNT],
        }
    }

    /// Feed this frame's levels; returns an event only if something changed.
    pub fn update(&mut self, state: [bool; BUTTON_COUNT]) -> Option<ButtonEvent> {
        if state == self.previous {
            return None;
        }

        let mut pressed = [false; BUTTON_COUNT];
        let mut released = [false; BUTTON_COUNT];
        for i in 0..BUTTON_COUNT {
            pressed[i] = state[i] && !self.previous[i];
            released[i] = !state[i] && self.previous[i];
        }
        self.previous = state;

        Some(ButtonEvent {
            state,
            pressed,
            released,
        })
    }

    /// Levels seen on the last update.
    #[must_use]
    pub fn state(&self) -> [bool; BUTTON_COUNT] {
        self.previous
    }
}
