//! Trigger button sampling
//!
//! Short press opens the config portal, a hold of more than three seconds
//! requests a factory reset. Events fire on release only.

use log::*;

/// A press must stay low this long before it counts
pub const DEBOUNCE_MS: u64 = 50;

/// Presses strictly longer than this are long presses
pub const LONG_PRESS_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ConfigPortalRequested,
    FactoryResetRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Low, but not yet for [`DEBOUNCE_MS`]
    Settling { since: u64 },
    Pressed { since: u64 },
}

/// Debounces the button and classifies press length
#[derive(Debug)]
pub struct InputController {
    phase: Phase,
}

impl Default for InputController {
    fn default() -> Self {
        Self::new()
    }
}

impl InputController {
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    /// Feed one level sample taken at `now` (ms). `low` is true while held.
    pub fn sample(&mut self, low: bool, now: u64) -> Option<ButtonEvent> {
        match (self.phase, low) {
            (Phase::Idle, true) => {
                self.phase = Phase::Settling { since: now };
                None
            }
            (Phase::Idle, false) => None,
            (Phase::Settling { since }, true) => {
                if now.saturating_sub(since) >= DEBOUNCE_MS {
                    debug!("Button pressed");
                    self.phase = Phase::Pressed { since };
                }
                None
            }
            // bounce
            (Phase::Settling { .. }, false) => {
                self.phase = Phase::Idle;
                None
            }
            (Phase::Pressed { .. }, true) => None,
            (Phase::Pressed { since }, false) => {
                self.phase = Phase::Idle;
                let held = now.saturating_sub(since);
                if held > LONG_PRESS_MS {
                    info!("Long press detected ({} ms)", held);
                    Some(ButtonEvent::FactoryResetRequested)
                } else {
                    info!("Short press detected ({} ms)", held);
                    Some(ButtonEvent::ConfigPortalRequested)
                }
            }
        }
    }

    pub fn is_pressed(&self) -> bool {
        matches!(self.phase, Phase::Pressed { .. })
    }
}
