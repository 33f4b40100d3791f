//! Connection status and the status light
//!
//! The status changes only through the methods here; the light blinks at a
//! cadence chosen by the current status.

use beacon_mcu::IndicatorLight;
use log::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    #[default]
    Boot,
    ConfigMode,
    Connecting,
    Connected,
    Error,
}

/// How the status light behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Toggle every `period_ms`
    Blink { period_ms: u64 },
    Solid,
}

impl DeviceStatus {
    pub fn cadence(&self) -> Cadence {
        match self {
            DeviceStatus::ConfigMode => Cadence::Blink { period_ms: 200 },
            DeviceStatus::Connecting => Cadence::Blink { period_ms: 500 },
            DeviceStatus::Connected => Cadence::Blink { period_ms: 2000 },
            DeviceStatus::Error => Cadence::Solid,
            DeviceStatus::Boot => Cadence::Blink { period_ms: 1000 },
        }
    }
}

/// Change in link state noticed by [`ConnectionStateMachine::reconcile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    LinkLost,
    /// Caller should re-subscribe
    LinkRestored,
}

#[derive(Debug, Default)]
pub struct ConnectionStateMachine {
    status: DeviceStatus,
    last_toggle: u64,
    light_on: bool,
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    fn set(&mut self, next: DeviceStatus) {
        if self.status != next {
            debug!("Status {:?} -> {:?}", self.status, next);
            self.status = next;
        }
    }

    pub fn begin_connect(&mut self) {
        self.set(DeviceStatus::Connecting);
    }

    pub fn connect_finished(&mut self, ok: bool) {
        self.set(if ok {
            DeviceStatus::Connected
        } else {
            DeviceStatus::Error
        });
    }

    pub fn enter_config_mode(&mut self) {
        self.set(DeviceStatus::ConfigMode);
    }

    /// Leave the portal. A failed portal still ends up `Connected` if the
    /// station link happens to be up.
    pub fn exit_config_mode(&mut self, portal_ok: bool, link_up: bool) -> DeviceStatus {
        self.set(if portal_ok || link_up {
            DeviceStatus::Connected
        } else {
            DeviceStatus::Error
        });
        self.status
    }

    /// Match the status to the observed link
    pub fn reconcile(&mut self, link_up: bool) -> Option<Transition> {
        match (self.status, link_up) {
            (DeviceStatus::Connected, false) => {
                warn!("WiFi disconnected");
                self.set(DeviceStatus::Connecting);
                Some(Transition::LinkLost)
            }
            (DeviceStatus::Connecting | DeviceStatus::Error, true) => {
                info!("WiFi reconnected");
                self.set(DeviceStatus::Connected);
                Some(Transition::LinkRestored)
            }
            _ => None,
        }
    }

    /// Drive the light for the current status
    pub fn update_indicator<L: IndicatorLight>(&mut self, now: u64, light: &mut L) {
        match self.status.cadence() {
            Cadence::Solid => {
                self.light_on = true;
                light.set(true);
            }
            Cadence::Blink { period_ms } => {
                if now.saturating_sub(self.last_toggle) >= period_ms {
                    self.light_on = !self.light_on;
                    self.last_toggle = now;
                    light.set(self.light_on);
                }
            }
        }
    }
}
