//! Beacon Device Library
//!
//! The control core of a cloud-triggered BLE wake beacon. Everything runs
//! from one cooperative loop: [`Controller::tick`] is called repeatedly with a
//! short sleep in between, and no component owns a thread.
//!
//! # Example
//!
//! ```ignore
//! use beacon_device::{Controller, Flow, TICK_MS};
//!
//! let mut controller = Controller::<MyBoard>::new(parts);
//! controller.boot();
//!
//! loop {
//!     if controller.tick() == Flow::Restart {
//!         restart_device();
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(TICK_MS));
//! }
//! ```

mod beacon;
mod cloud;
mod config;
mod controller;
mod error;
mod input;
mod status;

#[cfg(test)]
mod mock;

pub use beacon::{BeaconSession, BeaconTrigger, BEACON_DURATION_MS};
pub use cloud::CloudSession;
pub use config::{check, sanitize, validate, ParameterStore, Sanitized};
pub use controller::{
    Controller, Flow, AP_PASSWORD, BOOT_AP_SSID, BOOT_PORTAL_TIMEOUT, ON_DEMAND_AP_SSID,
    PORTAL_TIMEOUT, TICK_MS,
};
pub use error::{Error, Result};
pub use input::{ButtonEvent, InputController, DEBOUNCE_MS, LONG_PRESS_MS};
pub use status::{Cadence, ConnectionStateMachine, DeviceStatus, Transition};

pub use beacon_proto::{Command, DeviceConfig, Field};
