//! Beacon MCU Library
//!
//! Traits for the board services the beacon controller drives.
//!
//! This crate provides:
//! - Persistent key-value storage
//! - WiFi status and the captive configuration portal
//! - BLE beacon advertising
//! - The cloud stream connector, pins and a millisecond clock
//! - The `Board` bundle tying one implementation of each together
//!
//! # Example MCU implementations
//! - ESP32: See `beacon-esp32`
//!
//! # Note
//! This crate has no dependencies beyond `beacon-proto` data types.

pub mod ble;
pub mod board;
pub mod io;
pub mod net;
pub mod storage;
pub mod wifi;

pub use ble::*;
pub use board::*;
pub use io::*;
pub use net::*;
pub use storage::*;
pub use wifi::*;
