//! BLE beacon advertising traits
//!
//! Packet formats and the wake payload are in beacon_proto::ble.

pub use beacon_proto::ble::{ADV_MAX_INTERVAL, ADV_MIN_INTERVAL, WAKE_ADV_DATA};
use beacon_proto::MacAddress;

/// Name the BLE stack is brought up with
pub const DEVICE_NAME: &str = "ESP32C3_BLE_Beacon";

/// Radio setup applied once, before the first advertisement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioConfig {
    pub device_name: String,
    /// Base address to program; the chip reports base + 2 as its BT address
    pub base_address: MacAddress,
    pub min_interval: u16,
    pub max_interval: u16,
    pub connectable: bool,
}

impl RadioConfig {
    /// Non-connectable beacon that will advertise from `address`
    pub fn beacon(address: MacAddress) -> Self {
        Self {
            device_name: DEVICE_NAME.to_string(),
            base_address: address.bt_base(),
            min_interval: ADV_MIN_INTERVAL,
            max_interval: ADV_MAX_INTERVAL,
            connectable: false,
        }
    }
}

/// Trait for BLE advertiser implementations
///
/// MCU-specific crates implement this trait using their BLE stack.
pub trait BeaconRadio {
    /// Error type for BLE operations
    type Error: core::fmt::Debug;

    /// Program the address and bring the stack up
    fn init(&mut self, config: &RadioConfig) -> Result<(), Self::Error>;

    /// Start advertising the given raw advertisement data
    fn start_advertising(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Stop BLE advertising
    fn stop_advertising(&mut self) -> Result<(), Self::Error>;

    /// Address the radio reports, once initialised
    fn address(&self) -> Option<MacAddress>;
}
