//! User editable device parameters, their storage keys and compiled-in defaults

use serde::{Deserialize, Serialize};

/// Storage namespace holding the four fields
pub const NAMESPACE: &str = "config";

pub const KEY_BAFA_UID: &str = "bafa_uid";
pub const KEY_BAFA_TOPIC: &str = "bafa_topic";
pub const KEY_BLE_MAC: &str = "ble_mac";
pub const KEY_BLE_DATA: &str = "ble_data";

pub const DEFAULT_BAFA_UID: &str = "your_bafa_uid_here";
pub const DEFAULT_BAFA_TOPIC: &str = "your_bafa_topic_here";
pub const DEFAULT_BLE_MAC: &str = "78:81:8c:06:9a:c4";
pub const DEFAULT_BLE_DATA: &str = "0201061BFF53050100037E0566200001816D60168C81780F00000000000000";

pub const MAX_UID_LEN: usize = 64;
pub const MAX_TOPIC_LEN: usize = 32;

/// The four persisted parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub bafa_uid: String,
    pub bafa_topic: String,
    pub ble_mac: String,
    #[serde(default)]
    pub ble_data: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            bafa_uid: DEFAULT_BAFA_UID.to_string(),
            bafa_topic: DEFAULT_BAFA_TOPIC.to_string(),
            ble_mac: DEFAULT_BLE_MAC.to_string(),
            ble_data: DEFAULT_BLE_DATA.to_string(),
        }
    }
}

impl DeviceConfig {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Uid => &self.bafa_uid,
            Field::Topic => &self.bafa_topic,
            Field::Mac => &self.ble_mac,
            Field::AdvData => &self.ble_data,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Uid => self.bafa_uid = value,
            Field::Topic => self.bafa_topic = value,
            Field::Mac => self.ble_mac = value,
            Field::AdvData => self.ble_data = value,
        }
    }
}

/// One of the four parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Uid,
    Topic,
    Mac,
    AdvData,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Uid, Field::Topic, Field::Mac, Field::AdvData];

    /// Storage key, also the portal form field name
    pub fn key(&self) -> &'static str {
        match self {
            Field::Uid => KEY_BAFA_UID,
            Field::Topic => KEY_BAFA_TOPIC,
            Field::Mac => KEY_BLE_MAC,
            Field::AdvData => KEY_BLE_DATA,
        }
    }

    pub fn default_value(&self) -> &'static str {
        match self {
            Field::Uid => DEFAULT_BAFA_UID,
            Field::Topic => DEFAULT_BAFA_TOPIC,
            Field::Mac => DEFAULT_BLE_MAC,
            Field::AdvData => DEFAULT_BLE_DATA,
        }
    }

    /// Human label shown next to the portal input
    pub fn label(&self) -> &'static str {
        match self {
            Field::Uid => "Bafa User ID (64 chars max)",
            Field::Topic => "Bafa Topic (32 chars max)",
            Field::Mac => "BLE Device MAC (AA:BB:CC:DD:EE:FF format)",
            Field::AdvData => "BLE Adv Data (Hex format, even length)",
        }
    }
}
