//! BLE beacon formats: device address, advertising payloads and the wake packet

use std::fmt;
use std::str::FromStr;

use data_encoding::HEXLOWER_PERMISSIVE;

use crate::ValidationError;

/// `xx:xx:xx:xx:xx:xx`
pub const MAC_STR_LEN: usize = 17;

/// Largest advertising payload accepted from config, in bytes
pub const MAX_ADV_DATA_LEN: usize = 32;

/// Advertising interval bounds, in 0.625 ms units
pub const ADV_MIN_INTERVAL: u16 = 0x0020;
pub const ADV_MAX_INTERVAL: u16 = 0x0040;

/// AD type for manufacturer specific data
pub const AD_TYPE_MANUFACTURER: u8 = 0xFF;

/// Company id carried by the wake packet (little endian on air)
pub const WAKE_COMPANY_ID: u16 = 0x0553;

/// Raw advertisement sent on every beacon session
pub const WAKE_ADV_DATA: [u8; 31] = [
    // Flags
    0x02, 0x01, 0x06,
    // Manufacturer specific data, length 27
    0x1B, 0xFF,
    0x53, 0x05, 0x01, 0x00, 0x03, 0x7e, 0x05, 0x66, 0x20, 0x00, 0x01, 0x81,
    // Host address, reversed
    0x6D, 0x60, 0x16, 0x8C, 0x81, 0x78,
    0x0f, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// 48-bit device address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Group address bit. The ESP-IDF refuses these as a base address.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Base address that makes the chip report `self` as its BT address.
    ///
    /// The ESP32 derives the BT address as base + 2 on the last octet.
    pub fn bt_base(&self) -> MacAddress {
        let mut octets = self.0;
        octets[5] = octets[5].wrapping_sub(2);
        MacAddress(octets)
    }
}

impl FromStr for MacAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != MAC_STR_LEN {
            return Err(ValidationError::BadLength {
                expected: MAC_STR_LEN,
                found: bytes.len(),
            });
        }

        for (pos, b) in bytes.iter().enumerate() {
            if pos % 3 == 2 {
                if *b != b':' {
                    return Err(ValidationError::MissingSeparator { pos });
                }
            } else if !b.is_ascii_hexdigit() {
                return Err(ValidationError::InvalidHex { pos });
            }
        }

        let hex: Vec<u8> = bytes.iter().copied().filter(|b| *b != b':').collect();
        let decoded = HEXLOWER_PERMISSIVE
            .decode(&hex)
            .map_err(|e| ValidationError::InvalidHex { pos: e.position })?;

        let mut octets = [0u8; 6];
        octets.copy_from_slice(&decoded);
        Ok(MacAddress(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Advertising payload decoded from a hex string, at most [`MAX_ADV_DATA_LEN`] bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvPayload {
    buf: [u8; MAX_ADV_DATA_LEN],
    len: usize,
}

impl AdvPayload {
    /// Parse an even-length hex string. The empty string is a valid, empty payload.
    pub fn from_hex(hex: &str) -> Result<Self, ValidationError> {
        let bytes = hex.as_bytes();
        if bytes.is_empty() {
            return Ok(Self {
                buf: [0; MAX_ADV_DATA_LEN],
                len: 0,
            });
        }
        if bytes.len() % 2 != 0 {
            return Err(ValidationError::OddLength);
        }
        if bytes.len() > MAX_ADV_DATA_LEN * 2 {
            return Err(ValidationError::TooLong {
                max: MAX_ADV_DATA_LEN * 2,
                found: bytes.len(),
            });
        }

        let decoded = HEXLOWER_PERMISSIVE
            .decode(bytes)
            .map_err(|e| ValidationError::InvalidHex { pos: e.position })?;

        let mut buf = [0u8; MAX_ADV_DATA_LEN];
        buf[..decoded.len()].copy_from_slice(&decoded);
        Ok(Self {
            buf,
            len: decoded.len(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Find the first manufacturer specific AD structure, returning (company id, data)
pub fn manufacturer_data(adv: &[u8]) -> Option<(u16, &[u8])> {
    let mut pos = 0;
    while pos < adv.len() {
        let len = adv[pos] as usize;
        if len == 0 || pos + 1 + len > adv.len() {
            return None;
        }
        let ad_type = adv[pos + 1];
        let data = &adv[pos + 2..pos + 1 + len];
        if ad_type == AD_TYPE_MANUFACTURER && data.len() >= 2 {
            return Some((u16::from_le_bytes([data[0], data[1]]), &data[2..]));
        }
        pos += 1 + len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_parse() {
        let mac: MacAddress = "78:81:8c:06:9a:c4".parse().unwrap();
        assert_eq!(mac.octets(), [0x78, 0x81, 0x8c, 0x06, 0x9a, 0xc4]);
        assert_eq!(mac.to_string(), "78:81:8c:06:9a:c4");

        let upper: MacAddress = "78:81:8C:06:9A:C4".parse().unwrap();
        assert_eq!(upper, mac);
    }

    #[test]
    fn mac_rejects() {
        assert_eq!(
            "78:81:8c:06:9a:c".parse::<MacAddress>(),
            Err(ValidationError::BadLength { expected: 17, found: 16 })
        );
        assert_eq!(
            "78:81:8c:06:9a:gg".parse::<MacAddress>(),
            Err(ValidationError::InvalidHex { pos: 15 })
        );
        assert_eq!(
            "78-81:8c:06:9a:c4".parse::<MacAddress>(),
            Err(ValidationError::MissingSeparator { pos: 2 })
        );
    }

    #[test]
    fn multicast_bit() {
        let group: MacAddress = "01:22:33:44:55:66".parse().unwrap();
        assert!(group.is_multicast());
        assert!(group.bt_base().is_multicast());

        let unicast: MacAddress = "78:81:8c:06:9a:c4".parse().unwrap();
        assert!(!unicast.is_multicast());
    }

    #[test]
    fn bt_base_wraps() {
        let mac: MacAddress = "78:81:8c:06:9a:c4".parse().unwrap();
        assert_eq!(mac.bt_base().octets()[5], 0xc2);

        let low = MacAddress([0, 0, 0, 0, 0, 0x01]);
        assert_eq!(low.bt_base().octets()[5], 0xff);
    }

    #[test]
    fn adv_payload_hex() {
        assert!(AdvPayload::from_hex("").unwrap().is_empty());
        assert_eq!(AdvPayload::from_hex("0102").unwrap().as_bytes(), &[0x01, 0x02]);
        assert_eq!(AdvPayload::from_hex("010"), Err(ValidationError::OddLength));
        assert_eq!(AdvPayload::from_hex("zz"), Err(ValidationError::InvalidHex { pos: 0 }));
        assert_eq!(
            AdvPayload::from_hex(&"00".repeat(33)),
            Err(ValidationError::TooLong { max: 64, found: 66 })
        );
    }

    #[test]
    fn default_adv_data_is_the_wake_packet() {
        let payload = AdvPayload::from_hex(crate::config::DEFAULT_BLE_DATA).unwrap();
        assert_eq!(payload.as_bytes(), &WAKE_ADV_DATA[..]);
    }

    #[test]
    fn wake_packet_manufacturer_data() {
        let (company, data) = manufacturer_data(&WAKE_ADV_DATA).unwrap();
        assert_eq!(company, WAKE_COMPANY_ID);
        assert_eq!(data.len(), 24);
        assert_eq!(&data[..3], &[0x01, 0x00, 0x03]);
    }
}
