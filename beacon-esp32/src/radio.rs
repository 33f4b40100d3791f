//! NimBLE advertiser for the wake beacon

use anyhow::anyhow;
use beacon_mcu::{BeaconRadio, RadioConfig};
use beacon_proto::MacAddress;
use esp32_nimble::{enums::ConnMode, BLEDevice};
use esp_idf_svc::sys::{esp, esp_base_mac_addr_set, esp_mac_type_t_ESP_MAC_BT, esp_read_mac, ESP_OK};
use log::*;

#[derive(Default)]
pub struct NimbleRadio {
    device: Option<&'static mut BLEDevice>,
}

impl NimbleRadio {
    pub fn new() -> Self {
        Self::default()
    }

    fn device(&mut self) -> anyhow::Result<&mut BLEDevice> {
        self.device
            .as_deref_mut()
            .ok_or_else(|| anyhow!("BLE not initialized"))
    }
}

impl BeaconRadio for NimbleRadio {
    type Error = anyhow::Error;

    fn init(&mut self, config: &RadioConfig) -> anyhow::Result<()> {
        // must precede the controller bring-up in BLEDevice::take. A refused
        // base address keeps the factory MAC and BLE still comes up.
        if config.base_address.is_multicast() {
            warn!("Failed to set custom MAC address: {} is multicast", config.base_address);
        } else {
            let base = config.base_address.octets();
            if let Err(e) = esp!(unsafe { esp_base_mac_addr_set(base.as_ptr()) }) {
                warn!("Failed to set custom MAC address: {:?}", e);
            }
        }

        let device = BLEDevice::take();
        BLEDevice::set_device_name(&config.device_name)
            .map_err(|e| anyhow!("set device name: {:?}", e))?;

        let mode = if config.connectable {
            ConnMode::Und
        } else {
            ConnMode::Non
        };
        device
            .get_advertising()
            .lock()
            .advertisement_type(mode)
            .min_interval(config.min_interval)
            .max_interval(config.max_interval);

        self.device = Some(device);
        info!("BLE initialized as '{}'", config.device_name);
        Ok(())
    }

    fn start_advertising(&mut self, data: &[u8]) -> anyhow::Result<()> {
        let mut advertising = self.device()?.get_advertising().lock();
        advertising
            .set_raw_data(data)
            .map_err(|e| anyhow!("set advertising data: {:?}", e))?;
        advertising
            .start()
            .map_err(|e| anyhow!("start advertising: {:?}", e))?;
        Ok(())
    }

    fn stop_advertising(&mut self) -> anyhow::Result<()> {
        self.device()?
            .get_advertising()
            .lock()
            .stop()
            .map_err(|e| anyhow!("stop advertising: {:?}", e))?;
        Ok(())
    }

    fn address(&self) -> Option<MacAddress> {
        self.device.as_ref()?;
        let mut mac = [0u8; 6];
        let err = unsafe { esp_read_mac(mac.as_mut_ptr(), esp_mac_type_t_ESP_MAC_BT) };
        (err == ESP_OK).then_some(MacAddress(mac))
    }
}
