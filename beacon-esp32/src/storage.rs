//! NVS backed parameter storage

use std::ffi::CString;

use beacon_mcu::Storage;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::sys::{
    esp, nvs_close, nvs_commit, nvs_erase_all, nvs_handle_t, nvs_open,
    nvs_open_mode_t_NVS_READWRITE, ESP_ERR_NVS_NOT_FOUND,
};

/// Longest value we read back; every validated field fits
const MAX_VALUE_LEN: usize = 256;

/// One NVS namespace. Reads open it read-only, writes read-write, and each
/// handle is closed again when the call returns.
pub struct NvsStorage {
    partition: EspDefaultNvsPartition,
    namespace: &'static str,
}

impl NvsStorage {
    pub fn open(partition: EspDefaultNvsPartition, namespace: &'static str) -> Self {
        Self {
            partition,
            namespace,
        }
    }

    fn writable(&self) -> anyhow::Result<EspNvs<NvsDefault>> {
        Ok(EspNvs::new(self.partition.clone(), self.namespace, true)?)
    }
}

impl Storage for NvsStorage {
    type Error = anyhow::Error;

    fn get_str(&self, key: &str) -> anyhow::Result<Option<String>> {
        let nvs = match EspNvs::new(self.partition.clone(), self.namespace, false) {
            Ok(nvs) => nvs,
            // namespace is created by the first write
            Err(e) if e.code() == ESP_ERR_NVS_NOT_FOUND as i32 => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut buf = [0u8; MAX_VALUE_LEN];
        let value = nvs.get_str(key, &mut buf)?;
        Ok(value.map(str::to_string))
    }

    fn set_str(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.writable()?.set_str(key, value)?;
        Ok(())
    }

    fn clear_all(&mut self) -> anyhow::Result<()> {
        let namespace = CString::new(self.namespace)?;
        let mut handle: nvs_handle_t = 0;
        esp!(unsafe { nvs_open(namespace.as_ptr(), nvs_open_mode_t_NVS_READWRITE, &mut handle) })?;

        let erased = esp!(unsafe { nvs_erase_all(handle) })
            .and_then(|()| esp!(unsafe { nvs_commit(handle) }));
        unsafe { nvs_close(handle) };
        erased?;
        Ok(())
    }
}
