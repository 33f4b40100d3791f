//! Parameter validation and persistence
//!
//! Every field the store hands out has passed its validator or is the
//! compiled-in default. Bad input is never an error, it is replaced.

use beacon_mcu::Storage;
use beacon_proto::config::{MAX_TOPIC_LEN, MAX_UID_LEN};
use beacon_proto::{AdvPayload, DeviceConfig, Field, MacAddress, ValidationError};
use log::*;
use serde::Serialize;

use crate::{Error, Result};

/// Check one field, reporting why it was rejected
pub fn check(field: Field, value: &str) -> std::result::Result<(), ValidationError> {
    match field {
        Field::Uid => check_len(value, MAX_UID_LEN),
        Field::Topic => check_len(value, MAX_TOPIC_LEN),
        Field::Mac => value.parse::<MacAddress>().map(|_| ()),
        Field::AdvData => AdvPayload::from_hex(value).map(|_| ()),
    }
}

pub fn validate(field: Field, value: &str) -> bool {
    check(field, value).is_ok()
}

fn check_len(value: &str, max: usize) -> std::result::Result<(), ValidationError> {
    if value.is_empty() {
        Err(ValidationError::Empty)
    } else if value.len() > max {
        Err(ValidationError::TooLong {
            max,
            found: value.len(),
        })
    } else {
        Ok(())
    }
}

/// A candidate config after per-field fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sanitized {
    pub config: DeviceConfig,
    /// Fields that were rejected and replaced by their default
    pub fallbacks: Vec<Field>,
}

/// Replace each invalid field with its default, independently of the others
pub fn sanitize(mut candidate: DeviceConfig) -> Sanitized {
    let mut fallbacks = Vec::new();

    for field in Field::ALL {
        if let Err(e) = check(field, candidate.get(field)) {
            warn!("{} rejected ({}), using default", field.key(), e);
            candidate.set(field, field.default_value().to_string());
            fallbacks.push(field);
        }
    }

    Sanitized {
        config: candidate,
        fallbacks,
    }
}

/// Owner of the live [`DeviceConfig`] and its persisted copy
pub struct ParameterStore<S: Storage> {
    storage: S,
    config: DeviceConfig,
}

impl<S: Storage> ParameterStore<S> {
    /// Load from storage. Missing keys take their default; unreadable storage
    /// yields all defaults.
    pub fn load(storage: S) -> Self {
        info!("Loading saved parameters...");

        let config = match read_all(&storage) {
            Ok(raw) => sanitize(raw).config,
            Err(e) => {
                error!("Failed to open preferences, using defaults: {:?}", e);
                DeviceConfig::default()
            }
        };

        info!("Parameters loaded:");
        info!("  Bafa UID: {}", config.bafa_uid);
        info!("  Bafa Topic: {}", config.bafa_topic);
        info!("  BLE MAC: {}", config.ble_mac);
        info!("  BLE Data: {}", config.ble_data);

        Self { storage, config }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Validate, persist, and on success adopt the candidate.
    ///
    /// All four keys are written even if one fails; the live config only
    /// changes when every write succeeded.
    pub fn save(&mut self, candidate: DeviceConfig) -> Result<&DeviceConfig> {
        info!("Parameter save triggered");
        let Sanitized { config, fallbacks } = sanitize(candidate);
        if !fallbacks.is_empty() {
            info!("{} field(s) fell back to defaults", fallbacks.len());
        }

        let mut first_err = None;
        for field in Field::ALL {
            if let Err(e) = self.storage.set_str(field.key(), config.get(field)) {
                error!("Failed to write {}: {:?}", field.key(), e);
                first_err.get_or_insert(e);
            }
        }

        if let Some(e) = first_err {
            return Err(Error::Storage(format!("{e:?}")));
        }

        self.config = config;
        info!("Parameters saved to flash");
        Ok(&self.config)
    }

    /// Factory reset: erase the namespace and fall back to defaults.
    ///
    /// The live config is reset even when the erase fails.
    pub fn clear(&mut self) -> Result<()> {
        self.config = DeviceConfig::default();
        self.storage
            .clear_all()
            .map_err(|e| Error::Storage(format!("{e:?}")))?;
        info!("Preferences cleared");
        Ok(())
    }
}

fn read_all<S: Storage>(storage: &S) -> std::result::Result<DeviceConfig, S::Error> {
    let mut config = DeviceConfig::default();
    for field in Field::ALL {
        if let Some(value) = storage.get_str(field.key())? {
            config.set(field, value);
        }
    }
    Ok(config)
}
