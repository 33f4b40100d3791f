//! Timed wake beacon
//!
//! A `TurnOn` command advertises the wake packet for one second; `TurnOff`
//! stops it early.

use beacon_mcu::{BeaconRadio, RadioConfig, WAKE_ADV_DATA};
use beacon_proto::config::DEFAULT_BLE_MAC;
use beacon_proto::{Command, DeviceConfig, MacAddress};
use log::*;

use crate::{Error, Result};

/// How long one wake advertisement runs
pub const BEACON_DURATION_MS: u64 = 1000;

/// A running advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconSession {
    pub started_at: u64,
}

pub struct BeaconTrigger<R: BeaconRadio> {
    radio: R,
    initialized: bool,
    session: Option<BeaconSession>,
    duration_ms: u64,
}

impl<R: BeaconRadio> BeaconTrigger<R> {
    pub fn new(radio: R) -> Self {
        Self {
            radio,
            initialized: false,
            session: None,
            duration_ms: BEACON_DURATION_MS,
        }
    }

    pub fn on_command(&mut self, cmd: Command, config: &DeviceConfig, now: u64) -> Result<()> {
        match cmd {
            Command::TurnOn => self.start(config, now),
            Command::TurnOff => self.stop(),
        }
    }

    /// Start, or restart, the advertising window
    pub fn start(&mut self, config: &DeviceConfig, now: u64) -> Result<()> {
        if !self.initialized {
            self.init(config)?;
        }

        self.radio.stop_advertising().map_err(radio_err)?;
        self.radio
            .start_advertising(&WAKE_ADV_DATA)
            .map_err(radio_err)?;

        if self.session.replace(BeaconSession { started_at: now }).is_some() {
            debug!("Beacon window restarted");
        }
        info!("BLE advertising started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.session = None;
        self.radio.stop_advertising().map_err(radio_err)?;
        info!("BLE advertising stopped");
        Ok(())
    }

    /// Stop once the window has run out
    pub fn tick(&mut self, now: u64) {
        let Some(session) = self.session else {
            return;
        };
        if now.saturating_sub(session.started_at) >= self.duration_ms {
            if let Err(e) = self.stop() {
                error!("Failed to stop advertising: {:?}", e);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<BeaconSession> {
        self.session
    }

    #[cfg(test)]
    pub(crate) fn radio(&self) -> &R {
        &self.radio
    }

    fn init(&mut self, config: &DeviceConfig) -> Result<()> {
        let address = config.ble_mac.parse::<MacAddress>().or_else(|e| {
            warn!("Configured MAC unusable ({}), using default", e);
            DEFAULT_BLE_MAC.parse::<MacAddress>()
        });
        let address = address.map_err(|e| Error::Radio(e.to_string()))?;

        info!("Initializing BLE as {}", address);
        self.radio
            .init(&RadioConfig::beacon(address))
            .map_err(radio_err)?;
        if let Some(actual) = self.radio.address() {
            info!("BLE MAC Address: {}", actual);
        }
        self.initialized = true;
        Ok(())
    }
}

fn radio_err<E: core::fmt::Debug>(e: E) -> Error {
    Error::Radio(format!("{e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRadio, RadioOp};

    fn trigger() -> BeaconTrigger<MockRadio> {
        BeaconTrigger::new(MockRadio::new())
    }

    #[test]
    fn turn_on_inits_once_and_advertises() {
        let mut beacon = trigger();
        let config = DeviceConfig::default();

        beacon.on_command(Command::TurnOn, &config, 10).unwrap();
        beacon.on_command(Command::TurnOn, &config, 20).unwrap();

        let ops = beacon.radio().ops();
        let inits: Vec<_> = ops
            .iter()
            .filter(|op| matches!(op, RadioOp::Init(_)))
            .collect();
        assert_eq!(inits.len(), 1);
        match inits[0] {
            RadioOp::Init(cfg) => assert_eq!(cfg.base_address.to_string(), "78:81:8c:06:9a:c2"),
            _ => unreachable!(),
        }
        assert_eq!(ops.last(), Some(&RadioOp::Start(WAKE_ADV_DATA.to_vec())));
    }

    #[test]
    fn stops_after_one_second() {
        let mut beacon = trigger();
        beacon
            .on_command(Command::TurnOn, &DeviceConfig::default(), 5000)
            .unwrap();

        beacon.tick(5999);
        assert!(beacon.is_active());
        beacon.tick(6000);
        assert!(!beacon.is_active());
        assert_eq!(beacon.radio().ops().last(), Some(&RadioOp::Stop));
    }

    #[test]
    fn retrigger_resets_window() {
        let mut beacon = trigger();
        let config = DeviceConfig::default();
        beacon.on_command(Command::TurnOn, &config, 0).unwrap();
        beacon.on_command(Command::TurnOn, &config, 800).unwrap();

        beacon.tick(1000);
        assert_eq!(beacon.session(), Some(BeaconSession { started_at: 800 }));
        beacon.tick(1800);
        assert!(!beacon.is_active());
    }

    #[test]
    fn turn_off_stops_immediately() {
        let mut beacon = trigger();
        let config = DeviceConfig::default();
        beacon.on_command(Command::TurnOn, &config, 0).unwrap();
        beacon.on_command(Command::TurnOff, &config, 100).unwrap();
        assert!(!beacon.is_active());
    }

    #[test]
    fn turn_off_before_init_touches_nothing() {
        let mut beacon = trigger();
        beacon
            .on_command(Command::TurnOff, &DeviceConfig::default(), 0)
            .unwrap();
        assert!(beacon.radio().ops().is_empty());
    }

    #[test]
    fn bad_mac_uses_default_address() {
        let mut beacon = trigger();
        let config = DeviceConfig {
            ble_mac: "nope".to_string(),
            ..DeviceConfig::default()
        };
        beacon.on_command(Command::TurnOn, &config, 0).unwrap();
        match &beacon.radio().ops()[0] {
            RadioOp::Init(cfg) => assert_eq!(cfg.base_address.to_string(), "78:81:8c:06:9a:c2"),
            op => panic!("unexpected {op:?}"),
        }
    }

    #[test]
    fn multicast_mac_still_advertises() {
        let mut beacon = trigger();
        let config = DeviceConfig {
            ble_mac: "01:22:33:44:55:66".to_string(),
            ..DeviceConfig::default()
        };
        beacon.on_command(Command::TurnOn, &config, 0).unwrap();
        assert!(beacon.is_active());
        match &beacon.radio().ops()[0] {
            RadioOp::Init(cfg) => assert!(cfg.base_address.is_multicast()),
            op => panic!("unexpected {op:?}"),
        }
    }

    #[test]
    fn radio_failure_is_reported() {
        let mut beacon = trigger();
        beacon.radio().fail(true);
        let result = beacon.on_command(Command::TurnOn, &DeviceConfig::default(), 0);
        assert!(matches!(result, Err(Error::Radio(_))));
        assert!(!beacon.is_active());
    }
}
