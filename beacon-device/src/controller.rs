//! The cooperative control loop
//!
//! [`Controller`] owns every component and every board service. The firmware
//! calls [`Controller::boot`] once, then [`Controller::tick`] every
//! [`TICK_MS`] until it is told to restart.

use std::time::Duration;

use beacon_mcu::{Board, ButtonPin, Clock, IndicatorLight, Network, Parts, PortalRequest, Storage};
use beacon_proto::{Command, DeviceConfig};
use log::*;

use crate::{
    BeaconTrigger, ButtonEvent, CloudSession, ConnectionStateMachine, DeviceStatus,
    InputController, ParameterStore, Transition,
};

/// Delay between ticks
pub const TICK_MS: u64 = 20;

/// On-demand portal, opened by a short press
pub const PORTAL_TIMEOUT: Duration = Duration::from_secs(120);
pub const ON_DEMAND_AP_SSID: &str = "ESP32-OnDemand";

/// Fallback portal when boot finds no usable credentials
pub const BOOT_PORTAL_TIMEOUT: Duration = Duration::from_secs(30);
pub const BOOT_AP_SSID: &str = "ESP32-ConfigAP";

pub const AP_PASSWORD: &str = "12345678";

/// Least time between two WiFi rejoin attempts while the link is down
pub const REJOIN_INTERVAL_MS: u64 = 5_000;

/// What the caller should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Factory reset done, restart the device
    Restart,
}

pub struct Controller<B: Board> {
    store: ParameterStore<B::Storage>,
    network: B::Network,
    cloud: CloudSession<B::Connector>,
    beacon: BeaconTrigger<B::Radio>,
    input: InputController,
    machine: ConnectionStateMachine,
    button: B::Button,
    status_light: B::Light,
    command_light: B::Light,
    clock: B::Clock,
    last_rejoin: Option<u64>,
}

impl<B: Board> Controller<B> {
    /// Load parameters and take ownership of the board
    pub fn new(parts: Parts<B>) -> Self {
        let Parts {
            storage,
            network,
            radio,
            connector,
            button,
            status_light,
            mut command_light,
            clock,
        } = parts;

        command_light.set(false);

        Self {
            store: ParameterStore::load(storage),
            network,
            cloud: CloudSession::new(connector),
            beacon: BeaconTrigger::new(radio),
            input: InputController::new(),
            machine: ConnectionStateMachine::new(),
            button,
            status_light,
            command_light,
            clock,
            last_rejoin: None,
        }
    }

    pub fn status(&self) -> DeviceStatus {
        self.machine.status()
    }

    pub fn config(&self) -> &DeviceConfig {
        self.store.config()
    }

    /// Join WiFi with saved credentials, falling back to the boot portal
    pub fn boot(&mut self) {
        info!("Connecting to WiFi...");
        self.machine.begin_connect();

        let prefill = self.store.config().clone();
        let request = PortalRequest {
            ssid: BOOT_AP_SSID,
            password: AP_PASSWORD,
            timeout: BOOT_PORTAL_TIMEOUT,
            prefill: &prefill,
        };
        let store = &mut self.store;
        let mut on_save = |candidate: DeviceConfig| save_submitted(store, candidate);

        let connected = self.network.auto_connect(&request, &mut on_save);
        self.machine.connect_finished(connected);

        if connected {
            self.log_ip();
            self.subscribe();
        } else {
            error!("Failed to connect to WiFi");
        }
    }

    /// One pass of the loop
    pub fn tick(&mut self) -> Flow {
        let now = self.clock.now_ms();

        let low = self.button.is_low();
        match self.input.sample(low, now) {
            Some(ButtonEvent::ConfigPortalRequested) => self.run_portal(),
            Some(ButtonEvent::FactoryResetRequested) => return self.factory_reset(),
            None => {}
        }

        // the portal may have blocked for minutes
        let now = self.clock.now_ms();

        self.machine.update_indicator(now, &mut self.status_light);

        let link_up = self.network.is_connected();
        if self.machine.reconcile(link_up) == Some(Transition::LinkRestored) {
            self.last_rejoin = None;
            self.subscribe();
        }
        if !link_up {
            self.rejoin(now);
        }

        if let Some(cmd) = self.cloud.poll_inbound() {
            self.command_light.set(cmd == Command::TurnOn);
            if let Err(e) = self.beacon.on_command(cmd, self.store.config(), now) {
                error!("Beacon command failed: {}", e);
            }
        }

        self.beacon.tick(now);
        self.cloud.tick_heartbeat(now);

        Flow::Continue
    }

    /// Blocks until the portal returns
    fn run_portal(&mut self) {
        info!("Starting config portal");
        self.machine.enter_config_mode();
        self.status_light.set(true);

        let prefill = self.store.config().clone();
        let request = PortalRequest {
            ssid: ON_DEMAND_AP_SSID,
            password: AP_PASSWORD,
            timeout: PORTAL_TIMEOUT,
            prefill: &prefill,
        };
        let store = &mut self.store;
        let mut on_save = |candidate: DeviceConfig| save_submitted(store, candidate);
        let portal_ok = self.network.start_portal(&request, &mut on_save);

        let link_up = self.network.is_connected();
        if !portal_ok {
            warn!("Config portal timed out or failed");
        }
        if self.machine.exit_config_mode(portal_ok, link_up) == DeviceStatus::Connected {
            self.log_ip();
            self.subscribe();
        }
    }

    fn factory_reset(&mut self) -> Flow {
        warn!("Factory reset requested");
        if let Err(e) = self.store.clear() {
            error!("Failed to clear parameters: {}", e);
        }
        if let Err(e) = self.network.reset_settings() {
            error!("Failed to reset WiFi settings: {:?}", e);
        }
        self.cloud.close();
        if let Err(e) = self.network.disconnect() {
            warn!("WiFi disconnect before restart failed: {:?}", e);
        }
        Flow::Restart
    }

    /// Ask the network to rejoin, at most once per [`REJOIN_INTERVAL_MS`]
    fn rejoin(&mut self, now: u64) {
        if let Some(last) = self.last_rejoin {
            if now.saturating_sub(last) < REJOIN_INTERVAL_MS {
                return;
            }
        }
        self.last_rejoin = Some(now);
        debug!("WiFi down, rejoining");
        if let Err(e) = self.network.reconnect() {
            warn!("WiFi rejoin failed: {:?}", e);
        }
    }

    fn subscribe(&mut self) {
        let config = self.store.config();
        if let Err(e) = self.cloud.subscribe(&config.bafa_uid, &config.bafa_topic) {
            warn!("Subscribe failed, retrying on next connect: {}", e);
        }
    }

    fn log_ip(&self) {
        if let Some(ip) = self.network.ip_info() {
            info!("WiFi connected, IP: {}", ip.ip_str());
        }
    }

    #[cfg(test)]
    pub(crate) fn cloud(&self) -> &CloudSession<B::Connector> {
        &self.cloud
    }

    #[cfg(test)]
    pub(crate) fn beacon(&self) -> &BeaconTrigger<B::Radio> {
        &self.beacon
    }
}

fn save_submitted<S: Storage>(store: &mut ParameterStore<S>, candidate: DeviceConfig) {
    if let Err(e) = store.save(candidate) {
        error!("Failed to save parameters: {}", e);
    }
}
