//! WiFi station with a captive portal fallback

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Instant;

use anyhow::anyhow;
use beacon_mcu::{IpInfo, Network, PortalRequest, SaveCallback, Storage, WifiStatus};
use embedded_svc::wifi::{AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::*;

use crate::portal;
use crate::storage::NvsStorage;

pub const WIFI_NAMESPACE: &str = "wifi";
const KEY_WIFI_SSID: &str = "wifi_ssid";
const KEY_WIFI_PASS: &str = "wifi_pass";

pub struct EspNetwork {
    wifi: BlockingWifi<EspWifi<'static>>,
    credentials: NvsStorage,
    /// A non-blocking connect was issued and has not been seen to land
    rejoining: bool,
}

impl EspNetwork {
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>, credentials: NvsStorage) -> Self {
        Self {
            wifi,
            credentials,
            rejoining: false,
        }
    }

    fn load_credentials(&self) -> Option<(String, String)> {
        let ssid = self.credentials.get_str(KEY_WIFI_SSID).ok()??;
        let pass = self
            .credentials
            .get_str(KEY_WIFI_PASS)
            .ok()
            .flatten()
            .unwrap_or_default();
        if ssid.is_empty() {
            return None;
        }
        Some((ssid, pass))
    }

    fn save_credentials(&mut self, ssid: &str, password: &str) {
        if let Err(e) = self.credentials.set_str(KEY_WIFI_SSID, ssid) {
            error!("Failed to save SSID: {:?}", e);
        }
        if let Err(e) = self.credentials.set_str(KEY_WIFI_PASS, password) {
            error!("Failed to save password: {:?}", e);
        }
    }

    fn join(&mut self, ssid: &str, password: &str) -> anyhow::Result<()> {
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| anyhow!("SSID too long"))?,
            password: password
                .try_into()
                .map_err(|_| anyhow!("Password too long"))?,
            auth_method,
            ..Default::default()
        });

        if self.wifi.is_started()? {
            self.wifi.stop()?;
        }
        self.wifi.set_configuration(&config)?;
        self.wifi.start()?;
        info!("WiFi started, connecting to {}...", ssid);

        self.wifi.connect()?;
        self.wifi.wait_netif_up()?;
        self.rejoining = false;
        info!("Network interface is up");
        Ok(())
    }

    fn open_access_point(&mut self, portal: &PortalRequest<'_>) -> anyhow::Result<()> {
        let config = Configuration::AccessPoint(AccessPointConfiguration {
            ssid: portal.ssid.try_into().map_err(|_| anyhow!("AP SSID too long"))?,
            password: portal
                .password
                .try_into()
                .map_err(|_| anyhow!("AP password too long"))?,
            auth_method: AuthMethod::WPA2Personal,
            ssid_hidden: false,
            ..Default::default()
        });

        if self.wifi.is_started()? {
            self.wifi.stop()?;
        }
        self.wifi.set_configuration(&config)?;
        self.wifi.start()?;
        self.wifi.wait_netif_up()?;
        info!("Config portal AP '{}' is up", portal.ssid);
        Ok(())
    }

    /// Blocks until a submission connects, or the timeout runs out
    fn run_portal(
        &mut self,
        portal: &PortalRequest<'_>,
        on_save: &mut SaveCallback<'_>,
    ) -> anyhow::Result<bool> {
        self.open_access_point(portal)?;

        let (tx, rx) = mpsc::channel();
        let _server = portal::serve(portal.prefill, tx)?;
        let deadline = Instant::now() + portal.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let form = match rx.recv_timeout(remaining) {
                Ok(form) => form,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return Ok(false);
                }
            };

            on_save(form.config);
            self.save_credentials(&form.wifi_ssid, &form.wifi_password);

            match self.join(&form.wifi_ssid, &form.wifi_password) {
                Ok(()) => return Ok(true),
                Err(e) => {
                    warn!("Could not join '{}': {:?}", form.wifi_ssid, e);
                    self.open_access_point(portal)?;
                }
            }
        }
    }

    /// Back to station mode after a portal that did not connect
    fn restore_station(&mut self) {
        if let Some((ssid, pass)) = self.load_credentials() {
            if let Err(e) = self.join(&ssid, &pass) {
                warn!("Rejoin after portal failed: {:?}", e);
            }
        } else if let Err(e) = self.wifi.stop() {
            warn!("Failed to stop WiFi: {:?}", e);
        }
    }
}

impl Network for EspNetwork {
    type Error = anyhow::Error;

    fn status(&self) -> WifiStatus {
        match self.wifi.is_connected() {
            Ok(true) => WifiStatus::Connected,
            Ok(false) if self.rejoining => WifiStatus::Connecting,
            Ok(false) => WifiStatus::Disconnected,
            Err(_) => WifiStatus::Failed,
        }
    }

    fn ip_info(&self) -> Option<IpInfo> {
        let info = self.wifi.wifi().sta_netif().get_ip_info().ok()?;
        Some(IpInfo {
            ip: info.ip.octets(),
            gateway: info.subnet.gateway.octets(),
            netmask: std::net::Ipv4Addr::from(info.subnet.mask).octets(),
        })
    }

    fn auto_connect(&mut self, portal: &PortalRequest<'_>, on_save: &mut SaveCallback<'_>) -> bool {
        match self.load_credentials() {
            Some((ssid, pass)) => match self.join(&ssid, &pass) {
                Ok(()) => return true,
                Err(e) => warn!("Saved WiFi credentials did not connect: {:?}", e),
            },
            None => warn!("No WiFi credentials saved"),
        }
        self.start_portal(portal, on_save)
    }

    fn start_portal(&mut self, portal: &PortalRequest<'_>, on_save: &mut SaveCallback<'_>) -> bool {
        info!(
            "Opening config portal '{}' for {}s",
            portal.ssid,
            portal.timeout.as_secs()
        );
        match self.run_portal(portal, on_save) {
            Ok(true) => true,
            Ok(false) => {
                warn!("Config portal timed out");
                self.restore_station();
                false
            }
            Err(e) => {
                error!("Config portal failed: {:?}", e);
                self.restore_station();
                false
            }
        }
    }

    fn reconnect(&mut self) -> anyhow::Result<()> {
        if self.wifi.is_connected()? {
            self.rejoining = false;
            return Ok(());
        }
        if self.load_credentials().is_none() {
            return Ok(());
        }
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        // EspWifi::connect only starts the attempt; the station event lands later
        self.wifi.wifi_mut().connect()?;
        self.rejoining = true;
        Ok(())
    }

    fn reset_settings(&mut self) -> anyhow::Result<()> {
        self.credentials.clear_all()?;
        info!("WiFi credentials cleared");
        Ok(())
    }

    fn disconnect(&mut self) -> anyhow::Result<()> {
        self.rejoining = false;
        if self.wifi.is_connected()? {
            self.wifi.disconnect()?;
        }
        Ok(())
    }
}
