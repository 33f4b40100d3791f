//! WiFi Abstraction Traits
//!
//! Traits for station connectivity and the captive configuration portal.

use std::time::Duration;

use beacon_proto::DeviceConfig;

/// WiFi connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiStatus {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// IP address info
#[derive(Debug, Clone)]
pub struct IpInfo {
    pub ip: [u8; 4],
    pub gateway: [u8; 4],
    pub netmask: [u8; 4],
}

impl IpInfo {
    pub fn ip_str(&self) -> String {
        format!("{}.{}.{}.{}", self.ip[0], self.ip[1], self.ip[2], self.ip[3])
    }
}

/// How to open the captive portal
#[derive(Debug, Clone)]
pub struct PortalRequest<'a> {
    /// Access point name
    pub ssid: &'a str,
    /// Access point password
    pub password: &'a str,
    /// Give up after this long without a successful submit
    pub timeout: Duration,
    /// Values the form is pre-filled with
    pub prefill: &'a DeviceConfig,
}

/// Called with the raw, unvalidated field values the user submitted
pub type SaveCallback<'a> = dyn FnMut(DeviceConfig) + 'a;

/// Trait for WiFi operations
///
/// MCU-specific crates implement this trait using their WiFi stack.
/// Both portal calls block the caller until they return.
pub trait Network {
    /// Error type for WiFi operations
    type Error: core::fmt::Debug;

    /// Get current connection status
    fn status(&self) -> WifiStatus;

    /// Get IP info (if connected)
    fn ip_info(&self) -> Option<IpInfo>;

    /// Check if connected
    fn is_connected(&self) -> bool {
        self.status() == WifiStatus::Connected
    }

    /// Connect with stored credentials, falling back to the portal.
    ///
    /// Returns true once connected.
    fn auto_connect(&mut self, portal: &PortalRequest<'_>, on_save: &mut SaveCallback<'_>) -> bool;

    /// Run the portal until the user submits and the station connects, or timeout.
    ///
    /// Returns true on a successful exit, false on timeout or failure.
    fn start_portal(&mut self, portal: &PortalRequest<'_>, on_save: &mut SaveCallback<'_>) -> bool;

    /// Kick off a rejoin with stored credentials and return without waiting.
    ///
    /// The outcome shows up later through [`Network::status`].
    fn reconnect(&mut self) -> Result<(), Self::Error>;

    /// Forget stored WiFi credentials
    fn reset_settings(&mut self) -> Result<(), Self::Error>;

    /// Disconnect from WiFi
    fn disconnect(&mut self) -> Result<(), Self::Error>;
}
