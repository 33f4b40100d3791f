//! Board bundle
//!
//! Aggregates one implementation of every service the controller drives,
//! so the controller is generic over a single type parameter.

use crate::{BeaconRadio, ButtonPin, Clock, Connector, IndicatorLight, Network, Storage};

/// Root board trait
///
/// Implementations only name their concrete types; construction happens in
/// the firmware's `main` and is handed over as [`Parts`].
pub trait Board {
    type Storage: Storage;
    type Network: Network;
    type Radio: BeaconRadio;
    type Connector: Connector;
    type Button: ButtonPin;
    type Light: IndicatorLight;
    type Clock: Clock;
}

/// Owned board services
pub struct Parts<B: Board> {
    pub storage: B::Storage,
    pub network: B::Network,
    pub radio: B::Radio,
    pub connector: B::Connector,
    pub button: B::Button,
    /// Connection status blink
    pub status_light: B::Light,
    /// Mirrors the last cloud command
    pub command_light: B::Light,
    pub clock: B::Clock,
}
