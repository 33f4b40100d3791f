//! In-memory board for unit tests
//!
//! Every handle is a cheap clone sharing state with the copy moved into the
//! controller, so tests keep poking at a board after handing it over.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Read, Write};
use std::rc::Rc;

use beacon_mcu::{
    BeaconRadio, Board, ButtonPin, Clock, Connector, IndicatorLight, IpInfo, Network, Parts,
    PortalRequest, RadioConfig, SaveCallback, Storage, WifiStatus,
};
use beacon_proto::{DeviceConfig, MacAddress};

pub struct MockBoard;

impl Board for MockBoard {
    type Storage = MemStorage;
    type Network = MockNetwork;
    type Radio = MockRadio;
    type Connector = MockConnector;
    type Button = MockButton;
    type Light = MockLight;
    type Clock = MockClock;
}

// Storage

#[derive(Default)]
struct StorageState {
    entries: BTreeMap<String, String>,
    fail_reads: bool,
    fail_writes: bool,
}

#[derive(Clone, Default)]
pub struct MemStorage(Rc<RefCell<StorageState>>);

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.0
            .borrow_mut()
            .entries
            .insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.0.borrow().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().entries.len()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.0.borrow_mut().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.0.borrow_mut().fail_writes = fail;
    }
}

impl Storage for MemStorage {
    type Error = &'static str;

    fn get_str(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let state = self.0.borrow();
        if state.fail_reads {
            return Err("read failed");
        }
        Ok(state.entries.get(key).cloned())
    }

    fn set_str(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        if state.fail_writes {
            return Err("write failed");
        }
        state.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear_all(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        if state.fail_writes {
            return Err("erase failed");
        }
        state.entries.clear();
        Ok(())
    }
}

// Network

#[derive(Default)]
struct NetworkState {
    connected: bool,
    auto_connect: bool,
    portal_result: bool,
    submission: Option<DeviceConfig>,
    last_ssid: Option<String>,
    reset: bool,
    reconnects: usize,
    portal_clock: Option<(MockClock, u64)>,
}

#[derive(Clone, Default)]
pub struct MockNetwork(Rc<RefCell<NetworkState>>);

impl MockNetwork {
    pub fn set_connected(&self, connected: bool) {
        self.0.borrow_mut().connected = connected;
    }

    pub fn set_auto_connect(&self, ok: bool) {
        self.0.borrow_mut().auto_connect = ok;
    }

    pub fn set_portal_result(&self, ok: bool) {
        self.0.borrow_mut().portal_result = ok;
    }

    /// Form values the next portal run submits
    pub fn submit_on_portal(&self, config: DeviceConfig) {
        self.0.borrow_mut().submission = Some(config);
    }

    pub fn last_portal_ssid(&self) -> Option<String> {
        self.0.borrow().last_ssid.clone()
    }

    pub fn was_reset(&self) -> bool {
        self.0.borrow().reset
    }

    pub fn reconnects(&self) -> usize {
        self.0.borrow().reconnects
    }

    /// Every portal run moves `clock` forward by `ms`
    pub fn portal_takes(&self, clock: &MockClock, ms: u64) {
        self.0.borrow_mut().portal_clock = Some((clock.clone(), ms));
    }

    fn run(&mut self, portal: &PortalRequest<'_>, on_save: &mut SaveCallback<'_>, ok: bool) -> bool {
        let submission = {
            let mut state = self.0.borrow_mut();
            state.last_ssid = Some(portal.ssid.to_string());
            if let Some((clock, ms)) = &state.portal_clock {
                clock.advance(*ms);
            }
            state.submission.take()
        };
        if let Some(config) = submission {
            on_save(config);
        }
        if ok {
            self.0.borrow_mut().connected = true;
        }
        ok
    }
}

impl Network for MockNetwork {
    type Error = &'static str;

    fn status(&self) -> WifiStatus {
        if self.0.borrow().connected {
            WifiStatus::Connected
        } else {
            WifiStatus::Disconnected
        }
    }

    fn ip_info(&self) -> Option<IpInfo> {
        self.is_connected().then_some(IpInfo {
            ip: [192, 168, 1, 50],
            gateway: [192, 168, 1, 1],
            netmask: [255, 255, 255, 0],
        })
    }

    fn auto_connect(&mut self, portal: &PortalRequest<'_>, on_save: &mut SaveCallback<'_>) -> bool {
        let ok = self.0.borrow().auto_connect;
        self.run(portal, on_save, ok)
    }

    fn start_portal(&mut self, portal: &PortalRequest<'_>, on_save: &mut SaveCallback<'_>) -> bool {
        let ok = self.0.borrow().portal_result;
        self.run(portal, on_save, ok)
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().reconnects += 1;
        Ok(())
    }

    fn reset_settings(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        state.reset = true;
        state.connected = false;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().connected = false;
        Ok(())
    }
}

// Radio

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioOp {
    Init(RadioConfig),
    Start(Vec<u8>),
    Stop,
}

#[derive(Default)]
struct RadioState {
    ops: Vec<RadioOp>,
    address: Option<MacAddress>,
    fail: bool,
}

#[derive(Clone, Default)]
pub struct MockRadio(Rc<RefCell<RadioState>>);

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<RadioOp> {
        self.0.borrow().ops.clone()
    }

    pub fn fail(&self, fail: bool) {
        self.0.borrow_mut().fail = fail;
    }

    fn record(&self, op: RadioOp) -> Result<(), &'static str> {
        let mut state = self.0.borrow_mut();
        if state.fail {
            return Err("radio unavailable");
        }
        state.ops.push(op);
        Ok(())
    }
}

impl BeaconRadio for MockRadio {
    type Error = &'static str;

    fn init(&mut self, config: &RadioConfig) -> Result<(), Self::Error> {
        self.record(RadioOp::Init(config.clone()))?;
        let mut octets = config.base_address.octets();
        octets[5] = octets[5].wrapping_add(2);
        self.0.borrow_mut().address = Some(MacAddress(octets));
        Ok(())
    }

    fn start_advertising(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.record(RadioOp::Start(data.to_vec()))
    }

    fn stop_advertising(&mut self) -> Result<(), Self::Error> {
        self.record(RadioOp::Stop)
    }

    fn address(&self) -> Option<MacAddress> {
        self.0.borrow().address
    }
}

// Cloud link

#[derive(Default)]
struct LinkState {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    remote_closed: bool,
    refuse: bool,
    connects: usize,
}

#[derive(Clone, Default)]
pub struct MockConnector(Rc<RefCell<LinkState>>);

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the device to read
    pub fn feed(&self, data: &[u8]) {
        self.0.borrow_mut().inbound.extend(data);
    }

    /// Everything the device has written so far
    pub fn sent(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow().outbound).into_owned()
    }

    pub fn take_sent(&self) -> String {
        let bytes = std::mem::take(&mut self.0.borrow_mut().outbound);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Peer hangs up: reads return 0, writes fail
    pub fn close_remote(&self) {
        self.0.borrow_mut().remote_closed = true;
    }

    pub fn refuse(&self, refuse: bool) {
        self.0.borrow_mut().refuse = refuse;
    }

    pub fn connects(&self) -> usize {
        self.0.borrow().connects
    }
}

impl Connector for MockConnector {
    type Stream = MockStream;

    fn connect(&mut self, _host: &str, _port: u16) -> io::Result<MockStream> {
        let mut state = self.0.borrow_mut();
        if state.refuse {
            return Err(io::ErrorKind::ConnectionRefused.into());
        }
        state.connects += 1;
        state.remote_closed = false;
        Ok(MockStream(self.0.clone()))
    }
}

pub struct MockStream(Rc<RefCell<LinkState>>);

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.0.borrow_mut();
        if state.inbound.is_empty() {
            if state.remote_closed {
                return Ok(0);
            }
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = buf.len().min(state.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.0.borrow_mut();
        if state.remote_closed {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        state.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// Pins and time

#[derive(Clone, Default)]
pub struct MockButton(Rc<Cell<bool>>);

impl MockButton {
    pub fn set_low(&self, low: bool) {
        self.0.set(low);
    }
}

impl ButtonPin for MockButton {
    fn is_low(&mut self) -> bool {
        self.0.get()
    }
}

/// Records every level written
#[derive(Clone, Default)]
pub struct MockLight(Rc<RefCell<Vec<bool>>>);

impl MockLight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<bool> {
        self.0.borrow().clone()
    }

    pub fn is_on(&self) -> bool {
        self.0.borrow().last().copied().unwrap_or(false)
    }
}

impl IndicatorLight for MockLight {
    fn set(&mut self, on: bool) {
        self.0.borrow_mut().push(on);
    }
}

#[derive(Clone, Default)]
pub struct MockClock(Rc<Cell<u64>>);

impl MockClock {
    pub fn set(&self, ms: u64) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

/// Handles onto one mock board
#[derive(Clone, Default)]
pub struct Rig {
    pub storage: MemStorage,
    pub network: MockNetwork,
    pub radio: MockRadio,
    pub connector: MockConnector,
    pub button: MockButton,
    pub status_light: MockLight,
    pub command_light: MockLight,
    pub clock: MockClock,
}

impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parts(&self) -> Parts<MockBoard> {
        Parts {
            storage: self.storage.clone(),
            network: self.network.clone(),
            radio: self.radio.clone(),
            connector: self.connector.clone(),
            button: self.button.clone(),
            status_light: self.status_light.clone(),
            command_light: self.command_light.clone(),
            clock: self.clock.clone(),
        }
    }
}
