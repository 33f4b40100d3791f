//! BLE Wake Beacon for ESP32-C3
//!
//! Subscribes to a cloud topic and advertises a one second wake packet
//! whenever an "on" command arrives. Parameters and WiFi credentials are set
//! through a captive portal opened by a short press on the trigger button;
//! holding it for more than three seconds resets the device.

mod network;
mod pins;
mod portal;
mod radio;
mod storage;

use beacon_device::{Controller, Flow, TICK_MS};
use beacon_mcu::{Board, Parts, SystemClock, TcpConnector};
use beacon_proto::config::NAMESPACE;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{
        gpio::{IOPin, OutputPin},
        prelude::Peripherals,
    },
    nvs::EspDefaultNvsPartition,
    wifi::{BlockingWifi, EspWifi},
};
use log::*;

use network::{EspNetwork, WIFI_NAMESPACE};
use pins::{Button, Led};
use radio::NimbleRadio;
use storage::NvsStorage;

struct Esp32C3;

impl Board for Esp32C3 {
    type Storage = NvsStorage;
    type Network = EspNetwork;
    type Radio = NimbleRadio;
    type Connector = TcpConnector;
    type Button = Button;
    type Light = Led;
    type Clock = SystemClock;
}

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("ESP32-C3 BLE Beacon v0.1");
    info!("Initializing...");

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let button = Button::new(peripherals.pins.gpio9.downgrade())?;
    let status_light = Led::new(peripherals.pins.gpio12.downgrade_output())?;
    let command_light = Led::new(peripherals.pins.gpio13.downgrade_output())?;
    info!(
        "Pins: trigger GPIO{}, status LED GPIO{}, command LED GPIO{}",
        pins::TRIGGER_PIN,
        pins::STATUS_LED_PIN,
        pins::COMMAND_LED_PIN
    );

    let wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs.clone()))?,
        sys_loop,
    )?;

    let parts = Parts::<Esp32C3> {
        storage: NvsStorage::open(nvs.clone(), NAMESPACE),
        network: EspNetwork::new(wifi, NvsStorage::open(nvs, WIFI_NAMESPACE)),
        radio: NimbleRadio::new(),
        connector: TcpConnector::default(),
        button,
        status_light,
        command_light,
        clock: SystemClock::new(),
    };

    let mut controller = Controller::new(parts);
    controller.boot();
    info!("System initialized, status {:?}", controller.status());

    loop {
        if controller.tick() == Flow::Restart {
            restart_device();
        }
        std::thread::sleep(std::time::Duration::from_millis(TICK_MS));
    }
}

/// Restart the device
fn restart_device() -> ! {
    info!("Restarting in 1 second...");
    std::thread::sleep(std::time::Duration::from_secs(1));
    unsafe {
        esp_idf_svc::sys::esp_restart();
    }
}
