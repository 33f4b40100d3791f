//! GPIO wiring of the ESP32-C3 board

use beacon_mcu::{ButtonPin, IndicatorLight};
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, Input, Output, PinDriver, Pull};
use log::*;

pub const TRIGGER_PIN: u8 = 9;
pub const STATUS_LED_PIN: u8 = 12;
pub const COMMAND_LED_PIN: u8 = 13;

/// Active-low push button with the internal pull-up
pub struct Button {
    pin: PinDriver<'static, AnyIOPin, Input>,
}

impl Button {
    pub fn new(pin: AnyIOPin) -> anyhow::Result<Self> {
        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Up)?;
        Ok(Self { pin })
    }
}

impl ButtonPin for Button {
    fn is_low(&mut self) -> bool {
        self.pin.is_low()
    }
}

pub struct Led {
    pin: PinDriver<'static, AnyOutputPin, Output>,
}

impl Led {
    pub fn new(pin: AnyOutputPin) -> anyhow::Result<Self> {
        let mut pin = PinDriver::output(pin)?;
        pin.set_low()?;
        Ok(Self { pin })
    }
}

impl IndicatorLight for Led {
    fn set(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = result {
            warn!("Failed to drive LED: {:?}", e);
        }
    }
}
