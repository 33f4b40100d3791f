//! Pins and time

use std::time::Instant;

/// Raw level of the trigger button
pub trait ButtonPin {
    /// True while the (active-low, pulled-up) button is held
    fn is_low(&mut self) -> bool;
}

/// A single on/off indicator output
pub trait IndicatorLight {
    fn set(&mut self, on: bool);
}

/// Milliseconds since boot
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// `Instant` based clock, usable on any std target including esp-idf
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
