use std::collections::HashMap;

use log::*;
use rppal::gpio::{Gpio, OutputPin};

use crate::gpio::bank::{Level, PinBank};
use crate::gpio::{GpioError, Result};

impl From<Level> for rppal::gpio::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => rppal::gpio::Level::Low,
            Level::High => rppal::gpio::Level::High,
        }
    }
}

/// The real GPIO header, driven through rppal's Broadcom driver.
pub struct RppalBank {
    gpio: Gpio,
    pins: HashMap<u8, OutputPin>,
}

impl RppalBank {
    pub fn new() -> Result<Self> {
        Ok(RppalBank {
            gpio: Gpio::new()?,
            pins: HashMap::new(),
        })
    }
}

impl PinBank for RppalBank {
    fn claim(&mut self, pin: u8) -> Result<()> {
        // rppal validates the line number against the detected board here.
        // Dropping an OutputPin resets the line to its original floating
        // state, so release below only has to drop it.
        let out = self.gpio.get(pin)?.into_output();
        trace!("claimed line {pin} for output");
        self.pins.insert(pin, out);
        Ok(())
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<()> {
        let out = self.pins.get_mut(&pin).ok_or(GpioError::NotClaimed(pin))?;
        trace!("line {pin} driven {level}");
        out.write(level.into());
        Ok(())
    }

    fn release(&mut self, pin: u8) -> Result<()> {
        if self.pins.remove(&pin).is_some() {
            trace!("released line {pin}");
        }
        Ok(())
    }
}
