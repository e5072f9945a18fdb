use std::collections::BTreeSet;

use log::*;

use crate::gpio::bank::{Level, PinBank};
use crate::gpio::{GpioError, Result};
use crate::model::PinEvent;

/// The highest BCM line broken out on the 40 pin header.
const MAX_BCM_LINE: u8 = 27;

/// An in-memory stand-in for the GPIO header. I don't always have a Pi
/// wired up, so this fakes the electrical side and keeps a journal of
/// everything that would have happened to the lines.
#[derive(Debug, Default)]
pub struct SimBank {
    claimed: BTreeSet<u8>,
    journal: Vec<PinEvent>,
    failing: BTreeSet<u8>,
}

impl SimBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything that happened to the lines, in order.
    pub fn journal(&self) -> &[PinEvent] {
        &self.journal
    }

    /// Makes release fail for the given line, to simulate hardware that
    /// detached mid-run.
    pub fn fail_release(&mut self, pin: u8) {
        self.failing.insert(pin);
    }
}

impl PinBank for SimBank {
    fn claim(&mut self, pin: u8) -> Result<()> {
        if pin > MAX_BCM_LINE {
            return Err(GpioError::PinUnavailable(
                pin,
                String::from("not an output-capable line on this board"),
            ));
        }
        if !self.claimed.insert(pin) {
            return Err(GpioError::PinUnavailable(pin, String::from("already claimed")));
        }
        debug!("sim: claimed line {pin} for output");
        self.journal.push(PinEvent::claimed(pin));
        Ok(())
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<()> {
        if !self.claimed.contains(&pin) {
            return Err(GpioError::NotClaimed(pin));
        }
        debug!("sim: line {pin} driven {level}");
        self.journal.push(PinEvent::level_changed(pin, level));
        Ok(())
    }

    fn release(&mut self, pin: u8) -> Result<()> {
        if self.failing.contains(&pin) {
            return Err(GpioError::Cleanup(format!("line {pin} did not respond")));
        }
        if self.claimed.remove(&pin) {
            debug!("sim: released line {pin}");
            self.journal.push(PinEvent::released(pin));
        }
        Ok(())
    }
}
