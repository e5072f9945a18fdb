use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gpio::Result;

/// The electrical state driven onto an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The hardware boundary: something that can hand out GPIO lines as outputs,
/// drive them, and give them back. The controller does all bookkeeping on
/// top of this; a bank only has to move electrons (or pretend to).
///
/// Pin numbers at this boundary are always BCM lines.
pub trait PinBank {
    /// Reserves a line for output use.
    fn claim(&mut self, pin: u8) -> Result<()>;
    /// Drives a claimed line high or low.
    fn write(&mut self, pin: u8, level: Level) -> Result<()>;
    /// Returns a line to its unclaimed, floating state. Releasing a line
    /// that was never claimed is a no-op.
    fn release(&mut self, pin: u8) -> Result<()>;
}

impl<B: PinBank + ?Sized> PinBank for Box<B> {
    fn claim(&mut self, pin: u8) -> Result<()> {
        (**self).claim(pin)
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<()> {
        (**self).write(pin, level)
    }

    fn release(&mut self, pin: u8) -> Result<()> {
        (**self).release(pin)
    }
}
