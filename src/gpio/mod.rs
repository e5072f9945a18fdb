use std::env::var;

use thiserror::Error;

pub mod bank;
pub mod controller;
pub mod rppal_bank;
pub mod sim_bank;

#[derive(Error, Debug, PartialEq)]
pub enum GpioError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("pin {0} is unavailable: {1}")]
    PinUnavailable(u8, String),
    #[error("pin {0} is not claimed for output")]
    NotClaimed(u8),
    #[error("cleanup incomplete: {0}")]
    Cleanup(String),
}

impl From<rppal::gpio::Error> for GpioError {
    fn from(e: rppal::gpio::Error) -> Self {
        match e {
            rppal::gpio::Error::PinNotAvailable(pin) => {
                GpioError::PinUnavailable(pin, String::from("not an output-capable line on this board"))
            }
            other => GpioError::Configuration(format!("{other}")),
        }
    }
}

/// A custom result type using the GpioError defined above
pub type Result<T> = std::result::Result<T, GpioError>;

/// Whether we should touch the real GPIO header. Off by default so the
/// binary and the demos are safe to run away from the Pi.
pub fn hardware_enabled() -> bool {
    var("PINKIT_HARDWARE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
