use std::env::var;
use std::time::Duration;

use crate::blink::BlinkMode;
use crate::gpio::controller::Numbering;

pub fn led_pins() -> [u8; 3] {
    // The three LEDs on the breadboard
    [18, 24, 25]
}

pub fn blink_cycles() -> u32 {
    var("PINKIT_CYCLES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5)
}

pub fn hold_duration() -> Duration {
    let ms = var("PINKIT_HOLD_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1_000);
    Duration::from_millis(ms)
}

pub fn numbering() -> Numbering {
    match var("PINKIT_NUMBERING").as_deref() {
        Ok("board") => Numbering::Board,
        _ => Numbering::Bcm,
    }
}

pub fn blink_mode() -> BlinkMode {
    match var("PINKIT_MODE").as_deref() {
        Ok("alternate") => BlinkMode::Alternate,
        Ok("wave") => BlinkMode::Wave,
        _ => BlinkMode::Blink,
    }
}
