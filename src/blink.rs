//! The fixed-count driving loops that push levels out through a controller.
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::*;

use crate::gpio::bank::{Level, PinBank};
use crate::gpio::controller::{OutputController, OutputSet};
use crate::gpio::Result;

/// Where the loops get their delays from. The binary sleeps for real;
/// tests swap in a clock that just records what it was asked for.
pub trait Clock {
    fn pause(&mut self, duration: Duration);
}

/// Blocks the calling thread. Wall-clock, not CPU-exact.
pub struct WallClock;

impl Clock for WallClock {
    fn pause(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// How many cycles to run and how long to hold each level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkSequence {
    pub cycles: u32,
    pub hold: Duration,
}

impl Default for BlinkSequence {
    fn default() -> Self {
        BlinkSequence {
            cycles: 5,
            hold: Duration::from_secs(1),
        }
    }
}

/// The available light patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkMode {
    /// All LEDs on together, then off together.
    Blink,
    /// Even positions against odd positions, swapping each half cycle.
    Alternate,
    /// LEDs ripple on in order, then off in order.
    Wave,
}

impl BlinkMode {
    pub fn run<B: PinBank>(
        self,
        seq: &BlinkSequence,
        ctl: &mut OutputController<B>,
        set: &OutputSet,
        clock: &mut dyn Clock,
        running: &AtomicBool,
    ) -> Result<()> {
        match self {
            BlinkMode::Blink => blink(seq, ctl, set, clock, running),
            BlinkMode::Alternate => alternate(seq, ctl, set, clock, running),
            BlinkMode::Wave => wave(seq, ctl, set, clock, running),
        }
    }
}

/// All LEDs blink together: high, hold, low, hold, for the configured
/// number of cycles. The running flag is checked between steps so Ctrl-C
/// stops the loop at the next transition instead of finishing the run.
pub fn blink<B: PinBank>(
    seq: &BlinkSequence,
    ctl: &mut OutputController<B>,
    set: &OutputSet,
    clock: &mut dyn Clock,
    running: &AtomicBool,
) -> Result<()> {
    for cycle in 0..seq.cycles {
        if !running.load(Ordering::SeqCst) {
            info!("stopping early in cycle {cycle}");
            break;
        }
        ctl.set_all(set, Level::High)?;
        clock.pause(seq.hold);

        if !running.load(Ordering::SeqCst) {
            info!("stopping early in cycle {cycle}");
            break;
        }
        ctl.set_all(set, Level::Low)?;
        clock.pause(seq.hold);
    }
    Ok(())
}

/// Even positions light against odd positions, swapping every half cycle.
/// Ends with everything off.
pub fn alternate<B: PinBank>(
    seq: &BlinkSequence,
    ctl: &mut OutputController<B>,
    set: &OutputSet,
    clock: &mut dyn Clock,
    running: &AtomicBool,
) -> Result<()> {
    for cycle in 0..seq.cycles {
        if !running.load(Ordering::SeqCst) {
            info!("stopping early in cycle {cycle}");
            break;
        }
        half_and_half(ctl, set, Level::High, Level::Low)?;
        clock.pause(seq.hold);

        if !running.load(Ordering::SeqCst) {
            info!("stopping early in cycle {cycle}");
            break;
        }
        half_and_half(ctl, set, Level::Low, Level::High)?;
        clock.pause(seq.hold);
    }
    ctl.set_all(set, Level::Low)
}

fn half_and_half<B: PinBank>(
    ctl: &mut OutputController<B>,
    set: &OutputSet,
    even: Level,
    odd: Level,
) -> Result<()> {
    for (i, &handle) in set.handles().iter().enumerate() {
        let level = if i % 2 == 0 { even } else { odd };
        ctl.set_level(handle, level)?;
    }
    Ok(())
}

/// LEDs ripple on in order, sit lit for a moment, then ripple off again.
/// The stagger and crest are fractions of the configured hold.
pub fn wave<B: PinBank>(
    seq: &BlinkSequence,
    ctl: &mut OutputController<B>,
    set: &OutputSet,
    clock: &mut dyn Clock,
    running: &AtomicBool,
) -> Result<()> {
    let stagger = seq.hold / 10;
    let crest = seq.hold / 5;

    for cycle in 0..seq.cycles {
        if !running.load(Ordering::SeqCst) {
            info!("stopping early in cycle {cycle}");
            break;
        }
        ripple(ctl, set, Level::High, stagger, clock)?;
        clock.pause(crest);

        if !running.load(Ordering::SeqCst) {
            info!("stopping early in cycle {cycle}");
            break;
        }
        ripple(ctl, set, Level::Low, stagger, clock)?;
    }
    Ok(())
}

fn ripple<B: PinBank>(
    ctl: &mut OutputController<B>,
    set: &OutputSet,
    level: Level,
    stagger: Duration,
    clock: &mut dyn Clock,
) -> Result<()> {
    let handles = set.handles();
    for (i, &handle) in handles.iter().enumerate() {
        ctl.set_level(handle, level)?;
        if i + 1 < handles.len() {
            clock.pause(stagger);
        }
    }
    Ok(())
}
