use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::LevelFilter;
use log::*;

use pinkit::prelude::*;
use pinkit::{defaults, gpio};

fn run(running: &AtomicBool) -> Result<()> {
    let pins = defaults::led_pins();
    let seq = BlinkSequence {
        cycles: defaults::blink_cycles(),
        hold: defaults::hold_duration(),
    };
    let mode = defaults::blink_mode();

    let bank: Box<dyn PinBank> = if gpio::hardware_enabled() {
        Box::new(RppalBank::new()?)
    } else {
        warn!("hardware is not enabled, driving the simulated pin bank instead");
        Box::new(SimBank::new())
    };

    let mut ctl = OutputController::new(bank);
    ctl.configure(defaults::numbering())?;
    let leds = ctl.claim_set(&pins)?;
    info!("claimed pins {pins:?} as outputs");
    info!("running {mode:?} for {} cycles", seq.cycles);

    let mut clock = WallClock;
    let result = mode.run(&seq, &mut ctl, &leds, &mut clock, running);

    // The pins go back no matter how the loop ended
    let cleanup = ctl.release_all();
    info!("released all pins");

    match (result, cleanup) {
        (Ok(()), cleanup) => cleanup,
        (Err(e), Err(cleanup_err)) => {
            // Don't let a cleanup failure hide what actually went wrong
            error!("{cleanup_err}");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("Program is starting...");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("couldn't install the Ctrl-C handler: {e}");
    }

    match run(&running) {
        Ok(()) => {
            info!("Program finished.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
