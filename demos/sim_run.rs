use std::sync::atomic::AtomicBool;
use std::time::Duration;

use log::*;

use pinkit::blink;
use pinkit::prelude::*;

fn main() {
    env_logger::init();

    info!("Starting a simulated blink run");

    let mut ctl = OutputController::new(SimBank::new());
    ctl.configure(Numbering::Bcm).expect("configure numbering");
    let leds = ctl.claim_set(&[18, 24, 25]).expect("claim pins");

    let seq = BlinkSequence {
        cycles: 5,
        hold: Duration::from_millis(100),
    };
    let running = AtomicBool::new(true);
    let mut clock = WallClock;
    blink::blink(&seq, &mut ctl, &leds, &mut clock, &running).expect("blink");

    ctl.release_all().expect("release pins");

    for event in ctl.bank().journal() {
        println!("{}", event.to_json().expect("event to json"));
    }
}
