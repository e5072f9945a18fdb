use std::collections::BTreeMap;
use std::fmt;

use log::*;

use crate::gpio::bank::{Level, PinBank};
use crate::gpio::{GpioError, Result};

/// How callers name pins: by the chip's BCM line numbers, or by the
/// physical position on the 40 pin header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Numbering {
    Bcm,
    Board,
}

impl fmt::Display for Numbering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Physical header position (1 based) to BCM line. Power and ground
/// positions have no line and can never be claimed.
const PHYSICAL_TO_BCM: [Option<u8>; 40] = [
    None,     // 1: 3v3
    None,     // 2: 5v
    Some(2),  // 3
    None,     // 4: 5v
    Some(3),  // 5
    None,     // 6: ground
    Some(4),  // 7
    Some(14), // 8
    None,     // 9: ground
    Some(15), // 10
    Some(17), // 11
    Some(18), // 12
    Some(27), // 13
    None,     // 14: ground
    Some(22), // 15
    Some(23), // 16
    None,     // 17: 3v3
    Some(24), // 18
    Some(10), // 19
    None,     // 20: ground
    Some(9),  // 21
    Some(25), // 22
    Some(11), // 23
    Some(8),  // 24
    None,     // 25: ground
    Some(7),  // 26
    Some(0),  // 27
    Some(1),  // 28
    Some(5),  // 29
    None,     // 30: ground
    Some(6),  // 31
    Some(12), // 32
    Some(13), // 33
    None,     // 34: ground
    Some(19), // 35
    Some(16), // 36
    Some(26), // 37
    Some(20), // 38
    None,     // 39: ground
    Some(21), // 40
];

impl Numbering {
    /// Resolves a caller-facing pin id to a BCM line.
    fn to_bcm(self, pin: u8) -> Result<u8> {
        match self {
            Numbering::Bcm => Ok(pin),
            Numbering::Board => (pin as usize)
                .checked_sub(1)
                .and_then(|i| PHYSICAL_TO_BCM.get(i))
                .copied()
                .flatten()
                .ok_or_else(|| {
                    GpioError::PinUnavailable(
                        pin,
                        String::from("board position is a power/ground pin or off the header"),
                    )
                }),
        }
    }
}

/// A claimed output line. The serial ties the handle to one particular
/// claim, so a handle kept around after release (or after the line was
/// claimed again) stops working instead of driving someone else's pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinHandle {
    pin: u8,
    serial: u64,
}

impl PinHandle {
    /// The BCM line this handle drives.
    pub fn pin(&self) -> u8 {
        self.pin
    }
}

/// An ordered group of outputs driven together, like the three LEDs on the
/// breadboard. Writes go out sequentially; the lines are electrically
/// independent so there is no intermediate state to observe.
#[derive(Debug, Clone)]
pub struct OutputSet {
    handles: Vec<PinHandle>,
}

impl OutputSet {
    pub fn handles(&self) -> &[PinHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[derive(Debug)]
struct ClaimRecord {
    serial: u64,
    level: Option<Level>,
}

/// Owns a pin bank and tracks which lines this process has claimed for
/// output. One claimant per line; released lines need a fresh claim before
/// they can be driven again.
pub struct OutputController<B: PinBank> {
    bank: B,
    numbering: Option<Numbering>,
    claimed: BTreeMap<u8, ClaimRecord>,
    next_serial: u64,
}

impl<B: PinBank> OutputController<B> {
    pub fn new(bank: B) -> Self {
        OutputController {
            bank,
            numbering: None,
            claimed: BTreeMap::new(),
            next_serial: 0,
        }
    }

    /// Selects the numbering scheme for every claim that follows. Calling
    /// again with the same scheme is fine; switching schemes mid-process is
    /// not.
    pub fn configure(&mut self, scheme: Numbering) -> Result<()> {
        match self.numbering {
            None => {
                info!("using {scheme} pin numbering");
                self.numbering = Some(scheme);
                Ok(())
            }
            Some(current) if current == scheme => Ok(()),
            Some(current) => Err(GpioError::Configuration(format!(
                "numbering already set to {current}, refusing to switch to {scheme}"
            ))),
        }
    }

    /// Reserves a line for output use and hands back the only way to drive it.
    pub fn claim_output(&mut self, pin: u8) -> Result<PinHandle> {
        let numbering = self.numbering.ok_or_else(|| {
            GpioError::Configuration(String::from("configure a numbering scheme before claiming pins"))
        })?;
        let line = numbering.to_bcm(pin)?;

        if self.claimed.contains_key(&line) {
            return Err(GpioError::PinUnavailable(pin, String::from("already claimed")));
        }

        self.bank.claim(line)?;
        let serial = self.next_serial;
        self.next_serial += 1;
        self.claimed.insert(line, ClaimRecord { serial, level: None });
        trace!("pin {pin} claimed as output (line {line}, claim #{serial})");

        Ok(PinHandle { pin: line, serial })
    }

    /// Claims a whole group of lines, fail fast: if any claim fails, the
    /// ones this call already grabbed are released again so a partial
    /// startup never leaves lines driven.
    pub fn claim_set(&mut self, pins: &[u8]) -> Result<OutputSet> {
        let mut handles = Vec::with_capacity(pins.len());
        for &pin in pins {
            match self.claim_output(pin) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!("couldn't claim pin {pin}: {e}");
                    for handle in handles {
                        // Claim just succeeded, so the only way this fails
                        // is the hardware going away under us.
                        if let Err(e) = self.release(handle) {
                            warn!("couldn't unwind claim on line {}: {e}", handle.pin());
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(OutputSet { handles })
    }

    /// Drives the line electrically high or low.
    pub fn set_level(&mut self, handle: PinHandle, level: Level) -> Result<()> {
        let record = self
            .claimed
            .get_mut(&handle.pin)
            .filter(|r| r.serial == handle.serial)
            .ok_or(GpioError::NotClaimed(handle.pin))?;
        record.level = Some(level);
        self.bank.write(handle.pin, level)
    }

    /// Drives every line in the set to the same level, in order.
    pub fn set_all(&mut self, set: &OutputSet, level: Level) -> Result<()> {
        for &handle in set.handles() {
            self.set_level(handle, level)?;
        }
        Ok(())
    }

    /// Frees the line, returning it to an unclaimed, floating state.
    /// Releasing an already released handle is a no-op so cleanup paths can
    /// call it unconditionally.
    pub fn release(&mut self, handle: PinHandle) -> Result<()> {
        match self.claimed.get(&handle.pin) {
            Some(record) if record.serial == handle.serial => {
                self.bank.release(handle.pin)?;
                self.claimed.remove(&handle.pin);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Releases every line this controller still holds. Best effort: a
    /// failing line is reported but doesn't stop the rest from being
    /// released, and the error lists every line that couldn't be freed.
    pub fn release_all(&mut self) -> Result<()> {
        let mut failures = Vec::new();
        let lines: Vec<u8> = self.claimed.keys().copied().collect();
        for line in lines {
            match self.bank.release(line) {
                Ok(()) => {
                    self.claimed.remove(&line);
                }
                Err(e) => {
                    error!("couldn't release line {line}: {e}");
                    failures.push(format!("line {line}: {e}"));
                    // Drop the record anyway. The hardware may be wedged
                    // but this process no longer considers the line held.
                    self.claimed.remove(&line);
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(GpioError::Cleanup(failures.join("; ")))
        }
    }

    /// The last level driven on a claimed line, None if the line hasn't
    /// been written yet or the handle is stale.
    pub fn current_level(&self, handle: PinHandle) -> Option<Level> {
        self.claimed
            .get(&handle.pin)
            .filter(|r| r.serial == handle.serial)
            .and_then(|r| r.level)
    }

    /// How many lines are currently claimed.
    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }
}

impl<B: PinBank> Drop for OutputController<B> {
    fn drop(&mut self) {
        if self.claimed.is_empty() {
            return;
        }
        warn!(
            "controller dropped with {} line(s) still claimed, releasing them",
            self.claimed.len()
        );
        if let Err(e) = self.release_all() {
            error!("{e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::sim_bank::SimBank;
    use crate::model::PinEventKind;

    fn ctl() -> OutputController<SimBank> {
        let mut ctl = OutputController::new(SimBank::new());
        ctl.configure(Numbering::Bcm).unwrap();
        ctl
    }

    #[test]
    fn test_claim_release_reclaim() {
        let mut ctl = ctl();
        let handle = ctl.claim_output(18).unwrap();
        assert_eq!(handle.pin(), 18);
        ctl.release(handle).unwrap();
        assert_eq!(ctl.claimed_count(), 0);
        // Released lines can be claimed again with a fresh handle
        let again = ctl.claim_output(18).unwrap();
        assert_ne!(handle, again);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut ctl = ctl();
        let handle = ctl.claim_output(18).unwrap();
        assert_eq!(ctl.release(handle), Ok(()));
        assert_eq!(ctl.release(handle), Ok(()));
    }

    #[test]
    fn test_set_level_after_release() {
        let mut ctl = ctl();
        let handle = ctl.claim_output(18).unwrap();
        ctl.release(handle).unwrap();
        assert_eq!(
            ctl.set_level(handle, Level::High),
            Err(GpioError::NotClaimed(18))
        );
    }

    #[test]
    fn test_stale_handle_after_reclaim() {
        let mut ctl = ctl();
        let old = ctl.claim_output(18).unwrap();
        ctl.release(old).unwrap();
        let fresh = ctl.claim_output(18).unwrap();
        // The stale handle must not drive the new claim
        assert_eq!(ctl.set_level(old, Level::High), Err(GpioError::NotClaimed(18)));
        assert!(ctl.set_level(fresh, Level::High).is_ok());
    }

    #[test]
    fn test_current_level_tracks_writes() {
        let mut ctl = ctl();
        let handle = ctl.claim_output(18).unwrap();
        assert_eq!(ctl.current_level(handle), None);
        ctl.set_level(handle, Level::High).unwrap();
        assert_eq!(ctl.current_level(handle), Some(Level::High));
        ctl.release(handle).unwrap();
        assert_eq!(ctl.current_level(handle), None);
    }

    #[test]
    fn test_double_claim_leaves_original_untouched() {
        let mut ctl = ctl();
        let handle = ctl.claim_output(18).unwrap();
        ctl.set_level(handle, Level::High).unwrap();

        match ctl.claim_output(18) {
            Err(GpioError::PinUnavailable(18, _)) => {}
            other => panic!("expected PinUnavailable, got {other:?}"),
        }
        // The first claim still works
        assert!(ctl.set_level(handle, Level::Low).is_ok());
    }

    #[test]
    fn test_claim_before_configure() {
        let mut ctl = OutputController::new(SimBank::new());
        match ctl.claim_output(18) {
            Err(GpioError::Configuration(_)) => {}
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_conflicting_numbering() {
        let mut ctl = OutputController::new(SimBank::new());
        ctl.configure(Numbering::Bcm).unwrap();
        assert!(ctl.configure(Numbering::Bcm).is_ok());
        match ctl.configure(Numbering::Board) {
            Err(GpioError::Configuration(_)) => {}
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_board_numbering_maps_to_bcm() {
        let mut ctl = OutputController::new(SimBank::new());
        ctl.configure(Numbering::Board).unwrap();
        // Physical position 12 is BCM line 18
        let handle = ctl.claim_output(12).unwrap();
        assert_eq!(handle.pin(), 18);
    }

    #[test]
    fn test_board_numbering_rejects_ground() {
        let mut ctl = OutputController::new(SimBank::new());
        ctl.configure(Numbering::Board).unwrap();
        // Physical position 6 is a ground pin
        match ctl.claim_output(6) {
            Err(GpioError::PinUnavailable(6, _)) => {}
            other => panic!("expected PinUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_claim_set_unwinds_on_failure() {
        let mut ctl = ctl();
        // The second 18 collides with the first, so 18 and 24 must be
        // released again
        assert!(ctl.claim_set(&[18, 24, 18]).is_err());
        assert_eq!(ctl.claimed_count(), 0);
        // And the lines are free for another claim
        assert!(ctl.claim_set(&[18, 24, 25]).is_ok());
    }

    #[test]
    fn test_release_all_empties_registry() {
        let mut ctl = ctl();
        let set = ctl.claim_set(&[18, 24, 25]).unwrap();
        ctl.set_all(&set, Level::High).unwrap();
        assert_eq!(ctl.claimed_count(), 3);

        ctl.release_all().unwrap();
        assert_eq!(ctl.claimed_count(), 0);

        let releases = ctl
            .bank()
            .journal()
            .iter()
            .filter(|e| e.kind() == PinEventKind::Released)
            .count();
        assert_eq!(releases, 3);
    }

    #[test]
    fn test_release_all_is_best_effort() {
        let mut bank = SimBank::new();
        bank.fail_release(24);
        let mut ctl = OutputController::new(bank);
        ctl.configure(Numbering::Bcm).unwrap();
        ctl.claim_set(&[18, 24, 25]).unwrap();

        match ctl.release_all() {
            Err(GpioError::Cleanup(msg)) => {
                assert!(msg.contains("line 24"));
                assert!(!msg.contains("line 18"));
            }
            other => panic!("expected Cleanup error, got {other:?}"),
        }
        // The failing line didn't stop the others
        assert_eq!(ctl.claimed_count(), 0);
        let released: Vec<u8> = ctl
            .bank()
            .journal()
            .iter()
            .filter(|e| e.kind() == PinEventKind::Released)
            .map(|e| e.pin())
            .collect();
        assert_eq!(released, vec![18, 25]);
    }

    #[test]
    fn test_set_all_writes_in_order() {
        let mut ctl = ctl();
        let set = ctl.claim_set(&[18, 24, 25]).unwrap();
        ctl.set_all(&set, Level::High).unwrap();

        let writes: Vec<u8> = ctl
            .bank()
            .journal()
            .iter()
            .filter(|e| e.kind() == PinEventKind::LevelChanged)
            .map(|e| e.pin())
            .collect();
        assert_eq!(writes, vec![18, 24, 25]);
    }
}
