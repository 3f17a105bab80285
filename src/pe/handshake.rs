//! Host/chip rendezvous through one flag word per PE.

use crate::chip::{CoreId, Interconnect};
use crate::config::PollPolicy;
use crate::error::{ChipError, Result};
use std::hint;
use std::thread;

/// Values of a PE's handshake flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
    /// Written by the PE at boot
    Ready,
    /// Written by the PE after every layer
    LayerDone,
    /// Written by the host to let the PE continue
    Resume,
    /// Written by the PE once the last layer is done
    AllDone,
}

impl Flag {
    pub const READY: u32 = 0xbeef_dead;
    pub const LAYER_DONE: u32 = 0xdead_feed;
    pub const RESUME: u32 = 0xfeed_beef;
    pub const ALL_DONE: u32 = 0xdead_beef;

    pub fn word(self) -> u32 {
        match self {
            Flag::Ready => Flag::READY,
            Flag::LayerDone => Flag::LAYER_DONE,
            Flag::Resume => Flag::RESUME,
            Flag::AllDone => Flag::ALL_DONE,
        }
    }

    pub fn from_word(word: u32) -> Option<Flag> {
        match word {
            Flag::READY => Some(Flag::Ready),
            Flag::LAYER_DONE => Some(Flag::LayerDone),
            Flag::RESUME => Some(Flag::Resume),
            Flag::ALL_DONE => Some(Flag::AllDone),
            _ => None,
        }
    }
}

/// Spin, then yield, then sleep with a doubling interval.
pub struct Backoff {
    policy: PollPolicy,
    step: u32,
}

impl Backoff {
    pub fn new(policy: PollPolicy) -> Backoff {
        Backoff { policy, step: 0 }
    }

    pub fn snooze(&mut self) {
        let PollPolicy {
            spins,
            yields,
            sleep_min,
            sleep_max,
        } = self.policy;
        if self.step < spins {
            hint::spin_loop();
        } else if self.step < spins + yields {
            thread::yield_now();
        } else {
            let doublings = (self.step - spins - yields).min(16);
            thread::sleep((sleep_min * (1 << doublings)).min(sleep_max));
        }
        self.step = self.step.saturating_add(1);
    }
}

/// Writes `flag` into `core`'s flag word.
pub fn signal<I: Interconnect>(chip: &I, core: CoreId, flag: Flag) -> Result<()> {
    let addr = chip.config().flag_addr;
    trace!("PE {} signals {:?}", core, flag);
    chip.with_local(core, |mem| mem.set_word(addr, flag.word()))?
        .ok_or(ChipError::AddressFault {
            addr: chip.translate(core, addr),
            len: 1,
        })
}

pub fn read_flag<I: Interconnect>(chip: &I, core: CoreId) -> Result<u32> {
    let addr = chip.config().flag_addr;
    chip.with_local(core, |mem| mem.word(addr))?
        .ok_or(ChipError::AddressFault {
            addr: chip.translate(core, addr),
            len: 1,
        })
}

/// Polls `core`'s flag word until it holds `flag`. Never times out.
pub fn wait_for<I: Interconnect>(chip: &I, core: CoreId, flag: Flag) -> Result<()> {
    let mut backoff = Backoff::new(chip.config().poll);
    while read_flag(chip, core)? != flag.word() {
        backoff.snooze();
    }
    trace!("PE {} saw {:?}", core, flag);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::Chip;
    use crate::config::EPIPHANY_16;
    use std::time::Duration;

    #[test]
    fn sentinels_are_distinct() {
        let flags = [Flag::Ready, Flag::LayerDone, Flag::Resume, Flag::AllDone];
        for (i, a) in flags.iter().enumerate() {
            assert_eq!(Flag::from_word(a.word()), Some(*a));
            for b in &flags[i + 1..] {
                assert_ne!(a.word(), b.word());
            }
        }
        assert_eq!(Flag::from_word(0), None);
    }

    #[test]
    fn wait_returns_once_another_thread_writes_the_flag() {
        let chip = Chip::new(EPIPHANY_16.with_grid(1, 2).with_dram_words(0x1000)).unwrap();
        let core = CoreId::new(0, 1);
        signal(&chip, core, Flag::LayerDone).unwrap();

        thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(5));
                signal(&chip, core, Flag::Resume).unwrap();
            });
            wait_for(&chip, core, Flag::Resume).unwrap();
        });
        assert_eq!(Flag::from_word(read_flag(&chip, core).unwrap()), Some(Flag::Resume));
    }

    #[test]
    fn backoff_steps_through_spin_yield_and_sleep() {
        let policy = PollPolicy {
            spins: 1,
            yields: 1,
            sleep_min: Duration::from_micros(1),
            sleep_max: Duration::from_micros(4),
        };
        let mut backoff = Backoff::new(policy);
        for _ in 0..8 {
            backoff.snooze();
        }
        assert_eq!(backoff.step, 8);
    }
}
