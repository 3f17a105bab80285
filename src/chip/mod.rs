//! Simulated processing-element grid.
//!
//! Every PE owns a private word memory; the root PE and the host reach other
//! memories only through DMA. DRAM is shared by all PEs.

mod memory;

pub use self::memory::*;
use crate::config::ChipConfig;
use crate::error::{ChipError, Result};
use itertools::iproduct;
use std::fmt;
use std::sync::{Barrier, Mutex, MutexGuard};

/// Grid coordinate of a PE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CoreId {
    pub row: usize,
    pub col: usize,
}

impl CoreId {
    pub const ROOT: CoreId = CoreId { row: 0, col: 0 };

    pub fn new(row: usize, col: usize) -> CoreId {
        CoreId { row, col }
    }

    /// The PE that reduces the grid and writes output tiles.
    pub fn is_root(&self) -> bool {
        *self == CoreId::ROOT
    }

    /// Linear PE id, row-major over a grid `cols` wide.
    pub fn index(&self, cols: usize) -> usize {
        self.row * cols + self.col
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// An address anywhere on the chip's interconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobalAddress {
    /// A word of external DRAM
    Dram(usize),
    /// A word of a PE's private memory
    Local { core: CoreId, addr: usize },
}

impl GlobalAddress {
    /// Word address inside the addressed memory.
    pub fn word_addr(&self) -> usize {
        match *self {
            GlobalAddress::Dram(addr) | GlobalAddress::Local { addr, .. } => addr,
        }
    }

    /// The address `words` further on.
    pub fn offset(self, words: usize) -> GlobalAddress {
        match self {
            GlobalAddress::Dram(addr) => GlobalAddress::Dram(addr + words),
            GlobalAddress::Local { core, addr } => GlobalAddress::Local {
                core,
                addr: addr + words,
            },
        }
    }
}

impl fmt::Display for GlobalAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GlobalAddress::Dram(addr) => write!(f, "dram:{:#x}", addr),
            GlobalAddress::Local { core, addr } => write!(f, "pe{}:{:#x}", core, addr),
        }
    }
}

/// The hardware services a PE program relies on.
///
/// All operations block the caller until they complete.
pub trait Interconnect {
    fn config(&self) -> &ChipConfig;

    /// Blocks until every PE of the grid has arrived.
    fn barrier(&self);

    /// Copies `len` words from `src` to `dst`.
    fn dma_copy(&self, dst: GlobalAddress, src: GlobalAddress, len: usize) -> Result<()>;

    /// Maps a word of `core`'s private memory onto the interconnect.
    fn translate(&self, core: CoreId, addr: usize) -> GlobalAddress {
        GlobalAddress::Local { core, addr }
    }

    /// Runs `f` with exclusive access to `core`'s private memory.
    fn with_local<R, F>(&self, core: CoreId, f: F) -> Result<R>
    where
        F: FnOnce(&mut Memory) -> R;
}

/// The simulated chip: DRAM, one private memory per PE and the grid barrier.
pub struct Chip {
    config: ChipConfig,
    dram: Mutex<Memory>,
    cores: Vec<Mutex<Memory>>,
    barrier: Barrier,
}

impl Chip {
    pub fn new(config: ChipConfig) -> Result<Chip> {
        config.validate()?;
        debug!(
            "Create chip with {}x{} PEs, {} local words, {} DRAM words.",
            config.rows, config.cols, config.local_words, config.dram_words
        );
        Ok(Chip {
            config,
            dram: Mutex::new(Memory::new(config.dram_words)),
            cores: (0..config.num_cores())
                .map(|_| Mutex::new(Memory::new(config.local_words)))
                .collect(),
            barrier: Barrier::new(config.num_cores()),
        })
    }

    /// Every PE coordinate, row-major.
    pub fn cores(&self) -> impl Iterator<Item = CoreId> {
        iproduct!(0..self.config.rows, 0..self.config.cols).map(|(row, col)| CoreId::new(row, col))
    }

    fn lock_dram(&self) -> Result<MutexGuard<Memory>> {
        self.dram.lock().map_err(|_| ChipError::Poisoned {
            region: "DRAM".to_string(),
        })
    }

    fn lock_core(&self, core: CoreId) -> Result<MutexGuard<Memory>> {
        let fault = || ChipError::AddressFault {
            addr: GlobalAddress::Local { core, addr: 0 },
            len: 0,
        };
        if core.row >= self.config.rows || core.col >= self.config.cols {
            return Err(fault());
        }
        self.cores[core.index(self.config.cols)]
            .lock()
            .map_err(|_| ChipError::Poisoned {
                region: format!("PE {}", core),
            })
    }

    fn lock(&self, addr: GlobalAddress) -> Result<MutexGuard<Memory>> {
        match addr {
            GlobalAddress::Dram(_) => self.lock_dram(),
            GlobalAddress::Local { core, .. } => self.lock_core(core),
        }
    }

    /// Reads `len` words at any global address.
    pub fn read(&self, src: GlobalAddress, len: usize) -> Result<Vec<u32>> {
        self.lock(src)?
            .read(src.word_addr(), len)
            .map(|words| words.to_vec())
            .ok_or(ChipError::AddressFault { addr: src, len })
    }

    /// Writes words at any global address.
    pub fn write(&self, dst: GlobalAddress, data: &[u32]) -> Result<()> {
        self.lock(dst)?
            .write(dst.word_addr(), data)
            .ok_or(ChipError::AddressFault {
                addr: dst,
                len: data.len(),
            })
    }

    pub fn write_dram_f32s(&self, addr: usize, data: &[f32]) -> Result<()> {
        self.write(GlobalAddress::Dram(addr), bytemuck::cast_slice(data))
    }

    pub fn read_dram_f32s(&self, addr: usize, len: usize) -> Result<Vec<f32>> {
        let words = self.read(GlobalAddress::Dram(addr), len)?;
        Ok(words.into_iter().map(f32::from_bits).collect())
    }

    /// Reads one word of a PE's private memory, e.g. its handshake flag.
    pub fn read_local_word(&self, core: CoreId, addr: usize) -> Result<u32> {
        let words = self.read(GlobalAddress::Local { core, addr }, 1)?;
        Ok(words[0])
    }

    pub fn write_local_word(&self, core: CoreId, addr: usize, value: u32) -> Result<()> {
        self.write(GlobalAddress::Local { core, addr }, &[value])
    }
}

impl Interconnect for Chip {
    fn config(&self) -> &ChipConfig {
        &self.config
    }

    fn barrier(&self) {
        self.barrier.wait();
    }

    fn dma_copy(&self, dst: GlobalAddress, src: GlobalAddress, len: usize) -> Result<()> {
        trace!("DMA {} words {} -> {}", len, src, dst);
        // Staged through a buffer so that source and destination locks are never held together
        let data = self.read(src, len)?;
        self.write(dst, &data)
    }

    fn with_local<R, F>(&self, core: CoreId, f: F) -> Result<R>
    where
        F: FnOnce(&mut Memory) -> R,
    {
        let mut mem = self.lock_core(core)?;
        Ok(f(&mut mem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EPIPHANY_16;

    fn small_chip() -> Chip {
        Chip::new(EPIPHANY_16.with_grid(2, 2).with_dram_words(0x1000)).unwrap()
    }

    #[test]
    fn cores_are_enumerated_row_major() {
        let chip = small_chip();
        let cores: Vec<_> = chip.cores().map(|c| c.index(2)).collect();
        assert_eq!(cores, vec![0, 1, 2, 3]);
        assert!(chip.cores().next().unwrap().is_root());
    }

    #[test]
    fn dma_moves_words_between_dram_and_remote_pe() {
        let chip = small_chip();
        chip.write_dram_f32s(0x10, &[1.0, 2.0, 3.0]).unwrap();

        let remote = chip.translate(CoreId::new(1, 1), 0x40);
        chip.dma_copy(remote, GlobalAddress::Dram(0x10), 3).unwrap();
        let local = chip.translate(CoreId::ROOT, 0x0);
        chip.dma_copy(local, remote.offset(1), 2).unwrap();

        let copied = chip
            .with_local(CoreId::ROOT, |mem| mem.f32s(0..2).to_vec())
            .unwrap();
        assert_eq!(copied, vec![2.0, 3.0]);
    }

    #[test]
    fn dma_past_the_end_faults() {
        let chip = small_chip();
        let err = chip
            .dma_copy(GlobalAddress::Dram(0xFFF), GlobalAddress::Dram(0), 2)
            .unwrap_err();
        match err {
            ChipError::AddressFault { addr, len } => {
                assert_eq!(addr, GlobalAddress::Dram(0xFFF));
                assert_eq!(len, 2);
            }
            other => panic!("unexpected error {}", other),
        }
        assert!(chip.read_local_word(CoreId::new(2, 0), 0).is_err());
    }
}
