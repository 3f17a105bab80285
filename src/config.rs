use crate::error::ConfigError;
use std::time::Duration;

/// How a blocked PE or the host polls a handshake flag.
///
/// Polling spins `spins` times, then yields `yields` times, then sleeps with an
/// exponentially growing interval that starts at `sleep_min` and is capped at
/// `sleep_max`. There is no timeout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PollPolicy {
    pub spins: u32,
    pub yields: u32,
    pub sleep_min: Duration,
    pub sleep_max: Duration,
}

/// Static description of the chip: grid shape, the private memory map shared by
/// every PE and the fixed regions of the external DRAM. All addresses are word
/// addresses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChipConfig {
    pub rows: usize,
    pub cols: usize,
    /// Size of one PE's private memory
    pub local_words: usize,
    /// First word of the per-layer data region (the parameter record goes here)
    pub data_base: usize,
    /// One past the last word usable by the per-layer buffers
    pub data_limit: usize,
    /// Handshake flag word, outside of the data region
    pub flag_addr: usize,
    pub dram_words: usize,
    /// Parameter table, one record per layer
    pub parameter_table: usize,
    /// Pre-tiled input image read by layer 0
    pub image_addr: usize,
    /// Re-tiled output of the previous layer, read by layers 1..
    pub intermediate_addr: usize,
    /// Start of the region the host hands out for kernel tables and output maps
    pub heap_addr: usize,
    pub poll: PollPolicy,
}

pub const DEFAULT_POLL: PollPolicy = PollPolicy {
    spins: 64,
    yields: 16,
    sleep_min: Duration::from_micros(10),
    sleep_max: Duration::from_millis(2),
};

/// A 4x4 grid of PEs with 32 KiB of private memory each; the stack starts at
/// byte 0x7800, so the data region ends below it.
pub const EPIPHANY_16: ChipConfig = ChipConfig {
    rows: 4,
    cols: 4,
    local_words: 0x2000,
    data_base: 0x0,
    data_limit: 0x1DF0,
    flag_addr: 0x1DF0,
    dram_words: 0x40_0000,
    parameter_table: 0x0,
    image_addr: 0x1000,
    intermediate_addr: 0x10_0000,
    heap_addr: 0x20_0000,
    poll: DEFAULT_POLL,
};

impl Default for ChipConfig {
    fn default() -> ChipConfig {
        EPIPHANY_16
    }
}

impl ChipConfig {
    /// Returns a copy with a different grid shape.
    pub fn with_grid(self, rows: usize, cols: usize) -> ChipConfig {
        ChipConfig { rows, cols, ..self }
    }

    /// Returns a copy with a smaller or larger DRAM, with the image,
    /// intermediate and heap regions moved to 1/16, 1/4 and 1/2 of it.
    pub fn with_dram_words(self, dram_words: usize) -> ChipConfig {
        ChipConfig {
            dram_words,
            image_addr: dram_words / 16,
            intermediate_addr: dram_words / 4,
            heap_addr: dram_words / 2,
            ..self
        }
    }

    pub fn num_cores(&self) -> usize {
        self.rows * self.cols
    }

    /// Number of words the per-layer buffers may occupy.
    pub fn data_words(&self) -> usize {
        self.data_limit - self.data_base
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::InvalidChip {
                reason: reason.to_string(),
            })
        };
        if self.rows == 0 || self.cols == 0 {
            return invalid("the PE grid is empty");
        }
        if self.data_base >= self.data_limit || self.data_limit > self.local_words {
            return invalid("the data region does not fit into private memory");
        }
        if self.flag_addr >= self.local_words
            || (self.data_base..self.data_limit).contains(&self.flag_addr)
        {
            return invalid("the flag word must be in private memory, outside the data region");
        }
        let regions = [
            self.parameter_table,
            self.image_addr,
            self.intermediate_addr,
            self.heap_addr,
        ];
        if regions.windows(2).any(|w| w[0] >= w[1]) || self.heap_addr >= self.dram_words {
            return invalid("DRAM regions must be ascending and inside DRAM");
        }
        Ok(())
    }
}
