extern crate byteorder;
extern crate env_logger;
#[cfg(test)]
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod arena;
pub mod chip;
pub mod config;
pub mod error;
pub mod geometry;
pub mod host;
pub mod math;
pub mod network;
pub mod pe;
pub mod util;
#[cfg(test)]
mod tests;

pub use crate::chip::{Chip, CoreId, GlobalAddress, Interconnect};
pub use crate::config::{ChipConfig, PollPolicy, EPIPHANY_16};
pub use crate::error::{ChipError, ConfigError, Result};
pub use crate::host::Host;
pub use crate::network::{KernelSlice, LayerParameters, LayerSpec};
pub use crate::util::*;
