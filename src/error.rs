//! Error types for layer configuration and chip simulation.

use crate::chip::{CoreId, GlobalAddress};
use std::io;
use thiserror::Error;

/// Result type alias for chip operations.
pub type Result<T> = std::result::Result<T, ChipError>;

/// Parameter values that cannot be laid out or executed on the chip.
///
/// Raised when a layer is loaded, before any of its buffers are touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A dimension that must be positive was zero.
    #[error("{name} must be positive")]
    ZeroDimension {
        /// Name of the offending parameter
        name: &'static str,
    },

    /// Valid convolution needs at least one output sample.
    #[error("kernel width {kernel_width} exceeds patch width {patch_width}")]
    KernelWiderThanPatch { kernel_width: usize, patch_width: usize },

    /// Decimation would produce no samples.
    #[error("subsample stride {stride} leaves no samples of a {conv_side}-wide convolution")]
    EmptyAccumulator { stride: usize, conv_side: usize },

    /// The accumulated tile does not fit into a row of the output map.
    #[error("output map width {big_map_width} is narrower than a {tile_width}-wide tile")]
    OutputTooNarrow { big_map_width: usize, tile_width: usize },

    /// The per-layer buffers overflow the private memory data region.
    #[error("layer needs {required} words of private memory, {available} available")]
    OutOfLocalMemory { required: usize, available: usize },

    /// A host-side DRAM allocation did not fit.
    #[error("DRAM allocation of {required} words exceeds the {available} words left")]
    OutOfDram { required: usize, available: usize },

    /// A feature map cannot be cut into the next layer's patches.
    #[error("{map_width}x{map_rows} map cannot be cut into {patch_width}-wide patches")]
    MapNotTileable {
        map_width: usize,
        map_rows: usize,
        patch_width: usize,
    },

    /// The kernel data handed to the host does not match the layer shape.
    #[error("expected {expected} kernel slices of {words} words, got {actual}")]
    KernelShape {
        expected: usize,
        words: usize,
        actual: usize,
    },

    /// A parameter or DRAM address does not fit into a parameter record word.
    #[error("{name} {value} does not fit into a 32-bit word")]
    WordOverflow { name: &'static str, value: usize },

    /// A layer reads more patches than its input holds.
    #[error("layer {layer} reads {required} patches but its input holds {available}")]
    NotEnoughPatches {
        layer: usize,
        required: usize,
        available: usize,
    },

    /// The chip configuration itself is inconsistent.
    #[error("invalid chip configuration: {reason}")]
    InvalidChip { reason: String },
}

/// Errors surfaced by the chip simulator and the host harness.
#[derive(Debug, Error)]
pub enum ChipError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A transfer touched words outside of the addressed memory.
    #[error("address fault: {len} words at {addr}")]
    AddressFault { addr: GlobalAddress, len: usize },

    /// A thread panicked while holding a memory lock.
    #[error("{region} memory is poisoned")]
    Poisoned { region: String },

    /// A PE program returned early or panicked.
    #[error("PE {core} failed: {reason}")]
    PeFailed { core: CoreId, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
