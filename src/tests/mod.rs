mod staging;

use crate::config::{ChipConfig, EPIPHANY_16};
use crate::network::{KernelSlice, LayerSpec};
use rand::Rng;

pub const RESULT_MARGIN: f32 = 0.0001f32;

lazy_static! {
    /// Small chip used by the end-to-end tests; the DRAM is kept small so
    /// every test can afford its own chip.
    static ref SMALL_CHIP: ChipConfig = EPIPHANY_16.with_dram_words(0x1_0000);
}

pub fn init_logging() {
    // Several tests race to install the logger
    let _ = env_logger::try_init();
}

pub fn small_chip(rows: usize, cols: usize) -> ChipConfig {
    SMALL_CHIP.with_grid(rows, cols)
}

pub fn random_vec(len: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(-1f32..1f32)).collect()
}

/// A layer with no pooling or decimation, every PE using the same kernels.
pub fn plain_layer(
    num_cores: usize,
    num_patches: usize,
    kernel_width: usize,
    patch_width: usize,
    big_map_width: usize,
    kernel: KernelSlice,
) -> LayerSpec {
    LayerSpec {
        num_maps: kernel.scales.len(),
        num_patches,
        kernel_width,
        patch_width,
        pool_window: 1,
        subsample_factor: 1,
        big_map_width,
        kernels: vec![kernel; num_cores],
    }
}
