extern crate env_logger;
#[macro_use]
extern crate log;
extern crate rusty_noc_cnn;

use rusty_noc_cnn::host::tile_map;
use rusty_noc_cnn::*;
use std::env;
use std::time::Instant;

const OUT_FILE: &str = "output/out.f";
const IMAGE_SIDE: usize = 32;
const PATCH_1_SIDE: usize = 8;
const PATCH_2_SIDE: usize = 6;
const MAPS_PER_PE: usize = 2;

fn main() {
    env_logger::init();

    match run() {
        Ok(_) => info!("Exited great."),
        Err(err) => info!("Exited with error: {}.", err),
    }
}

/// Kernels for every PE: a mix of box and edge filters, different per PE and map.
fn demo_kernels(num_cores: usize, kernel_width: usize) -> Vec<KernelSlice> {
    let kernel_len = kernel_width * kernel_width;
    (0..num_cores)
        .map(|pe| {
            let kernels = (0..MAPS_PER_PE * kernel_len)
                .map(|i| ((pe + i / kernel_len + i) % 3) as f32 - 1.0)
                .collect();
            let scales = (0..MAPS_PER_PE)
                .map(|m| 1.0 / (kernel_len * (m + 1)) as f32)
                .collect();
            KernelSlice::new(kernels, scales)
        })
        .collect()
}

/// A 32x32 image read from the file given as the first argument, or a
/// synthetic gradient when none is given.
fn load_image() -> Result<Vec<f32>> {
    match env::args().nth(1) {
        Some(path) => {
            info!("Reading the image from {}.", path);
            Ok(read_file_as_f32s_checked(path, IMAGE_SIDE * IMAGE_SIDE)?)
        }
        None => Ok((0..IMAGE_SIDE * IMAGE_SIDE)
            .map(|i| ((i / IMAGE_SIDE) as f32 * 0.25).sin() + ((i % IMAGE_SIDE) as f32 * 0.5).cos())
            .collect()),
    }
}

fn run() -> Result<()> {
    let config = EPIPHANY_16;
    let host = Host::new(config)?;

    // 16 8x8 patches -> 6x6 convolution, 2x2 pooling, stride 2 -> 3x3 tiles in a 12x12 map
    let conv1 = LayerSpec {
        num_maps: MAPS_PER_PE,
        num_patches: (IMAGE_SIDE / PATCH_1_SIDE).pow(2),
        kernel_width: 3,
        patch_width: PATCH_1_SIDE,
        pool_window: 2,
        subsample_factor: 2,
        big_map_width: 12,
        kernels: demo_kernels(config.num_cores(), 3),
    };
    // 4 6x6 patches of the 12x12 map -> 4x4 convolution, 2x2 tiles in a 4x4 map
    let conv2 = LayerSpec {
        num_maps: MAPS_PER_PE,
        num_patches: (12 / PATCH_2_SIDE) * (12 / PATCH_2_SIDE),
        kernel_width: 3,
        patch_width: PATCH_2_SIDE,
        pool_window: 2,
        subsample_factor: 2,
        big_map_width: 4,
        kernels: demo_kernels(config.num_cores(), 3),
    };

    let image = tile_map(&load_image()?, IMAGE_SIDE, PATCH_1_SIDE)?;

    let start_time = Instant::now();
    let outputs = host.run(&image, &[conv1, conv2])?;
    let end_time = Instant::now();
    info!(
        "Total computation time: {}",
        duration_between(start_time, end_time)
    );

    if let Some(output) = outputs.last() {
        debug!("Output map: {:?}", output);
        write_file_f32s(OUT_FILE, output)?;
    }
    Ok(())
}
