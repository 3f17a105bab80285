//! The program every PE runs.
//!
//! All PEs execute `run` with their own coordinate. Per layer:
//! load parameters, size the buffers, load kernels, then for every patch load
//! it, convolve/pool/decimate each map into the local accumulator and meet at
//! the barrier. The root PE then reduces the grid and writes the tile out while
//! the others wait at a second barrier. After the last patch every PE reports
//! the layer done and waits for the host to resume it.

pub mod handshake;
pub mod layout;
pub mod loader;
pub mod reduce;
pub mod scatter;

pub use self::handshake::Flag;
pub use self::layout::{LayerBuffers, LayerLayout};
use crate::arena::Arena;
use crate::chip::{CoreId, Interconnect};
use crate::error::Result;
use crate::geometry::Square;
use crate::math::*;
use crate::network::LayerParameters;

/// Runs the per-map pipeline over the loaded patch and folds every map into
/// the accumulator.
pub fn accumulate_maps(bufs: LayerBuffers, layout: &LayerLayout) {
    let geometry = &layout.geometry;
    let kernel_len = geometry.kernel().num_elems();
    let kernel_width = geometry.kernel().side();
    let patch_width = geometry.patch().side();
    let conv_width = geometry.conv().side();

    let LayerBuffers {
        kernels,
        scales,
        patch,
        accumulator,
        intermediate,
        decimated,
    } = bufs;

    for (i, (kernel, &scale)) in kernels.chunks_exact(kernel_len).zip(scales).enumerate() {
        filter2d(kernel, patch, intermediate, kernel_width, patch_width, scale);
        pool(intermediate, geometry.pool_window(), conv_width);
        subsample(intermediate, decimated, geometry.stride(), conv_width);
        accumulate(accumulator, decimated, i == 0);
    }
}

/// The SPMD program of one PE, for `num_layers` layers.
pub fn run<I: Interconnect>(chip: &I, core: CoreId, num_layers: usize) -> Result<()> {
    let config = *chip.config();
    let mut arena = Arena::new(config.data_base..config.data_limit);
    handshake::signal(chip, core, Flag::Ready)?;

    for layer in 0..num_layers {
        let params: LayerParameters = loader::load_parameters(chip, core, layer)?;
        let layout = LayerLayout::compute_in(&params, config.cols, &mut arena)?;
        loader::load_kernels(chip, core, &params, &layout)?;
        if core.is_root() {
            debug!(
                "Layer {}: {} patches, {} maps per PE, {}x{} tiles into a {}-wide map.",
                layer,
                params.num_patches,
                params.num_maps,
                layout.geometry.accumulator().side(),
                layout.geometry.accumulator().side(),
                params.big_map_width
            );
        }

        for patch in 0..params.num_patches() {
            loader::load_patch(chip, core, &layout, layer, patch)?;
            chip.with_local(core, |mem| accumulate_maps(layout.buffers(mem), &layout))?;

            chip.barrier();
            if core.is_root() {
                reduce::reduce(chip, &layout)?;
                scatter::dump_to_dram(
                    chip,
                    &layout,
                    params.dram_map_ptr as usize,
                    patch,
                    params.big_map_width as usize,
                )?;
            }
            // Accumulators stay untouched until the root has pulled them
            chip.barrier();
            trace!("PE {} finished patch {} of layer {}", core, patch, layer);
        }

        handshake::signal(chip, core, Flag::LayerDone)?;
        handshake::wait_for(chip, core, Flag::Resume)?;
    }

    handshake::signal(chip, core, Flag::AllDone)
}
