//! Blocking DMA loads from DRAM into a PE's private memory.

use super::layout::LayerLayout;
use crate::chip::{CoreId, GlobalAddress, Interconnect};
use crate::error::Result;
use crate::network::LayerParameters;

/// Copies the layer's record from the parameter table into the start of the
/// data region and decodes it.
pub fn load_parameters<I: Interconnect>(
    chip: &I,
    core: CoreId,
    layer: usize,
) -> Result<LayerParameters> {
    let config = chip.config();
    let dst = LayerLayout::params_range(config);
    let src = config.parameter_table + LayerParameters::WORDS * layer;
    chip.dma_copy(
        chip.translate(core, dst.start),
        GlobalAddress::Dram(src),
        LayerParameters::WORDS,
    )?;
    let params = chip.with_local(core, |mem| LayerParameters::from_words(mem.words(dst)))?;
    trace!("PE {} loaded layer {} parameters {:?}", core, layer, params);
    Ok(params)
}

/// Copies this PE's kernels and scales for the layer.
///
/// Each PE's slice starts `pe_id × kernel_slice_len` words into the layer's
/// kernel table and fills the adjacent kernels and scales buffers.
pub fn load_kernels<I: Interconnect>(
    chip: &I,
    core: CoreId,
    params: &LayerParameters,
    layout: &LayerLayout,
) -> Result<()> {
    let pe_id = core.index(chip.config().cols);
    let slice_len = params.kernel_slice_len();
    debug_assert_eq!(layout.scales.start, layout.kernels.end);
    debug_assert_eq!(slice_len, layout.kernels.len() + layout.scales.len());

    let src = params.dram_kernel_ptr as usize + slice_len * pe_id;
    chip.dma_copy(
        chip.translate(core, layout.kernels.start),
        GlobalAddress::Dram(src),
        slice_len,
    )
}

/// DRAM address of a patch: layer 0 reads the image buffer, later layers the
/// intermediate maps left there by the host.
pub fn patch_address<I: Interconnect>(chip: &I, layer: usize, patch: usize, patch_len: usize) -> usize {
    let config = chip.config();
    let region = if layer == 0 {
        config.image_addr
    } else {
        config.intermediate_addr
    };
    region + patch * patch_len
}

/// Copies one input patch into the patch buffer.
pub fn load_patch<I: Interconnect>(
    chip: &I,
    core: CoreId,
    layout: &LayerLayout,
    layer: usize,
    patch: usize,
) -> Result<()> {
    let patch_len = layout.patch.len();
    let src = patch_address(chip, layer, patch, patch_len);
    chip.dma_copy(
        chip.translate(core, layout.patch.start),
        GlobalAddress::Dram(src),
        patch_len,
    )
}
