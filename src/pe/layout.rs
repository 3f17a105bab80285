use crate::arena::Arena;
use crate::chip::Memory;
use crate::config::ChipConfig;
use crate::error::ConfigError;
use crate::geometry::*;
use crate::network::LayerParameters;
use std::ops::Range;

/// Where each per-layer buffer lives in a PE's private memory.
///
/// The buffers are bump-allocated in this order from the start of the data
/// region: parameters, kernels, scales, patch, accumulator, intermediate,
/// decimated. Every PE of the grid computes the same layout for a layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerLayout {
    pub params: Range<usize>,
    pub kernels: Range<usize>,
    pub scales: Range<usize>,
    pub patch: Range<usize>,
    pub accumulator: Range<usize>,
    /// Convolution output; on the root PE also the reduction scratch slots
    pub intermediate: Range<usize>,
    pub decimated: Range<usize>,
    pub geometry: PatchGeometry,
}

/// Typed views of one PE's per-layer buffers.
pub struct LayerBuffers<'a> {
    pub kernels: &'a [f32],
    pub scales: &'a [f32],
    pub patch: &'a [f32],
    pub accumulator: &'a mut [f32],
    pub intermediate: &'a mut [f32],
    pub decimated: &'a mut [f32],
}

impl LayerLayout {
    /// Where the parameter record is loaded, before the rest can be sized.
    pub fn params_range(config: &ChipConfig) -> Range<usize> {
        config.data_base..config.data_base + LayerParameters::WORDS
    }

    /// Lays out the buffers for a layer's parameters inside the data region.
    pub fn compute(params: &LayerParameters, config: &ChipConfig) -> Result<LayerLayout, ConfigError> {
        let mut arena = Arena::new(config.data_base..config.data_limit);
        LayerLayout::compute_in(params, config.cols, &mut arena)
    }

    /// Rewinds `arena` and lays out the buffers in it.
    ///
    /// The intermediate buffer is large enough for both the convolution output
    /// and one accumulator-sized scratch slot per grid column.
    pub fn compute_in(
        params: &LayerParameters,
        grid_cols: usize,
        arena: &mut Arena,
    ) -> Result<LayerLayout, ConfigError> {
        arena.reset();
        let geometry = params.geometry()?;
        let num_maps = params.num_maps();
        let accum_len = geometry.accumulator().num_elems();
        let intermediate_len = geometry.conv().num_elems().max(grid_cols * accum_len);

        let layout = LayerLayout {
            params: arena.take_local(LayerParameters::WORDS)?,
            kernels: arena.take_local(num_maps * geometry.kernel().num_elems())?,
            scales: arena.take_local(num_maps)?,
            patch: arena.take_local(geometry.patch().num_elems())?,
            accumulator: arena.take_local(accum_len)?,
            intermediate: arena.take_local(intermediate_len)?,
            decimated: arena.take_local(accum_len)?,
            geometry,
        };
        debug!(
            "Lay out {} maps of {}x{} patches: {} of {} data words used.",
            num_maps,
            geometry.patch().side(),
            geometry.patch().side(),
            arena.used(),
            arena.capacity()
        );
        trace!("\t↳ {:?}", layout);
        Ok(layout)
    }

    pub fn accumulator_len(&self) -> usize {
        self.accumulator.len()
    }

    /// Splits the data region of `mem` into the layer's buffers.
    pub fn buffers<'a>(&self, mem: &'a mut Memory) -> LayerBuffers<'a> {
        let region = mem.f32s_mut(self.kernels.start..self.decimated.end);
        let (kernels, rest) = region.split_at_mut(self.kernels.len());
        let (scales, rest) = rest.split_at_mut(self.scales.len());
        let (patch, rest) = rest.split_at_mut(self.patch.len());
        let (accumulator, rest) = rest.split_at_mut(self.accumulator.len());
        let (intermediate, decimated) = rest.split_at_mut(self.intermediate.len());
        LayerBuffers {
            kernels,
            scales,
            patch,
            accumulator,
            intermediate,
            decimated,
        }
    }
}
