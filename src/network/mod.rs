use crate::error::ConfigError;
use crate::geometry::*;
use std::convert::TryFrom;

/// The per-layer scalar configuration, as stored in one record of the DRAM
/// parameter table and in the first words of every PE's data region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerParameters {
    /// Maps processed by each PE
    pub num_maps: u32,
    pub num_patches: u32,
    pub kernel_width: u32,
    pub patch_width: u32,
    pub pool_window: u32,
    pub subsample_factor: u32,
    /// DRAM address of this layer's kernel table
    pub dram_kernel_ptr: u32,
    /// DRAM address of this layer's output map
    pub dram_map_ptr: u32,
    pub big_map_width: u32,
}

impl LayerParameters {
    /// Length of one parameter record in words.
    pub const WORDS: usize = 9;

    pub fn from_words(words: &[u32]) -> LayerParameters {
        LayerParameters {
            num_maps: words[0],
            num_patches: words[1],
            kernel_width: words[2],
            patch_width: words[3],
            pool_window: words[4],
            subsample_factor: words[5],
            dram_kernel_ptr: words[6],
            dram_map_ptr: words[7],
            big_map_width: words[8],
        }
    }

    pub fn to_words(&self) -> [u32; LayerParameters::WORDS] {
        [
            self.num_maps,
            self.num_patches,
            self.kernel_width,
            self.patch_width,
            self.pool_window,
            self.subsample_factor,
            self.dram_kernel_ptr,
            self.dram_map_ptr,
            self.big_map_width,
        ]
    }

    /// Checks the shape parameters and returns the resulting patch geometry.
    pub fn geometry(&self) -> Result<PatchGeometry, ConfigError> {
        if self.num_maps == 0 {
            return Err(ConfigError::ZeroDimension { name: "map count" });
        }
        let geometry = PatchGeometry::new(
            self.patch_width as usize,
            self.kernel_width as usize,
            self.pool_window as usize,
            self.subsample_factor as usize,
        )?;
        let tile_width = geometry.accumulator().side();
        if (self.big_map_width as usize) < tile_width {
            return Err(ConfigError::OutputTooNarrow {
                big_map_width: self.big_map_width as usize,
                tile_width,
            });
        }
        Ok(geometry)
    }

    pub fn num_maps(&self) -> usize {
        self.num_maps as usize
    }
    pub fn num_patches(&self) -> usize {
        self.num_patches as usize
    }
    pub fn kernel_len(&self) -> usize {
        (self.kernel_width * self.kernel_width) as usize
    }
    /// Words of one PE's kernel slice: the kernels followed by one scale per map.
    pub fn kernel_slice_len(&self) -> usize {
        self.num_maps() * (self.kernel_len() + 1)
    }
}

fn to_word(name: &'static str, value: usize) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::WordOverflow { name, value })
}

/// One PE's filters for a layer.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelSlice {
    /// `num_maps` row-major kernels, back to back
    pub kernels: Vec<f32>,
    /// One scale factor per map
    pub scales: Vec<f32>,
}

impl KernelSlice {
    pub fn new(kernels: Vec<f32>, scales: Vec<f32>) -> KernelSlice {
        KernelSlice { kernels, scales }
    }

    /// `num_maps` kernels filled with `value`, every map scaled by `scale`.
    pub fn uniform(num_maps: usize, kernel_width: usize, value: f32, scale: f32) -> KernelSlice {
        KernelSlice {
            kernels: vec![value; num_maps * kernel_width * kernel_width],
            scales: vec![scale; num_maps],
        }
    }

    pub fn len(&self) -> usize {
        self.kernels.len() + self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What the host knows about a layer before DRAM addresses are assigned.
#[derive(Clone, Debug)]
pub struct LayerSpec {
    pub num_maps: usize,
    pub num_patches: usize,
    pub kernel_width: usize,
    pub patch_width: usize,
    pub pool_window: usize,
    pub subsample_factor: usize,
    pub big_map_width: usize,
    /// One slice per PE, in PE id order
    pub kernels: Vec<KernelSlice>,
}

impl LayerSpec {
    /// Record for the parameter table, pointing at the given DRAM addresses.
    ///
    /// Fails if a field or address does not fit into a 32-bit word.
    pub fn parameters(
        &self,
        dram_kernel_ptr: usize,
        dram_map_ptr: usize,
    ) -> Result<LayerParameters, ConfigError> {
        Ok(LayerParameters {
            num_maps: to_word("map count", self.num_maps)?,
            num_patches: to_word("patch count", self.num_patches)?,
            kernel_width: to_word("kernel width", self.kernel_width)?,
            patch_width: to_word("patch width", self.patch_width)?,
            pool_window: to_word("pool window", self.pool_window)?,
            subsample_factor: to_word("subsample factor", self.subsample_factor)?,
            dram_kernel_ptr: to_word("kernel table address", dram_kernel_ptr)?,
            dram_map_ptr: to_word("output map address", dram_map_ptr)?,
            big_map_width: to_word("output map width", self.big_map_width)?,
        })
    }

    pub fn geometry(&self) -> Result<PatchGeometry, ConfigError> {
        self.parameters(0, 0)?.geometry()
    }

    /// Rows of the output map once every patch's tile has been written.
    pub fn output_rows(&self) -> Result<usize, ConfigError> {
        let tile_width = self.geometry()?.accumulator().side();
        let tiles_per_row = self.big_map_width / tile_width;
        let tile_rows = (self.num_patches + tiles_per_row - 1) / tiles_per_row;
        Ok(tile_rows * tile_width)
    }

    pub fn output_len(&self) -> Result<usize, ConfigError> {
        Ok(self.output_rows()? * self.big_map_width)
    }

    /// Checks that there is one kernel slice per PE, each of the right length.
    pub fn check_kernels(&self, num_cores: usize) -> Result<(), ConfigError> {
        let words = self.num_maps * (self.kernel_width * self.kernel_width + 1);
        let well_formed = self.kernels.len() == num_cores
            && self.kernels.iter().all(|k| {
                k.scales.len() == self.num_maps && k.len() == words
            });
        if well_formed {
            Ok(())
        } else {
            Err(ConfigError::KernelShape {
                expected: num_cores,
                words,
                actual: self.kernels.len(),
            })
        }
    }
}
