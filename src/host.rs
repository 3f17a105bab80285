//! Host side of the chip: stages a network in DRAM, starts one thread per PE
//! and drives the layer handshake.

use crate::arena::Arena;
use crate::chip::{Chip, CoreId, GlobalAddress, Interconnect};
use crate::config::ChipConfig;
use crate::error::{ChipError, ConfigError, Result};
use crate::network::{LayerParameters, LayerSpec};
use crate::pe::{self, handshake, Flag};
use crate::util::duration_between;
use std::thread::{self, ScopedJoinHandle};
use std::time::Instant;

/// Cuts a row-major map into row-major ordered, contiguous `patch_width`²
/// patches, the layout the PEs read their input in.
pub fn tile_map(map: &[f32], map_width: usize, patch_width: usize) -> Result<Vec<f32>> {
    let map_rows = if map_width == 0 { 0 } else { map.len() / map_width };
    if patch_width == 0
        || map_width % patch_width != 0
        || map_rows % patch_width != 0
        || map_rows * map_width != map.len()
    {
        return Err(ConfigError::MapNotTileable {
            map_width,
            map_rows,
            patch_width,
        }
        .into());
    }

    let mut patches = Vec::with_capacity(map.len());
    for tile_row in (0..map_rows).step_by(patch_width) {
        for tile_col in (0..map_width).step_by(patch_width) {
            for r in tile_row..tile_row + patch_width {
                let start = r * map_width + tile_col;
                patches.extend_from_slice(&map[start..start + patch_width]);
            }
        }
    }
    Ok(patches)
}

/// A network staged in DRAM: every layer's parameter record with the kernel
/// table and output map addresses the host assigned to it.
pub struct StagedNetwork {
    pub params: Vec<LayerParameters>,
    pub specs: Vec<LayerSpec>,
}

/// The host program.
pub struct Host {
    chip: Chip,
}

impl Host {
    pub fn new(config: ChipConfig) -> Result<Host> {
        Ok(Host {
            chip: Chip::new(config)?,
        })
    }

    pub fn chip(&self) -> &Chip {
        &self.chip
    }

    /// Writes the parameter table, every layer's kernel table and the pre-tiled
    /// input image into DRAM, and clears every layer's output map.
    pub fn stage(&self, image: &[f32], layers: &[LayerSpec]) -> Result<StagedNetwork> {
        let config = *self.chip.config();
        let mut heap = Arena::new(config.heap_addr..config.dram_words);
        let table_len = layers.len() * LayerParameters::WORDS;
        if config.parameter_table + table_len > config.image_addr {
            return Err(ConfigError::OutOfDram {
                required: table_len,
                available: config.image_addr - config.parameter_table,
            }
            .into());
        }
        if config.image_addr + image.len() > config.intermediate_addr {
            return Err(ConfigError::OutOfDram {
                required: image.len(),
                available: config.intermediate_addr - config.image_addr,
            }
            .into());
        }
        for spec in layers {
            spec.geometry()?;
            spec.check_kernels(config.num_cores())?;
        }

        if let Some(first) = layers.first() {
            let available = image.len() / (first.patch_width * first.patch_width);
            if first.num_patches > available {
                return Err(ConfigError::NotEnoughPatches {
                    layer: 0,
                    required: first.num_patches,
                    available,
                }
                .into());
            }
        }

        // Re-tiling between layers must not fail once the PEs are running
        for (n, pair) in layers.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            let map_rows = prev.output_rows()?;
            if prev.big_map_width % next.patch_width != 0 || map_rows % next.patch_width != 0 {
                return Err(ConfigError::MapNotTileable {
                    map_width: prev.big_map_width,
                    map_rows,
                    patch_width: next.patch_width,
                }
                .into());
            }
            let available = (prev.big_map_width / next.patch_width) * (map_rows / next.patch_width);
            if next.num_patches > available {
                return Err(ConfigError::NotEnoughPatches {
                    layer: n + 1,
                    required: next.num_patches,
                    available,
                }
                .into());
            }
            let intermediate_len = config.heap_addr - config.intermediate_addr;
            if prev.output_len()? > intermediate_len {
                return Err(ConfigError::OutOfDram {
                    required: prev.output_len()?,
                    available: intermediate_len,
                }
                .into());
            }
        }

        let mut params = Vec::with_capacity(layers.len());
        for (n, spec) in layers.iter().enumerate() {
            let kernel_table: Vec<f32> = spec
                .kernels
                .iter()
                .flat_map(|slice| slice.kernels.iter().chain(&slice.scales))
                .cloned()
                .collect();
            let map_len = spec.output_len()?;
            let kernel_ptr = heap.take_dram(kernel_table.len())?.start;
            let map_ptr = heap.take_dram(map_len)?.start;
            let record = spec.parameters(kernel_ptr, map_ptr)?;

            self.chip.write_dram_f32s(kernel_ptr, &kernel_table)?;
            // Tile slots no patch maps to are never written by the PEs
            self.chip.write_dram_f32s(map_ptr, &vec![0f32; map_len])?;
            self.chip.write(
                GlobalAddress::Dram(config.parameter_table + n * LayerParameters::WORDS),
                &record.to_words(),
            )?;
            debug!(
                "Stage layer {}: kernels at {:#x}, output map at {:#x}.",
                n, kernel_ptr, map_ptr
            );
            params.push(record);
        }
        self.chip.write_dram_f32s(config.image_addr, image)?;

        Ok(StagedNetwork {
            params,
            specs: layers.to_vec(),
        })
    }

    /// Runs `layers` on the chip with `image` as the layer-0 input and returns
    /// the output map of every layer.
    ///
    /// Between layers the previous output map is cut into the next layer's
    /// patches and written to the intermediate region.
    pub fn run(&self, image: &[f32], layers: &[LayerSpec]) -> Result<Vec<Vec<f32>>> {
        let staged = self.stage(image, layers)?;
        let chip = &self.chip;
        let num_layers = layers.len();

        thread::scope(|s| {
            let handles: Vec<(CoreId, ScopedJoinHandle<Result<()>>)> = chip
                .cores()
                .map(|core| (core, s.spawn(move || pe::run(chip, core, num_layers))))
                .collect();

            let outputs = self.drive(&staged, &handles);
            // A PE's own error explains a failed handshake better than the host's view
            join_all(handles)?;
            outputs
        })
    }

    /// The host half of the handshake, one pass per layer.
    fn drive(
        &self,
        staged: &StagedNetwork,
        handles: &[(CoreId, ScopedJoinHandle<Result<()>>)],
    ) -> Result<Vec<Vec<f32>>> {
        let config = *self.chip.config();
        let mut outputs = Vec::with_capacity(staged.params.len());
        let mut start = Instant::now();

        for (n, (params, spec)) in staged.params.iter().zip(&staged.specs).enumerate() {
            self.wait_all(handles, Flag::LayerDone)?;
            let end = Instant::now();
            info!(
                "Layer {} done in {:.3} ms.",
                n,
                duration_between(start, end)
            );

            let map = self
                .chip
                .read_dram_f32s(params.dram_map_ptr as usize, spec.output_len()?)?;
            if let Some(next) = staged.specs.get(n + 1) {
                let patches = tile_map(&map, spec.big_map_width, next.patch_width)?;
                self.chip.write_dram_f32s(config.intermediate_addr, &patches)?;
            }
            outputs.push(map);

            start = Instant::now();
            for &(core, _) in handles {
                self.chip
                    .write_local_word(core, config.flag_addr, Flag::Resume.word())?;
            }
        }

        self.wait_all(handles, Flag::AllDone)?;
        info!("All {} layers done.", outputs.len());
        Ok(outputs)
    }

    /// Waits until every PE's flag holds `flag`, or until a PE thread exits early.
    fn wait_all(
        &self,
        handles: &[(CoreId, ScopedJoinHandle<Result<()>>)],
        flag: Flag,
    ) -> Result<()> {
        let config = self.chip.config();
        for (core, handle) in handles {
            let mut backoff = handshake::Backoff::new(config.poll);
            loop {
                if self.chip.read_local_word(*core, config.flag_addr)? == flag.word() {
                    break;
                }
                if handle.is_finished() {
                    return Err(ChipError::PeFailed {
                        core: *core,
                        reason: format!("exited while the host waited for {:?}", flag),
                    });
                }
                backoff.snooze();
            }
        }
        Ok(())
    }
}

/// Joins every PE thread, reporting the first failure.
fn join_all(handles: Vec<(CoreId, ScopedJoinHandle<Result<()>>)>) -> Result<()> {
    let mut first_err = None;
    for (core, handle) in handles {
        let result = match handle.join() {
            Ok(result) => result,
            Err(_) => Err(ChipError::PeFailed {
                core,
                reason: "panicked".to_string(),
            }),
        };
        if let Err(err) = result {
            warn!("PE {} failed: {}", core, err);
            first_err.get_or_insert(err);
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
