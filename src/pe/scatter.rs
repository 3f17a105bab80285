use super::layout::LayerLayout;
use crate::chip::{CoreId, GlobalAddress, Interconnect};
use crate::error::Result;
use crate::geometry::Square;

/// Tile coordinates of a patch inside the output map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilePlacement {
    pub row: usize,
    pub col: usize,
}

impl TilePlacement {
    /// Treats a `big_width`-wide map as a row-major grid of `tile_width`-wide
    /// tiles and finds the one belonging to `patch_id`.
    pub fn of(patch_id: usize, tile_width: usize, big_width: usize) -> TilePlacement {
        let tiles_per_row = big_width / tile_width;
        let col = patch_id % tiles_per_row;
        let row = (patch_id - col) / tiles_per_row;
        TilePlacement { row, col }
    }

    /// Word offset, inside the map, of row `i` of the tile.
    pub fn row_offset(&self, i: usize, tile_width: usize, big_width: usize) -> usize {
        (self.row * tile_width + i) * big_width + self.col * tile_width
    }
}

/// Writes the root's accumulator into its tile of the output map at
/// `map_ptr`, one DMA per tile row.
pub fn dump_to_dram<I: Interconnect>(
    chip: &I,
    layout: &LayerLayout,
    map_ptr: usize,
    patch_id: usize,
    big_width: usize,
) -> Result<()> {
    let tile_width = layout.geometry.accumulator().side();
    let placement = TilePlacement::of(patch_id, tile_width, big_width);
    trace!(
        "Write patch {} to tile {:?} of the {}-wide map at {:#x}",
        patch_id,
        placement,
        big_width,
        map_ptr
    );

    for i in 0..tile_width {
        let dst = GlobalAddress::Dram(map_ptr + placement.row_offset(i, tile_width, big_width));
        let src = chip.translate(CoreId::ROOT, layout.accumulator.start + i * tile_width);
        chip.dma_copy(dst, src, tile_width)?;
    }
    Ok(())
}
