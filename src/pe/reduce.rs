use super::layout::LayerLayout;
use crate::chip::{CoreId, Interconnect};
use crate::error::Result;
use crate::math::sum_into;

/// Sums every PE's accumulator into the root PE's accumulator.
///
/// Runs on the root only, after the grid barrier. Remote accumulators are
/// pulled by DMA into accumulator-sized slots of the root's intermediate
/// buffer. Row 0 is merged first (the root's own accumulator plus columns
/// 1..), then every other row is pulled in full and added, one row at a time.
pub fn reduce<I: Interconnect>(chip: &I, layout: &LayerLayout) -> Result<()> {
    let config = chip.config();
    let root = CoreId::ROOT;
    let accum_len = layout.accumulator_len();
    debug_assert!(layout.intermediate.len() >= config.cols * accum_len);

    for row in 0..config.rows {
        // Row 0 skips the root itself, its accumulator is the destination
        let first_col = if row == 0 { 1 } else { 0 };
        let cols = first_col..config.cols;
        if cols.is_empty() {
            continue;
        }

        for (slot, col) in cols.clone().enumerate() {
            let src = chip.translate(CoreId::new(row, col), layout.accumulator.start);
            let dst = chip.translate(root, layout.intermediate.start + slot * accum_len);
            chip.dma_copy(dst, src, accum_len)?;
        }

        let num_slots = cols.len();
        chip.with_local(root, |mem| {
            let bufs = layout.buffers(mem);
            let slots: Vec<&[f32]> = bufs.intermediate[..num_slots * accum_len]
                .chunks_exact(accum_len)
                .collect();
            sum_into(bufs.accumulator, &slots);
        })?;
        trace!("Reduced row {} ({} PEs) into the root", row, num_slots);
    }
    Ok(())
}
