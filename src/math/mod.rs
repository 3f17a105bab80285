#[cfg(test)]
mod test;

use num_traits::NumAssign;

/// Valid (unpadded, stride 1) 2D convolution of a square `src` with a square
/// `kernel`, each result scaled by `scale`.
///
/// Writes `(src_width - kernel_width + 1)²` samples to `dest` in row-major
/// order. Products are accumulated into one running sum, kernel row by kernel
/// row, before scaling.
pub fn filter2d(
    kernel: &[f32],
    src: &[f32],
    dest: &mut [f32],
    kernel_width: usize,
    src_width: usize,
    scale: f32,
) {
    let conv_size = src_width - kernel_width + 1;
    debug_assert!(kernel.len() >= kernel_width * kernel_width);
    debug_assert!(src.len() >= src_width * src_width);
    debug_assert!(dest.len() >= conv_size * conv_size);

    let mut out = dest.iter_mut();
    let mut row_base = 0;
    for _ in 0..conv_size {
        for col in 0..conv_size {
            let mut sop = 0f32;
            for (kernel_row, weights) in kernel.chunks_exact(kernel_width).enumerate() {
                let start = row_base + kernel_row * src_width + col;
                for (w, s) in weights.iter().zip(&src[start..start + kernel_width]) {
                    sop += w * s;
                }
            }
            if let Some(o) = out.next() {
                *o = sop * scale;
            }
        }
        row_base += src_width;
    }
}

/// In-place mean pooling over non-overlapping `window`×`window` blocks.
///
/// Every sample of a block is replaced by the block mean. Rows and columns
/// past `src_width - src_width % window` are left as they are.
pub fn pool(src: &mut [f32], window: usize, src_width: usize) {
    let corr = src_width - src_width % window;
    let denom = (window * window) as f32;

    for row in (0..corr).step_by(window) {
        for col in (0..corr).step_by(window) {
            let mut sum = 0f32;
            for i in 0..window {
                let start = (row + i) * src_width + col;
                for s in &src[start..start + window] {
                    sum += *s;
                }
            }

            let mean = sum / denom;

            for i in 0..window {
                let start = (row + i) * src_width + col;
                for s in &mut src[start..start + window] {
                    *s = mean;
                }
            }
        }
    }
}

/// Strided point sampling: copies `src[row][col]` for every `row` and `col`
/// that are multiples of `stride` inside `src_width - src_width % stride`,
/// packed row-major into `dest`.
///
/// Returns the number of samples written.
pub fn subsample(src: &[f32], dest: &mut [f32], stride: usize, src_width: usize) -> usize {
    let corr = src_width - src_width % stride;

    let mut o_cntr = 0;
    for row in (0..corr).step_by(stride) {
        for col in (0..corr).step_by(stride) {
            dest[o_cntr] = src[row * src_width + col];
            o_cntr += 1;
        }
    }
    o_cntr
}

/// Folds one decimated map into a running accumulator: assigns for the first
/// map of a patch, adds elementwise for the rest.
pub fn accumulate<T>(accum: &mut [T], map: &[T], first: bool)
where
    T: NumAssign + Copy,
{
    if first {
        accum.copy_from_slice(&map[..accum.len()]);
    } else {
        for (a, &m) in accum.iter_mut().zip(map) {
            *a += m;
        }
    }
}

/// Adds the left-to-right sum of `parts` into `accum`, elementwise.
///
/// The parts are summed first and the total is added once, so
/// `accum[j] += p0[j] + p1[j] + ...`.
pub fn sum_into<T>(accum: &mut [T], parts: &[&[T]])
where
    T: NumAssign + Copy,
{
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return,
    };
    for (j, a) in accum.iter_mut().enumerate() {
        let mut sum = first[j];
        for part in rest {
            sum += part[j];
        }
        *a += sum;
    }
}
