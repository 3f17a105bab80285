use super::*;
use crate::util::verify;
use ndarray::{s, Array, Array2};
use rand::Rng;

const EPSILON: f32 = 0.0001;

lazy_static! {
    // 6x6 ramp: 0, 1, 2, ... 35
    static ref RAMP_6: Vec<f32> = (0..36).map(|x| x as f32).collect();
}

fn random_vec(len: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(-1f32..1f32)).collect()
}

/// Reference valid cross-correlation on ndarray views.
fn reference_filter2d(kernel: &[f32], src: &[f32], k: usize, w: usize, scale: f32) -> Vec<f32> {
    let kernel = Array::from_shape_vec((k, k), kernel.to_vec()).unwrap();
    let src = Array::from_shape_vec((w, w), src.to_vec()).unwrap();
    let n = w - k + 1;
    let mut out = Array2::<f32>::zeros((n, n));
    for row in 0..n {
        for col in 0..n {
            let window = src.slice(s![row..row + k, col..col + k]);
            out[[row, col]] = (&window * &kernel).sum() * scale;
        }
    }
    out.into_raw_vec()
}

#[test]
fn filter2d_output_width_is_valid_convolution() {
    let (k, w) = (3, 6);
    let kernel = vec![1f32; k * k];
    // Sentinel past the end must stay untouched
    let mut dest = vec![-1f32; (w - k + 1) * (w - k + 1) + 1];
    filter2d(&kernel, &RAMP_6, &mut dest, k, w, 1f32);

    assert_eq!(dest[16], -1f32);
    // Top-left window: rows 0..3, cols 0..3 of the ramp
    let top_left: f32 = [0, 1, 2, 6, 7, 8, 12, 13, 14].iter().map(|&x| x as f32).sum();
    assert_eq!(dest[0], top_left);
}

#[test]
fn filter2d_top_left_is_scaled_dot_product() {
    let (k, w) = (4, 9);
    let kernel = random_vec(k * k);
    let src = random_vec(w * w);
    let mut dest = vec![0f32; (w - k + 1) * (w - k + 1)];
    filter2d(&kernel, &src, &mut dest, k, w, 0.5);

    let mut dot = 0f32;
    for r in 0..k {
        for c in 0..k {
            dot += kernel[r * k + c] * src[r * w + c];
        }
    }
    assert_eq!(dest[0], dot * 0.5);
}

#[test]
fn filter2d_matches_ndarray_reference() {
    let (k, w) = (5, 12);
    let kernel = random_vec(k * k);
    let src = random_vec(w * w);
    let mut dest = vec![0f32; (w - k + 1) * (w - k + 1)];
    filter2d(&kernel, &src, &mut dest, k, w, 1.25);

    verify(&dest, &reference_filter2d(&kernel, &src, k, w, 1.25), EPSILON);
}

#[test]
fn filter2d_with_full_width_kernel_yields_single_sample() {
    let kernel = vec![2f32; 4];
    let src = vec![1f32, 2f32, 3f32, 4f32];
    let mut dest = vec![0f32; 1];
    filter2d(&kernel, &src, &mut dest, 2, 2, 0.25);
    assert_eq!(dest, vec![5f32]);
}

#[test]
fn pool_replaces_blocks_with_their_mean() {
    let mut buf = RAMP_6.clone();
    pool(&mut buf, 2, 6);

    // Block (0, 0) holds 0, 1, 6, 7
    for &idx in &[0, 1, 6, 7] {
        assert_eq!(buf[idx], 3.5);
    }
    // Block (2, 1) holds 26, 27, 32, 33
    for &idx in &[26, 27, 32, 33] {
        assert_eq!(buf[idx], 29.5);
    }
}

#[test]
fn pool_is_idempotent() {
    let mut once = random_vec(64);
    pool(&mut once, 4, 8);
    let mut twice = once.clone();
    pool(&mut twice, 4, 8);
    verify(&twice, &once, EPSILON);
}

#[test]
fn pool_leaves_trailing_rows_and_columns_untouched() {
    let original: Vec<f32> = (0..25).map(|x| x as f32).collect();
    let mut buf = original.clone();
    pool(&mut buf, 2, 5);

    for row in 0..5 {
        assert_eq!(buf[row * 5 + 4], original[row * 5 + 4]);
    }
    for col in 0..5 {
        assert_eq!(buf[20 + col], original[20 + col]);
    }
    assert_eq!(buf[0], 3f32);
}

#[test]
fn pool_with_unit_window_is_identity() {
    let mut buf = RAMP_6.clone();
    pool(&mut buf, 1, 6);
    assert_eq!(&buf[..], &RAMP_6[..]);
}

#[test]
fn subsample_picks_points_without_averaging() {
    let mut dest = vec![0f32; 9];
    let written = subsample(&RAMP_6, &mut dest, 2, 6);

    assert_eq!(written, 9);
    assert_eq!(dest, vec![0., 2., 4., 12., 14., 16., 24., 26., 28.]);
}

#[test]
fn subsample_length_drops_remainder() {
    for &(w, stride) in &[(7, 2), (10, 3), (5, 5), (4, 1)] {
        let src = random_vec(w * w);
        let mut dest = vec![0f32; w * w];
        let side = (w - w % stride) / stride;
        assert_eq!(subsample(&src, &mut dest, stride, w), side * side);
        for r in 0..side {
            for c in 0..side {
                assert_eq!(dest[r * side + c], src[r * stride * w + c * stride]);
            }
        }
    }
}

#[test]
fn subsample_reads_pooled_buffer_with_its_own_stride() {
    // Pool window 2, stride 3: only some of the pooled blocks are sampled
    let mut buf = RAMP_6.clone();
    pool(&mut buf, 2, 6);
    let mut dest = vec![0f32; 4];
    subsample(&buf, &mut dest, 3, 6);
    assert_eq!(dest, vec![3.5, 5.5, 15.5, 17.5]);
}

#[test]
fn accumulate_single_map_equals_that_map() {
    let map = random_vec(16);
    let mut accum = vec![99f32; 16];
    accumulate(&mut accum, &map, true);
    assert_eq!(accum, map);
}

#[test]
fn accumulate_two_maps_equals_their_sum() {
    let a = vec![1f32, 2., 3., 4.];
    let b = vec![10f32, 20., 30., 40.];
    let mut accum = vec![0f32; 4];
    accumulate(&mut accum, &a, true);
    accumulate(&mut accum, &b, false);
    assert_eq!(accum, vec![11., 22., 33., 44.]);
}

#[test]
fn sum_into_adds_all_parts() {
    let mut accum = vec![1i32, 1, 1];
    let p0 = [1, 2, 3];
    let p1 = [10, 20, 30];
    sum_into(&mut accum, &[&p0[..], &p1[..]]);
    assert_eq!(accum, vec![12, 23, 34]);

    sum_into::<i32>(&mut accum, &[]);
    assert_eq!(accum, vec![12, 23, 34]);
}
