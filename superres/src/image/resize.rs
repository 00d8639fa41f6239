//! Plane resampling kernels.

use rayon::prelude::*;

use super::{ImageSize, Interpolation};

pub(super) fn resample(
    src: &[f64],
    src_size: ImageSize,
    dst_size: ImageSize,
    interpolation: Interpolation,
) -> Vec<f64> {
    debug_assert_eq!(src.len(), src_size.pixel_count());

    let mut dst = vec![0.0; dst_size.pixel_count()];
    match interpolation {
        Interpolation::Nearest => resample_nearest(src, src_size, &mut dst, dst_size),
        Interpolation::Linear => resample_linear(src, src_size, &mut dst, dst_size),
    }
    dst
}

fn resample_nearest(src: &[f64], src_size: ImageSize, dst: &mut [f64], dst_size: ImageSize) {
    let src_x: Vec<usize> = (0..dst_size.width)
        .map(|x| (x * src_size.width / dst_size.width).min(src_size.width - 1))
        .collect();

    dst.par_chunks_mut(dst_size.width)
        .enumerate()
        .for_each(|(y, row)| {
            let sy = (y * src_size.height / dst_size.height).min(src_size.height - 1);
            let src_row = &src[sy * src_size.width..(sy + 1) * src_size.width];
            for (out, &sx) in row.iter_mut().zip(&src_x) {
                *out = src_row[sx];
            }
        });
}

/// Source sample position for destination coordinate `d` with pixel centers
/// aligned, split into the lower neighbour and the fractional weight.
#[inline]
fn linear_tap(d: usize, src_len: usize, dst_len: usize) -> (usize, usize, f64) {
    let ratio = src_len as f64 / dst_len as f64;
    let s = ((d as f64 + 0.5) * ratio - 0.5).clamp(0.0, (src_len - 1) as f64);
    let s0 = s.floor() as usize;
    let s1 = (s0 + 1).min(src_len - 1);
    (s0, s1, s - s0 as f64)
}

fn resample_linear(src: &[f64], src_size: ImageSize, dst: &mut [f64], dst_size: ImageSize) {
    let x_taps: Vec<(usize, usize, f64)> = (0..dst_size.width)
        .map(|x| linear_tap(x, src_size.width, dst_size.width))
        .collect();
    let width = src_size.width;

    dst.par_chunks_mut(dst_size.width)
        .enumerate()
        .for_each(|(y, row)| {
            let (y0, y1, fy) = linear_tap(y, src_size.height, dst_size.height);
            let top = &src[y0 * width..(y0 + 1) * width];
            let bottom = &src[y1 * width..(y1 + 1) * width];
            for (out, &(x0, x1, fx)) in row.iter_mut().zip(&x_taps) {
                let t = top[x0] + (top[x1] - top[x0]) * fx;
                let b = bottom[x0] + (bottom[x1] - bottom[x0]) * fx;
                *out = t + (b - t) * fy;
            }
        });
}
