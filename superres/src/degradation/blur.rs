//! Separable Gaussian point-spread function.

use rayon::prelude::*;

use super::DegradationOperator;
use crate::image::{ImageData, ImageSize};

/// Gaussian blur with zero boundary handling.
///
/// The kernel is symmetric and truncated identically at both ends, so the
/// resulting matrix is symmetric and the operator is its own adjoint.
#[derive(Debug, Clone)]
pub struct GaussianBlur {
    sigma: f64,
    kernel: Vec<f64>,
}

impl GaussianBlur {
    pub fn new(sigma: f64) -> Self {
        assert!(
            sigma.is_finite() && sigma > 0.0,
            "Blur sigma must be positive, got {}",
            sigma
        );
        let radius = (3.0 * sigma).ceil() as isize;
        let denom = 2.0 * sigma * sigma;
        let mut kernel: Vec<f64> = (-radius..=radius)
            .map(|k| (-((k * k) as f64) / denom).exp())
            .collect();
        let sum: f64 = kernel.iter().sum();
        kernel.iter_mut().for_each(|v| *v /= sum);

        Self { sigma, kernel }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn radius(&self) -> usize {
        self.kernel.len() / 2
    }

    pub fn kernel(&self) -> &[f64] {
        &self.kernel
    }

    fn blur_plane(&self, plane: &mut [f64], size: ImageSize) {
        let horizontal = convolve_rows(plane, size, &self.kernel);
        convolve_columns(&horizontal, plane, size, &self.kernel);
    }
}

impl DegradationOperator for GaussianBlur {
    fn apply(&self, image: &mut ImageData, _index: usize) {
        let size = image.size();
        for c in 0..image.num_channels() {
            self.blur_plane(image.channel_mut(c), size);
        }
    }

    fn apply_transpose(&self, image: &mut ImageData, index: usize) {
        self.apply(image, index);
    }
}

fn convolve_rows(src: &[f64], size: ImageSize, kernel: &[f64]) -> Vec<f64> {
    let width = size.width;
    let radius = (kernel.len() / 2) as isize;
    let mut dst = vec![0.0; src.len()];

    dst.par_chunks_mut(width)
        .zip(src.par_chunks(width))
        .for_each(|(out_row, in_row)| {
            for (x, out) in out_row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = x as isize + k as isize - radius;
                    if sx >= 0 && (sx as usize) < width {
                        acc += w * in_row[sx as usize];
                    }
                }
                *out = acc;
            }
        });
    dst
}

fn convolve_columns(src: &[f64], dst: &mut [f64], size: ImageSize, kernel: &[f64]) {
    let ImageSize { width, height } = size;
    let radius = (kernel.len() / 2) as isize;

    dst.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out_row)| {
            out_row.fill(0.0);
            for (k, &w) in kernel.iter().enumerate() {
                let sy = y as isize + k as isize - radius;
                if sy < 0 || sy as usize >= height {
                    continue;
                }
                let in_row = &src[sy as usize * width..(sy as usize + 1) * width];
                for (out, &v) in out_row.iter_mut().zip(in_row) {
                    *out += w * v;
                }
            }
        });
}
