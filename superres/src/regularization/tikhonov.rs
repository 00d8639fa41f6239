use rayon::prelude::*;

use super::Regularizer;
use crate::image::ImageSize;

/// Laplacian (smoothness) prior: `r_i = Σ_{n ∈ N4(i)} (x_i - x_n)` over
/// in-bounds 4-neighbours.
///
/// The graph Laplacian is symmetric and linear, so the derivative operator is
/// the same Laplacian applied to the multipliers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tikhonov;

impl Tikhonov {
    pub fn new() -> Self {
        Self
    }
}

fn laplacian(values: &[f64], size: ImageSize) -> Vec<f64> {
    let ImageSize { width, height } = size;
    (0..values.len())
        .into_par_iter()
        .map(|i| {
            let (x, y) = (i % width, i / width);
            let center = values[i];
            let mut r = 0.0;
            if x > 0 {
                r += center - values[i - 1];
            }
            if x + 1 < width {
                r += center - values[i + 1];
            }
            if y > 0 {
                r += center - values[i - width];
            }
            if y + 1 < height {
                r += center - values[i + width];
            }
            r
        })
        .collect()
}

impl Regularizer for Tikhonov {
    fn apply_to_image(&self, estimate: &[f64], size: ImageSize) -> Vec<f64> {
        assert_eq!(estimate.len(), size.pixel_count(), "Estimate size mismatch");
        laplacian(estimate, size)
    }

    fn derivatives(&self, estimate: &[f64], size: ImageSize, multipliers: &[f64]) -> Vec<f64> {
        assert_eq!(estimate.len(), size.pixel_count(), "Estimate size mismatch");
        assert_eq!(
            multipliers.len(),
            estimate.len(),
            "Multiplier count mismatch"
        );
        laplacian(multipliers, size)
    }
}
