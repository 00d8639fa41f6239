use rayon::prelude::*;

use super::Regularizer;
use crate::image::ImageSize;

/// Isotropic total variation.
///
/// `r_i = sqrt(dx_i² + dy_i²)` with forward differences `dx_i = x_{i+1} - x_i`
/// and `dy_i = x_{i+w} - x_i`, both zero on the last column/row.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalVariation;

impl TotalVariation {
    pub fn new() -> Self {
        Self
    }
}

#[inline]
fn forward_differences(estimate: &[f64], size: ImageSize, i: usize) -> (f64, f64) {
    let ImageSize { width, height } = size;
    let (x, y) = (i % width, i / width);
    let dx = if x + 1 < width {
        estimate[i + 1] - estimate[i]
    } else {
        0.0
    };
    let dy = if y + 1 < height {
        estimate[i + width] - estimate[i]
    } else {
        0.0
    };
    (dx, dy)
}

impl Regularizer for TotalVariation {
    fn apply_to_image(&self, estimate: &[f64], size: ImageSize) -> Vec<f64> {
        assert_eq!(estimate.len(), size.pixel_count(), "Estimate size mismatch");
        (0..estimate.len())
            .into_par_iter()
            .map(|i| {
                let (dx, dy) = forward_differences(estimate, size, i);
                (dx * dx + dy * dy).sqrt()
            })
            .collect()
    }

    fn derivatives(&self, estimate: &[f64], size: ImageSize, multipliers: &[f64]) -> Vec<f64> {
        assert_eq!(estimate.len(), size.pixel_count(), "Estimate size mismatch");
        assert_eq!(
            multipliers.len(),
            estimate.len(),
            "Multiplier count mismatch"
        );
        let width = size.width;

        // Scaled unit gradient m_i * (dx_i, dy_i) / r_i, zero where r_i = 0.
        let (ux, uy): (Vec<f64>, Vec<f64>) = (0..estimate.len())
            .into_par_iter()
            .map(|i| {
                let (dx, dy) = forward_differences(estimate, size, i);
                let r = (dx * dx + dy * dy).sqrt();
                if r > 0.0 {
                    let s = multipliers[i] / r;
                    (s * dx, s * dy)
                } else {
                    (0.0, 0.0)
                }
            })
            .unzip();

        // r_i depends on x_i (negatively through both differences), on
        // x_{i+1} through dx_i and on x_{i+w} through dy_i.
        (0..estimate.len())
            .into_par_iter()
            .map(|j| {
                let (x, y) = (j % width, j / width);
                let mut g = -(ux[j] + uy[j]);
                if x > 0 {
                    g += ux[j - 1];
                }
                if y > 0 {
                    g += uy[j - width];
                }
                g
            })
            .collect()
    }
}
