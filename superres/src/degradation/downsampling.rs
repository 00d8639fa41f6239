//! Integer box-average decimation.

use rayon::prelude::*;

use super::DegradationOperator;
use crate::image::{ImageData, ImageSize};

/// Averages each `scale × scale` block into one pixel.
///
/// The adjoint spreads every low-resolution value over its block divided by
/// `scale²`. Scale 1 is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Downsampling {
    scale: usize,
}

impl Downsampling {
    pub fn new(scale: usize) -> Self {
        assert!(scale > 0, "Downsampling scale must be positive");
        Self { scale }
    }

    #[inline]
    pub fn scale(&self) -> usize {
        self.scale
    }
}

impl DegradationOperator for Downsampling {
    fn apply(&self, image: &mut ImageData, _index: usize) {
        if self.scale == 1 {
            return;
        }
        let hr_size = image.size();
        let lr_size = hr_size.downscaled(self.scale);
        let planes = image
            .channels()
            .map(|plane| box_average(plane, hr_size, lr_size, self.scale))
            .collect();
        image.replace_planes(lr_size, planes);
    }

    fn apply_transpose(&self, image: &mut ImageData, _index: usize) {
        if self.scale == 1 {
            return;
        }
        let lr_size = image.size();
        let hr_size = lr_size.upscaled(self.scale);
        let planes = image
            .channels()
            .map(|plane| spread(plane, lr_size, hr_size, self.scale))
            .collect();
        image.replace_planes(hr_size, planes);
    }
}

fn box_average(src: &[f64], hr_size: ImageSize, lr_size: ImageSize, scale: usize) -> Vec<f64> {
    let norm = 1.0 / (scale * scale) as f64;
    let mut dst = vec![0.0; lr_size.pixel_count()];

    dst.par_chunks_mut(lr_size.width)
        .enumerate()
        .for_each(|(ly, row)| {
            for sy in ly * scale..(ly + 1) * scale {
                let src_row = &src[sy * hr_size.width..(sy + 1) * hr_size.width];
                for (out, block) in row.iter_mut().zip(src_row.chunks_exact(scale)) {
                    *out += block.iter().sum::<f64>();
                }
            }
            row.iter_mut().for_each(|v| *v *= norm);
        });
    dst
}

fn spread(src: &[f64], lr_size: ImageSize, hr_size: ImageSize, scale: usize) -> Vec<f64> {
    let norm = 1.0 / (scale * scale) as f64;
    let mut dst = vec![0.0; hr_size.pixel_count()];

    dst.par_chunks_mut(hr_size.width)
        .enumerate()
        .for_each(|(y, row)| {
            let ly = y / scale;
            let src_row = &src[ly * lr_size.width..(ly + 1) * lr_size.width];
            for (block, &v) in row.chunks_exact_mut(scale).zip(src_row) {
                block.fill(v * norm);
            }
        });
    dst
}
