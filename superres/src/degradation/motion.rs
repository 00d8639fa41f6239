//! Per-observation sub-pixel translation.

use glam::DVec2;
use rayon::prelude::*;

use super::DegradationOperator;
use crate::image::{ImageData, ImageSize};

/// Integer offset plus weight of one bilinear sample.
type Tap = (isize, isize, f64);

/// Translates observation `k` so that output pixel `(x, y)` samples the scene
/// at `(x + dx_k, y + dy_k)` with bilinear interpolation and zeros outside.
#[derive(Debug, Clone)]
pub struct MotionShift {
    shifts: Vec<DVec2>,
}

impl MotionShift {
    pub fn new(shifts: Vec<DVec2>) -> Self {
        assert!(!shifts.is_empty(), "MotionShift needs at least one shift");
        for (i, shift) in shifts.iter().enumerate() {
            assert!(
                shift.is_finite(),
                "Shift {} is not finite: {:?}",
                i,
                shift
            );
        }
        Self { shifts }
    }

    pub fn shifts(&self) -> &[DVec2] {
        &self.shifts
    }

    fn taps(&self, index: usize) -> [Tap; 4] {
        assert!(
            index < self.shifts.len(),
            "Observation index {} out of range for {} shifts",
            index,
            self.shifts.len()
        );
        let shift = self.shifts[index];
        let origin = shift.floor();
        let frac = shift - origin;
        let (ox, oy) = (origin.x as isize, origin.y as isize);

        [
            (ox, oy, (1.0 - frac.x) * (1.0 - frac.y)),
            (ox + 1, oy, frac.x * (1.0 - frac.y)),
            (ox, oy + 1, (1.0 - frac.x) * frac.y),
            (ox + 1, oy + 1, frac.x * frac.y),
        ]
    }
}

impl DegradationOperator for MotionShift {
    fn apply(&self, image: &mut ImageData, index: usize) {
        let taps = self.taps(index);
        let size = image.size();
        for c in 0..image.num_channels() {
            let shifted = gather(image.channel(c), size, &taps);
            image.channel_mut(c).copy_from_slice(&shifted);
        }
    }

    // The forward matrix has entry w at (p, p + t) for each tap t, so its
    // transpose is a gather with negated offsets and the same weights.
    fn apply_transpose(&self, image: &mut ImageData, index: usize) {
        let taps = self.taps(index).map(|(dx, dy, w)| (-dx, -dy, w));
        let size = image.size();
        for c in 0..image.num_channels() {
            let shifted = gather(image.channel(c), size, &taps);
            image.channel_mut(c).copy_from_slice(&shifted);
        }
    }

    fn observation_count(&self) -> Option<usize> {
        Some(self.shifts.len())
    }
}

fn gather(src: &[f64], size: ImageSize, taps: &[Tap]) -> Vec<f64> {
    let ImageSize { width, height } = size;
    let mut dst = vec![0.0; src.len()];

    dst.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for &(dx, dy, w) in taps {
                if w == 0.0 {
                    continue;
                }
                let sy = y as isize + dy;
                if sy < 0 || sy as usize >= height {
                    continue;
                }
                let src_row = &src[sy as usize * width..(sy as usize + 1) * width];
                for (x, out) in row.iter_mut().enumerate() {
                    let sx = x as isize + dx;
                    if sx >= 0 && (sx as usize) < width {
                        *out += w * src_row[sx as usize];
                    }
                }
            }
        });
    dst
}
