//! Planar multi-channel image buffer used throughout reconstruction.
//!
//! Pixels are stored as `f64`, one contiguous row-major plane per channel.
//! Pixel index `i` of a plane is `y * width + x`, which is the layout the
//! minimizer sees when a single channel is handed over as a flat vector.

mod resize;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Width and height of an image plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

impl ImageSize {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0, "Width must be positive");
        assert!(height > 0, "Height must be positive");
        Self { width, height }
    }

    /// Number of pixels in one plane.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Size after integer downsampling. Panics unless both sides divide evenly.
    pub fn downscaled(&self, scale: usize) -> Self {
        assert!(scale > 0, "Scale must be positive");
        assert!(
            self.width % scale == 0 && self.height % scale == 0,
            "Size {}x{} is not divisible by scale {}",
            self.width,
            self.height,
            scale
        );
        Self::new(self.width / scale, self.height / scale)
    }

    /// Size after integer upsampling.
    pub fn upscaled(&self, scale: usize) -> Self {
        assert!(scale > 0, "Scale must be positive");
        Self::new(self.width * scale, self.height * scale)
    }
}

/// Resampling mode for [`ImageData::resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Interpolation {
    /// Pixel replication: destination `x` reads source `floor(x * src / dst)`.
    #[default]
    Nearest,
    /// Half-pixel aligned bilinear interpolation with clamp-to-edge.
    Linear,
}

/// Multi-channel image with planar `f64` storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    size: ImageSize,
    channels: Vec<Vec<f64>>,
}

impl ImageData {
    /// Zero-filled image.
    pub fn new(size: ImageSize, num_channels: usize) -> Self {
        assert!(num_channels > 0, "Channels must be positive");
        Self {
            size,
            channels: vec![vec![0.0; size.pixel_count()]; num_channels],
        }
    }

    /// Single-channel image taking ownership of `pixels`.
    pub fn from_channel(size: ImageSize, pixels: Vec<f64>) -> Self {
        Self::from_channels(size, vec![pixels])
    }

    /// Single-channel image copied from a raw pixel slice.
    pub fn from_slice(size: ImageSize, pixels: &[f64]) -> Self {
        Self::from_channel(size, pixels.to_vec())
    }

    pub fn from_channels(size: ImageSize, channels: Vec<Vec<f64>>) -> Self {
        assert!(!channels.is_empty(), "Channels must be positive");
        for (c, plane) in channels.iter().enumerate() {
            assert_eq!(
                plane.len(),
                size.pixel_count(),
                "Channel {} has {} pixels, expected {}x{}",
                c,
                plane.len(),
                size.width,
                size.height
            );
        }
        Self { size, channels }
    }

    /// Single-channel image where every pixel equals `value`.
    pub fn filled(size: ImageSize, value: f64) -> Self {
        Self::from_channel(size, vec![value; size.pixel_count()])
    }

    #[inline]
    pub fn size(&self) -> ImageSize {
        self.size
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.size.height
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Pixels per channel.
    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.size.pixel_count()
    }

    #[inline]
    pub fn pixel(&self, channel: usize, index: usize) -> f64 {
        self.channels[channel][index]
    }

    #[inline]
    pub fn set_pixel(&mut self, channel: usize, index: usize, value: f64) {
        self.channels[channel][index] = value;
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &[f64] {
        &self.channels[channel]
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f64] {
        &mut self.channels[channel]
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f64]> {
        self.channels.iter().map(Vec::as_slice)
    }

    pub fn into_channels(self) -> Vec<Vec<f64>> {
        self.channels
    }

    /// Consumes the image and returns one plane.
    pub fn into_channel(mut self, channel: usize) -> Vec<f64> {
        self.channels.swap_remove(channel)
    }

    /// Copy of a single channel as its own image.
    pub fn extract_channel(&self, channel: usize) -> ImageData {
        Self::from_channel(self.size, self.channels[channel].clone())
    }

    /// Replaces every plane, possibly changing the size. Used by operators
    /// that map between resolutions.
    pub(crate) fn replace_planes(&mut self, size: ImageSize, channels: Vec<Vec<f64>>) {
        debug_assert_eq!(channels.len(), self.channels.len());
        debug_assert!(channels.iter().all(|p| p.len() == size.pixel_count()));
        self.size = size;
        self.channels = channels;
    }

    /// Resamples every channel to `new_size`. Resizing to the current size is
    /// the identity for both modes.
    pub fn resize(&mut self, new_size: ImageSize, interpolation: Interpolation) {
        if new_size == self.size {
            return;
        }
        let src_size = self.size;
        let channels = self
            .channels
            .iter()
            .map(|plane| resize::resample(plane, src_size, new_size, interpolation))
            .collect();
        self.size = new_size;
        self.channels = channels;
    }

    /// Mean squared error over all channels.
    pub fn mean_squared_error(&self, other: &ImageData) -> f64 {
        assert_eq!(self.size, other.size, "Image size mismatch");
        assert_eq!(
            self.num_channels(),
            other.num_channels(),
            "Channel count mismatch"
        );
        let sum: f64 = self
            .channels
            .iter()
            .zip(&other.channels)
            .flat_map(|(a, b)| a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)))
            .sum();
        sum / (self.num_pixels() * self.num_channels()) as f64
    }

    /// Peak signal-to-noise ratio in dB for signals with the given peak value.
    pub fn psnr(&self, other: &ImageData, peak: f64) -> f64 {
        let mse = self.mean_squared_error(other);
        if mse == 0.0 {
            return f64::INFINITY;
        }
        10.0 * (peak * peak / mse).log10()
    }
}
