//! Testing utilities for superres.

#![allow(dead_code)]

use finitediff::FiniteDiff;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::image::{ImageData, ImageSize};

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Uniform random values in `[-1, 1)` from a fixed seed.
pub fn random_vec(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// Single-channel image with uniform random pixels.
pub fn random_image(size: ImageSize, seed: u64) -> ImageData {
    ImageData::from_channel(size, random_vec(size.pixel_count(), seed))
}

/// Multi-channel image with uniform random pixels.
pub fn random_image_channels(size: ImageSize, channels: usize, seed: u64) -> ImageData {
    let planes = (0..channels)
        .map(|c| random_vec(size.pixel_count(), seed.wrapping_add(c as u64)))
        .collect();
    ImageData::from_channels(size, planes)
}

/// Sum of `a[i] * b[i]` over every channel.
pub fn inner_product(a: &ImageData, b: &ImageData) -> f64 {
    assert_eq!(a.size(), b.size());
    assert_eq!(a.num_channels(), b.num_channels());
    a.channels()
        .zip(b.channels())
        .flat_map(|(x, y)| x.iter().zip(y).map(|(p, q)| p * q))
        .sum()
}

/// Central finite-difference gradient of `f` at `point`.
pub fn numerical_gradient(point: &[f64], f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    point.to_vec().central_diff(&|x: &Vec<f64>| -> f64 { f(x) })
}

/// Asserts two vectors agree within `tolerance` relative to their scale.
pub fn assert_vec_close(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    let scale = expected.iter().fold(1.0f64, |m, v| m.max(v.abs()));
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tolerance * scale,
            "index {}: got {}, expected {} (tolerance {})",
            i,
            a,
            e,
            tolerance * scale
        );
    }
}
