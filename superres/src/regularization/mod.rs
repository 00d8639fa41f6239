//! Image priors expressed as per-pixel residuals.
//!
//! A [`Regularizer`] maps an estimate `x` to residuals `r(x)`, one per pixel.
//! The solver penalizes `Σ (λ √w_i r_i)²` and needs, for given multipliers
//! `m`, the vector `g_j = Σ_i m_i ∂r_i/∂x_j` (the transposed Jacobian applied
//! to `m`). Regularizers are stateless and may be shared between solves.

mod tikhonov;
mod total_variation;


use std::fmt::Debug;

pub use tikhonov::Tikhonov;
pub use total_variation::TotalVariation;

use crate::image::ImageSize;

pub trait Regularizer: Send + Sync + Debug {
    /// Per-pixel residuals of `estimate`, same length as the estimate.
    fn apply_to_image(&self, estimate: &[f64], size: ImageSize) -> Vec<f64>;

    /// `Jᵀ m` where `J` is the Jacobian of
    /// [`apply_to_image`](Self::apply_to_image) at `estimate`.
    fn derivatives(&self, estimate: &[f64], size: ImageSize, multipliers: &[f64]) -> Vec<f64>;
}
