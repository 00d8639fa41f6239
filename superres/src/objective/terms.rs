//! Data-fidelity and regularization cost terms.
//!
//! The free functions here are shared with the IRLS solver, which evaluates
//! the same math with its own per-pixel weights.

use super::ObjectiveTerm;
use crate::degradation::DegradationModel;
use crate::image::{ImageData, ImageSize};
use crate::regularization::Regularizer;

/// Residual `A_k x - y_k` on the observation grid for one channel.
pub(crate) fn data_residual(
    model: &DegradationModel,
    observation: &ImageData,
    index: usize,
    channel: usize,
    estimate: &[f64],
    size: ImageSize,
) -> Vec<f64> {
    assert_eq!(
        estimate.len(),
        size.pixel_count(),
        "Estimate length does not match {}x{}",
        size.width,
        size.height
    );
    let mut degraded = ImageData::from_slice(size, estimate);
    model.apply(&mut degraded, index);
    assert_eq!(
        degraded.size(),
        observation.size(),
        "Degraded estimate size {:?} does not match observation {} size {:?}",
        degraded.size(),
        index,
        observation.size()
    );

    degraded
        .channel(0)
        .iter()
        .zip(observation.channel(channel))
        .map(|(d, o)| d - o)
        .collect()
}

/// Cost `‖A_k x - y_k‖²` and its gradient `2 A_kᵀ (A_k x - y_k)`.
pub(crate) fn data_fidelity(
    model: &DegradationModel,
    observation: &ImageData,
    index: usize,
    channel: usize,
    estimate: &[f64],
    size: ImageSize,
) -> (f64, Vec<f64>) {
    let residual = data_residual(model, observation, index, channel, estimate, size);
    let cost = residual.iter().map(|r| r * r).sum();

    let mut back = ImageData::from_channel(observation.size(), residual);
    model.apply_transpose(&mut back, index);
    debug_assert_eq!(back.size(), size);

    let mut gradient = back.into_channel(0);
    gradient.iter_mut().for_each(|g| *g *= 2.0);
    (cost, gradient)
}

/// `λ √w_i r_i` for every pixel. Missing weights count as 1.
pub(crate) fn weighted_residuals(
    regularizer: &dyn Regularizer,
    lambda: f64,
    weights: Option<&[f64]>,
    estimate: &[f64],
    size: ImageSize,
) -> Vec<f64> {
    let mut residuals = regularizer.apply_to_image(estimate, size);
    assert_eq!(
        residuals.len(),
        estimate.len(),
        "Regularizer returned {} residuals for {} pixels",
        residuals.len(),
        estimate.len()
    );
    match weights {
        Some(weights) => {
            assert_eq!(weights.len(), residuals.len(), "Weight count mismatch");
            for (r, w) in residuals.iter_mut().zip(weights) {
                *r *= lambda * w.sqrt();
            }
        }
        None => residuals.iter_mut().for_each(|r| *r *= lambda),
    }
    residuals
}

/// Cost `Σ (λ √w_i r_i)²` and its exact gradient `Jᵀ m` with
/// `m_i = 2 λ √w_i (λ √w_i r_i)`.
pub(crate) fn weighted_regularization(
    regularizer: &dyn Regularizer,
    lambda: f64,
    weights: Option<&[f64]>,
    estimate: &[f64],
    size: ImageSize,
) -> (f64, Vec<f64>) {
    let weighted = weighted_residuals(regularizer, lambda, weights, estimate, size);
    let cost = weighted.iter().map(|r| r * r).sum();

    let multipliers: Vec<f64> = match weights {
        Some(weights) => weighted
            .iter()
            .zip(weights)
            .map(|(r, w)| 2.0 * lambda * w.sqrt() * r)
            .collect(),
        None => weighted.iter().map(|r| 2.0 * lambda * r).collect(),
    };
    let gradient = regularizer.derivatives(estimate, size, &multipliers);
    (cost, gradient)
}

/// Squared error between observation `index` (one channel) and the degraded
/// estimate.
#[derive(Debug)]
pub struct DataFidelityTerm<'a> {
    model: &'a DegradationModel,
    observation: &'a ImageData,
    index: usize,
    channel: usize,
    size: ImageSize,
}

impl<'a> DataFidelityTerm<'a> {
    /// `size` is the high-resolution size of the estimate.
    pub fn new(
        model: &'a DegradationModel,
        observation: &'a ImageData,
        index: usize,
        channel: usize,
        size: ImageSize,
    ) -> Self {
        assert!(
            channel < observation.num_channels(),
            "Channel {} out of range for observation with {} channels",
            channel,
            observation.num_channels()
        );
        Self {
            model,
            observation,
            index,
            channel,
            size,
        }
    }
}

impl ObjectiveTerm for DataFidelityTerm<'_> {
    fn compute(&self, estimate: &[f64], gradient: Option<&mut [f64]>) -> f64 {
        match gradient {
            Some(gradient) => {
                let (cost, term_gradient) = data_fidelity(
                    self.model,
                    self.observation,
                    self.index,
                    self.channel,
                    estimate,
                    self.size,
                );
                for (g, t) in gradient.iter_mut().zip(&term_gradient) {
                    *g += t;
                }
                cost
            }
            None => data_residual(
                self.model,
                self.observation,
                self.index,
                self.channel,
                estimate,
                self.size,
            )
            .iter()
            .map(|r| r * r)
            .sum(),
        }
    }
}

/// Unweighted `Σ (λ r_i)²` for one regularizer.
#[derive(Debug)]
pub struct RegularizationTerm<'a> {
    regularizer: &'a dyn Regularizer,
    lambda: f64,
    size: ImageSize,
}

impl<'a> RegularizationTerm<'a> {
    pub fn new(regularizer: &'a dyn Regularizer, lambda: f64, size: ImageSize) -> Self {
        assert!(lambda >= 0.0, "Regularization weight must be non-negative");
        Self {
            regularizer,
            lambda,
            size,
        }
    }
}

impl ObjectiveTerm for RegularizationTerm<'_> {
    fn compute(&self, estimate: &[f64], gradient: Option<&mut [f64]>) -> f64 {
        match gradient {
            Some(gradient) => {
                let (cost, term_gradient) = weighted_regularization(
                    self.regularizer,
                    self.lambda,
                    None,
                    estimate,
                    self.size,
                );
                for (g, t) in gradient.iter_mut().zip(&term_gradient) {
                    *g += t;
                }
                cost
            }
            None => weighted_residuals(self.regularizer, self.lambda, None, estimate, self.size)
                .iter()
                .map(|r| r * r)
                .sum(),
        }
    }
}
