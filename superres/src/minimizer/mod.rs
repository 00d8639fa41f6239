//! Unconstrained gradient-based minimization.
//!
//! A [`Minimizer`] drives a [`CostFunction`] from an initial point until one
//! of the [`ConvergenceConfig`] criteria holds. The cost function is called
//! back synchronously; after every accepted step it is notified through
//! [`CostFunction::iteration_complete`] and may change its objective (IRLS
//! reweighting does), so the minimizer re-evaluates cost and gradient at the
//! accepted point before continuing.

mod conjugate_gradient;
mod numerical_gradient;


use serde::{Deserialize, Serialize};
use strum_macros::Display;

pub use conjugate_gradient::ConjugateGradient;
pub use numerical_gradient::NumericalGradient;

use crate::error::Result;

/// Objective evaluated by a [`Minimizer`].
pub trait CostFunction {
    /// Returns the cost at `point` and writes the full gradient into `gradient`.
    fn cost_and_gradient(&self, point: &[f64], gradient: &mut [f64]) -> f64;

    /// Cost alone. Implementors with a cheaper cost-only path should override.
    fn cost(&self, point: &[f64]) -> f64 {
        let mut gradient = vec![0.0; point.len()];
        self.cost_and_gradient(point, &mut gradient)
    }

    /// Called once after each accepted step with the new point and its cost.
    fn iteration_complete(&mut self, _point: &[f64], _cost: f64) {}
}

pub trait Minimizer {
    /// Minimizes `problem` starting at `initial`. The point buffer is owned by
    /// the minimizer while it runs and is returned in the outcome.
    fn minimize(
        &self,
        initial: Vec<f64>,
        problem: &mut dyn CostFunction,
        config: &ConvergenceConfig,
    ) -> Result<MinimizerOutcome>;
}

/// Stopping criteria. A threshold of zero disables that criterion.
///
/// If every criterion is disabled the step-size criterion falls back to
/// [`ConvergenceConfig::FALLBACK_STEP_SIZE`] so the run always terminates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Stop when `‖∇f‖ ≤ threshold`.
    pub gradient_norm_threshold: f64,
    /// Stop when `|f_k - f_{k+1}| ≤ threshold · max(|f_k|, |f_{k+1}|, 1)`.
    pub cost_change_threshold: f64,
    /// Stop when the accepted step `‖x_{k+1} - x_k‖ ≤ threshold`.
    pub step_size_threshold: f64,
    /// Maximum number of accepted steps.
    pub max_iterations: usize,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            gradient_norm_threshold: 1e-10,
            cost_change_threshold: 0.0,
            step_size_threshold: 0.0,
            max_iterations: 50,
        }
    }
}

impl ConvergenceConfig {
    pub const FALLBACK_STEP_SIZE: f64 = 1e-6;

    pub fn with_gradient_norm_threshold(mut self, threshold: f64) -> Self {
        assert!(
            threshold >= 0.0,
            "gradient_norm_threshold must be non-negative"
        );
        self.gradient_norm_threshold = threshold;
        self
    }

    pub fn with_cost_change_threshold(mut self, threshold: f64) -> Self {
        assert!(threshold >= 0.0, "cost_change_threshold must be non-negative");
        self.cost_change_threshold = threshold;
        self
    }

    pub fn with_step_size_threshold(mut self, threshold: f64) -> Self {
        assert!(threshold >= 0.0, "step_size_threshold must be non-negative");
        self.step_size_threshold = threshold;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Step-size threshold actually applied.
    pub fn effective_step_size_threshold(&self) -> f64 {
        let all_disabled = self.gradient_norm_threshold == 0.0
            && self.cost_change_threshold == 0.0
            && self.step_size_threshold == 0.0
            && self.max_iterations == 0;
        if all_disabled {
            Self::FALLBACK_STEP_SIZE
        } else {
            self.step_size_threshold
        }
    }

    pub(crate) fn validate(&self) {
        assert!(
            self.gradient_norm_threshold >= 0.0
                && self.cost_change_threshold >= 0.0
                && self.step_size_threshold >= 0.0,
            "Convergence thresholds must be non-negative: {:?}",
            self
        );
    }
}

/// Why a minimization run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TerminationReason {
    GradientNorm,
    CostChange,
    StepSize,
    MaxIterations,
    /// No step along the search direction decreased the cost. The best point
    /// found so far is returned.
    LineSearchStalled,
}

impl TerminationReason {
    /// Whether a convergence criterion (not a budget or a stall) ended the run.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            TerminationReason::GradientNorm
                | TerminationReason::CostChange
                | TerminationReason::StepSize
        )
    }
}

#[derive(Debug, Clone)]
pub struct MinimizerOutcome {
    pub point: Vec<f64>,
    pub cost: f64,
    pub gradient_norm: f64,
    /// Accepted steps.
    pub iterations: usize,
    pub cost_evaluations: usize,
    pub termination: TerminationReason,
}

#[inline]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
pub(crate) fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}
