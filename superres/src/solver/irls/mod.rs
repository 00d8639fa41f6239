//! Iteratively reweighted least squares MAP solver.
//!
//! The solver minimizes
//!
//! ```text
//! E(x) = Σ_k ‖A_k x - y_k‖² + Σ_r Σ_i (λ_r √w_i r_{r,i}(x))²
//! ```
//!
//! for one channel at a time. The weights `w` start at 1 and are held fixed
//! while the minimizer evaluates cost and gradient. After every accepted step
//! they are recomputed from the new estimate by the configured
//! [`IrlsReweighting`], which is what turns the sequence of weighted quadratic
//! problems into a robust (for example L1 or Huber) penalty.

mod reweighting;

#[cfg(test)]
mod tests;

use tracing::{info, trace};

pub use reweighting::{HuberWeights, IrlsReweighting, L1Weights, UniformWeights};

use super::{minimize_channel, MapProblem, Reconstruction};
use crate::config::SolverConfig;
use crate::error::Result;
use crate::image::ImageData;
use crate::minimizer::{ConjugateGradient, CostFunction, Minimizer};
use crate::objective::{data_residual, weighted_regularization, weighted_residuals};
use crate::progress::{report_progress, ProgressCallback};

pub struct IrlsMapSolver {
    problem: MapProblem,
    config: SolverConfig,
    reweighting: Box<dyn IrlsReweighting>,
    irls_weights: Vec<f64>,
    progress: ProgressCallback,
}

impl IrlsMapSolver {
    /// Solver with [`UniformWeights`]. Use
    /// [`with_reweighting`](Self::with_reweighting) for a robust penalty.
    pub fn new(problem: MapProblem, config: SolverConfig) -> Self {
        let irls_weights = vec![1.0; problem.num_pixels()];
        Self {
            problem,
            config,
            reweighting: Box::new(UniformWeights),
            irls_weights,
            progress: None,
        }
    }

    pub fn with_reweighting(mut self, reweighting: impl IrlsReweighting + 'static) -> Self {
        self.reweighting = Box::new(reweighting);
        self
    }

    pub fn with_progress_callback(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn problem(&self) -> &MapProblem {
        &self.problem
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Current per-pixel weights, one per high-resolution pixel.
    pub fn irls_weights(&self) -> &[f64] {
        &self.irls_weights
    }

    /// Cost `‖A_k x - y_k‖²` of observation `index` in `channel` and its
    /// gradient `2 A_kᵀ (A_k x - y_k)`.
    pub fn compute_data_term(
        &self,
        index: usize,
        channel: usize,
        estimate: &[f64],
    ) -> (f64, Vec<f64>) {
        self.problem.data_term(index, channel, estimate)
    }

    /// Weighted regularization cost of `estimate` and its gradient, using
    /// the current IRLS weights. Does not modify the weights.
    pub fn compute_regularization(&self, estimate: &[f64]) -> (f64, Vec<f64>) {
        let mut cost = 0.0;
        let mut gradient = vec![0.0; estimate.len()];
        for (regularizer, lambda) in self.problem.regularizers() {
            let (term_cost, term_gradient) = weighted_regularization(
                regularizer.as_ref(),
                *lambda,
                Some(self.irls_weights.as_slice()),
                estimate,
                self.problem.size(),
            );
            cost += term_cost;
            for (g, t) in gradient.iter_mut().zip(&term_gradient) {
                *g += t;
            }
        }
        (cost, gradient)
    }

    fn total_cost(&self, channel: usize, estimate: &[f64]) -> f64 {
        let problem = &self.problem;
        let data: f64 = problem
            .observations()
            .iter()
            .enumerate()
            .map(|(index, observation)| {
                data_residual(
                    problem.model(),
                    observation,
                    index,
                    channel,
                    estimate,
                    problem.size(),
                )
                .iter()
                .map(|r| r * r)
                .sum::<f64>()
            })
            .sum();
        let regularization: f64 = problem
            .regularizers()
            .iter()
            .map(|(regularizer, lambda)| {
                weighted_residuals(
                    regularizer.as_ref(),
                    *lambda,
                    Some(self.irls_weights.as_slice()),
                    estimate,
                    problem.size(),
                )
                .iter()
                .map(|r| r * r)
                .sum::<f64>()
            })
            .sum();
        data + regularization
    }

    fn total_cost_and_gradient(
        &self,
        channel: usize,
        estimate: &[f64],
        gradient: &mut [f64],
    ) -> f64 {
        let (mut cost, regularization_gradient) = self.compute_regularization(estimate);
        gradient.copy_from_slice(&regularization_gradient);
        for index in 0..self.problem.num_observations() {
            let (data_cost, data_gradient) = self.compute_data_term(index, channel, estimate);
            cost += data_cost;
            for (g, d) in gradient.iter_mut().zip(&data_gradient) {
                *g += d;
            }
        }
        cost
    }

    /// Recomputes the IRLS weights from `estimate`.
    pub fn update_irls_weights(&mut self, estimate: &[f64]) {
        let size = self.problem.size();
        let mut magnitudes = vec![0.0; size.pixel_count()];
        for (regularizer, lambda) in self.problem.regularizers() {
            let scaled = weighted_residuals(regularizer.as_ref(), *lambda, None, estimate, size);
            for (m, r) in magnitudes.iter_mut().zip(&scaled) {
                *m += r * r;
            }
        }
        magnitudes.iter_mut().for_each(|m| *m = m.sqrt());

        self.reweighting.update_weights(&magnitudes, &mut self.irls_weights);

        assert_eq!(
            self.irls_weights.len(),
            size.pixel_count(),
            "IRLS weight count changed"
        );
        assert!(
            self.irls_weights.iter().all(|w| w.is_finite() && *w >= 0.0),
            "IRLS weights must be finite and non-negative"
        );

        if tracing::enabled!(tracing::Level::TRACE) {
            let (min, max, sum) = self.irls_weights.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY, 0.0),
                |(min, max, sum), &w| (min.min(w), max.max(w), sum + w),
            );
            trace!(
                min,
                max,
                mean = sum / self.irls_weights.len() as f64,
                "Updated IRLS weights"
            );
        }
    }

    fn reset_irls_weights(&mut self) {
        self.irls_weights.clear();
        self.irls_weights.resize(self.problem.num_pixels(), 1.0);
    }

    /// Reconstructs every channel with [`ConjugateGradient`].
    pub fn solve(&mut self, initial: &ImageData) -> Result<Reconstruction> {
        self.solve_with(&ConjugateGradient::default(), initial)
    }

    /// Reconstructs every channel with `minimizer`, starting from `initial`
    /// (high-resolution, same channel count as the observations). Weights are
    /// reset to 1 before each channel.
    pub fn solve_with(
        &mut self,
        minimizer: &dyn Minimizer,
        initial: &ImageData,
    ) -> Result<Reconstruction> {
        self.problem.check_initial_estimate(initial);
        let config = self.config;
        let channels = self.problem.num_channels();
        info!(
            width = self.problem.size().width,
            height = self.problem.size().height,
            observations = self.problem.num_observations(),
            regularizers = self.problem.regularizers().len(),
            channels,
            reweighting = ?self.reweighting,
            "Starting IRLS MAP solve"
        );

        let mut planes = Vec::with_capacity(channels);
        let mut reports = Vec::with_capacity(channels);
        for channel in 0..channels {
            self.reset_irls_weights();
            let mut problem = IrlsProblem {
                solver: self,
                channel,
                iterations: 0,
            };
            let (report, plane) = minimize_channel(
                minimizer,
                initial.channel(channel).to_vec(),
                &mut problem,
                &config,
                channel,
            )?;
            planes.push(plane);
            reports.push(report);
        }

        Ok(Reconstruction {
            image: ImageData::from_channels(self.problem.size(), planes),
            reports,
        })
    }
}

/// One channel's objective as seen by the minimizer. Cost and gradient use
/// the weights as they are; each accepted step triggers a reweighting.
struct IrlsProblem<'a> {
    solver: &'a mut IrlsMapSolver,
    channel: usize,
    iterations: usize,
}

impl CostFunction for IrlsProblem<'_> {
    fn cost_and_gradient(&self, point: &[f64], gradient: &mut [f64]) -> f64 {
        self.solver.total_cost_and_gradient(self.channel, point, gradient)
    }

    fn cost(&self, point: &[f64]) -> f64 {
        self.solver.total_cost(self.channel, point)
    }

    fn iteration_complete(&mut self, point: &[f64], cost: f64) {
        self.iterations += 1;
        self.solver.update_irls_weights(point);
        report_progress(&self.solver.progress, self.channel, self.iterations, cost);
    }
}
