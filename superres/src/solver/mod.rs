//! MAP reconstruction from multiple degraded observations.
//!
//! [`MapProblem`] holds everything that defines the estimation problem: the
//! observations, the forward [`DegradationModel`] and the registered
//! regularizers. Two solvers consume it:
//!
//! - [`MapSolver`] minimizes `Σ_k ‖A_k x - y_k‖² + Σ_r Σ_i (λ_r r_i(x))²`
//!   through the generic [`ObjectiveFunction`](crate::ObjectiveFunction).
//! - [`IrlsMapSolver`] adds per-pixel weights `w_i` to the regularization
//!   and updates them after every minimizer step, turning the quadratic
//!   penalty into a robust one (L1, Huber) over the course of the solve.
//!
//! Channels are reconstructed independently.

mod irls;
mod map;


use tracing::info;

pub use irls::{HuberWeights, IrlsMapSolver, IrlsReweighting, L1Weights, UniformWeights};
pub use map::MapSolver;

use crate::config::SolverConfig;
use crate::degradation::DegradationModel;
use crate::error::Result;
use crate::image::{ImageData, ImageSize};
use crate::minimizer::{
    CostFunction, Minimizer, MinimizerOutcome, NumericalGradient, TerminationReason,
};
use crate::objective::data_fidelity;
use crate::regularization::Regularizer;

/// Minimizer summary for one reconstructed channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReport {
    pub channel: usize,
    pub iterations: usize,
    pub cost_evaluations: usize,
    pub cost: f64,
    pub gradient_norm: f64,
    pub termination: TerminationReason,
}

/// Result of a solve: the high-resolution image and one report per channel.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub image: ImageData,
    pub reports: Vec<ChannelReport>,
}

impl Reconstruction {
    /// Total accepted minimizer steps over all channels.
    pub fn total_iterations(&self) -> usize {
        self.reports.iter().map(|r| r.iterations).sum()
    }
}

/// Runs `minimizer` on one channel, swapping in finite differences if the
/// config asks for them. Returns the report and the final plane.
pub(crate) fn minimize_channel(
    minimizer: &dyn Minimizer,
    initial: Vec<f64>,
    problem: &mut dyn CostFunction,
    config: &SolverConfig,
    channel: usize,
) -> Result<(ChannelReport, Vec<f64>)> {
    let outcome: MinimizerOutcome = if config.use_numerical_differentiation {
        minimizer.minimize(
            initial,
            &mut NumericalGradient::new(problem),
            &config.convergence,
        )?
    } else {
        minimizer.minimize(initial, problem, &config.convergence)?
    };

    info!(
        channel,
        iterations = outcome.iterations,
        cost = outcome.cost,
        gradient_norm = outcome.gradient_norm,
        termination = %outcome.termination,
        "Channel solved"
    );

    let report = ChannelReport {
        channel,
        iterations: outcome.iterations,
        cost_evaluations: outcome.cost_evaluations,
        cost: outcome.cost,
        gradient_norm: outcome.gradient_norm,
        termination: outcome.termination,
    };
    Ok((report, outcome.point))
}

/// Observations, degradation model and regularizers of one reconstruction.
#[derive(Debug)]
pub struct MapProblem {
    model: DegradationModel,
    observations: Vec<ImageData>,
    size: ImageSize,
    regularizers: Vec<(Box<dyn Regularizer>, f64)>,
}

impl MapProblem {
    /// Validates the observations against the model. All observations must
    /// share one size and channel count, and per-frame operators must have
    /// exactly one entry per observation.
    pub fn new(model: DegradationModel, observations: Vec<ImageData>) -> Self {
        assert!(!observations.is_empty(), "At least one observation is required");

        let lr_size = observations[0].size();
        let channels = observations[0].num_channels();
        for (i, observation) in observations.iter().enumerate() {
            assert_eq!(
                observation.size(),
                lr_size,
                "Observation {} has size {:?}, expected {:?}",
                i,
                observation.size(),
                lr_size
            );
            assert_eq!(
                observation.num_channels(),
                channels,
                "Observation {} has {} channels, expected {}",
                i,
                observation.num_channels(),
                channels
            );
        }
        if let Some(count) = model.observation_count() {
            assert_eq!(
                count,
                observations.len(),
                "Degradation model is parameterized for {} observations, got {}",
                count,
                observations.len()
            );
        }

        let size = lr_size.upscaled(model.downsampling_scale());
        Self {
            model,
            observations,
            size,
            regularizers: Vec::new(),
        }
    }

    /// Registers a regularizer with weight `lambda`.
    pub fn add_regularizer(&mut self, regularizer: impl Regularizer + 'static, lambda: f64) {
        assert!(
            lambda.is_finite() && lambda >= 0.0,
            "Regularization weight must be non-negative, got {}",
            lambda
        );
        self.regularizers.push((Box::new(regularizer), lambda));
    }

    pub fn with_regularizer(
        mut self,
        regularizer: impl Regularizer + 'static,
        lambda: f64,
    ) -> Self {
        self.add_regularizer(regularizer, lambda);
        self
    }

    pub fn model(&self) -> &DegradationModel {
        &self.model
    }

    pub fn observations(&self) -> &[ImageData] {
        &self.observations
    }

    pub fn num_observations(&self) -> usize {
        self.observations.len()
    }

    pub fn num_channels(&self) -> usize {
        self.observations[0].num_channels()
    }

    /// High-resolution size of the estimate.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn num_pixels(&self) -> usize {
        self.size.pixel_count()
    }

    pub fn regularizers(&self) -> &[(Box<dyn Regularizer>, f64)] {
        &self.regularizers
    }

    /// Data-fidelity cost and gradient of observation `index` for `channel`.
    pub fn data_term(&self, index: usize, channel: usize, estimate: &[f64]) -> (f64, Vec<f64>) {
        assert!(
            index < self.observations.len(),
            "Observation index {} out of range for {} observations",
            index,
            self.observations.len()
        );
        assert!(
            channel < self.num_channels(),
            "Channel {} out of range for {} channels",
            channel,
            self.num_channels()
        );
        data_fidelity(
            &self.model,
            &self.observations[index],
            index,
            channel,
            estimate,
            self.size,
        )
    }

    /// Asserts that `initial` can seed a solve of this problem.
    pub(crate) fn check_initial_estimate(&self, initial: &ImageData) {
        assert_eq!(
            initial.size(),
            self.size,
            "Initial estimate size {:?} does not match high-resolution size {:?}",
            initial.size(),
            self.size
        );
        assert_eq!(
            initial.num_channels(),
            self.num_channels(),
            "Initial estimate has {} channels, observations have {}",
            initial.num_channels(),
            self.num_channels()
        );
    }
}
