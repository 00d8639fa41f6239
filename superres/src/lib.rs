//! Superres - multi-frame super-resolution by MAP estimation.
//!
//! Reconstructs one high-resolution image from several degraded
//! low-resolution observations by minimizing
//!
//! ```text
//! Σ_k ‖A_k x - y_k‖² + Σ_r Σ_i (λ_r √w_i r_{r,i}(x))²
//! ```
//!
//! where `A_k` is the forward [`DegradationModel`] of observation `k` and
//! `r_r` are the registered [`Regularizer`]s. The [`IrlsMapSolver`] updates
//! the per-pixel weights `w` after every minimizer step (iteratively
//! reweighted least squares), which turns quadratic penalties into robust
//! ones such as L1 total variation.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use superres::{
//!     DegradationModel, GaussianBlur, ImageData, Interpolation, IrlsMapSolver, L1Weights,
//!     MapProblem, MotionShift, SolverConfig, TotalVariation,
//! };
//!
//! let model = DegradationModel::new(2)
//!     .with_operator(MotionShift::new(shifts))
//!     .with_operator(GaussianBlur::new(1.0));
//!
//! let hr_size = observations[0].size().upscaled(model.downsampling_scale());
//! let mut initial = observations[0].clone();
//! initial.resize(hr_size, Interpolation::Linear);
//!
//! let problem =
//!     MapProblem::new(model, observations).with_regularizer(TotalVariation::new(), 0.02);
//!
//! let mut solver = IrlsMapSolver::new(problem, SolverConfig::default())
//!     .with_reweighting(L1Weights::default());
//! let result = solver.solve(&initial)?;
//! ```

mod config;
pub mod degradation;
mod error;
pub mod image;
pub mod minimizer;
pub mod objective;
mod progress;
pub mod regularization;
pub mod solver;

#[cfg(test)]
pub mod testing;

// ============================================================================
// Core types
// ============================================================================

pub use config::SolverConfig;
pub use error::{Error, Result};
pub use image::{ImageData, ImageSize, Interpolation};
pub use progress::{report_progress, ProgressCallback, SolveProgress};

// ============================================================================
// Forward model and priors
// ============================================================================

pub use degradation::{
    DegradationModel, DegradationOperator, Downsampling, GaussianBlur, MotionShift,
};
pub use regularization::{Regularizer, Tikhonov, TotalVariation};

// ============================================================================
// Optimization
// ============================================================================

pub use minimizer::{
    ConjugateGradient, ConvergenceConfig, CostFunction, Minimizer, MinimizerOutcome,
    NumericalGradient, TerminationReason,
};
pub use objective::{DataFidelityTerm, ObjectiveFunction, ObjectiveTerm, RegularizationTerm};

// ============================================================================
// Solvers
// ============================================================================

pub use solver::{
    ChannelReport, HuberWeights, IrlsMapSolver, IrlsReweighting, L1Weights, MapProblem,
    MapSolver, Reconstruction, UniformWeights,
};
