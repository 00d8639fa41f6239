//! Solver configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::minimizer::ConvergenceConfig;

/// Configuration shared by [`MapSolver`](crate::MapSolver) and
/// [`IrlsMapSolver`](crate::IrlsMapSolver).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Minimizer stopping criteria.
    pub convergence: ConvergenceConfig,
    /// Replace the analytic gradient with central finite differences of the
    /// same cost. Costs two objective evaluations per pixel, so only useful
    /// for verifying the analytic path on small images.
    pub use_numerical_differentiation: bool,
}

impl SolverConfig {
    /// Parses a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.convergence.validate();
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yml::to_string(self)?)
    }

    pub fn with_convergence(mut self, convergence: ConvergenceConfig) -> Self {
        convergence.validate();
        self.convergence = convergence;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.convergence.max_iterations = max_iterations;
        self
    }

    pub fn with_numerical_differentiation(mut self, enabled: bool) -> Self {
        self.use_numerical_differentiation = enabled;
        self
    }
}
