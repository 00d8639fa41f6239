//! Generic objective assembled from independent cost terms.

mod terms;


use tracing::debug;

pub use terms::{DataFidelityTerm, RegularizationTerm};
pub(crate) use terms::{data_fidelity, data_residual, weighted_regularization, weighted_residuals};

use crate::minimizer::CostFunction;

/// One additive contribution to an objective.
pub trait ObjectiveTerm {
    /// Returns this term's cost at `estimate`. If `gradient` is given, the
    /// term's gradient is added to it (not overwritten).
    fn compute(&self, estimate: &[f64], gradient: Option<&mut [f64]>) -> f64;
}

/// Sum of independently registered [`ObjectiveTerm`]s.
///
/// The objective owns its terms. It also counts completed minimizer
/// iterations so callers can inspect progress after a run.
pub struct ObjectiveFunction<'a> {
    num_parameters: usize,
    terms: Vec<Box<dyn ObjectiveTerm + 'a>>,
    num_completed_iterations: usize,
}

impl<'a> ObjectiveFunction<'a> {
    pub fn new(num_parameters: usize) -> Self {
        Self {
            num_parameters,
            terms: Vec::new(),
            num_completed_iterations: 0,
        }
    }

    pub fn add_term(&mut self, term: impl ObjectiveTerm + 'a) {
        self.terms.push(Box::new(term));
    }

    pub fn num_parameters(&self) -> usize {
        self.num_parameters
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Total cost over all terms. With a gradient buffer, zeroes it and then
    /// accumulates every term's gradient.
    pub fn compute_all_terms(&self, estimate: &[f64], mut gradient: Option<&mut [f64]>) -> f64 {
        assert_eq!(
            estimate.len(),
            self.num_parameters,
            "Estimate length does not match parameter count"
        );
        if let Some(g) = gradient.as_deref_mut() {
            assert_eq!(
                g.len(),
                self.num_parameters,
                "Gradient length does not match parameter count"
            );
            g.fill(0.0);
        }

        self.terms
            .iter()
            .map(|term| term.compute(estimate, gradient.as_deref_mut()))
            .sum()
    }

    pub fn report_iteration_complete(&mut self, cost: f64) {
        self.num_completed_iterations += 1;
        debug!(
            iteration = self.num_completed_iterations,
            cost, "Objective iteration complete"
        );
    }

    pub fn num_completed_iterations(&self) -> usize {
        self.num_completed_iterations
    }
}

impl CostFunction for ObjectiveFunction<'_> {
    fn cost_and_gradient(&self, point: &[f64], gradient: &mut [f64]) -> f64 {
        self.compute_all_terms(point, Some(gradient))
    }

    fn cost(&self, point: &[f64]) -> f64 {
        self.compute_all_terms(point, None)
    }

    fn iteration_complete(&mut self, _point: &[f64], cost: f64) {
        self.report_iteration_complete(cost);
    }
}
