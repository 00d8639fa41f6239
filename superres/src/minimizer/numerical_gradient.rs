use finitediff::FiniteDiff;

use super::CostFunction;

/// Replaces the gradient of the wrapped cost function with central finite
/// differences of its cost. Iteration notifications pass through unchanged.
pub struct NumericalGradient<'a> {
    inner: &'a mut dyn CostFunction,
}

impl<'a> NumericalGradient<'a> {
    pub fn new(inner: &'a mut dyn CostFunction) -> Self {
        Self { inner }
    }
}

impl CostFunction for NumericalGradient<'_> {
    fn cost_and_gradient(&self, point: &[f64], gradient: &mut [f64]) -> f64 {
        let inner = &*self.inner;
        let numeric = point
            .to_vec()
            .central_diff(&|x: &Vec<f64>| -> f64 { inner.cost(x) });
        gradient.copy_from_slice(&numeric);
        inner.cost(point)
    }

    fn cost(&self, point: &[f64]) -> f64 {
        self.inner.cost(point)
    }

    fn iteration_complete(&mut self, point: &[f64], cost: f64) {
        self.inner.iteration_complete(point, cost);
    }
}
