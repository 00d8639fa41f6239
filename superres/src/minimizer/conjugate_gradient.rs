//! Nonlinear conjugate gradient with Polak-Ribière+ updates.

use tracing::{debug, warn};

use super::{
    dot, norm, ConvergenceConfig, CostFunction, Minimizer, MinimizerOutcome, TerminationReason,
};
use crate::error::{Error, Result};

/// Polak-Ribière+ conjugate gradient.
///
/// Each line search looks for a step satisfying the Armijo condition
/// `f(x + αd) ≤ f(x) + c1·α·gᵀd` and the curvature condition
/// `g(x + αd)ᵀd ≥ c2·gᵀd`. Failed trials shrink the step by safeguarded
/// quadratic interpolation (bisection once bracketed); trials that are too
/// short grow it by secant extrapolation on the directional derivative.
#[derive(Debug, Clone, Copy)]
pub struct ConjugateGradient {
    pub sufficient_decrease: f64,
    pub curvature: f64,
    pub max_line_search_trials: usize,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self {
            sufficient_decrease: 1e-4,
            curvature: 0.1,
            max_line_search_trials: 40,
        }
    }
}

/// Accepted line search step.
struct Step {
    alpha: f64,
    point: Vec<f64>,
    cost: f64,
}

/// One evaluated trial point.
struct Trial {
    alpha: f64,
    point: Vec<f64>,
    cost: f64,
}

impl ConjugateGradient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sufficient_decrease(mut self, c1: f64) -> Self {
        assert!(c1 > 0.0 && c1 < 1.0, "sufficient_decrease must be in (0, 1)");
        self.sufficient_decrease = c1;
        self
    }

    pub fn with_curvature(mut self, c2: f64) -> Self {
        assert!(
            c2 > self.sufficient_decrease && c2 < 1.0,
            "curvature must be in (sufficient_decrease, 1)"
        );
        self.curvature = c2;
        self
    }

    pub fn with_max_line_search_trials(mut self, trials: usize) -> Self {
        assert!(trials > 0, "max_line_search_trials must be positive");
        self.max_line_search_trials = trials;
        self
    }

    /// Searches along `direction` from `point`. `slope` is `gᵀd < 0`.
    ///
    /// Returns the accepted step, or the lowest-cost Armijo point if the
    /// curvature condition was never met, or `None` if no trial decreased
    /// the cost sufficiently.
    #[allow(clippy::too_many_arguments)]
    fn line_search(
        &self,
        problem: &dyn CostFunction,
        point: &[f64],
        cost: f64,
        slope: f64,
        direction: &[f64],
        initial_alpha: f64,
        evaluations: &mut usize,
    ) -> Option<Step> {
        debug_assert!(slope < 0.0);

        let mut gradient = vec![0.0; point.len()];
        let mut trial_point = vec![0.0; point.len()];
        let mut alpha = initial_alpha;
        // Largest step known to satisfy Armijo, smallest step known to violate it.
        let mut lo = 0.0;
        let mut hi: Option<f64> = None;
        let mut best: Option<Trial> = None;

        for _ in 0..self.max_line_search_trials {
            for ((t, &x), &d) in trial_point.iter_mut().zip(point).zip(direction) {
                *t = x + alpha * d;
            }
            let trial_cost = problem.cost_and_gradient(&trial_point, &mut gradient);
            *evaluations += 1;

            let armijo = cost + self.sufficient_decrease * alpha * slope;
            if !trial_cost.is_finite() || trial_cost > armijo || trial_cost >= cost {
                hi = Some(alpha);
                alpha = if lo > 0.0 {
                    0.5 * (lo + alpha)
                } else {
                    // Minimizer of the quadratic through f(0), f'(0) and f(alpha).
                    let curvature = trial_cost - cost - slope * alpha;
                    let q = -slope * alpha * alpha / (2.0 * curvature);
                    if q.is_finite() && curvature > 0.0 {
                        q.clamp(0.1 * alpha, 0.9 * alpha)
                    } else {
                        0.5 * alpha
                    }
                };
                continue;
            }

            if best.as_ref().map_or(true, |b| trial_cost < b.cost) {
                best = Some(Trial {
                    alpha,
                    point: trial_point.clone(),
                    cost: trial_cost,
                });
            }

            let trial_slope = dot(&gradient, direction);
            if trial_slope >= self.curvature * slope {
                return Some(Step {
                    alpha,
                    point: trial_point,
                    cost: trial_cost,
                });
            }

            // Sufficient decrease but still steeply descending: step is too short.
            lo = alpha;
            alpha = match hi {
                Some(h) => 0.5 * (lo + h),
                None => {
                    let denom = slope - trial_slope;
                    let secant = if denom < 0.0 {
                        alpha * slope / denom
                    } else {
                        10.0 * alpha
                    };
                    secant.clamp(1.1 * alpha, 10.0 * alpha)
                }
            };
        }

        best.map(|b| Step {
            alpha: b.alpha,
            point: b.point,
            cost: b.cost,
        })
    }
}

fn check_finite(cost: f64, gradient: &[f64], iteration: usize) -> Result<()> {
    if !cost.is_finite() {
        return Err(Error::NonFiniteCost {
            iteration,
            value: cost,
        });
    }
    if gradient.iter().any(|g| !g.is_finite()) {
        return Err(Error::NonFiniteGradient { iteration });
    }
    Ok(())
}

impl Minimizer for ConjugateGradient {
    fn minimize(
        &self,
        initial: Vec<f64>,
        problem: &mut dyn CostFunction,
        config: &ConvergenceConfig,
    ) -> Result<MinimizerOutcome> {
        config.validate();
        let step_size_threshold = config.effective_step_size_threshold();

        let n = initial.len();
        let mut point = initial;
        let mut gradient = vec![0.0; n];
        let mut cost = problem.cost_and_gradient(&point, &mut gradient);
        let mut evaluations = 1;
        check_finite(cost, &gradient, 0)?;

        let mut gradient_norm = norm(&gradient);
        let mut iterations = 0;
        let mut direction: Vec<f64> = gradient.iter().map(|g| -g).collect();
        let mut alpha_guess = if gradient_norm > 0.0 {
            1.0 / gradient_norm
        } else {
            1.0
        };
        let mut next_gradient = vec![0.0; n];

        let termination = loop {
            if gradient_norm == 0.0 || gradient_norm <= config.gradient_norm_threshold {
                break TerminationReason::GradientNorm;
            }
            if config.max_iterations > 0 && iterations >= config.max_iterations {
                break TerminationReason::MaxIterations;
            }

            let mut slope = dot(&gradient, &direction);
            if slope.is_nan() || slope >= 0.0 {
                debug!(iteration = iterations, "Restarting with steepest descent");
                for (d, g) in direction.iter_mut().zip(&gradient) {
                    *d = -g;
                }
                slope = -gradient_norm * gradient_norm;
                alpha_guess = 1.0 / gradient_norm;
            }

            let Some(step) = self.line_search(
                problem,
                &point,
                cost,
                slope,
                &direction,
                alpha_guess,
                &mut evaluations,
            ) else {
                warn!(
                    iteration = iterations,
                    cost, gradient_norm, "Line search stalled, keeping best point"
                );
                break TerminationReason::LineSearchStalled;
            };

            let step_norm = step.alpha * norm(&direction);
            let previous_cost = cost;
            point = step.point;
            iterations += 1;

            problem.iteration_complete(&point, step.cost);

            // The callback may have changed the objective.
            cost = problem.cost_and_gradient(&point, &mut next_gradient);
            evaluations += 1;
            check_finite(cost, &next_gradient, iterations)?;
            gradient_norm = norm(&next_gradient);

            debug!(
                iteration = iterations,
                cost,
                gradient_norm,
                step = step_norm,
                "Conjugate gradient iteration"
            );

            let cost_change = (previous_cost - step.cost).abs();
            let cost_scale = previous_cost.abs().max(step.cost.abs()).max(1.0);
            if config.cost_change_threshold > 0.0
                && cost_change <= config.cost_change_threshold * cost_scale
            {
                break TerminationReason::CostChange;
            }
            if step_size_threshold > 0.0 && step_norm <= step_size_threshold {
                break TerminationReason::StepSize;
            }

            // Polak-Ribière+.
            let gradient_sq = dot(&gradient, &gradient);
            let beta = if gradient_sq > 0.0 {
                let numerator: f64 = next_gradient
                    .iter()
                    .zip(&gradient)
                    .map(|(gn, go)| gn * (gn - go))
                    .sum();
                (numerator / gradient_sq).max(0.0)
            } else {
                0.0
            };
            for (d, g) in direction.iter_mut().zip(&next_gradient) {
                *d = -g + beta * *d;
            }
            std::mem::swap(&mut gradient, &mut next_gradient);

            let next_slope = dot(&gradient, &direction);
            let guess = step.alpha * slope / next_slope;
            alpha_guess = if guess.is_finite() && guess > 0.0 {
                guess
            } else {
                step.alpha
            };
        };

        Ok(MinimizerOutcome {
            point,
            cost,
            gradient_norm,
            iterations,
            cost_evaluations: evaluations,
            termination,
        })
    }
}
