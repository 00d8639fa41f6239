use std::fmt::Debug;

/// Rule turning per-pixel regularization residual magnitudes into IRLS
/// weights.
///
/// `residual_magnitudes[i]` is `sqrt(Σ_k (λ_k r_{k,i})²)` over all registered
/// regularizers. Implementations must write one finite, non-negative weight
/// per pixel.
pub trait IrlsReweighting: Send + Sync + Debug {
    fn update_weights(&self, residual_magnitudes: &[f64], weights: &mut [f64]);
}

/// Keeps every weight at 1, which reduces IRLS to ordinary least squares.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformWeights;

impl IrlsReweighting for UniformWeights {
    fn update_weights(&self, _residual_magnitudes: &[f64], weights: &mut [f64]) {
        weights.fill(1.0);
    }
}

/// `w_i = 1 / max(m_i, ε)`.
///
/// The weighted quadratic `w_i m_i²` then approximates `|m_i|`, so a total
/// variation regularizer behaves like true (L1) TV and keeps edges sharp.
#[derive(Debug, Clone, Copy)]
pub struct L1Weights {
    epsilon: f64,
}

impl L1Weights {
    pub fn new(epsilon: f64) -> Self {
        assert!(
            epsilon.is_finite() && epsilon > 0.0,
            "L1 epsilon must be positive"
        );
        Self { epsilon }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl Default for L1Weights {
    fn default() -> Self {
        Self::new(1e-3)
    }
}

impl IrlsReweighting for L1Weights {
    fn update_weights(&self, residual_magnitudes: &[f64], weights: &mut [f64]) {
        for (w, &m) in weights.iter_mut().zip(residual_magnitudes) {
            *w = 1.0 / m.max(self.epsilon);
        }
    }
}

/// `w_i = 1` for `m_i ≤ δ`, `δ / m_i` above it: quadratic near zero and
/// linear in the tails.
#[derive(Debug, Clone, Copy)]
pub struct HuberWeights {
    threshold: f64,
}

impl HuberWeights {
    pub fn new(threshold: f64) -> Self {
        assert!(
            threshold.is_finite() && threshold > 0.0,
            "Huber threshold must be positive"
        );
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl IrlsReweighting for HuberWeights {
    fn update_weights(&self, residual_magnitudes: &[f64], weights: &mut [f64]) {
        for (w, &m) in weights.iter_mut().zip(residual_magnitudes) {
            *w = if m <= self.threshold {
                1.0
            } else {
                self.threshold / m
            };
        }
    }
}
