//! Forward imaging model mapping a high-resolution scene to each observation.
//!
//! A [`DegradationModel`] is an ordered list of [`DegradationOperator`]s
//! followed by integer [`Downsampling`]. For observation `k` the forward
//! model is `A_k = D · O_n · … · O_1` and its adjoint is
//! `A_kᵀ = O_1ᵀ · … · O_nᵀ · Dᵀ`.
//!
//! Every operator must satisfy `<A x, y> = <x, Aᵀ y>` exactly. The solver
//! relies on this for its analytic gradient, so an operator whose transpose
//! is only approximate is a bug, not a tolerance issue.

mod blur;
mod downsampling;
mod motion;


use std::fmt::Debug;

pub use blur::GaussianBlur;
pub use downsampling::Downsampling;
pub use motion::MotionShift;

use crate::image::{ImageData, ImageSize};

/// A linear operator applied to every channel of an image.
pub trait DegradationOperator: Send + Sync + Debug {
    /// Applies the operator for observation `index` in place.
    fn apply(&self, image: &mut ImageData, index: usize);

    /// Applies the exact adjoint of [`apply`](Self::apply) in place.
    fn apply_transpose(&self, image: &mut ImageData, index: usize);

    /// Number of observations this operator has per-frame parameters for.
    /// `None` means the operator is identical for every observation.
    fn observation_count(&self) -> Option<usize> {
        None
    }
}

/// Composition of per-observation operators and a final downsampling stage.
#[derive(Debug)]
pub struct DegradationModel {
    operators: Vec<Box<dyn DegradationOperator>>,
    downsampling: Downsampling,
}

impl DegradationModel {
    /// Model with no operators besides downsampling by `scale`.
    pub fn new(scale: usize) -> Self {
        Self {
            operators: Vec::new(),
            downsampling: Downsampling::new(scale),
        }
    }

    /// Model that leaves images untouched.
    pub fn identity() -> Self {
        Self::new(1)
    }

    /// Appends an operator. Operators run in insertion order before downsampling.
    pub fn add_operator(&mut self, operator: impl DegradationOperator + 'static) {
        self.operators.push(Box::new(operator));
    }

    pub fn with_operator(mut self, operator: impl DegradationOperator + 'static) -> Self {
        self.add_operator(operator);
        self
    }

    #[inline]
    pub fn downsampling_scale(&self) -> usize {
        self.downsampling.scale()
    }

    pub fn operators(&self) -> &[Box<dyn DegradationOperator>] {
        &self.operators
    }

    /// Number of observations the per-frame operators are parameterized for.
    pub fn observation_count(&self) -> Option<usize> {
        let mut count = None;
        for operator in &self.operators {
            if let Some(n) = operator.observation_count() {
                if let Some(existing) = count {
                    assert_eq!(
                        existing, n,
                        "Degradation operators disagree on observation count: {} vs {}",
                        existing, n
                    );
                }
                count = Some(n);
            }
        }
        count
    }

    /// Resolution an HR image of `hr_size` has after [`apply`](Self::apply).
    pub fn low_resolution_size(&self, hr_size: ImageSize) -> ImageSize {
        hr_size.downscaled(self.downsampling_scale())
    }

    /// Degrades `image` in place to observation `index`'s resolution.
    pub fn apply(&self, image: &mut ImageData, index: usize) {
        for operator in &self.operators {
            operator.apply(image, index);
        }
        self.downsampling.apply(image, index);
    }

    /// Adjoint of [`apply`](Self::apply). Takes an LR image back to HR.
    pub fn apply_transpose(&self, image: &mut ImageData, index: usize) {
        self.downsampling.apply_transpose(image, index);
        for operator in self.operators.iter().rev() {
            operator.apply_transpose(image, index);
        }
    }
}
