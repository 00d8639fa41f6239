//! Error types for super-resolution solving.

use thiserror::Error;

/// Recoverable failures during a solve.
///
/// Precondition violations (mismatched buffer lengths, bad observation
/// indices, negative weights) are programming errors and panic instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Objective returned non-finite cost {value} at iteration {iteration}")]
    NonFiniteCost { iteration: usize, value: f64 },

    #[error("Objective returned non-finite gradient at iteration {iteration}")]
    NonFiniteGradient { iteration: usize },

    #[error("Failed to parse solver config: {0}")]
    ConfigParse(#[from] serde_yml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
