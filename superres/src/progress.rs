//! Progress reporting for solves.

use std::sync::Arc;

/// Progress information emitted after each accepted minimizer step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveProgress {
    /// Channel being reconstructed (0-based).
    pub channel: usize,
    /// Completed iterations on this channel.
    pub iteration: usize,
    /// Cost at the accepted point, before reweighting.
    pub cost: f64,
}

/// Callback type for progress reporting.
pub type ProgressCallback = Option<Arc<dyn Fn(SolveProgress) + Send + Sync>>;

/// Report progress using the callback if set.
pub fn report_progress(callback: &ProgressCallback, channel: usize, iteration: usize, cost: f64) {
    if let Some(f) = callback.as_ref() {
        f(SolveProgress {
            channel,
            iteration,
            cost,
        });
    }
}
