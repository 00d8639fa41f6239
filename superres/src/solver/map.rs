use tracing::info;

use super::{minimize_channel, MapProblem, Reconstruction};
use crate::config::SolverConfig;
use crate::error::Result;
use crate::image::ImageData;
use crate::minimizer::{ConjugateGradient, CostFunction, Minimizer};
use crate::objective::{DataFidelityTerm, ObjectiveFunction, RegularizationTerm};
use crate::progress::{report_progress, ProgressCallback};

/// Plain MAP reconstruction with unit regularization weights.
///
/// Every channel gets its own [`ObjectiveFunction`] holding one
/// [`DataFidelityTerm`] per observation and one [`RegularizationTerm`] per
/// registered regularizer.
pub struct MapSolver {
    problem: MapProblem,
    config: SolverConfig,
    progress: ProgressCallback,
}

/// Forwards to the channel objective and reports progress after each step.
struct ChannelObjective<'a> {
    objective: ObjectiveFunction<'a>,
    channel: usize,
    progress: &'a ProgressCallback,
}

impl CostFunction for ChannelObjective<'_> {
    fn cost_and_gradient(&self, point: &[f64], gradient: &mut [f64]) -> f64 {
        self.objective.cost_and_gradient(point, gradient)
    }

    fn cost(&self, point: &[f64]) -> f64 {
        self.objective.cost(point)
    }

    fn iteration_complete(&mut self, point: &[f64], cost: f64) {
        self.objective.iteration_complete(point, cost);
        report_progress(
            self.progress,
            self.channel,
            self.objective.num_completed_iterations(),
            cost,
        );
    }
}

impl MapSolver {
    pub fn new(problem: MapProblem, config: SolverConfig) -> Self {
        Self {
            problem,
            config,
            progress: None,
        }
    }

    pub fn with_progress_callback(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn problem(&self) -> &MapProblem {
        &self.problem
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Objective for one channel built from the problem's observations and
    /// regularizers.
    pub fn build_objective(&self, channel: usize) -> ObjectiveFunction<'_> {
        let problem = &self.problem;
        let size = problem.size();
        let mut objective = ObjectiveFunction::new(size.pixel_count());
        for (index, observation) in problem.observations().iter().enumerate() {
            objective.add_term(DataFidelityTerm::new(
                problem.model(),
                observation,
                index,
                channel,
                size,
            ));
        }
        for (regularizer, lambda) in problem.regularizers() {
            objective.add_term(RegularizationTerm::new(regularizer.as_ref(), *lambda, size));
        }
        objective
    }

    pub fn solve(&self, initial: &ImageData) -> Result<Reconstruction> {
        self.solve_with(&ConjugateGradient::default(), initial)
    }

    pub fn solve_with(
        &self,
        minimizer: &dyn Minimizer,
        initial: &ImageData,
    ) -> Result<Reconstruction> {
        self.problem.check_initial_estimate(initial);
        info!(
            width = self.problem.size().width,
            height = self.problem.size().height,
            observations = self.problem.num_observations(),
            regularizers = self.problem.regularizers().len(),
            channels = self.problem.num_channels(),
            "Starting MAP solve"
        );

        let mut planes = Vec::with_capacity(self.problem.num_channels());
        let mut reports = Vec::with_capacity(self.problem.num_channels());
        for channel in 0..self.problem.num_channels() {
            let mut objective = ChannelObjective {
                objective: self.build_objective(channel),
                channel,
                progress: &self.progress,
            };
            let (report, plane) = minimize_channel(
                minimizer,
                initial.channel(channel).to_vec(),
                &mut objective,
                &self.config,
                channel,
            )?;
            planes.push(plane);
            reports.push(report);
        }

        Ok(Reconstruction {
            image: ImageData::from_channels(self.problem.size(), planes),
            reports,
        })
    }
}
