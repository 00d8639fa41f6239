use std::sync::{Arc, Mutex};

use glam::DVec2;

use super::*;
use crate::degradation::{DegradationModel, GaussianBlur, MotionShift};
use crate::image::ImageSize;
use crate::minimizer::TerminationReason;
use crate::progress::SolveProgress;
use crate::regularization::{Tikhonov, TotalVariation};
use crate::testing::{
    assert_vec_close, init_tracing, numerical_gradient, random_image, random_image_channels,
    random_vec,
};

fn identity_solver(observation: ImageData) -> IrlsMapSolver {
    let problem = MapProblem::new(DegradationModel::identity(), vec![observation]);
    IrlsMapSolver::new(problem, SolverConfig::default())
}

fn shifted_model() -> DegradationModel {
    DegradationModel::new(2)
        .with_operator(MotionShift::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(0.5, 0.5),
        ]))
        .with_operator(GaussianBlur::new(0.5))
}

/// Two shifted, blurred, 2x downsampled observations of a random scene.
fn shifted_problem(hr_size: ImageSize, channels: usize) -> MapProblem {
    let model = shifted_model();
    let scene = random_image_channels(hr_size, channels, 3);
    let observations = (0..2)
        .map(|k| {
            let mut obs = scene.clone();
            model.apply(&mut obs, k);
            obs
        })
        .collect();
    MapProblem::new(model, observations)
}

#[test]
fn test_reweighting_uniform() {
    let mut weights = vec![0.0; 4];
    UniformWeights.update_weights(&[0.0, 1.0, 5.0, 100.0], &mut weights);
    assert_eq!(weights, vec![1.0; 4]);
}

#[test]
fn test_reweighting_l1() {
    let mut weights = vec![0.0; 3];
    L1Weights::new(0.1).update_weights(&[0.0, 0.05, 4.0], &mut weights);
    assert_eq!(weights, vec![10.0, 10.0, 0.25]);
}

#[test]
fn test_reweighting_huber() {
    let mut weights = vec![0.0; 3];
    HuberWeights::new(2.0).update_weights(&[0.5, 2.0, 8.0], &mut weights);
    assert_eq!(weights, vec![1.0, 1.0, 0.25]);
}

#[test]
#[should_panic(expected = "L1 epsilon must be positive")]
fn test_reweighting_l1_invalid_epsilon() {
    L1Weights::new(0.0);
}

#[test]
fn test_initial_weights_are_one() {
    let solver = identity_solver(random_image(ImageSize::new(5, 4), 1));
    assert_eq!(solver.irls_weights(), &[1.0; 20]);
}

#[test]
fn test_update_weights_length_and_sign() {
    let size = ImageSize::new(8, 6);

    for reweighting in [
        Box::new(UniformWeights) as Box<dyn IrlsReweighting>,
        Box::new(L1Weights::new(1e-3)),
        Box::new(HuberWeights::new(0.05)),
    ] {
        let problem = MapProblem::new(DegradationModel::identity(), vec![random_image(size, 2)])
            .with_regularizer(TotalVariation::new(), 0.5)
            .with_regularizer(Tikhonov::new(), 0.1);
        let mut solver = IrlsMapSolver::new(problem, SolverConfig::default());
        solver.reweighting = reweighting;
        solver.update_irls_weights(&random_vec(size.pixel_count(), 3));

        assert_eq!(solver.irls_weights().len(), size.pixel_count());
        assert!(solver.irls_weights().iter().all(|&w| w >= 0.0));
    }
}

#[test]
fn test_update_weights_uses_scaled_magnitudes() {
    #[rustfmt::skip]
    let estimate = [
        0.0, 3.0,
        4.0, 4.0,
    ];
    let size = ImageSize::new(2, 2);
    let problem = MapProblem::new(DegradationModel::identity(), vec![ImageData::new(size, 1)])
        .with_regularizer(TotalVariation::new(), 2.0);
    let mut solver =
        IrlsMapSolver::new(problem, SolverConfig::default()).with_reweighting(L1Weights::new(0.5));

    solver.update_irls_weights(&estimate);

    // TV residuals are (5, 1, 0, 0); scaled by λ = 2 they become (10, 2, 0, 0).
    assert_eq!(solver.irls_weights(), &[0.1, 0.5, 2.0, 2.0]);
}

#[test]
fn test_no_regularizers_keeps_weights_finite() {
    let mut solver = identity_solver(random_image(ImageSize::new(4, 4), 5))
        .with_reweighting(L1Weights::new(1e-2));
    solver.update_irls_weights(&[0.0; 16]);
    assert!(solver.irls_weights().iter().all(|&w| w == 100.0));
}

#[test]
fn test_data_term_zero_for_exact_observation() {
    let observation = random_image(ImageSize::new(7, 5), 6);
    let solver = identity_solver(observation.clone());

    let (cost, gradient) = solver.compute_data_term(0, 0, observation.channel(0));

    assert_eq!(cost, 0.0);
    assert_eq!(gradient.len(), 35);
    assert!(gradient.iter().all(|&g| g == 0.0));
}

#[test]
fn test_data_term_single_pixel_perturbation() {
    let observation = random_image(ImageSize::new(5, 5), 7);
    let solver = identity_solver(observation.clone());
    let d = -0.625;

    let mut estimate = observation.channel(0).to_vec();
    estimate[12] += d;
    let (cost, gradient) = solver.compute_data_term(0, 0, &estimate);

    assert!((cost - d * d).abs() < 1e-15);
    for (i, &g) in gradient.iter().enumerate() {
        let expected = if i == 12 { 2.0 * d } else { 0.0 };
        assert!((g - expected).abs() < 1e-15, "index {}: {}", i, g);
    }
}

#[test]
#[should_panic(expected = "Observation index 1 out of range")]
fn test_data_term_index_out_of_range() {
    let solver = identity_solver(random_image(ImageSize::new(3, 3), 8));
    solver.compute_data_term(1, 0, &[0.0; 9]);
}

#[test]
fn test_regularization_is_pure() {
    let size = ImageSize::new(6, 6);
    let problem = MapProblem::new(DegradationModel::identity(), vec![random_image(size, 9)])
        .with_regularizer(TotalVariation::new(), 0.3);
    let mut solver =
        IrlsMapSolver::new(problem, SolverConfig::default()).with_reweighting(L1Weights::default());
    solver.update_irls_weights(&random_vec(size.pixel_count(), 10));
    let weights_before = solver.irls_weights().to_vec();

    let estimate = random_vec(size.pixel_count(), 11);
    let first = solver.compute_regularization(&estimate);
    let second = solver.compute_regularization(&estimate);

    assert_eq!(first, second);
    assert_eq!(solver.irls_weights(), weights_before.as_slice());
}

#[test]
fn test_regularization_without_regularizers_is_zero() {
    let solver = identity_solver(random_image(ImageSize::new(3, 4), 12));
    let (cost, gradient) = solver.compute_regularization(&random_vec(12, 13));
    assert_eq!(cost, 0.0);
    assert_eq!(gradient, vec![0.0; 12]);
}

#[test]
fn test_total_gradient_matches_finite_differences() {
    let hr_size = ImageSize::new(8, 8);
    let problem = shifted_problem(hr_size, 1)
        .with_regularizer(TotalVariation::new(), 0.2)
        .with_regularizer(Tikhonov::new(), 0.05);
    let mut solver = IrlsMapSolver::new(problem, SolverConfig::default())
        .with_reweighting(HuberWeights::new(0.1));
    solver.update_irls_weights(&random_vec(hr_size.pixel_count(), 14));

    let estimate = random_vec(hr_size.pixel_count(), 15);
    let mut analytic = vec![0.0; hr_size.pixel_count()];
    let cost = solver.total_cost_and_gradient(0, &estimate, &mut analytic);
    assert!((cost - solver.total_cost(0, &estimate)).abs() < 1e-10 * cost.max(1.0));

    let numeric = numerical_gradient(&estimate, |x| solver.total_cost(0, x));
    assert_vec_close(&analytic, &numeric, 1e-5);
}

#[test]
fn test_solve_returns_exact_observation_immediately() {
    init_tracing();
    let observation = random_image(ImageSize::new(6, 6), 16);
    let mut solver = identity_solver(observation.clone());

    let result = solver.solve(&observation).unwrap();

    assert_eq!(result.reports.len(), 1);
    assert!(result.reports[0].iterations <= 1);
    assert_eq!(result.reports[0].termination, TerminationReason::GradientNorm);
    for (x, y) in result.image.channel(0).iter().zip(observation.channel(0)) {
        assert!((x - y).abs() < 1e-9);
    }
}

#[test]
fn test_solve_recovers_identity_observation() {
    let observation = random_image(ImageSize::new(6, 5), 17);
    let mut solver = identity_solver(observation.clone());

    let initial = ImageData::new(observation.size(), 1);
    let result = solver.solve(&initial).unwrap();

    assert!(result.image.mean_squared_error(&observation) < 1e-12);
}

#[test]
fn test_solve_multichannel_independent() {
    init_tracing();
    let hr_size = ImageSize::new(8, 6);
    let problem = shifted_problem(hr_size, 3).with_regularizer(TotalVariation::new(), 0.01);
    let initial = ImageData::new(hr_size, 3);

    let mut solver = IrlsMapSolver::new(problem, SolverConfig::default().with_max_iterations(10))
        .with_reweighting(L1Weights::default());
    let result = solver.solve(&initial).unwrap();

    assert_eq!(result.image.num_channels(), 3);
    assert_eq!(result.reports.len(), 3);
    for (c, report) in result.reports.iter().enumerate() {
        assert_eq!(report.channel, c);
        assert!(report.iterations > 0);
    }

    // Solving channel 1 on its own gives the same plane.
    let single = MapProblem::new(
        shifted_model(),
        solver
            .problem()
            .observations()
            .iter()
            .map(|o| o.extract_channel(1))
            .collect(),
    )
    .with_regularizer(TotalVariation::new(), 0.01);
    let mut single_solver =
        IrlsMapSolver::new(single, SolverConfig::default().with_max_iterations(10))
            .with_reweighting(L1Weights::default());
    let single_result = single_solver.solve(&ImageData::new(hr_size, 1)).unwrap();

    assert_eq!(single_result.image.channel(0), result.image.channel(1));
}

#[test]
fn test_solve_is_repeatable() {
    let hr_size = ImageSize::new(8, 8);
    let problem = shifted_problem(hr_size, 1).with_regularizer(TotalVariation::new(), 0.05);
    let mut solver = IrlsMapSolver::new(problem, SolverConfig::default().with_max_iterations(8))
        .with_reweighting(L1Weights::default());
    let initial = ImageData::filled(hr_size, 0.1);

    let first = solver.solve(&initial).unwrap();
    let second = solver.solve(&initial).unwrap();

    assert_eq!(first.image, second.image);
    assert_eq!(first.reports, second.reports);
}

#[test]
fn test_progress_reports_every_iteration() {
    let hr_size = ImageSize::new(8, 8);
    let problem = shifted_problem(hr_size, 2).with_regularizer(Tikhonov::new(), 0.05);
    let seen: Arc<Mutex<Vec<SolveProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: Arc<dyn Fn(SolveProgress) + Send + Sync> = Arc::new(move |p| {
        sink.lock().unwrap().push(p);
    });

    let mut solver = IrlsMapSolver::new(problem, SolverConfig::default().with_max_iterations(5))
        .with_progress_callback(Some(callback));
    let result = solver.solve(&ImageData::new(hr_size, 2)).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), result.total_iterations());
    for channel in 0..2 {
        let iterations: Vec<usize> = seen
            .iter()
            .filter(|p| p.channel == channel)
            .map(|p| p.iteration)
            .collect();
        let expected: Vec<usize> = (1..=result.reports[channel].iterations).collect();
        assert_eq!(iterations, expected);
    }
}

#[test]
fn test_numerical_differentiation_matches_analytic() {
    let hr_size = ImageSize::new(6, 6);
    let initial = ImageData::filled(hr_size, 0.0);
    let config = SolverConfig::default().with_max_iterations(4);

    let mut analytic = IrlsMapSolver::new(
        shifted_problem(hr_size, 1).with_regularizer(Tikhonov::new(), 0.1),
        config,
    );
    let mut numeric = IrlsMapSolver::new(
        shifted_problem(hr_size, 1).with_regularizer(Tikhonov::new(), 0.1),
        config.with_numerical_differentiation(true),
    );

    let a = analytic.solve(&initial).unwrap();
    let n = numeric.solve(&initial).unwrap();

    assert!(a.image.mean_squared_error(&n.image) < 1e-10);
}

#[test]
#[should_panic(expected = "Initial estimate size")]
fn test_solve_initial_size_mismatch() {
    let mut solver = identity_solver(random_image(ImageSize::new(4, 4), 18));
    let _ = solver.solve(&ImageData::new(ImageSize::new(8, 8), 1));
}
