use criterion::{criterion_group, criterion_main, Criterion};

use RustedLMFit::fitting::info::{EstimatorID, FitInfo, FitState, ModelID};
use RustedLMFit::fitting::lm_fit::{FitInputs, FitOutputs, LMFitSolver};

fn run_gauss1d_fit(data: &[f32]) -> FitState {
    let initial_parameters = [8.0f32, 22.0, 5.0, 0.0];
    let parameters_to_fit = [true, true, true, true];
    let info = FitInfo {
        n_points: data.len(),
        n_parameters: 4,
        n_parameters_to_fit: 4,
        max_iterations: 100,
        model_id: ModelID::Gauss1D,
        estimator_id: EstimatorID::LSE,
        user_info_size: 0,
    };

    let mut parameters = [0.0f32; 4];
    let mut state = FitState::Converged;
    let mut chi_square = 0.0f32;
    let mut n_iterations = 0usize;

    let inputs = FitInputs {
        data,
        weight: None,
        initial_parameters: &initial_parameters,
        parameters_to_fit: &parameters_to_fit,
        user_info: None,
    };
    let outputs = FitOutputs {
        parameters: &mut parameters,
        state: &mut state,
        chi_square: &mut chi_square,
        n_iterations: &mut n_iterations,
    };

    let mut solver = LMFitSolver::new(1e-6, 0, inputs, info, outputs);
    solver.run();
    state
}

fn bench_gauss1d_fit(c: &mut Criterion) {
    let data: Vec<f32> = (0..50)
        .map(|i| {
            let x = i as f32;
            10.0 * (-(x - 24.5) * (x - 24.5) / (2.0 * 3.0 * 3.0)).exp() + 1.0
        })
        .collect();

    c.bench_function("gauss1d LSE fit, 50 points", |b| {
        b.iter(|| run_gauss1d_fit(&data))
    });
}

criterion_group!(benches, bench_gauss1d_fit);
criterion_main!(benches);
