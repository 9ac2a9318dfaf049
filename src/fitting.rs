//! Single-fit Levenberg-Marquardt curve fitting on 1D or 2D sampled data.
//!
//! The solver couples an analytic model (see [`models`]) with a least squares
//! or Poisson maximum likelihood objective (see [`objective`]) and controls
//! the damping parameter with the More trust-region strategy
//! (see [`trust_region`]). One [`lm_fit::LMFitSolver`] instance owns the
//! whole state of one fit and runs it to completion.
//!
//! ```
//! use RustedLMFit::fitting::info::{EstimatorID, FitInfo, FitState, ModelID};
//! use RustedLMFit::fitting::lm_fit::{FitInputs, FitOutputs, LMFitSolver};
//!
//! // data on x = 0..9 generated by 2 + 3*x
//! let data: Vec<f32> = (0..10).map(|i| 2.0 + 3.0 * i as f32).collect();
//! let initial_parameters = [0.0f32, 0.0];
//! let parameters_to_fit = [true, true];
//!
//! let info = FitInfo {
//!     n_points: data.len(),
//!     n_parameters: 2,
//!     n_parameters_to_fit: 2,
//!     max_iterations: 20,
//!     model_id: ModelID::Linear1D,
//!     estimator_id: EstimatorID::LSE,
//!     user_info_size: 0,
//! };
//!
//! let mut parameters = [0.0f32; 2];
//! let mut state = FitState::Converged;
//! let mut chi_square = 0.0f32;
//! let mut n_iterations = 0usize;
//!
//! let inputs = FitInputs {
//!     data: &data,
//!     weight: None,
//!     initial_parameters: &initial_parameters,
//!     parameters_to_fit: &parameters_to_fit,
//!     user_info: None,
//! };
//! let outputs = FitOutputs {
//!     parameters: &mut parameters,
//!     state: &mut state,
//!     chi_square: &mut chi_square,
//!     n_iterations: &mut n_iterations,
//! };
//!
//! let mut solver = LMFitSolver::new(1e-6, 0, inputs, info, outputs);
//! solver.run();
//!
//! assert_eq!(state, FitState::Converged);
//! assert!((parameters[0] - 2.0).abs() < 1e-3);
//! assert!((parameters[1] - 3.0).abs() < 1e-3);
//! ```

pub mod info;
pub mod lm_fit;
pub mod models;
pub mod objective;
pub mod trust_region;
