//! The single-fit Levenberg-Marquardt iteration driver.
//!
//! One [`LMFitSolver`] owns the whole mutable state of one fit: the
//! borrowed read-only inputs, the owned workspace buffers sized once from
//! [`FitInfo`], and the borrowed output slots. `run` executes the fit to
//! completion; failure never unwinds, it is a value on the state output.
use crate::fitting::info::{FitFailure, FitInfo, FitState};
use crate::fitting::models::{FitModel, ModelContext};
use crate::fitting::objective;
use crate::fitting::trust_region::{TrustRegionControl, MAX_LAMBDA_ITERATIONS};
use crate::somelinalg::lup_dense::{decompose_lup, invert_lup, solve_lup};
use log::{info, warn};
use nalgebra::{DMatrix, DVector};

/// Read-only views over the caller's data, borrowed for the whole fit.
pub struct FitInputs<'a> {
    pub data: &'a [f32],
    /// per-point least squares weights; `None` means unit weights. Ignored
    /// under MLE.
    pub weight: Option<&'a [f32]>,
    pub initial_parameters: &'a [f32],
    /// free-parameter mask; masked-out parameters keep their initial value
    pub parameters_to_fit: &'a [bool],
    /// opaque model payload, typically independent-variable coordinates
    pub user_info: Option<&'a [u8]>,
}

/// Output slots, borrowed mutably and exclusively for the whole fit.
pub struct FitOutputs<'a> {
    pub parameters: &'a mut [f32],
    pub state: &'a mut FitState,
    pub chi_square: &'a mut f32,
    pub n_iterations: &'a mut usize,
}

/// Scratch buffers of one fit, allocated once at construction and reused
/// across iterations.
struct FitWorkspace {
    curve: DVector<f32>,
    /// Jacobian, one column per model parameter
    derivatives: DMatrix<f32>,
    /// Jacobian snapshot at the last accepted iterate
    temp_derivatives: DMatrix<f32>,
    hessian: DMatrix<f32>,
    modified_hessian: DMatrix<f32>,
    decomposed_hessian: DMatrix<f32>,
    inverted_hessian: DMatrix<f32>,
    pivot_array: Vec<usize>,
    gradient: DVector<f32>,
    delta: DVector<f32>,
    prev_parameters: Vec<f32>,
    /// indices of the free parameters in increasing order
    free: Vec<usize>,
}

pub struct LMFitSolver<'a> {
    tolerance: f32,
    fit_index: usize,
    info: FitInfo,
    inputs: FitInputs<'a>,
    outputs: FitOutputs<'a>,
    model: &'static dyn FitModel,
    ws: FitWorkspace,
    tr: TrustRegionControl,
    chi_square: f32,
    prev_chi_square: f32,
    converged: bool,
    n_iterations: usize,
}

impl<'a> LMFitSolver<'a> {
    pub fn new(
        tolerance: f32,
        fit_index: usize,
        inputs: FitInputs<'a>,
        info: FitInfo,
        outputs: FitOutputs<'a>,
    ) -> Self {
        debug_assert_eq!(inputs.data.len(), info.n_points);
        debug_assert_eq!(inputs.initial_parameters.len(), info.n_parameters);
        debug_assert_eq!(inputs.parameters_to_fit.len(), info.n_parameters);
        debug_assert_eq!(outputs.parameters.len(), info.n_parameters);

        let free: Vec<usize> = (0..info.n_parameters)
            .filter(|&p| inputs.parameters_to_fit[p])
            .collect();
        debug_assert_eq!(free.len(), info.n_parameters_to_fit);
        let k = free.len();

        let ws = FitWorkspace {
            curve: DVector::zeros(info.n_points),
            derivatives: DMatrix::zeros(info.n_points, info.n_parameters),
            temp_derivatives: DMatrix::zeros(info.n_points, info.n_parameters),
            hessian: DMatrix::zeros(k, k),
            modified_hessian: DMatrix::zeros(k, k),
            decomposed_hessian: DMatrix::zeros(k, k),
            inverted_hessian: DMatrix::zeros(k, k),
            pivot_array: vec![0; k],
            gradient: DVector::zeros(k),
            delta: DVector::zeros(k),
            prev_parameters: vec![0.0; info.n_parameters],
            free,
        };

        LMFitSolver {
            tolerance,
            fit_index,
            info,
            inputs,
            outputs,
            model: info.model_id.model(),
            ws,
            tr: TrustRegionControl::new(k),
            chi_square: 0.0,
            prev_chi_square: 0.0,
            converged: false,
            n_iterations: 0,
        }
    }

    /// Run the fit to completion and materialize the outputs.
    pub fn run(&mut self) {
        let state = self.execute();
        *self.outputs.state = state;
        *self.outputs.n_iterations = self.n_iterations;
    }

    fn execute(&mut self) -> FitState {
        self.outputs
            .parameters
            .copy_from_slice(self.inputs.initial_parameters);

        self.calc_model();
        self.ws.temp_derivatives.copy_from(&self.ws.derivatives);

        match objective::calc_chi_square(
            self.info.estimator_id,
            &self.ws.curve,
            self.inputs.data,
            self.inputs.weight,
        ) {
            Ok(chi_square) => self.chi_square = chi_square,
            Err(failure) => {
                warn!("model curve not positive under MLE at the initial parameters");
                return failure.into();
            }
        }
        self.calc_hessian_and_gradient();
        self.prev_chi_square = self.chi_square;

        let max_iterations = self.info.max_iterations;
        for iteration in 0..max_iterations {
            if let Err(failure) = self.iterate(iteration) {
                self.n_iterations = iteration + 1;
                *self.outputs.chi_square = self.prev_chi_square;
                return failure.into();
            }

            let max_iterations_reached = iteration == max_iterations - 1;
            if self.converged || max_iterations_reached {
                self.n_iterations = iteration + 1;
            }

            self.prepare_next_iteration();

            if self.converged {
                *self.outputs.chi_square = self.chi_square;
                return FitState::Converged;
            }
            if max_iterations_reached {
                *self.outputs.chi_square = self.chi_square;
                return FitState::MaxIteration;
            }
        }

        // an iteration cap of zero leaves the initial evaluation in place
        *self.outputs.chi_square = self.chi_square;
        FitState::MaxIteration
    }

    fn iterate(&mut self, iteration: usize) -> Result<(), FitFailure> {
        self.tr
            .modify_step_width(&self.ws.hessian, &mut self.ws.modified_hessian);

        if iteration == 0 {
            self.tr
                .initialize_step_bound(self.outputs.parameters, &self.ws.free);
        }

        // Gauss-Newton probe on the undamped Hessian
        self.decompose_invert_solve(false)?;
        self.tr.calc_phi(&self.ws.delta, &self.ws.inverted_hessian);
        self.tr.renormalize_phi_derivative(&self.ws.delta);

        if self.tr.phi_exceeds_threshold() {
            self.tr
                .initialize_lambda_bounds(&self.ws.gradient, &self.ws.delta);
            self.tr
                .modify_step_width(&self.ws.hessian, &mut self.ws.modified_hessian);
            self.decompose_invert_solve(true)?;
            self.tr.calc_phi(&self.ws.delta, &self.ws.inverted_hessian);

            let mut iter_lambda = 0;
            while self.tr.phi_outside_tolerance() && iter_lambda < MAX_LAMBDA_ITERATIONS {
                self.tr.update_lambda();
                self.tr
                    .modify_step_width(&self.ws.hessian, &mut self.ws.modified_hessian);
                self.decompose_invert_solve(true)?;
                self.tr.calc_phi(&self.ws.delta, &self.ws.inverted_hessian);
                iter_lambda += 1;
            }
        } else {
            self.tr.lambda = 0.0;
        }

        if iteration == 0 {
            // clamp the first step bound to the scaled length of the step
            // actually taken, recomputed here from the final delta
            let scaled_delta_norm = self.tr.scaled_delta_norm(&self.ws.delta);
            self.tr.step_bound = self.tr.step_bound.min(scaled_delta_norm);
        }

        self.update_parameters();
        self.calc_model();

        match objective::calc_chi_square(
            self.info.estimator_id,
            &self.ws.curve,
            self.inputs.data,
            self.inputs.weight,
        ) {
            Ok(chi_square) => self.chi_square = chi_square,
            Err(failure) => {
                warn!(
                    "model curve not positive under MLE at iteration {}",
                    iteration
                );
                self.restore_parameters();
                return Err(failure);
            }
        }

        if self.chi_square < self.prev_chi_square {
            self.calc_hessian_and_gradient();
        }

        self.tr.calc_approximation_quality(
            &self.ws.temp_derivatives,
            &self.ws.delta,
            &self.ws.free,
            self.chi_square,
            self.prev_chi_square,
        );
        self.tr
            .update_step_bound(&self.ws.delta, self.chi_square, self.prev_chi_square);

        self.converged = (self.chi_square - self.prev_chi_square).abs()
            < self.tolerance.max(self.tolerance * self.chi_square.abs());

        info!(
            "iteration {}: chi_square = {:.6e}, lambda = {:.3e}, step_bound = {:.3e}",
            iteration, self.chi_square, self.tr.lambda, self.tr.step_bound
        );

        Ok(())
    }

    /// Copy the source Hessian, factorize it in place, then invert and
    /// solve for the step. A degenerate factorization is fatal.
    fn decompose_invert_solve(&mut self, use_modified: bool) -> Result<(), FitFailure> {
        let ws = &mut self.ws;
        if use_modified {
            ws.decomposed_hessian.copy_from(&ws.modified_hessian);
        } else {
            ws.decomposed_hessian.copy_from(&ws.hessian);
        }

        if decompose_lup(&mut ws.decomposed_hessian, 0.0, &mut ws.pivot_array).is_err() {
            warn!("singular Hessian in LUP decomposition");
            return Err(FitFailure::SingularHessian);
        }
        invert_lup(
            &ws.decomposed_hessian,
            &ws.pivot_array,
            &mut ws.inverted_hessian,
        );
        solve_lup(
            &ws.decomposed_hessian,
            &ws.pivot_array,
            &ws.gradient,
            &mut ws.delta,
        );
        Ok(())
    }

    fn calc_model(&mut self) {
        let ctx = ModelContext::new(&self.info, self.fit_index, self.inputs.user_info);
        let parameters: &[f32] = self.outputs.parameters;
        self.model
            .evaluate(parameters, &ctx, self.ws.curve.as_mut_slice());
        self.model
            .derivatives(parameters, &ctx, &mut self.ws.derivatives);
    }

    fn calc_hessian_and_gradient(&mut self) {
        objective::calc_hessian(
            self.info.estimator_id,
            &self.ws.derivatives,
            &self.ws.curve,
            self.inputs.data,
            self.inputs.weight,
            &self.ws.free,
            &mut self.ws.hessian,
        );
        objective::calc_gradient(
            self.info.estimator_id,
            &self.ws.derivatives,
            &self.ws.curve,
            self.inputs.data,
            self.inputs.weight,
            &self.ws.free,
            &mut self.ws.gradient,
        );
    }

    /// Apply the step to the free parameters, saving the prior values.
    fn update_parameters(&mut self) {
        for (delta_index, &parameter_index) in self.ws.free.iter().enumerate() {
            self.ws.prev_parameters[parameter_index] = self.outputs.parameters[parameter_index];
            self.outputs.parameters[parameter_index] += self.ws.delta[delta_index];
        }
    }

    fn restore_parameters(&mut self) {
        for &parameter_index in self.ws.free.iter() {
            self.outputs.parameters[parameter_index] = self.ws.prev_parameters[parameter_index];
        }
    }

    /// Commit the iterate when chi-square improved, otherwise roll chi-square
    /// and the free parameters back to the last accepted values.
    fn prepare_next_iteration(&mut self) {
        if self.chi_square < self.prev_chi_square {
            self.prev_chi_square = self.chi_square;
            self.ws.temp_derivatives.copy_from(&self.ws.derivatives);
        } else {
            self.chi_square = self.prev_chi_square;
            self.restore_parameters();
        }
    }
}
