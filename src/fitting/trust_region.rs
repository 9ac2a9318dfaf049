//! Trust-region control of the Levenberg-Marquardt damping parameter.
//!
//! This resembles `LMPAR` from `MINPACK`:
//!
//! > More J.J. (1978) The Levenberg-Marquardt algorithm: Implementation and
//! > theory. In: Watson G.A. (eds) Numerical Analysis. Lecture Notes in
//! > Mathematics, vol 630. Springer, Berlin, Heidelberg.
//!
//! The controller keeps a step bound (the trust-region radius on the scaled
//! step), bracketing bounds for the damping parameter lambda, and an
//! adaptive diagonal scaling vector whose entries never decrease. The
//! secular function `phi = ||D^(1/2) delta|| - step_bound` is driven to the
//! trust-region boundary by a secant-like iteration over lambda.
use crate::somelinalg::dense_ops::{dot, enorm, mat_vec_accumulate};
use log::info;
use nalgebra::{DMatrix, DVector};

const P1: f32 = 0.1;
const INITIAL_STEP_BOUND_FACTOR: f32 = 100.0;

/// Maximum number of lambda refinements per outer iteration.
pub const MAX_LAMBDA_ITERATIONS: usize = 10;

pub struct TrustRegionControl {
    pub lambda: f32,
    lambda_lower_bound: f32,
    lambda_upper_bound: f32,
    pub step_bound: f32,
    phi: f32,
    phi_derivative: f32,
    /// adaptive diagonal scaling; element-wise non-decreasing over the fit
    pub scaling_vector: DVector<f32>,
    predicted_reduction: f32,
    actual_reduction: f32,
    directive_derivative: f32,
    approximation_ratio: f32,
}

impl TrustRegionControl {
    pub fn new(n_parameters_to_fit: usize) -> Self {
        TrustRegionControl {
            lambda: 0.0,
            lambda_lower_bound: 0.0,
            lambda_upper_bound: 0.0,
            step_bound: 0.0,
            phi: 0.0,
            phi_derivative: 0.0,
            scaling_vector: DVector::zeros(n_parameters_to_fit),
            predicted_reduction: 0.0,
            actual_reduction: 0.0,
            directive_derivative: 0.0,
            approximation_ratio: 0.0,
        }
    }

    /// `||D^(1/2) delta||`, the scaled step norm.
    pub fn scaled_delta_norm(&self, delta: &DVector<f32>) -> f32 {
        let scaled_delta =
            DVector::from_fn(delta.len(), |i, _| self.scaling_vector[i].sqrt() * delta[i]);
        enorm(&scaled_delta)
    }

    /// Raise the scaling entries to the current Hessian diagonal and build
    /// `modified = hessian + lambda * diag(scaling)`.
    pub fn modify_step_width(&mut self, hessian: &DMatrix<f32>, modified: &mut DMatrix<f32>) {
        modified.copy_from(hessian);
        let n = self.scaling_vector.len();
        for parameter_index in 0..n {
            let diagonal = modified[(parameter_index, parameter_index)];
            // adaptive scaling
            self.scaling_vector[parameter_index] =
                self.scaling_vector[parameter_index].max(diagonal);
            modified[(parameter_index, parameter_index)] +=
                self.scaling_vector[parameter_index] * self.lambda;
        }
    }

    /// First-iteration step bound `100 * ||D^(1/2) p||` over the free
    /// parameters, or 100 if the scaled parameter norm is zero.
    pub fn initialize_step_bound(&mut self, parameters: &[f32], free: &[usize]) {
        let scaled_parameters = DVector::from_fn(free.len(), |k, _| {
            parameters[free[k]] * self.scaling_vector[k].sqrt()
        });
        self.step_bound = INITIAL_STEP_BOUND_FACTOR * enorm(&scaled_parameters);
        if self.step_bound == 0.0 {
            self.step_bound = INITIAL_STEP_BOUND_FACTOR;
        }
    }

    /// The secular function and its derivative for the current step.
    ///
    /// `phi = ||D^(1/2) delta|| - step_bound`; the derivative is
    /// `(D delta) . H^(-1) (D delta) / ||D^(1/2) delta||` with the inverse
    /// of the factored matrix.
    pub fn calc_phi(&mut self, delta: &DVector<f32>, inverted_hessian: &DMatrix<f32>) {
        let scaled_delta_norm = self.scaled_delta_norm(delta);
        self.phi = scaled_delta_norm - self.step_bound;

        let scaled_delta =
            DVector::from_fn(delta.len(), |i, _| self.scaling_vector[i] * delta[i]);
        let mut temp = DVector::zeros(delta.len());
        mat_vec_accumulate(&mut temp, inverted_hessian, &scaled_delta);
        self.phi_derivative = dot(&temp, &scaled_delta) / scaled_delta_norm;
    }

    /// The More normalization applied between the Gauss-Newton probe and
    /// the bracket search.
    pub fn renormalize_phi_derivative(&mut self, delta: &DVector<f32>) {
        self.phi_derivative *= self.step_bound / self.scaled_delta_norm(delta);
    }

    /// Whether the current step leaves the trust region by more than 10%.
    pub fn phi_exceeds_threshold(&self) -> bool {
        self.phi > P1 * self.step_bound
    }

    /// Whether the bracket search still has to refine lambda.
    pub fn phi_outside_tolerance(&self) -> bool {
        self.phi.abs() > P1 * self.step_bound
    }

    /// Bracket `[lambda_lower, lambda_upper]` for the damping parameter and
    /// the starting lambda inside it.
    pub fn initialize_lambda_bounds(&mut self, gradient: &DVector<f32>, delta: &DVector<f32>) {
        let scaled_delta_norm = self.scaled_delta_norm(delta);

        self.lambda_lower_bound = self.phi / self.phi_derivative;

        let scaled_gradient = DVector::from_fn(gradient.len(), |i, _| {
            gradient[i] / self.scaling_vector[i].sqrt()
        });
        let gradient_norm = enorm(&scaled_gradient);
        self.lambda_upper_bound = gradient_norm / self.step_bound;

        self.lambda = self
            .lambda
            .max(self.lambda_lower_bound)
            .min(self.lambda_upper_bound);
        if self.lambda == 0.0 {
            self.lambda = gradient_norm / scaled_delta_norm;
        }
        info!(
            "lambda bounds [{:.3e}, {:.3e}], lambda = {:.3e}",
            self.lambda_lower_bound, self.lambda_upper_bound, self.lambda
        );
    }

    /// One secant-like refinement of lambda against the trust-region
    /// constraint, tightening the violated bracket bound first.
    pub fn update_lambda(&mut self) {
        if self.phi > 0.0 {
            self.lambda_lower_bound = self.lambda_lower_bound.max(self.lambda);
        }
        if self.phi < 0.0 {
            self.lambda_upper_bound = self.lambda_upper_bound.min(self.lambda);
        }

        self.lambda += (self.phi + self.step_bound) / self.step_bound * self.phi
            / self.phi_derivative;
        self.lambda = self.lambda.max(self.lambda_lower_bound);
    }

    /// Predicted and actual reduction of the objective for the step just
    /// taken, using the Jacobian of the last accepted iterate.
    pub fn calc_approximation_quality(
        &mut self,
        temp_derivatives: &DMatrix<f32>,
        delta: &DVector<f32>,
        free: &[usize],
        chi_square: f32,
        prev_chi_square: f32,
    ) {
        let n_points = temp_derivatives.nrows();
        let mut derivatives_delta = vec![0.0f64; n_points];
        for (delta_index, &parameter_index) in free.iter().enumerate() {
            let d = delta[delta_index] as f64;
            for (point_index, acc) in derivatives_delta.iter_mut().enumerate() {
                *acc += temp_derivatives[(point_index, parameter_index)] as f64 * d;
            }
        }
        let derivatives_delta_norm = derivatives_delta
            .iter()
            .map(|v| v * v)
            .sum::<f64>()
            .sqrt() as f32;

        let scaled_delta_norm = self.scaled_delta_norm(delta);

        let summand1 = derivatives_delta_norm * derivatives_delta_norm / prev_chi_square;
        let summand2 =
            2.0 * self.lambda * scaled_delta_norm * scaled_delta_norm / prev_chi_square;

        self.predicted_reduction = summand1 + summand2;
        self.directive_derivative = -summand1 - summand2 / 2.0;

        self.actual_reduction = -1.0;
        if P1 * chi_square.sqrt() < prev_chi_square.sqrt() {
            self.actual_reduction = 1.0 - chi_square / prev_chi_square;
        }

        self.approximation_ratio = self.actual_reduction / self.predicted_reduction;
    }

    /// Shrink or expand the trust region from the approximation ratio and
    /// move lambda the opposite way.
    pub fn update_step_bound(
        &mut self,
        delta: &DVector<f32>,
        chi_square: f32,
        prev_chi_square: f32,
    ) {
        let scaled_delta_norm = self.scaled_delta_norm(delta);

        if self.approximation_ratio <= 0.25 {
            let mut temp = if self.actual_reduction >= 0.0 {
                0.5
            } else {
                0.5 * self.directive_derivative
                    / (self.directive_derivative + 0.5 * self.actual_reduction)
            };

            if P1 * chi_square.sqrt() >= prev_chi_square.sqrt() || temp < P1 {
                temp = P1;
            }

            self.step_bound = temp * self.step_bound.min(scaled_delta_norm / P1);
            self.lambda /= temp;
        } else if self.lambda == 0.0 || self.approximation_ratio >= 0.75 {
            self.step_bound = scaled_delta_norm / 0.5;
            self.lambda *= 0.5;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::dvector;

    fn control_with_scaling(scaling: &[f32]) -> TrustRegionControl {
        let mut tr = TrustRegionControl::new(scaling.len());
        for (i, &s) in scaling.iter().enumerate() {
            tr.scaling_vector[i] = s;
        }
        tr
    }

    #[test]
    fn test_scaling_vector_is_non_decreasing() {
        let mut tr = TrustRegionControl::new(2);
        let hessian_large = DMatrix::from_row_slice(2, 2, &[4.0f32, 0.0, 0.0, 9.0]);
        let hessian_small = DMatrix::from_row_slice(2, 2, &[1.0f32, 0.0, 0.0, 1.0]);
        let mut modified = DMatrix::zeros(2, 2);

        tr.modify_step_width(&hessian_large, &mut modified);
        assert_relative_eq!(tr.scaling_vector[0], 4.0);
        assert_relative_eq!(tr.scaling_vector[1], 9.0);

        // a smaller diagonal must not lower the scaling
        tr.modify_step_width(&hessian_small, &mut modified);
        assert_relative_eq!(tr.scaling_vector[0], 4.0);
        assert_relative_eq!(tr.scaling_vector[1], 9.0);
    }

    #[test]
    fn test_modify_step_width_adds_damping() {
        let mut tr = control_with_scaling(&[2.0, 3.0]);
        tr.lambda = 0.5;
        let hessian = DMatrix::from_row_slice(2, 2, &[2.0f32, 1.0, 1.0, 3.0]);
        let mut modified = DMatrix::zeros(2, 2);
        tr.modify_step_width(&hessian, &mut modified);
        assert_relative_eq!(modified[(0, 0)], 2.0 + 0.5 * 2.0);
        assert_relative_eq!(modified[(1, 1)], 3.0 + 0.5 * 3.0);
        assert_relative_eq!(modified[(0, 1)], 1.0);
    }

    #[test]
    fn test_initialize_step_bound() {
        let mut tr = control_with_scaling(&[4.0, 4.0]);
        let parameters = [3.0f32, 4.0];
        tr.initialize_step_bound(&parameters, &[0, 1]);
        // ||sqrt(4) * (3, 4)|| = 10
        assert_relative_eq!(tr.step_bound, 1000.0);
    }

    #[test]
    fn test_initialize_step_bound_zero_parameters() {
        let mut tr = control_with_scaling(&[1.0, 1.0]);
        let parameters = [0.0f32, 0.0];
        tr.initialize_step_bound(&parameters, &[0, 1]);
        assert_relative_eq!(tr.step_bound, 100.0);
    }

    #[test]
    fn test_calc_phi_on_identity() {
        let mut tr = control_with_scaling(&[1.0, 1.0]);
        tr.step_bound = 1.0;
        let delta = dvector![3.0f32, 4.0];
        let inverted = DMatrix::identity(2, 2);
        tr.calc_phi(&delta, &inverted);
        assert_relative_eq!(tr.phi, 4.0);
        // (D delta) . (D delta) / ||delta|| = 25 / 5
        assert_relative_eq!(tr.phi_derivative, 5.0);
    }

    #[test]
    fn test_update_step_bound_poor_ratio_shrinks() {
        let mut tr = control_with_scaling(&[1.0, 1.0]);
        tr.step_bound = 10.0;
        tr.lambda = 0.1;
        tr.approximation_ratio = 0.1;
        tr.actual_reduction = 0.05;
        tr.directive_derivative = -0.5;
        let delta = dvector![1.0f32, 0.0];
        tr.update_step_bound(&delta, 90.0, 100.0);
        assert!(tr.step_bound < 10.0);
        assert!(tr.lambda > 0.1);
    }

    #[test]
    fn test_update_step_bound_good_ratio_expands() {
        let mut tr = control_with_scaling(&[1.0, 1.0]);
        tr.step_bound = 1.0;
        tr.lambda = 0.4;
        tr.approximation_ratio = 0.9;
        tr.actual_reduction = 0.9;
        let delta = dvector![3.0f32, 4.0];
        tr.update_step_bound(&delta, 10.0, 100.0);
        assert_relative_eq!(tr.step_bound, 10.0);
        assert_relative_eq!(tr.lambda, 0.2);
    }

    #[test]
    fn test_update_step_bound_moderate_ratio_keeps_values() {
        let mut tr = control_with_scaling(&[1.0, 1.0]);
        tr.step_bound = 7.0;
        tr.lambda = 0.4;
        tr.approximation_ratio = 0.5;
        tr.actual_reduction = 0.3;
        let delta = dvector![1.0f32, 1.0];
        tr.update_step_bound(&delta, 70.0, 100.0);
        assert_relative_eq!(tr.step_bound, 7.0);
        assert_relative_eq!(tr.lambda, 0.4);
    }

    #[test]
    fn test_update_lambda_tightens_bounds() {
        let mut tr = control_with_scaling(&[1.0]);
        tr.step_bound = 1.0;
        tr.lambda = 1.0;
        tr.lambda_lower_bound = 0.0;
        tr.lambda_upper_bound = 10.0;
        tr.phi = 0.5;
        tr.phi_derivative = -1.0;
        tr.update_lambda();
        // phi > 0 raises the lower bound to the old lambda before the step
        assert!(tr.lambda_lower_bound >= 1.0);
        assert!(tr.lambda >= tr.lambda_lower_bound);
    }
}
