//! Assembly of the scalar objective, its gradient and the Gauss-Newton
//! approximation of the Hessian, restricted to the free parameters.
//!
//! Sign convention: the gradient entries are `sum_i w_i (y_i - c_i) d_a`
//! under LSE, so a positive solve step is a descent step and the driver adds
//! the step to the parameters.
use crate::fitting::info::{EstimatorID, FitFailure};
use nalgebra::{DMatrix, DVector};

/// Chi-square of the current curve: weighted sum of squared residuals under
/// LSE, the Poisson deviance under MLE. A non-positive model value under
/// MLE is fatal for the fit. All terms are summed in f64.
pub fn calc_chi_square(
    estimator: EstimatorID,
    curve: &DVector<f32>,
    data: &[f32],
    weight: Option<&[f32]>,
) -> Result<f32, FitFailure> {
    let mut sum = 0.0f64;
    for point_index in 0..curve.len() {
        let deviant = curve[point_index] - data[point_index];
        match estimator {
            EstimatorID::LSE => match weight {
                None => sum += (deviant * deviant) as f64,
                Some(w) => sum += (deviant * deviant * w[point_index]) as f64,
            },
            EstimatorID::MLE => {
                if curve[point_index] <= 0.0 {
                    return Err(FitFailure::NegCurvatureMLE);
                }
                if data[point_index] != 0.0 {
                    sum += 2.0
                        * (deviant as f64
                            - (data[point_index]
                                * (curve[point_index] / data[point_index]).ln())
                                as f64);
                } else {
                    sum += 2.0 * deviant as f64;
                }
            }
        }
    }
    Ok(sum as f32)
}

/// Gradient of the objective over the free parameters `free`, each entry a
/// f64 sum over all sample points. Weights apply to LSE only.
pub fn calc_gradient(
    estimator: EstimatorID,
    derivatives: &DMatrix<f32>,
    curve: &DVector<f32>,
    data: &[f32],
    weight: Option<&[f32]>,
    free: &[usize],
    gradient: &mut DVector<f32>,
) {
    for (gradient_index, &parameter_index) in free.iter().enumerate() {
        let mut sum = 0.0f64;
        for point_index in 0..curve.len() {
            let derivative = derivatives[(point_index, parameter_index)];
            let deviant = data[point_index] - curve[point_index];
            match estimator {
                EstimatorID::LSE => match weight {
                    None => sum += (deviant * derivative) as f64,
                    Some(w) => sum += (deviant * derivative * w[point_index]) as f64,
                },
                EstimatorID::MLE => {
                    sum += (-derivative * (1.0 - data[point_index] / curve[point_index])) as f64;
                }
            }
        }
        gradient[gradient_index] = sum as f32;
    }
}

/// Gauss-Newton Hessian over the free parameters: `J^T W J` under LSE, the
/// `y / c^2` weighted form under MLE. The lower triangle is summed in f64
/// and mirrored, so the result is symmetric exactly.
pub fn calc_hessian(
    estimator: EstimatorID,
    derivatives: &DMatrix<f32>,
    curve: &DVector<f32>,
    data: &[f32],
    weight: Option<&[f32]>,
    free: &[usize],
    hessian: &mut DMatrix<f32>,
) {
    for (jhessian, &jp) in free.iter().enumerate() {
        for (ihessian, &ip) in free.iter().enumerate().take(jhessian + 1) {
            let mut sum = 0.0f64;
            for point_index in 0..curve.len() {
                let di = derivatives[(point_index, ip)];
                let dj = derivatives[(point_index, jp)];
                match estimator {
                    EstimatorID::LSE => match weight {
                        None => sum += (di * dj) as f64,
                        Some(w) => sum += (di * dj * w[point_index]) as f64,
                    },
                    EstimatorID::MLE => {
                        sum += (data[point_index]
                            / (curve[point_index] * curve[point_index])
                            * di
                            * dj) as f64;
                    }
                }
            }
            hessian[(ihessian, jhessian)] = sum as f32;
            if ihessian != jhessian {
                hessian[(jhessian, ihessian)] = sum as f32;
            }
        }
    }
}
