//! Model registry: every [`ModelID`] maps to an object exposing the model
//! curve and its analytic partial derivatives. No dispatch by branching in
//! the solver; the driver asks the registry once and calls through the
//! trait.
use crate::fitting::info::{FitInfo, ModelID};
use nalgebra::DMatrix;

pub mod cauchy;
pub mod classic;
pub mod gauss;
pub mod linear;
pub mod ramsey;

/// One fit model: the curve evaluated at the current parameters and the
/// Jacobian column of every parameter at every sample point.
///
/// `curve` has `n_points` entries; `jacobian` is `n_points` rows by
/// `n_parameters` columns, column `j` holding the partial derivative of the
/// model with respect to parameter `j` over all sample points.
pub trait FitModel: Sync {
    fn n_parameters(&self) -> usize;

    fn evaluate(&self, parameters: &[f32], ctx: &ModelContext, curve: &mut [f32]);

    fn derivatives(&self, parameters: &[f32], ctx: &ModelContext, jacobian: &mut DMatrix<f32>);
}

impl ModelID {
    /// Registry lookup.
    pub fn model(self) -> &'static dyn FitModel {
        match self {
            ModelID::Gauss1D => &gauss::Gauss1D,
            ModelID::Gauss2D => &gauss::Gauss2D,
            ModelID::Gauss2DElliptic => &gauss::Gauss2DElliptic,
            ModelID::Gauss2DRotated => &gauss::Gauss2DRotated,
            ModelID::Cauchy2DElliptic => &cauchy::Cauchy2DElliptic,
            ModelID::Linear1D => &linear::Linear1D,
            ModelID::FletcherPowellHelix => &classic::FletcherPowellHelix,
            ModelID::BrownDennis => &classic::BrownDennis,
            ModelID::RamseyVarP => &ramsey::RamseyVarP,
        }
    }
}

/// Per-fit context handed to the models: sample count, the index of this
/// fit within a batched payload, and the opaque user info bytes.
pub struct ModelContext<'a> {
    pub n_points: usize,
    pub fit_index: usize,
    user_info: Option<&'a [u8]>,
    user_info_size: usize,
}

impl<'a> ModelContext<'a> {
    pub fn new(info: &FitInfo, fit_index: usize, user_info: Option<&'a [u8]>) -> Self {
        ModelContext {
            n_points: info.n_points,
            fit_index,
            user_info,
            user_info_size: info.user_info_size,
        }
    }

    /// Independent variable of a 1D sample.
    ///
    /// Without user info the sample index is the coordinate. A payload of
    /// exactly `n_points` floats holds one coordinate per sample; a larger
    /// payload holds one block of `n_points` coordinates per fit, selected
    /// by `fit_index`.
    pub fn x(&self, point_index: usize) -> f32 {
        let bytes = match self.user_info {
            None => return point_index as f32,
            Some(bytes) => bytes,
        };
        let n_floats = self.user_info_size / core::mem::size_of::<f32>();
        if n_floats == self.n_points {
            self.user_info_float(bytes, point_index)
        } else if n_floats > self.n_points {
            self.user_info_float(bytes, self.fit_index * self.n_points + point_index)
        } else {
            0.0
        }
    }

    /// Side length of the square sample grid of the 2D models.
    pub fn grid_size(&self) -> usize {
        (self.n_points as f64).sqrt() as usize
    }

    fn user_info_float(&self, bytes: &[u8], index: usize) -> f32 {
        let start = index * core::mem::size_of::<f32>();
        match bytes.get(start..start + core::mem::size_of::<f32>()) {
            Some(chunk) => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(chunk);
                f32::from_ne_bytes(raw)
            }
            None => 0.0,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;

    /// Central finite differences over every parameter and sample point,
    /// compared against the analytic Jacobian with a loose single
    /// precision tolerance.
    pub fn check_derivatives_against_finite_differences(
        model: &dyn FitModel,
        parameters: &[f32],
        ctx: &ModelContext,
    ) {
        let n_points = ctx.n_points;
        let n_parameters = model.n_parameters();

        let mut jacobian = DMatrix::zeros(n_points, n_parameters);
        model.derivatives(parameters, ctx, &mut jacobian);

        let mut plus = vec![0.0f32; n_points];
        let mut minus = vec![0.0f32; n_points];
        for j in 0..n_parameters {
            let h = 1e-3 * parameters[j].abs().max(1.0);
            let mut shifted = parameters.to_vec();
            shifted[j] = parameters[j] + h;
            model.evaluate(&shifted, ctx, &mut plus);
            shifted[j] = parameters[j] - h;
            model.evaluate(&shifted, ctx, &mut minus);

            for i in 0..n_points {
                let numeric = (plus[i] - minus[i]) / (2.0 * h);
                let analytic = jacobian[(i, j)];
                let tolerance = 1e-2 + 2e-2 * analytic.abs();
                assert!(
                    (numeric - analytic).abs() <= tolerance,
                    "parameter {} point {}: analytic {} vs numeric {}",
                    j,
                    i,
                    analytic,
                    numeric
                );
            }
        }
    }

    pub fn context_without_user_info(n_points: usize) -> ModelContext<'static> {
        let info = FitInfo {
            n_points,
            n_parameters: 0,
            n_parameters_to_fit: 0,
            max_iterations: 0,
            model_id: ModelID::Linear1D,
            estimator_id: crate::fitting::info::EstimatorID::LSE,
            user_info_size: 0,
        };
        ModelContext::new(&info, 0, None)
    }
}
