use crate::fitting::models::{FitModel, ModelContext};
use nalgebra::DMatrix;

/// Straight line, `[offset, slope]`.
pub struct Linear1D;

impl FitModel for Linear1D {
    fn n_parameters(&self) -> usize {
        2
    }

    fn evaluate(&self, p: &[f32], ctx: &ModelContext, curve: &mut [f32]) {
        for point_index in 0..ctx.n_points {
            let x = ctx.x(point_index);
            curve[point_index] = p[0] + p[1] * x;
        }
    }

    fn derivatives(&self, _p: &[f32], ctx: &ModelContext, jacobian: &mut DMatrix<f32>) {
        for point_index in 0..ctx.n_points {
            jacobian[(point_index, 0)] = 1.0;
            jacobian[(point_index, 1)] = ctx.x(point_index);
        }
    }
}
