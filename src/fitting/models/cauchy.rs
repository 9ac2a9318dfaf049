use crate::fitting::models::{FitModel, ModelContext};
use nalgebra::DMatrix;

/// Elliptic 2D Cauchy (Lorentzian) peak,
/// `[amplitude, x0, y0, width_x, width_y, offset]`.
pub struct Cauchy2DElliptic;

impl FitModel for Cauchy2DElliptic {
    fn n_parameters(&self) -> usize {
        6
    }

    fn evaluate(&self, p: &[f32], ctx: &ModelContext, curve: &mut [f32]) {
        let size = ctx.grid_size();
        for iy in 0..size {
            for ix in 0..size {
                let x = ix as f32;
                let y = iy as f32;
                let argx = ((p[1] - x) / p[3]) * ((p[1] - x) / p[3]) + 1.0;
                let argy = ((p[2] - y) / p[4]) * ((p[2] - y) / p[4]) + 1.0;
                curve[iy * size + ix] = p[0] / (argx * argy) + p[5];
            }
        }
    }

    fn derivatives(&self, p: &[f32], ctx: &ModelContext, jacobian: &mut DMatrix<f32>) {
        let size = ctx.grid_size();
        for iy in 0..size {
            for ix in 0..size {
                let x = ix as f32;
                let y = iy as f32;
                let argx = ((p[1] - x) / p[3]) * ((p[1] - x) / p[3]) + 1.0;
                let argy = ((p[2] - y) / p[4]) * ((p[2] - y) / p[4]) + 1.0;
                let point_index = iy * size + ix;

                jacobian[(point_index, 0)] = 1.0 / (argx * argy);
                jacobian[(point_index, 1)] =
                    -2.0 * p[0] * (p[1] - x) / (p[3] * p[3] * argx * argx * argy);
                jacobian[(point_index, 2)] =
                    -2.0 * p[0] * (p[2] - y) / (p[4] * p[4] * argy * argy * argx);
                jacobian[(point_index, 3)] =
                    2.0 * p[0] * (p[1] - x) * (p[1] - x) / (p[3] * p[3] * p[3] * argx * argx * argy);
                jacobian[(point_index, 4)] =
                    2.0 * p[0] * (p[2] - y) * (p[2] - y) / (p[4] * p[4] * p[4] * argy * argy * argx);
                jacobian[(point_index, 5)] = 1.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitting::models::test_helpers::{
        check_derivatives_against_finite_differences, context_without_user_info,
    };
    use approx::assert_relative_eq;

    #[test]
    fn test_peak_value() {
        let ctx = context_without_user_info(25);
        let p = [6.0f32, 2.0, 2.0, 1.0, 1.5, 0.25];
        let mut curve = vec![0.0f32; 25];
        Cauchy2DElliptic.evaluate(&p, &ctx, &mut curve);
        // both lobes are 1 at the center
        assert_relative_eq!(curve[2 * 5 + 2], 6.25);
    }

    #[test]
    fn test_derivatives() {
        let ctx = context_without_user_info(25);
        let p = [6.0f32, 2.0, 2.0, 1.0, 1.5, 0.25];
        check_derivatives_against_finite_differences(&Cauchy2DElliptic, &p, &ctx);
    }
}
