use crate::fitting::models::{FitModel, ModelContext};
use nalgebra::DMatrix;
use std::f32::consts::PI;

/// Two-frequency Ramsey fringe with variable-exponent decay,
/// `[a1, a2, c, f1, f2, p, t2star, x1, x2]`:
///
/// `exp(-(x/t2star)^p) * (a1*cos(2*pi*f1*(x - x1)) + a2*cos(2*pi*f2*(x - x2))) + c`
pub struct RamseyVarP;

impl FitModel for RamseyVarP {
    fn n_parameters(&self) -> usize {
        9
    }

    fn evaluate(&self, p: &[f32], ctx: &ModelContext, curve: &mut [f32]) {
        for point_index in 0..ctx.n_points {
            let x = ctx.x(point_index);

            let t2arg = (x / p[6]).powf(p[5]);
            let ex = (-t2arg).exp();
            let phasearg1 = 2.0 * PI * p[3] * (x - p[7]);
            let phasearg2 = 2.0 * PI * p[4] * (x - p[8]);

            curve[point_index] = ex * (p[0] * phasearg1.cos() + p[1] * phasearg2.cos()) + p[2];
        }
    }

    fn derivatives(&self, p: &[f32], ctx: &ModelContext, jacobian: &mut DMatrix<f32>) {
        for point_index in 0..ctx.n_points {
            let x = ctx.x(point_index);

            let t2arg = (x / p[6]).powf(p[5]);
            let ex = (-t2arg).exp();
            let phasearg1 = 2.0 * PI * p[3] * (x - p[7]);
            let phasearg2 = 2.0 * PI * p[4] * (x - p[8]);
            let cos1 = phasearg1.cos();
            let sin1 = phasearg1.sin();
            let cos2 = phasearg2.cos();
            let sin2 = phasearg2.sin();

            jacobian[(point_index, 0)] = ex * cos1;
            jacobian[(point_index, 1)] = ex * cos2;
            jacobian[(point_index, 2)] = 1.0;
            jacobian[(point_index, 3)] = -p[0] * 2.0 * PI * (x - p[7]) * ex * sin1;
            jacobian[(point_index, 4)] = -p[1] * 2.0 * PI * (x - p[8]) * ex * sin2;
            // the small shift keeps the logarithm finite at x = 0
            jacobian[(point_index, 5)] =
                -(x / p[6] + 0.000001).ln() * ex * t2arg * (p[0] * cos1 + p[1] * cos2);
            jacobian[(point_index, 6)] = p[5] * 1.0 / (p[6] * p[6]) * x * ex
                * (x / p[6]).powf(p[5] - 1.0)
                * (p[0] * cos1 + p[1] * cos2);
            jacobian[(point_index, 7)] = p[0] * 2.0 * PI * p[3] * sin1 * ex;
            jacobian[(point_index, 8)] = p[1] * 2.0 * PI * p[4] * sin2 * ex;
        }
    }
}
