use crate::fitting::models::{FitModel, ModelContext};
use nalgebra::DMatrix;

/// 1D Gaussian peak on an offset.
///
/// Parameters: `[amplitude, center, width, offset]`. The independent
/// variable comes from the user info payload (see
/// [`ModelContext::x`](crate::fitting::models::ModelContext::x)), the
/// sample index by default.
pub struct Gauss1D;

impl FitModel for Gauss1D {
    fn n_parameters(&self) -> usize {
        4
    }

    fn evaluate(&self, p: &[f32], ctx: &ModelContext, curve: &mut [f32]) {
        for point_index in 0..ctx.n_points {
            let x = ctx.x(point_index);
            let argx = (x - p[1]) * (x - p[1]) / (2.0 * p[2] * p[2]);
            let ex = (-argx).exp();
            curve[point_index] = p[0] * ex + p[3];
        }
    }

    fn derivatives(&self, p: &[f32], ctx: &ModelContext, jacobian: &mut DMatrix<f32>) {
        for point_index in 0..ctx.n_points {
            let x = ctx.x(point_index);
            let argx = (x - p[1]) * (x - p[1]) / (2.0 * p[2] * p[2]);
            let ex = (-argx).exp();

            jacobian[(point_index, 0)] = ex;
            jacobian[(point_index, 1)] = p[0] * (x - p[1]) * ex / (p[2] * p[2]);
            jacobian[(point_index, 2)] = p[0] * (x - p[1]) * (x - p[1]) * ex / (p[2] * p[2] * p[2]);
            jacobian[(point_index, 3)] = 1.0;
        }
    }
}

/// Symmetric 2D Gaussian, `[amplitude, x0, y0, width, offset]`, on the
/// square sample grid.
pub struct Gauss2D;

impl FitModel for Gauss2D {
    fn n_parameters(&self) -> usize {
        5
    }

    fn evaluate(&self, p: &[f32], ctx: &ModelContext, curve: &mut [f32]) {
        let size = ctx.grid_size();
        for iy in 0..size {
            for ix in 0..size {
                let x = ix as f32;
                let y = iy as f32;
                let argx = (x - p[1]) * (x - p[1]) / (2.0 * p[3] * p[3]);
                let argy = (y - p[2]) * (y - p[2]) / (2.0 * p[3] * p[3]);
                let ex = (-(argx + argy)).exp();
                curve[iy * size + ix] = p[0] * ex + p[4];
            }
        }
    }

    fn derivatives(&self, p: &[f32], ctx: &ModelContext, jacobian: &mut DMatrix<f32>) {
        let size = ctx.grid_size();
        for iy in 0..size {
            for ix in 0..size {
                let x = ix as f32;
                let y = iy as f32;
                let argx = (x - p[1]) * (x - p[1]) / (2.0 * p[3] * p[3]);
                let argy = (y - p[2]) * (y - p[2]) / (2.0 * p[3] * p[3]);
                let ex = (-(argx + argy)).exp();
                let point_index = iy * size + ix;

                jacobian[(point_index, 0)] = ex;
                jacobian[(point_index, 1)] = p[0] * ex * (x - p[1]) / (p[3] * p[3]);
                jacobian[(point_index, 2)] = p[0] * ex * (y - p[2]) / (p[3] * p[3]);
                jacobian[(point_index, 3)] = ex * p[0]
                    * ((x - p[1]) * (x - p[1]) + (y - p[2]) * (y - p[2]))
                    / (p[3] * p[3] * p[3]);
                jacobian[(point_index, 4)] = 1.0;
            }
        }
    }
}

/// Elliptic 2D Gaussian, `[amplitude, x0, y0, sigma_x, sigma_y, offset]`.
pub struct Gauss2DElliptic;

impl FitModel for Gauss2DElliptic {
    fn n_parameters(&self) -> usize {
        6
    }

    fn evaluate(&self, p: &[f32], ctx: &ModelContext, curve: &mut [f32]) {
        let size = ctx.grid_size();
        for iy in 0..size {
            for ix in 0..size {
                let x = ix as f32;
                let y = iy as f32;
                let argx = (x - p[1]) * (x - p[1]) / (2.0 * p[3] * p[3]);
                let argy = (y - p[2]) * (y - p[2]) / (2.0 * p[4] * p[4]);
                let ex = (-(argx + argy)).exp();
                curve[iy * size + ix] = p[0] * ex + p[5];
            }
        }
    }

    fn derivatives(&self, p: &[f32], ctx: &ModelContext, jacobian: &mut DMatrix<f32>) {
        let size = ctx.grid_size();
        for iy in 0..size {
            for ix in 0..size {
                let x = ix as f32;
                let y = iy as f32;
                let argx = (x - p[1]) * (x - p[1]) / (2.0 * p[3] * p[3]);
                let argy = (y - p[2]) * (y - p[2]) / (2.0 * p[4] * p[4]);
                let ex = (-(argx + argy)).exp();
                let point_index = iy * size + ix;

                jacobian[(point_index, 0)] = ex;
                jacobian[(point_index, 1)] = p[0] * (x - p[1]) * ex / (p[3] * p[3]);
                jacobian[(point_index, 2)] = p[0] * (y - p[2]) * ex / (p[4] * p[4]);
                jacobian[(point_index, 3)] =
                    p[0] * (x - p[1]) * (x - p[1]) * ex / (p[3] * p[3] * p[3]);
                jacobian[(point_index, 4)] =
                    p[0] * (y - p[2]) * (y - p[2]) * ex / (p[4] * p[4] * p[4]);
                jacobian[(point_index, 5)] = 1.0;
            }
        }
    }
}

/// Rotated elliptic 2D Gaussian,
/// `[amplitude, x0, y0, sigma_x, sigma_y, background, rotation_angle]`.
pub struct Gauss2DRotated;

impl FitModel for Gauss2DRotated {
    fn n_parameters(&self) -> usize {
        7
    }

    fn evaluate(&self, p: &[f32], ctx: &ModelContext, curve: &mut [f32]) {
        let size = ctx.grid_size();
        let amplitude = p[0];
        let x0 = p[1];
        let y0 = p[2];
        let sig_x = p[3];
        let sig_y = p[4];
        let background = p[5];
        let rot_sin = p[6].sin();
        let rot_cos = p[6].cos();

        for iy in 0..size {
            for ix in 0..size {
                let x = ix as f32;
                let y = iy as f32;
                let arga = (x - x0) * rot_cos - (y - y0) * rot_sin;
                let argb = (x - x0) * rot_sin + (y - y0) * rot_cos;
                let ex =
                    (-0.5 * ((arga / sig_x) * (arga / sig_x) + (argb / sig_y) * (argb / sig_y)))
                        .exp();
                curve[iy * size + ix] = amplitude * ex + background;
            }
        }
    }

    fn derivatives(&self, p: &[f32], ctx: &ModelContext, jacobian: &mut DMatrix<f32>) {
        let size = ctx.grid_size();
        let amplitude = p[0];
        let x0 = p[1];
        let y0 = p[2];
        let sig_x = p[3];
        let sig_y = p[4];
        let rot_sin = p[6].sin();
        let rot_cos = p[6].cos();

        for iy in 0..size {
            for ix in 0..size {
                let x = ix as f32;
                let y = iy as f32;
                let arga = (x - x0) * rot_cos - (y - y0) * rot_sin;
                let argb = (x - x0) * rot_sin + (y - y0) * rot_cos;
                let ex =
                    (-0.5 * ((arga / sig_x) * (arga / sig_x) + (argb / sig_y) * (argb / sig_y)))
                        .exp();
                let point_index = iy * size + ix;

                jacobian[(point_index, 0)] = ex;
                jacobian[(point_index, 1)] = ex
                    * (amplitude * rot_cos * arga / (sig_x * sig_x)
                        + amplitude * rot_sin * argb / (sig_y * sig_y));
                jacobian[(point_index, 2)] = ex
                    * (-amplitude * rot_sin * arga / (sig_x * sig_x)
                        + amplitude * rot_cos * argb / (sig_y * sig_y));
                jacobian[(point_index, 3)] = ex * amplitude * arga * arga / (sig_x * sig_x * sig_x);
                jacobian[(point_index, 4)] = ex * amplitude * argb * argb / (sig_y * sig_y * sig_y);
                jacobian[(point_index, 5)] = 1.0;
                jacobian[(point_index, 6)] = ex * amplitude * arga * argb
                    * (1.0 / (sig_x * sig_x) - 1.0 / (sig_y * sig_y));
            }
        }
    }
}
