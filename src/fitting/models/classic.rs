//! Classic nonlinear least squares test problems (Fletcher-Powell helical
//! valley, Brown-Dennis) expressed as fit models over three respectively
//! `n_points` residual samples against zero data.
use crate::fitting::models::{FitModel, ModelContext};
use nalgebra::DMatrix;
use std::f32::consts::PI;

/// Fletcher-Powell helical valley, `[p0, p1, p2]`, three residuals.
pub struct FletcherPowellHelix;

impl FitModel for FletcherPowellHelix {
    fn n_parameters(&self) -> usize {
        3
    }

    fn evaluate(&self, p: &[f32], _ctx: &ModelContext, curve: &mut [f32]) {
        let theta = if 0.0 < p[0] {
            0.5 * (p[1] / p[0]).atan() / PI
        } else if p[0] < 0.0 {
            0.5 * (p[1] / p[0]).atan() / PI + 0.5
        } else if 0.0 < p[1] {
            0.25
        } else if p[1] < 0.0 {
            -0.25
        } else {
            0.0
        };

        curve[0] = 10.0 * (p[2] - 10.0 * theta);
        curve[1] = 10.0 * ((p[0] * p[0] + p[1] * p[1]).sqrt() - 1.0);
        curve[2] = p[2];
    }

    fn derivatives(&self, p: &[f32], _ctx: &ModelContext, jacobian: &mut DMatrix<f32>) {
        let arg = p[0] * p[0] + p[1] * p[1];

        jacobian[(0, 0)] = 100.0 * 1.0 / (2.0 * PI) * p[1] / arg;
        jacobian[(1, 0)] = 10.0 * p[0] / arg.sqrt();
        jacobian[(2, 0)] = 0.0;

        jacobian[(0, 1)] = -100.0 * 1.0 / (2.0 * PI) * p[0] / arg;
        jacobian[(1, 1)] = 10.0 * p[1] / arg.sqrt();
        jacobian[(2, 1)] = 0.0;

        jacobian[(0, 2)] = 10.0;
        jacobian[(1, 2)] = 0.0;
        jacobian[(2, 2)] = 1.0;
    }
}

/// Brown-Dennis function, `[p0, p1, p2, p3]`, sampled at `t = i / 5`.
pub struct BrownDennis;

impl FitModel for BrownDennis {
    fn n_parameters(&self) -> usize {
        4
    }

    fn evaluate(&self, p: &[f32], ctx: &ModelContext, curve: &mut [f32]) {
        for point_index in 0..ctx.n_points {
            let t = point_index as f32 / 5.0;
            let arg1 = p[0] + p[1] * t - t.exp();
            let arg2 = p[2] + p[3] * t.sin() - t.cos();
            curve[point_index] = arg1 * arg1 + arg2 * arg2;
        }
    }

    fn derivatives(&self, p: &[f32], ctx: &ModelContext, jacobian: &mut DMatrix<f32>) {
        for point_index in 0..ctx.n_points {
            let t = point_index as f32 / 5.0;
            let arg1 = p[0] + p[1] * t - t.exp();
            let arg2 = p[2] + p[3] * t.sin() - t.cos();

            jacobian[(point_index, 0)] = 2.0 * arg1;
            jacobian[(point_index, 1)] = 2.0 * t * arg1;
            jacobian[(point_index, 2)] = 2.0 * arg2;
            jacobian[(point_index, 3)] = 2.0 * t.sin() * arg2;
        }
    }
}
