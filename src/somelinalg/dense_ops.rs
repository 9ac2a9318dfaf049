use nalgebra::{DMatrix, DVector};

/// Euclidean norm of a vector. The squares are summed in f64 so that
/// long single precision vectors do not lose the small components.
pub fn enorm(v: &DVector<f32>) -> f32 {
    let mut sum = 0.0f64;
    for x in v.iter() {
        sum += (*x as f64) * (*x as f64);
    }
    sum.sqrt() as f32
}

/// Dot product between two vectors, accumulated in f64.
pub fn dot(a: &DVector<f32>, b: &DVector<f32>) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        sum += (*x as f64) * (*y as f64);
    }
    sum as f32
}

/// product += matrix * vector
///
/// Row sums are accumulated in f64 and written back in single precision.
pub fn mat_vec_accumulate(product: &mut DVector<f32>, matrix: &DMatrix<f32>, vector: &DVector<f32>) {
    let n_rows = matrix.nrows();
    let n_cols = matrix.ncols();
    debug_assert_eq!(vector.len(), n_cols);
    debug_assert_eq!(product.len(), n_rows);

    let mut acc: Vec<f64> = (0..n_rows).map(|row| product[row] as f64).collect();
    for col in 0..n_cols {
        let v = vector[col] as f64;
        for (row, a) in acc.iter_mut().enumerate() {
            *a += matrix[(row, col)] as f64 * v;
        }
    }
    for (row, a) in acc.iter().enumerate() {
        product[row] = *a as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::dvector;

    #[test]
    fn test_enorm() {
        let v = dvector![3.0f32, 4.0];
        assert_relative_eq!(enorm(&v), 5.0);
        assert_eq!(enorm(&DVector::<f32>::zeros(4)), 0.0);
    }

    #[test]
    fn test_dot() {
        let a = dvector![1.0f32, 2.0, 3.0];
        let b = dvector![4.0f32, -5.0, 6.0];
        assert_relative_eq!(dot(&a, &b), 12.0);
    }

    #[test]
    fn test_mat_vec_accumulate() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let v = dvector![1.0f32, 0.0, -1.0];
        let mut product = dvector![10.0f32, 20.0];
        mat_vec_accumulate(&mut product, &m, &v);
        assert_relative_eq!(product[0], 10.0 + 1.0 - 3.0);
        assert_relative_eq!(product[1], 20.0 + 4.0 - 6.0);
    }
}
