use nalgebra::{DMatrix, DVector};

/// LU decomposition with partial (row) pivoting, Doolittle form, in place.
///
/// After a successful return `matrix` holds the unit lower triangle L in its
/// strict lower part and U in the upper part; `pivot` holds the row
/// permutation applied to the original matrix. The pivot at step `i` is the
/// largest absolute value in column `i` at or below the diagonal; a pivot
/// magnitude not above `tol` reports a degenerate matrix (the fit solver
/// passes `tol = 0.0`, so only an exactly zero column triggers).
pub fn decompose_lup(
    matrix: &mut DMatrix<f32>,
    tol: f32,
    pivot: &mut [usize],
) -> Result<(), &'static str> {
    let n = matrix.nrows();
    debug_assert!(matrix.is_square());
    debug_assert_eq!(pivot.len(), n);

    for (i, p) in pivot.iter_mut().enumerate() {
        *p = i;
    }

    for i in 0..n {
        let mut max_value = 0.0f32;
        let mut max_index = i;
        for k in i..n {
            let absolute_value = matrix[(k, i)].abs();
            if absolute_value > max_value {
                max_value = absolute_value;
                max_index = k;
            }
        }

        if max_value <= tol {
            return Err("degenerate matrix in LUP decomposition");
        }

        if max_index != i {
            pivot.swap(i, max_index);
            for j in 0..n {
                let tmp = matrix[(i, j)];
                matrix[(i, j)] = matrix[(max_index, j)];
                matrix[(max_index, j)] = tmp;
            }
        }

        let diagonal = matrix[(i, i)];
        for j in (i + 1)..n {
            matrix[(j, i)] /= diagonal;
            for k in (i + 1)..n {
                let update = matrix[(j, i)] * matrix[(i, k)];
                matrix[(j, k)] -= update;
            }
        }
    }

    Ok(())
}

/// Solve P A x = b from the factorized form produced by [`decompose_lup`].
///
/// Forward substitution against the permuted right hand side with unit
/// diagonal, then back substitution. Intermediate sums are accumulated in
/// f64, the matrix elements stay single precision.
pub fn solve_lup(lu: &DMatrix<f32>, pivot: &[usize], b: &DVector<f32>, x: &mut DVector<f32>) {
    let n = lu.nrows();
    debug_assert_eq!(b.len(), n);
    debug_assert_eq!(x.len(), n);

    for i in 0..n {
        let mut sum = b[pivot[i]] as f64;
        for k in 0..i {
            sum -= (lu[(i, k)] * x[k]) as f64;
        }
        x[i] = sum as f32;
    }

    for i in (0..n).rev() {
        let mut sum = x[i] as f64;
        for k in (i + 1)..n {
            sum -= (lu[(i, k)] * x[k]) as f64;
        }
        x[i] = (sum / lu[(i, i)] as f64) as f32;
    }
}

/// Explicit inverse from the factorized form: the solve applied column by
/// column against the permuted identity.
pub fn invert_lup(lu: &DMatrix<f32>, pivot: &[usize], inverse: &mut DMatrix<f32>) {
    let n = lu.nrows();
    debug_assert_eq!(inverse.nrows(), n);
    debug_assert_eq!(inverse.ncols(), n);

    for j in 0..n {
        for i in 0..n {
            let mut sum = if pivot[i] == j { 1.0f64 } else { 0.0f64 };
            for k in 0..i {
                sum -= (lu[(i, k)] * inverse[(k, j)]) as f64;
            }
            inverse[(i, j)] = sum as f32;
        }

        for i in (0..n).rev() {
            let mut sum = inverse[(i, j)] as f64;
            for k in (i + 1)..n {
                sum -= (lu[(i, k)] * inverse[(k, j)]) as f64;
            }
            inverse[(i, j)] = (sum / lu[(i, i)] as f64) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::dvector;

    fn test_matrix() -> DMatrix<f32> {
        DMatrix::from_row_slice(
            3,
            3,
            &[2.0f32, 1.0, 1.0, 4.0, -6.0, 0.0, -2.0, 7.0, 2.0],
        )
    }

    #[test]
    fn test_decompose_and_solve() {
        let a = test_matrix();
        // b = A * [1, 2, 3]
        let x_expected = dvector![1.0f32, 2.0, 3.0];
        let b = &a * &x_expected;

        let mut lu = a.clone();
        let mut pivot = vec![0usize; 3];
        decompose_lup(&mut lu, 0.0, &mut pivot).unwrap();

        // pivot must be a permutation of 0..N
        let mut sorted = pivot.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2]);

        let mut x = DVector::zeros(3);
        solve_lup(&lu, &pivot, &b, &mut x);
        for i in 0..3 {
            assert_relative_eq!(x[i], x_expected[i], epsilon = 1e-4);
        }
    }

    #[test]
    fn test_invert() {
        let a = test_matrix();
        let mut lu = a.clone();
        let mut pivot = vec![0usize; 3];
        decompose_lup(&mut lu, 0.0, &mut pivot).unwrap();

        let mut inverse = DMatrix::zeros(3, 3);
        invert_lup(&lu, &pivot, &mut inverse);

        let identity = &a * &inverse;
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(identity[(i, j)], expected, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_singular_matrix_reported() {
        // second column is zero
        let mut a = DMatrix::from_row_slice(3, 3, &[1.0f32, 0.0, 2.0, 3.0, 0.0, 4.0, 5.0, 0.0, 6.0]);
        let mut pivot = vec![0usize; 3];
        assert!(decompose_lup(&mut a, 0.0, &mut pivot).is_err());
    }

    #[test]
    fn test_solve_with_row_swaps() {
        // leading zero forces pivoting
        let a = DMatrix::from_row_slice(2, 2, &[0.0f32, 1.0, 1.0, 0.0]);
        let b = dvector![5.0f32, 7.0];
        let mut lu = a.clone();
        let mut pivot = vec![0usize; 2];
        decompose_lup(&mut lu, 0.0, &mut pivot).unwrap();
        let mut x = DVector::zeros(2);
        solve_lup(&lu, &pivot, &b, &mut x);
        assert_relative_eq!(x[0], 7.0);
        assert_relative_eq!(x[1], 5.0);
    }
}
