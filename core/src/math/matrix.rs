use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Gram matrix `JᵀJ` of a Jacobian.
    pub fn gram(jacobian: ArrayView2<f64>) -> Array2<f64> {
        jacobian.t().dot(&jacobian)
    }

    /// Product `Jᵀr`.
    pub fn transpose_mul(jacobian: ArrayView2<f64>, residuals: ArrayView1<f64>) -> Array1<f64> {
        jacobian.t().dot(&residuals)
    }

    /// Quadratic form `hᵀAh`.
    pub fn quadratic_form(matrix: ArrayView2<f64>, vector: ArrayView1<f64>) -> f64 {
        vector.dot(&matrix.dot(&vector))
    }

    /// Solves `A·x = b` for symmetric positive-definite `A` by Cholesky
    /// factorization. Returns `None` when a pivot is not strictly positive.
    pub fn solve_cholesky(matrix: ArrayView2<f64>, rhs: ArrayView1<f64>) -> Option<Array1<f64>> {
        let n = rhs.len();
        if matrix.nrows() != n || matrix.ncols() != n {
            return None;
        }

        let mut lower = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..=i {
                let mut sum = matrix[(i, j)];
                for k in 0..j {
                    sum -= lower[(i, k)] * lower[(j, k)];
                }
                if i == j {
                    if !(sum.is_finite() && sum > 0.0) {
                        return None;
                    }
                    lower[(i, i)] = sum.sqrt();
                } else {
                    lower[(i, j)] = sum / lower[(j, j)];
                }
            }
        }

        let mut forward = Array1::<f64>::zeros(n);
        for i in 0..n {
            let mut sum = rhs[i];
            for k in 0..i {
                sum -= lower[(i, k)] * forward[k];
            }
            forward[i] = sum / lower[(i, i)];
        }

        let mut solution = Array1::<f64>::zeros(n);
        for i in (0..n).rev() {
            let mut sum = forward[i];
            for k in (i + 1)..n {
                sum -= lower[(k, i)] * solution[k];
            }
            solution[i] = sum / lower[(i, i)];
        }

        if solution.iter().all(|v| v.is_finite()) {
            Some(solution)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn gram_matches_manual_product() {
        let jacobian = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let gram = MatrixHelper::gram(jacobian.view());
        assert_eq!(gram, array![[35.0, 44.0], [44.0, 56.0]]);
    }

    #[test]
    fn cholesky_solves_spd_system() {
        let matrix = array![[4.0, 2.0, 0.0], [2.0, 5.0, 1.0], [0.0, 1.0, 3.0]];
        let expected = array![1.0, -2.0, 0.5];
        let rhs = matrix.dot(&expected);
        let solution = MatrixHelper::solve_cholesky(matrix.view(), rhs.view()).unwrap();
        for (a, b) in solution.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn cholesky_rejects_singular_matrix() {
        let matrix = array![[1.0, 1.0], [1.0, 1.0]];
        let rhs = array![1.0, 2.0];
        assert!(MatrixHelper::solve_cholesky(matrix.view(), rhs.view()).is_none());
    }
}
