//! Least-squares linear solves.
//!
//! Two places need a robust `A x = b` solve:
//! - the damped normal equations of every Levenberg–Marquardt step
//! - `W⁻¹ B` in the multivariate PSRF, where `W` may be nearly singular
//!
//! Both go through SVD so rank-deficient or tall systems return the
//! minimum-norm least-squares solution instead of failing.

use nalgebra::{DMatrix, DVector};

/// Singular-value cutoffs, tried from strictest to loosest.
const TOLERANCES: [f64; 3] = [1e-12, 1e-10, 1e-8];

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    for &tol in &TOLERANCES {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }
    None
}

/// Matrix right-hand side variant of [`solve_least_squares`].
pub fn solve_least_squares_matrix(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let svd = x.clone().svd(true, true);
    for &tol in &TOLERANCES {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn matrix_rhs_matches_inverse() {
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let b = DMatrix::identity(2, 2);
        let inv = solve_least_squares_matrix(&a, &b).unwrap();
        let prod = &a * &inv;
        assert!((prod - DMatrix::<f64>::identity(2, 2)).amax() < 1e-12);
    }
}
