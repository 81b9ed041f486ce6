//! Central finite-difference Jacobians.
//!
//! Used for both the Levenberg–Marquardt steps and the Fisher information at
//! the best fit. The residual function must be deterministic; otherwise the
//! difference quotients are meaningless.

use nalgebra::DMatrix;

use crate::error::UqError;
use crate::models::ParametricModel;

/// Default relative step for central differences.
pub const DEFAULT_JACOBIAN_STEP: f64 = 1e-6;

/// Jacobian `∂f_m/∂θ_k` of a vector-valued function, shape `M × N`.
///
/// Column `k` uses `h_k = step * max(1, |θ_k|)` and
/// `(f(θ + h_k e_k) − f(θ − h_k e_k)) / (2 h_k)`.
pub fn numerical_jacobian<F>(f: F, theta: &[f64], step: f64) -> Result<DMatrix<f64>, UqError>
where
    F: Fn(&[f64]) -> Result<Vec<f64>, UqError>,
{
    if !(step.is_finite() && step > 0.0) {
        return Err(UqError::parameter(format!(
            "Jacobian step must be finite and > 0 (got {step})."
        )));
    }

    let n = theta.len();
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(n);
    let mut m = None;

    let mut probe = theta.to_vec();
    for k in 0..n {
        let h = step * theta[k].abs().max(1.0);

        probe[k] = theta[k] + h;
        let plus = f(&probe)?;
        probe[k] = theta[k] - h;
        let minus = f(&probe)?;
        probe[k] = theta[k];

        if plus.len() != minus.len() || m.is_some_and(|m| m != plus.len()) {
            return Err(UqError::dimension("Function output length changed between evaluations."));
        }
        m = Some(plus.len());

        let col: Vec<f64> = plus
            .iter()
            .zip(minus.iter())
            .map(|(p, q)| (p - q) / (2.0 * h))
            .collect();
        if col.iter().any(|v| !v.is_finite()) {
            return Err(UqError::non_finite(format!(
                "Non-finite Jacobian column {k} at theta={theta:?}."
            )));
        }
        columns.push(col);
    }

    let m = m.unwrap_or(0);
    Ok(DMatrix::from_fn(m, n, |i, k| columns[k][i]))
}

/// Jacobian of `model.residual` at `theta`.
pub fn residual_jacobian(
    model: &ParametricModel,
    theta: &[f64],
    step: f64,
) -> Result<DMatrix<f64>, UqError> {
    numerical_jacobian(|x| model.residual(x), theta, step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jacobian_of_linear_map_is_exact() {
        // f(x) = [x0 + 2 x1, 3 x0, -x1]
        let f = |x: &[f64]| Ok(vec![x[0] + 2.0 * x[1], 3.0 * x[0], -x[1]]);
        let j = numerical_jacobian(f, &[0.7, -1.3], DEFAULT_JACOBIAN_STEP).unwrap();
        let expected = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 0.0, 0.0, -1.0]);
        assert_eq!(j.shape(), (3, 2));
        assert!((j - expected).amax() < 1e-8);
    }

    #[test]
    fn jacobian_of_nonlinear_map() {
        // f(x) = [exp(x0) * x1]; df/dx0 = exp(x0) x1, df/dx1 = exp(x0)
        let f = |x: &[f64]| Ok(vec![x[0].exp() * x[1]]);
        let j = numerical_jacobian(f, &[0.5, 2.0], DEFAULT_JACOBIAN_STEP).unwrap();
        assert!((j[(0, 0)] - 0.5f64.exp() * 2.0).abs() < 1e-7);
        assert!((j[(0, 1)] - 0.5f64.exp()).abs() < 1e-7);
    }

    #[test]
    fn invalid_step_is_rejected() {
        let f = |x: &[f64]| Ok(x.to_vec());
        assert!(numerical_jacobian(f, &[1.0], 0.0).is_err());
    }

    #[test]
    fn evaluation_errors_propagate() {
        let f = |_: &[f64]| -> Result<Vec<f64>, UqError> { Err(UqError::non_finite("nan")) };
        let err = numerical_jacobian(f, &[1.0], 1e-6).unwrap_err();
        assert!(matches!(err, UqError::NonFiniteEvaluation(_)));
    }
}
