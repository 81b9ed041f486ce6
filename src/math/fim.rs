//! Fisher Information Matrix (FIM) as a local linear approximation.
//!
//! With residuals already weighted by the data error, the FIM at `θ*` is
//! `I = Jᵀ J` where `J` is the residual Jacobian. Its eigenvalues measure how
//! stiff each parameter direction is; small eigenvalues are "sloppy"
//! directions. `I⁻¹` approximates the parameter covariance.

use nalgebra::{DMatrix, DVector};

use crate::error::UqError;
use crate::math::jacobian::residual_jacobian;
use crate::models::ParametricModel;

/// `Jᵀ J`.
pub fn fisher_information(jacobian: &DMatrix<f64>) -> DMatrix<f64> {
    jacobian.transpose() * jacobian
}

/// Eigenpairs of a symmetric matrix, eigenvalues ascending.
///
/// Column `i` of `vectors` belongs to `values[i]`.
#[derive(Debug, Clone)]
pub struct EigenPairs {
    pub values: DVector<f64>,
    pub vectors: DMatrix<f64>,
}

/// Symmetric eigendecomposition with ascending eigenvalues.
///
/// The input is symmetrized as `(A + Aᵀ)/2` first so round-off asymmetry from
/// `Jᵀ J` does not leak into the result.
pub fn eigen_decomposition(matrix: &DMatrix<f64>) -> Result<EigenPairs, UqError> {
    if !matrix.is_square() {
        return Err(UqError::dimension(format!(
            "Eigendecomposition needs a square matrix (got {}x{}).",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(UqError::non_finite("Matrix has non-finite entries."));
    }

    let sym = (matrix + matrix.transpose()) * 0.5;
    let eig = sym.symmetric_eigen();

    let n = eig.eigenvalues.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eig.eigenvalues[a]
            .partial_cmp(&eig.eigenvalues[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let values = DVector::from_iterator(n, order.iter().map(|&i| eig.eigenvalues[i]));
    let vectors = DMatrix::from_fn(n, n, |r, c| eig.eigenvectors[(r, order[c])]);
    Ok(EigenPairs { values, vectors })
}

/// Everything the FIM workflow reports at one parameter point.
#[derive(Debug, Clone)]
pub struct FimAnalysis {
    pub theta: Vec<f64>,
    pub jacobian: DMatrix<f64>,
    pub fim: DMatrix<f64>,
    pub eigen: EigenPairs,
    /// `I⁻¹`, when the FIM is invertible.
    pub covariance: Option<DMatrix<f64>>,
    /// `λ_max / λ_min`; `None` when `λ_min <= 0`.
    pub condition_number: Option<f64>,
}

impl FimAnalysis {
    pub fn at(model: &ParametricModel, theta: &[f64], step: f64) -> Result<Self, UqError> {
        let jacobian = residual_jacobian(model, theta, step)?;
        Self::from_jacobian(theta, jacobian)
    }

    pub fn from_jacobian(theta: &[f64], jacobian: DMatrix<f64>) -> Result<Self, UqError> {
        let fim = fisher_information(&jacobian);
        let eigen = eigen_decomposition(&fim)?;

        let condition_number = match (eigen.values.iter().next(), eigen.values.iter().last()) {
            (Some(&lo), Some(&hi)) if lo > 0.0 => Some(hi / lo).filter(|c| c.is_finite()),
            _ => None,
        };
        let covariance = condition_number.and_then(|_| fim.clone().try_inverse());

        log::debug!(
            "FIM eigenvalues {:?}, condition number {condition_number:?}",
            eigen.values.as_slice()
        );

        Ok(Self {
            theta: theta.to_vec(),
            jacobian,
            fim,
            eigen,
            covariance,
            condition_number,
        })
    }
}
