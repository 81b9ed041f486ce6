//! Log-priors and the log-posterior handed to the sampler.

use serde::{Deserialize, Serialize};

use crate::error::UqError;
use crate::models::ParametricModel;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LogPrior {
    /// Improper flat prior: `0` everywhere.
    #[default]
    Flat,
    /// Uniform on the box `lower <= θ <= upper` (`−∞` outside).
    Uniform { lower: Vec<f64>, upper: Vec<f64> },
}

impl LogPrior {
    pub fn uniform(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, UqError> {
        if lower.len() != upper.len() {
            return Err(UqError::dimension(format!(
                "Prior bounds differ in length ({} vs {}).",
                lower.len(),
                upper.len()
            )));
        }
        if let Some(i) = (0..lower.len()).find(|&i| !(lower[i] < upper[i])) {
            return Err(UqError::parameter(format!(
                "Prior bound {i}: lower={} must be < upper={}.",
                lower[i], upper[i]
            )));
        }
        Ok(LogPrior::Uniform { lower, upper })
    }

    /// Check that the prior is defined over `n_dim` parameters.
    pub fn check_dim(&self, n_dim: usize) -> Result<(), UqError> {
        match self {
            LogPrior::Flat => Ok(()),
            LogPrior::Uniform { lower, .. } if lower.len() == n_dim => Ok(()),
            LogPrior::Uniform { lower, .. } => Err(UqError::dimension(format!(
                "Prior has {} bounds, model has N={n_dim}.",
                lower.len()
            ))),
        }
    }

    pub fn log_prior(&self, theta: &[f64]) -> f64 {
        match self {
            LogPrior::Flat => 0.0,
            LogPrior::Uniform { lower, upper } => {
                let inside = theta
                    .iter()
                    .zip(lower.iter().zip(upper.iter()))
                    .all(|(v, (lo, hi))| *v >= *lo && *v <= *hi);
                if inside { 0.0 } else { f64::NEG_INFINITY }
            }
        }
    }
}

/// `log_prior(θ) + log_likelihood(θ)`.
///
/// Points outside the prior support are not evaluated. Evaluation failures and
/// non-finite likelihoods become `−∞`, i.e. zero posterior probability.
pub fn log_probability(model: &ParametricModel, prior: &LogPrior, theta: &[f64]) -> f64 {
    let lp = prior.log_prior(theta);
    if !lp.is_finite() {
        return f64::NEG_INFINITY;
    }
    match model.log_likelihood(theta) {
        Ok(ll) if ll.is_finite() => lp + ll,
        Ok(_) => f64::NEG_INFINITY,
        Err(e) => {
            log::trace!("log-probability rejected {theta:?}: {e}");
            f64::NEG_INFINITY
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{LinearModel, Transform};

    fn model() -> ParametricModel {
        ParametricModel::new(
            1,
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![0.5, 0.5],
            Arc::new(LinearModel),
            Transform::Identity,
        )
        .unwrap()
    }

    #[test]
    fn uniform_box_support() {
        let prior = LogPrior::uniform(vec![-1.0, 0.0], vec![1.0, 2.0]).unwrap();
        assert_eq!(prior.log_prior(&[0.0, 1.0]), 0.0);
        assert_eq!(prior.log_prior(&[-1.0, 2.0]), 0.0);
        assert_eq!(prior.log_prior(&[1.5, 1.0]), f64::NEG_INFINITY);
        assert!(prior.check_dim(2).is_ok());
        assert!(prior.check_dim(3).is_err());
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        assert!(LogPrior::uniform(vec![0.0], vec![0.0]).is_err());
        assert!(LogPrior::uniform(vec![0.0], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn log_probability_is_minus_cost_under_flat_prior() {
        let m = model();
        let lp = log_probability(&m, &LogPrior::Flat, &[2.0]);
        assert_eq!(lp, -m.cost(&[2.0]).unwrap());
    }

    #[test]
    fn wrong_dim_theta_has_zero_probability() {
        let m = model();
        assert_eq!(log_probability(&m, &LogPrior::Flat, &[1.0, 2.0]), f64::NEG_INFINITY);
    }
}
