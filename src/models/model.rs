//! `ParametricModel`: forward model + observed data + per-point uncertainty.
//!
//! Everything downstream (least squares, FIM, Monte Carlo, MCMC) only talks to
//! three pure operations defined here:
//! - `predict(θ)`: forward model at the transformed parameters
//! - `residual(θ)`: `(predict(θ) − data) / data_error`
//! - `cost(θ)`: `½ Σ residual²`
//!
//! The model is immutable after construction and cheap to clone (all arrays are
//! shared), so parallel fitters and samplers can evaluate it without locking.

use std::fmt;
use std::sync::Arc;

use crate::error::UqError;
use crate::models::forward::ForwardModel;
use crate::models::transform::Transform;

#[derive(Clone)]
pub struct ParametricModel {
    n_params: usize,
    t: Arc<[f64]>,
    data: Arc<[f64]>,
    data_error: Arc<[f64]>,
    forward: Arc<dyn ForwardModel>,
    transform: Transform,
}

impl ParametricModel {
    /// Build a model, validating the inputs.
    ///
    /// # Errors
    /// - `InvalidDimension` if `t`, `data` and `data_error` lengths differ, or
    ///   the forward model requires a different parameter count.
    /// - `InvalidParameter` if `n_params == 0`, any input is non-finite, or any
    ///   `data_error` entry is `<= 0`.
    pub fn new(
        n_params: usize,
        t: impl Into<Arc<[f64]>>,
        data: impl Into<Arc<[f64]>>,
        data_error: impl Into<Arc<[f64]>>,
        forward: Arc<dyn ForwardModel>,
        transform: Transform,
    ) -> Result<Self, UqError> {
        let t = t.into();
        let data = data.into();
        let data_error = data_error.into();

        if n_params == 0 {
            return Err(UqError::parameter("Number of parameters must be > 0."));
        }
        if t.len() != data.len() || t.len() != data_error.len() {
            return Err(UqError::dimension(format!(
                "t, data and data_error must have equal lengths (got {}, {}, {}).",
                t.len(),
                data.len(),
                data_error.len()
            )));
        }
        if let Some(required) = forward.required_params() {
            if required != n_params {
                return Err(UqError::dimension(format!(
                    "Model '{}' takes {required} parameters, got N={n_params}.",
                    forward.name()
                )));
            }
        }
        if let Some(i) = t.iter().position(|v| !v.is_finite()) {
            return Err(UqError::parameter(format!("t[{i}] is not finite.")));
        }
        check_data(&data)?;
        if let Some((i, s)) = data_error
            .iter()
            .enumerate()
            .find(|(_, s)| !(s.is_finite() && **s > 0.0))
        {
            return Err(UqError::parameter(format!(
                "data_error[{i}] = {s} (must be finite and > 0)."
            )));
        }

        Ok(Self {
            n_params,
            t,
            data,
            data_error,
            forward,
            transform,
        })
    }

    /// Same points, error bars, forward model and transform; different observations.
    pub fn with_data(&self, data: impl Into<Arc<[f64]>>) -> Result<Self, UqError> {
        let data = data.into();
        if data.len() != self.t.len() {
            return Err(UqError::dimension(format!(
                "Replacement data has {} points, model has {}.",
                data.len(),
                self.t.len()
            )));
        }
        check_data(&data)?;
        Ok(Self {
            data,
            ..self.clone()
        })
    }

    pub fn n_params(&self) -> usize {
        self.n_params
    }

    pub fn n_points(&self) -> usize {
        self.t.len()
    }

    pub fn t(&self) -> &[f64] {
        &self.t
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_error(&self) -> &[f64] {
        &self.data_error
    }

    pub fn forward_name(&self) -> &'static str {
        self.forward.name()
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Physical parameters `φ = transform(θ)`.
    pub fn physical(&self, theta: &[f64]) -> Result<Vec<f64>, UqError> {
        self.check_theta(theta)?;
        let phi = self.transform.apply(theta);
        if phi.len() != self.n_params {
            return Err(UqError::dimension(format!(
                "Transform returned {} parameters, expected {}.",
                phi.len(),
                self.n_params
            )));
        }
        Ok(phi)
    }

    /// Model predictions at every sample point.
    pub fn predict(&self, theta: &[f64]) -> Result<Vec<f64>, UqError> {
        let phi = self.physical(theta)?;
        let preds = self.forward.evaluate(&phi, &self.t);
        if let Some(i) = preds.iter().position(|v| !v.is_finite()) {
            return Err(UqError::non_finite(format!(
                "Model '{}' prediction at t={} is {} for theta={theta:?}.",
                self.forward.name(),
                self.t[i],
                preds[i]
            )));
        }
        Ok(preds)
    }

    /// Weighted residuals `(predict(θ)_m − data_m) / data_error_m`.
    pub fn residual(&self, theta: &[f64]) -> Result<Vec<f64>, UqError> {
        let preds = self.predict(theta)?;
        Ok(preds
            .iter()
            .zip(self.data.iter())
            .zip(self.data_error.iter())
            .map(|((p, d), s)| (p - d) / s)
            .collect())
    }

    /// Least-squares cost `½ Σ r_m²`.
    pub fn cost(&self, theta: &[f64]) -> Result<f64, UqError> {
        let res = self.residual(theta)?;
        Ok(0.5 * res.iter().map(|r| r * r).sum::<f64>())
    }

    /// Gaussian log-likelihood up to an additive constant.
    pub fn log_likelihood(&self, theta: &[f64]) -> Result<f64, UqError> {
        Ok(-self.cost(theta)?)
    }

    fn check_theta(&self, theta: &[f64]) -> Result<(), UqError> {
        if theta.len() != self.n_params {
            return Err(UqError::dimension(format!(
                "theta has {} entries, model has N={}.",
                theta.len(),
                self.n_params
            )));
        }
        Ok(())
    }
}

fn check_data(data: &[f64]) -> Result<(), UqError> {
    match data.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(UqError::parameter(format!("data[{i}] is not finite."))),
        None => Ok(()),
    }
}

impl fmt::Debug for ParametricModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParametricModel")
            .field("n_params", &self.n_params)
            .field("forward", &self.forward.name())
            .field("transform", &self.transform)
            .field("t", &self.t)
            .field("data", &self.data)
            .field("data_error", &self.data_error)
            .finish()
    }
}
