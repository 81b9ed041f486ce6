//! Levenberg–Marquardt for weighted residuals.
//!
//! Given a `ParametricModel` and an initial guess `θ₀`, we iterate:
//! - Jacobian `J` of the residual (central differences)
//! - damped normal equations `(JᵀJ + λ diag(JᵀJ)) δ = −Jᵀ r`
//! - accept `θ + δ` if the cost decreases (shrink λ), otherwise grow λ and retry
//!
//! Trial points where the model cannot be evaluated (non-finite predictions)
//! count as rejected steps; only a failure at `θ₀` itself is an error.

use nalgebra::{DMatrix, DVector};

use crate::error::UqError;
use crate::math::{DEFAULT_JACOBIAN_STEP, residual_jacobian, solve_least_squares};
use crate::models::ParametricModel;

/// Floor for the diagonal damping term so flat directions still get damped.
const DIAG_FLOOR: f64 = 1e-12;
const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_MAX: f64 = 1e15;

#[derive(Debug, Clone)]
pub struct LmOptions {
    pub max_iter: usize,
    /// Relative cost reduction below which we stop.
    pub ftol: f64,
    /// Relative step size below which we stop.
    pub xtol: f64,
    /// Gradient max-norm below which we stop.
    pub gtol: f64,
    pub lambda0: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
    pub jacobian_step: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iter: 200,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-10,
            lambda0: 1e-3,
            lambda_up: 10.0,
            lambda_down: 10.0,
            jacobian_step: DEFAULT_JACOBIAN_STEP,
        }
    }
}

impl LmOptions {
    fn validate(&self) -> Result<(), UqError> {
        let positive = [
            ("ftol", self.ftol),
            ("xtol", self.xtol),
            ("gtol", self.gtol),
            ("lambda0", self.lambda0),
            ("jacobian_step", self.jacobian_step),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(UqError::parameter(format!("{name} must be finite and > 0 (got {v}).")));
            }
        }
        if !(self.lambda_up > 1.0 && self.lambda_down > 1.0) {
            return Err(UqError::parameter("lambda_up and lambda_down must be > 1."));
        }
        Ok(())
    }
}

/// Outcome of a least-squares fit.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Best-fit raw parameters.
    pub theta: Vec<f64>,
    /// `transform(theta)`.
    pub physical: Vec<f64>,
    pub cost: f64,
    pub iterations: usize,
    /// `false` if `max_iter` was reached before any stopping rule fired.
    pub converged: bool,
    /// Residual Jacobian at `theta`, shape `M × N`.
    pub jacobian: DMatrix<f64>,
}

/// Minimize `model.cost` starting from `theta0`.
pub fn fit_least_squares(
    model: &ParametricModel,
    theta0: &[f64],
    opts: &LmOptions,
) -> Result<FitResult, UqError> {
    opts.validate()?;
    let n = model.n_params();

    let mut theta = theta0.to_vec();
    let mut r = DVector::from_vec(model.residual(&theta)?);
    let mut cost = half_norm_squared(&r);
    let mut lambda = opts.lambda0;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < opts.max_iter {
        iterations += 1;

        let jac = residual_jacobian(model, &theta, opts.jacobian_step)?;
        let grad = jac.transpose() * &r;
        if grad.amax() < opts.gtol {
            converged = true;
            break;
        }
        let jtj = jac.transpose() * &jac;
        let rhs = -&grad;

        let mut accepted = false;
        let mut evaluated = false;
        while lambda <= LAMBDA_MAX {
            let mut damped = jtj.clone();
            for k in 0..n {
                damped[(k, k)] += lambda * jtj[(k, k)].max(DIAG_FLOOR);
            }

            let Some(delta) = solve_least_squares(&damped, &rhs) else {
                lambda *= opts.lambda_up;
                continue;
            };
            let trial: Vec<f64> = theta.iter().zip(delta.iter()).map(|(t, d)| t + d).collect();

            match model.residual(&trial) {
                Ok(r_trial) => {
                    let r_trial = DVector::from_vec(r_trial);
                    let c_trial = half_norm_squared(&r_trial);
                    evaluated |= c_trial.is_finite();
                    if c_trial.is_finite() && c_trial < cost {
                        let reduction = (cost - c_trial) / cost.max(f64::MIN_POSITIVE);
                        let theta_norm = theta.iter().map(|v| v * v).sum::<f64>().sqrt();
                        let small_step = delta.norm() < opts.xtol * (opts.xtol + theta_norm);

                        theta = trial;
                        r = r_trial;
                        cost = c_trial;
                        lambda = (lambda / opts.lambda_down).max(LAMBDA_MIN);
                        accepted = true;

                        if reduction < opts.ftol || small_step {
                            converged = true;
                        }
                        break;
                    }
                }
                Err(e) => log::debug!("LM trial step rejected: {e}"),
            }
            lambda *= opts.lambda_up;
        }

        log::debug!("LM iter {iterations}: cost={cost:.6e} lambda={lambda:.1e} theta={theta:?}");

        if !accepted {
            // No damping level improves the cost. With at least one finite
            // trial this is a minimum to working precision; otherwise the
            // model could not be evaluated anywhere along the step.
            if evaluated {
                converged = true;
            } else {
                log::warn!(
                    "LM stalled at theta={theta:?}: every trial step was non-finite \
                     (gradient max-norm {:.3e}).",
                    grad.amax()
                );
            }
            break;
        }
        if converged {
            break;
        }
    }

    if !converged && iterations == opts.max_iter {
        log::warn!("Least-squares fit hit max_iter={} without converging.", opts.max_iter);
    }

    let jacobian = residual_jacobian(model, &theta, opts.jacobian_step)?;
    let physical = model.physical(&theta)?;
    let cost = model.cost(&theta)?;

    Ok(FitResult {
        theta,
        physical,
        cost,
        iterations,
        converged,
        jacobian,
    })
}

fn half_norm_squared(r: &DVector<f64>) -> f64 {
    0.5 * r.iter().map(|v| v * v).sum::<f64>()
}
