//! Closed-form forward models `f(φ; t)`.
//!
//! A forward model only maps physical parameters and sample points to
//! predictions; weighting, residuals and costs live in `ParametricModel` so any
//! implementation here can be swapped in without touching them.

use std::sync::Arc;

use crate::domain::ModelKind;

/// A deterministic, differentiable model evaluated at every sample point.
pub trait ForwardModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Parameter count the expression is defined for, if it is fixed.
    fn required_params(&self) -> Option<usize> {
        None
    }

    /// Evaluate the model for physical parameters `phi` at each point of `t`.
    ///
    /// The output has the same length as `t`.
    fn evaluate(&self, phi: &[f64], t: &[f64]) -> Vec<f64>;
}

/// `f(φ; t) = 1 / (Σ_{n<N} φ_n tⁿ + t^N)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FractionalModel;

impl ForwardModel for FractionalModel {
    fn name(&self) -> &'static str {
        "fractional"
    }

    fn evaluate(&self, phi: &[f64], t: &[f64]) -> Vec<f64> {
        let order = phi.len() as i32;
        t.iter()
            .map(|&ti| {
                let poly: f64 = phi
                    .iter()
                    .enumerate()
                    .map(|(n, &p)| p * ti.powi(n as i32))
                    .sum();
                1.0 / (poly + ti.powi(order))
            })
            .collect()
    }
}

/// `f(φ; t) = φ₀ / (1 + φ₁ t)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RationalDecayModel;

impl ForwardModel for RationalDecayModel {
    fn name(&self) -> &'static str {
        "rational-decay"
    }

    fn required_params(&self) -> Option<usize> {
        Some(2)
    }

    fn evaluate(&self, phi: &[f64], t: &[f64]) -> Vec<f64> {
        t.iter().map(|&ti| phi[0] / (1.0 + phi[1] * ti)).collect()
    }
}

/// Monomial basis: `f(φ; t) = Σ_{n<N} φ_n tⁿ`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearModel;

impl ForwardModel for LinearModel {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn evaluate(&self, phi: &[f64], t: &[f64]) -> Vec<f64> {
        t.iter()
            .map(|&ti| {
                phi.iter()
                    .enumerate()
                    .map(|(n, &p)| p * ti.powi(n as i32))
                    .sum()
            })
            .collect()
    }
}

/// Mean of decaying exponentials: `f(φ; t) = (1/N) Σ_{n<N} exp(−φ_n t)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialModel;

impl ForwardModel for ExponentialModel {
    fn name(&self) -> &'static str {
        "exponential"
    }

    fn evaluate(&self, phi: &[f64], t: &[f64]) -> Vec<f64> {
        let n = phi.len() as f64;
        t.iter()
            .map(|&ti| phi.iter().map(|&p| (-p * ti).exp()).sum::<f64>() / n)
            .collect()
    }
}

impl ModelKind {
    pub fn build(self) -> Arc<dyn ForwardModel> {
        match self {
            ModelKind::Fractional => Arc::new(FractionalModel),
            ModelKind::RationalDecay => Arc::new(RationalDecayModel),
            ModelKind::Linear => Arc::new(LinearModel),
            ModelKind::Exponential => Arc::new(ExponentialModel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_two_params() {
        // 1 / (φ0 + φ1 t + t²)
        let y = FractionalModel.evaluate(&[1.0, 2.0], &[0.0, 1.0, 2.0]);
        assert_eq!(y, vec![1.0, 1.0 / 4.0, 1.0 / 9.0]);
    }

    #[test]
    fn rational_decay_matches_formula() {
        let y = RationalDecayModel.evaluate(&[10.0, 0.5], &[0.0, 2.0]);
        assert_eq!(y, vec![10.0, 5.0]);
        assert_eq!(RationalDecayModel.required_params(), Some(2));
    }

    #[test]
    fn linear_is_polynomial() {
        let y = LinearModel.evaluate(&[1.0, -1.0, 0.5], &[2.0]);
        assert!((y[0] - (1.0 - 2.0 + 2.0)).abs() < 1e-15);
    }

    #[test]
    fn exponential_is_one_at_origin() {
        let y = ExponentialModel.evaluate(&[0.3, 1.7, 4.0], &[0.0, 1.0]);
        assert_eq!(y[0], 1.0);
        let expected = ((-0.3f64).exp() + (-1.7f64).exp() + (-4.0f64).exp()) / 3.0;
        assert!((y[1] - expected).abs() < 1e-15);
    }

    #[test]
    fn kinds_build_matching_models() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.build().name(), kind.display_name());
        }
    }
}
