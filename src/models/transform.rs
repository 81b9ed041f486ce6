//! Parameter transforms.
//!
//! Optimizers and samplers work in an unconstrained "raw" space; the forward
//! model consumes "physical" parameters. A transform maps raw to physical, e.g.
//! `Exp` keeps every physical parameter strictly positive.

use std::fmt;
use std::sync::Arc;

use crate::domain::TransformKind;

/// Signature of a user-supplied transform.
pub type TransformFn = dyn Fn(&[f64]) -> Vec<f64> + Send + Sync;

/// Raw-to-physical parameter mapping held by a `ParametricModel`.
///
/// Must be pure: the same input always yields the same output.
#[derive(Clone, Default)]
pub enum Transform {
    #[default]
    Identity,
    Exp,
    Custom(Arc<TransformFn>),
}

impl Transform {
    pub fn custom(f: impl Fn(&[f64]) -> Vec<f64> + Send + Sync + 'static) -> Self {
        Transform::Custom(Arc::new(f))
    }

    pub fn apply(&self, theta: &[f64]) -> Vec<f64> {
        match self {
            Transform::Identity => theta.to_vec(),
            Transform::Exp => theta.iter().map(|v| v.exp()).collect(),
            Transform::Custom(f) => f(theta),
        }
    }

    /// Named kind for the built-in transforms (`None` for custom closures).
    pub fn kind(&self) -> Option<TransformKind> {
        match self {
            Transform::Identity => Some(TransformKind::Identity),
            Transform::Exp => Some(TransformKind::Exp),
            Transform::Custom(_) => None,
        }
    }
}

impl From<TransformKind> for Transform {
    fn from(kind: TransformKind) -> Self {
        match kind {
            TransformKind::Identity => Transform::Identity,
            TransformKind::Exp => Transform::Exp,
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Identity => write!(f, "Identity"),
            Transform::Exp => write!(f, "Exp"),
            Transform::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
