//! Parametric regression models.
//!
//! - `forward`: swappable closed-form curves `f(φ; t)`
//! - `transform`: raw-to-physical parameter maps
//! - `model`: `ParametricModel` (predict / residual / cost)

pub mod forward;
pub mod model;
pub mod transform;

pub use forward::*;
pub use model::*;
pub use transform::*;
