//! Numerical building blocks: least-squares solves, finite-difference
//! Jacobians, Fisher information and sample statistics.

pub mod fim;
pub mod jacobian;
pub mod ols;
pub mod stats;

pub use fim::*;
pub use jacobian::*;
pub use ols::*;
pub use stats::*;
