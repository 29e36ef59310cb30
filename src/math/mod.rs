//! Mathematical utilities: finite-difference Jacobians and linear least squares.

pub mod jacobian;
pub mod ols;

pub use jacobian::*;
pub use ols::*;
