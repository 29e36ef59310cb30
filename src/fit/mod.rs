//! Curve fitting.
//!
//! Responsibilities:
//!
//! - Levenberg–Marquardt least squares for any `Fn(t, params) -> y`
//! - built-in model fits with data-driven starting points
//! - parallel multi-start with deterministic selection

pub mod fitter;

pub use fitter::*;
