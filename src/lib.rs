//! `growth-fit` library crate.
//!
//! The binary (`growthfit`) is a thin wrapper around this library so that:
//!
//! - the fitter and integrator are testable without spawning processes
//! - scripts and notebooks can call `fit` / `simulate_ode` directly
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod ode;
pub mod report;

pub use domain::{FitOptions, FitResult, ModelKind, OdeOptions, Sample};
pub use error::FitError;
pub use fit::{FittedModel, fit, fit_curve, fit_model, fit_multistart};
pub use ode::simulate_ode;
