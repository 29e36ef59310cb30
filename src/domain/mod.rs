//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - observations (`Sample`) and model selection (`ModelKind`)
//! - solver settings (`FitOptions`, `OdeOptions`)
//! - run configuration (`FitConfig`, `SimulateConfig`)
//! - fit outputs (`FitResult`, `CurveFile`)

pub mod types;

pub use types::*;
