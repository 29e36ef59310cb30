//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and simulation
//! - exported to JSON
//! - reloaded later for reporting or comparisons

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::ode::calcium::CalciumParams;

/// One observation: elapsed time `t` and the measured quantity `y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    pub y: f64,
}

impl Sample {
    pub fn new(t: f64, y: f64) -> Self {
        Self { t, y }
    }
}

/// Build samples from parallel `t` / `y` slices (extra values on either side are ignored).
pub fn samples_from(t: &[f64], y: &[f64]) -> Vec<Sample> {
    t.iter().zip(y).map(|(&t, &y)| Sample { t, y }).collect()
}

/// Built-in parametric growth models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// `y = a + b·t`
    Linear,
    /// `y = A·exp(B·t)`
    #[value(alias = "exp")]
    Exponential,
    /// `y = A·t^B`
    #[value(alias = "power")]
    PowerLaw,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Linear, ModelKind::Exponential, ModelKind::PowerLaw];

    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Exponential => "exponential",
            ModelKind::PowerLaw => "power-law",
        }
    }

    pub fn formula(self) -> &'static str {
        match self {
            ModelKind::Linear => "y = a + b*t",
            ModelKind::Exponential => "y = A*exp(B*t)",
            ModelKind::PowerLaw => "y = A*t^B",
        }
    }

    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Linear => &["a", "b"],
            ModelKind::Exponential | ModelKind::PowerLaw => &["A", "B"],
        }
    }

    pub fn param_len(self) -> usize {
        self.param_names().len()
    }
}

/// Outcome of a successful least-squares fit.
///
/// `params` follow the order of the initial guess; `residual` is the final
/// sum of squared residuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub params: Vec<f64>,
    pub residual: f64,
    pub iterations: usize,
}

impl FitResult {
    /// Root-mean-square residual over `n` samples.
    pub fn rmse(&self, n: usize) -> f64 {
        if n == 0 {
            return f64::NAN;
        }
        (self.residual / n as f64).sqrt()
    }
}

/// Levenberg–Marquardt tuning knobs.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Upper bound on optimizer steps (accepted and rejected both count).
    pub max_iterations: usize,
    /// Converged once an accepted step reduces the cost by less than this fraction.
    pub ftol: f64,
    /// Converged once the accepted step is this small relative to the parameters.
    pub xtol: f64,
    /// Converged once the cost itself drops to this value.
    pub cost_tol: f64,
    /// Starting damping factor λ.
    pub initial_damping: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            ftol: 1e-12,
            xtol: 1e-12,
            cost_tol: 1e-20,
            initial_damping: 1e-3,
        }
    }
}

impl FitOptions {
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Self::default()
        }
    }
}

/// Integrator settings for `simulate_ode`.
#[derive(Debug, Clone)]
pub struct OdeOptions {
    /// Equal RK4 sub-steps taken between consecutive grid points.
    pub substeps: usize,
    /// Any state component with a larger magnitude aborts the integration.
    pub divergence_bound: f64,
}

impl Default for OdeOptions {
    fn default() -> Self {
        Self {
            substeps: 10,
            divergence_bound: 1e12,
        }
    }
}

/// Resolved configuration for one `growthfit fit` run.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub data_path: Option<PathBuf>,
    pub points: Vec<Sample>,
    pub delimiter: u8,
    pub model: ModelKind,
    pub guess: Option<Vec<f64>>,
    pub starts: usize,
    pub options: FitOptions,
    pub grid_points: usize,
    pub export_curve: Option<PathBuf>,
    pub export: Option<PathBuf>,
}

/// Which built-in ODE system to integrate.
#[derive(Debug, Clone)]
pub enum SimulationKind {
    Growth { x0: f64, rate: f64, target_factor: Option<f64> },
    Calcium(CalciumParams),
}

/// Resolved configuration for one `growthfit simulate` run.
#[derive(Debug, Clone)]
pub struct SimulateConfig {
    pub kind: SimulationKind,
    pub t_start: f64,
    pub t_end: f64,
    pub dt: f64,
    pub options: OdeOptions,
}

/// A fitted `(t, y)` grid for quick plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub t: Vec<f64>,
    pub y: Vec<f64>,
}

/// Portable representation of a fitted curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub model: ModelKind,
    pub param_names: Vec<String>,
    pub params: Vec<f64>,
    pub residual: f64,
    pub iterations: usize,
    pub n_samples: usize,
    pub grid: CurveGrid,
}
