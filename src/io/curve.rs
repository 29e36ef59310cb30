//! Read/write curve JSON files.
//!
//! Curve JSON is the "portable" representation of a fitted curve:
//! - model kind + named parameters
//! - fit diagnostics (residual, iterations, sample count)
//! - a precomputed fitted grid for quick plotting elsewhere
//!
//! The schema is defined by `domain::CurveFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurveFile, FitResult, ModelKind, Sample};
use crate::error::FitError;
use crate::fit::FittedModel;
use crate::models::model_fn;

/// Assemble the curve file for a built-in model fit.
///
/// The grid spans the sampled time range with `n` points.
pub fn build_curve_file(kind: ModelKind, result: &FitResult, samples: &[Sample], n: usize) -> CurveFile {
    let (t0, t1) = time_span(samples);
    let fitted = FittedModel::new(model_fn(kind), result.clone());

    CurveFile {
        tool: "growthfit".to_string(),
        generated_at: Utc::now(),
        model: kind,
        param_names: kind.param_names().iter().map(|s| s.to_string()).collect(),
        params: fitted.params().to_vec(),
        residual: fitted.residual(),
        iterations: fitted.result().iterations,
        n_samples: samples.len(),
        grid: fitted.grid(t0, t1, n),
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, curve: &CurveFile) -> Result<(), FitError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, curve).map_err(|e| FitError::Io(e.into()))?;
    Ok(())
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, FitError> {
    let file = File::open(path)?;
    serde_json::from_reader(file)
        .map_err(|e| FitError::InvalidInput(format!("invalid curve JSON '{}': {e}", path.display())))
}

fn time_span(samples: &[Sample]) -> (f64, f64) {
    let mut t0 = samples.iter().map(|s| s.t).fold(f64::INFINITY, f64::min);
    let mut t1 = samples.iter().map(|s| s.t).fold(f64::NEG_INFINITY, f64::max);
    if !(t0.is_finite() && t1.is_finite()) {
        t0 = 0.0;
        t1 = 1.0;
    }
    if (t1 - t0).abs() < 1e-9 {
        t0 -= 0.5;
        t1 += 0.5;
    }
    (t0, t1)
}
