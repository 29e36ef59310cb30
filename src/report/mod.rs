//! Reporting utilities: per-sample residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::Sample;
use crate::error::FitError;

/// Observed vs fitted value for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleResidual {
    pub sample: Sample,
    pub y_fit: f64,
    pub residual: f64,
}

/// Compute fitted values and residuals (`observed - fitted`) for each sample.
pub fn compute_residuals<F>(samples: &[Sample], model: &F, params: &[f64]) -> Result<Vec<SampleResidual>, FitError>
where
    F: Fn(f64, &[f64]) -> f64 + ?Sized,
{
    let mut out = Vec::with_capacity(samples.len());
    for s in samples {
        let y_fit = model(s.t, params);
        if !y_fit.is_finite() {
            return Err(FitError::InvalidInput(format!(
                "non-finite model prediction at t={}",
                s.t
            )));
        }
        out.push(SampleResidual {
            sample: *s,
            y_fit,
            residual: s.y - y_fit,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residuals_are_observed_minus_fitted() {
        let samples = [Sample::new(0.0, 1.0), Sample::new(1.0, 5.0)];
        let line = |t: f64, p: &[f64]| p[0] + p[1] * t;
        let rows = compute_residuals(&samples, &line, &[1.0, 3.0]).unwrap();
        assert_eq!(rows[0].residual, 0.0);
        assert_eq!(rows[1].y_fit, 4.0);
        assert_eq!(rows[1].residual, 1.0);
    }
}
