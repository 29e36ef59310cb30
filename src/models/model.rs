//! Model evaluation for the built-in growth models.
//!
//! The fitter relies on two primitive operations:
//! - predict `y(t)` given a parameter vector (residuals, grids, reports)
//! - derive a starting parameter vector from the data (when the caller has none)
//!
//! These are implemented here for each model kind.

use crate::domain::{ModelKind, Sample};
use crate::math::fit_line;

/// Predict `y(t)` for the given model kind.
///
/// Missing parameters evaluate to NaN, which `fit` reports as `InvalidInput`.
pub fn predict(model: ModelKind, t: f64, params: &[f64]) -> f64 {
    let [a, b] = match params {
        [a, b, ..] => [*a, *b],
        _ => return f64::NAN,
    };
    match model {
        ModelKind::Linear => a + b * t,
        ModelKind::Exponential => a * (b * t).exp(),
        ModelKind::PowerLaw => a * t.powf(b),
    }
}

/// The model as a closure, in the shape `fit` expects.
pub fn model_fn(model: ModelKind) -> impl Fn(f64, &[f64]) -> f64 + Send + Sync + Copy {
    move |t: f64, params: &[f64]| predict(model, t, params)
}

/// Data-driven starting point for the optimizer.
///
/// - linear: OLS line through the samples
/// - exponential: OLS on `ln y = ln A + B t` over samples with `y > 0`
/// - power law: OLS on `ln y = ln A + B ln t` over samples with `t > 0, y > 0`
///
/// When the transformed regression is not possible (too few usable samples),
/// falls back to `[mean(y), 0]`.
pub fn initial_guess(model: ModelKind, samples: &[Sample]) -> Vec<f64> {
    let fallback = || {
        let n = samples.len().max(1) as f64;
        let mean = samples.iter().map(|s| s.y).sum::<f64>() / n;
        vec![if mean.is_finite() { mean } else { 1.0 }, 0.0]
    };

    let line = match model {
        ModelKind::Linear => {
            let t: Vec<f64> = samples.iter().map(|s| s.t).collect();
            let y: Vec<f64> = samples.iter().map(|s| s.y).collect();
            fit_line(&t, &y)
        }
        ModelKind::Exponential => {
            let (t, ln_y): (Vec<f64>, Vec<f64>) = samples
                .iter()
                .filter(|s| s.y > 0.0)
                .map(|s| (s.t, s.y.ln()))
                .unzip();
            fit_line(&t, &ln_y).map(|(ln_a, b)| (ln_a.exp(), b))
        }
        ModelKind::PowerLaw => {
            let (ln_t, ln_y): (Vec<f64>, Vec<f64>) = samples
                .iter()
                .filter(|s| s.t > 0.0 && s.y > 0.0)
                .map(|s| (s.t.ln(), s.y.ln()))
                .unzip();
            fit_line(&ln_t, &ln_y).map(|(ln_a, b)| (ln_a.exp(), b))
        }
    };

    match line {
        Some((a, b)) if a.is_finite() && b.is_finite() => vec![a, b],
        _ => fallback(),
    }
}
