//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{CurveFile, FitConfig, FitResult, ModelKind, Sample};
use crate::report::SampleResidual;

/// Header + dataset stats + fitted parameters.
pub fn format_fit_summary(
    kind: ModelKind,
    result: &FitResult,
    guess: &[f64],
    samples: &[Sample],
    config: &FitConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== growthfit - least-squares growth fit ===\n");
    out.push_str(&format!("Model: {} ({})\n", kind.display_name(), kind.formula()));

    let t_min = samples.iter().map(|s| s.t).fold(f64::INFINITY, f64::min);
    let t_max = samples.iter().map(|s| s.t).fold(f64::NEG_INFINITY, f64::max);
    let y_min = samples.iter().map(|s| s.y).fold(f64::INFINITY, f64::min);
    let y_max = samples.iter().map(|s| s.y).fold(f64::NEG_INFINITY, f64::max);
    out.push_str(&format!(
        "Samples: n={} | t=[{:.4}, {:.4}] | y=[{:.4}, {:.4}]\n",
        samples.len(),
        t_min,
        t_max,
        y_min,
        y_max
    ));
    out.push_str(&format!(
        "Solver: max_iter={} | starts={} | iterations={}\n",
        config.options.max_iterations, config.starts, result.iterations
    ));
    out.push_str(&format!("Initial guess: {}\n", join_values(guess)));

    out.push_str("\nParameters:\n");
    for (name, value) in kind.param_names().iter().zip(&result.params) {
        out.push_str(&format!("  {name:<3} = {value:.10}\n"));
    }
    out.push_str(&format!("\nSSE:  {:.6e}\n", result.residual));
    out.push_str(&format!("RMSE: {:.6e}\n", result.rmse(samples.len())));

    if kind == ModelKind::Exponential {
        if let Some(&rate) = result.params.get(1) {
            if rate > 0.0 {
                out.push_str(&format!("Doubling time: {:.4}\n", std::f64::consts::LN_2 / rate));
            } else if rate < 0.0 {
                out.push_str(&format!("Half-life: {:.4}\n", -std::f64::consts::LN_2 / rate));
            }
        }
    }

    out
}

/// Stored curve file: model, parameters, diagnostics and grid extent.
pub fn format_curve_file(curve: &CurveFile) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== {} curve ({}) ===\n",
        curve.tool,
        curve.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("Model: {} ({})\n", curve.model.display_name(), curve.model.formula()));
    for (name, value) in curve.param_names.iter().zip(&curve.params) {
        out.push_str(&format!("  {name:<3} = {value:.10}\n"));
    }
    out.push_str(&format!(
        "SSE: {:.6e} | iterations={} | n={}\n",
        curve.residual, curve.iterations, curve.n_samples
    ));
    if let (Some(t0), Some(t1)) = (curve.grid.t.first(), curve.grid.t.last()) {
        out.push_str(&format!("Grid: {} points on [{t0:.4}, {t1:.4}]\n", curve.grid.t.len()));
    }
    out
}

fn join_values(values: &[f64]) -> String {
    values.iter().map(|v| format!("{v:.6}")).collect::<Vec<_>>().join(", ")
}

/// Per-sample table: `t | y_obs | y_fit | residual`.
pub fn format_residual_table(rows: &[SampleResidual]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>12} {:>14} {:>14} {:>14}\n",
        "t", "y_obs", "y_fit", "residual"
    ));
    for r in rows {
        out.push_str(&format!(
            "{:>12.4} {:>14.6} {:>14.6} {:>14.6e}\n",
            r.sample.t, r.sample.y, r.y_fit, r.residual
        ));
    }
    out
}

/// Trajectory table: one row per grid time, one column per state component.
pub fn format_trajectory(times: &[f64], states: &[Vec<f64>], names: &[&str]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>10}", "t"));
    for name in names {
        out.push_str(&format!(" {name:>14}"));
    }
    out.push('\n');

    for (t, state) in times.iter().zip(states) {
        out.push_str(&format!("{t:>10.3}"));
        for v in state {
            out.push_str(&format!(" {v:>14.6}"));
        }
        out.push('\n');
    }
    out
}
