//! Nonlinear least-squares fitting (Levenberg–Marquardt).
//!
//! Given:
//! - samples `(t_i, y_i)`
//! - a model `f(t, p)`
//! - a starting parameter vector `p0`
//!
//! we minimize `Σ (f(t_i, p) - y_i)²` by damped Gauss–Newton steps:
//!
//! ```text
//! minimize ‖J δ + r‖² + λ Σ d_j δ_j²
//! ```
//!
//! solved as the augmented linear system `[J; √(λ d)] δ = [-r; 0]` with the
//! SVD solver from `math::ols`. `d_j` is the running maximum of the squared
//! Jacobian column norms (Marquardt scaling), so the damping is invariant to
//! parameter units.
//!
//! A step is only accepted when it strictly lowers the cost, so the cost is
//! non-increasing along the trajectory and the whole run is deterministic.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{CurveGrid, FitOptions, FitResult, ModelKind, Sample};
use crate::error::FitError;
use crate::math::{fill_jacobian, solve_least_squares};
use crate::models::{initial_guess, model_fn};

/// Damping above which no step can lower the cost: the point is stationary.
const MAX_DAMPING: f64 = 1e16;
const MIN_DAMPING: f64 = 1e-15;

/// Relative-change convergence tests only count for steps close to Gauss–Newton.
const CONVERGENCE_DAMPING: f64 = 1.0;

/// Fit `model` to `samples` starting from `initial_guess`.
///
/// Returns the parameters in the order of `initial_guess` and the final sum of
/// squared residuals.
///
/// # Errors
/// - `InsufficientData` if there are fewer samples than parameters
/// - `InvalidInput` for an empty guess, non-finite inputs, or a model that is
///   not finite at the starting point
/// - `DidNotConverge` if `opts.max_iterations` steps pass without convergence
pub fn fit<F>(
    samples: &[Sample],
    model: &F,
    initial_guess: &[f64],
    opts: &FitOptions,
) -> Result<FitResult, FitError>
where
    F: Fn(f64, &[f64]) -> f64 + ?Sized,
{
    let n = initial_guess.len();
    let m = samples.len();

    if n == 0 {
        return Err(FitError::InvalidInput("initial guess is empty".into()));
    }
    if m < n {
        return Err(FitError::InsufficientData { samples: m, params: n });
    }
    if let Some(s) = samples.iter().find(|s| !(s.t.is_finite() && s.y.is_finite())) {
        return Err(FitError::InvalidInput(format!(
            "non-finite sample (t={}, y={})",
            s.t, s.y
        )));
    }
    if initial_guess.iter().any(|v| !v.is_finite()) {
        return Err(FitError::InvalidInput(format!(
            "non-finite initial guess {initial_guess:?}"
        )));
    }

    let mut params = initial_guess.to_vec();
    let mut residuals = DVector::<f64>::zeros(m);
    let mut cost = fill_residuals(model, samples, &params, &mut residuals);
    if !cost.is_finite() {
        return Err(FitError::InvalidInput(format!(
            "model is not finite at the initial guess {initial_guess:?}"
        )));
    }
    if cost <= opts.cost_tol {
        return Ok(FitResult {
            params,
            residual: cost,
            iterations: 0,
        });
    }

    let mut lambda = opts.initial_damping.max(MIN_DAMPING);
    let mut scale = vec![0.0; n];
    let mut jac = DMatrix::<f64>::zeros(m, n);
    let mut jac_stale = true;

    let mut trial = vec![0.0; n];
    let mut trial_residuals = DVector::<f64>::zeros(m);

    let mut iterations = 0usize;
    while iterations < opts.max_iterations {
        if jac_stale {
            fill_jacobian(model, samples, &params, &mut jac);
            if jac.iter().any(|v| !v.is_finite()) {
                return Err(FitError::InvalidInput(format!(
                    "model derivative is not finite at {params:?}"
                )));
            }
            for j in 0..n {
                scale[j] = f64::max(scale[j], jac.column(j).norm_squared());
            }
            jac_stale = false;
        }
        iterations += 1;

        let step = damped_step(&jac, &residuals, &scale, lambda);
        let accepted = match step {
            Some(delta) => {
                for j in 0..n {
                    trial[j] = params[j] + delta[j];
                }
                let trial_cost = fill_residuals(model, samples, &trial, &mut trial_residuals);
                if trial_cost < cost {
                    let reduction = cost - trial_cost;
                    let step_norm = delta.norm();
                    let param_norm = params.iter().map(|v| v * v).sum::<f64>().sqrt();
                    let prev_cost = cost;
                    let step_lambda = lambda;

                    params.copy_from_slice(&trial);
                    std::mem::swap(&mut residuals, &mut trial_residuals);
                    cost = trial_cost;
                    lambda = (lambda / 10.0).max(MIN_DAMPING);
                    jac_stale = true;

                    debug!(iterations, cost, lambda = step_lambda, "accepted step");

                    let converged = cost <= opts.cost_tol
                        || (step_lambda <= CONVERGENCE_DAMPING
                            && (reduction <= opts.ftol * prev_cost
                                || step_norm <= opts.xtol * (param_norm + opts.xtol)));
                    if converged {
                        return Ok(FitResult {
                            params,
                            residual: cost,
                            iterations,
                        });
                    }
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        if !accepted {
            lambda *= 10.0;
            if lambda > MAX_DAMPING {
                debug!(iterations, cost, "no descent direction left; treating point as stationary");
                return Ok(FitResult {
                    params,
                    residual: cost,
                    iterations,
                });
            }
        }
    }

    warn!(iterations, residual = cost, "fit hit the iteration cap without converging");
    Err(FitError::DidNotConverge {
        iterations,
        residual: cost,
    })
}

/// Fit one of the built-in models.
///
/// Without an explicit guess, the starting point comes from
/// `models::initial_guess` (log-linear regression for exponential / power law).
pub fn fit_model(
    samples: &[Sample],
    kind: ModelKind,
    guess: Option<&[f64]>,
    opts: &FitOptions,
) -> Result<FitResult, FitError> {
    let guess = resolve_guess(kind, samples, guess)?;
    fit(samples, &model_fn(kind), &guess, opts)
}

/// The caller's guess, or one derived from `samples`, checked against the
/// parameter count of `kind`.
pub fn resolve_guess(kind: ModelKind, samples: &[Sample], guess: Option<&[f64]>) -> Result<Vec<f64>, FitError> {
    let guess = match guess {
        Some(g) => g.to_vec(),
        None => initial_guess(kind, samples),
    };
    if guess.len() != kind.param_len() {
        return Err(FitError::InvalidInput(format!(
            "{} model takes {} parameter(s), got {}",
            kind.display_name(),
            kind.param_len(),
            guess.len()
        )));
    }
    Ok(guess)
}

/// Fit and keep the model alongside the result, so the curve can be evaluated later.
pub fn fit_curve<F>(
    samples: &[Sample],
    model: F,
    initial_guess: &[f64],
    opts: &FitOptions,
) -> Result<FittedModel<F>, FitError>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let result = fit(samples, &model, initial_guess, opts)?;
    Ok(FittedModel::new(model, result))
}

/// Run `fit` from several starting points in parallel and keep the best.
///
/// Selection is deterministic: lowest residual, ties broken by guess index.
/// If every start fails, the error of the first guess is returned.
pub fn fit_multistart<F>(
    samples: &[Sample],
    model: &F,
    guesses: &[Vec<f64>],
    opts: &FitOptions,
) -> Result<FitResult, FitError>
where
    F: Fn(f64, &[f64]) -> f64 + Sync + ?Sized,
{
    if guesses.is_empty() {
        return Err(FitError::InvalidInput("no starting points supplied".into()));
    }

    let outcomes: Vec<Result<FitResult, FitError>> = guesses
        .par_iter()
        .map(|g| fit(samples, model, g, opts))
        .collect();

    let mut best: Option<(usize, FitResult)> = None;
    let mut first_err = None;
    for (idx, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(r) => {
                let better = match &best {
                    Some((_, b)) => r.residual < b.residual,
                    None => true,
                };
                if better {
                    best = Some((idx, r));
                }
            }
            Err(e) => {
                debug!(start = idx, error = %e, "start failed");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }

    match (best, first_err) {
        (Some((idx, r)), _) => {
            debug!(start = idx, residual = r.residual, "selected best start");
            Ok(r)
        }
        (None, Some(e)) => Err(e),
        (None, None) => Err(FitError::InvalidInput("no starting points supplied".into())),
    }
}

/// Geometric spread of starting points around a base guess.
///
/// Each parameter is scaled by `factor^k` for `k` in `-(count/2)..` so the
/// grid brackets the base guess; zero entries are offset additively instead.
pub fn spread_guesses(base: &[f64], count: usize, factor: f64) -> Vec<Vec<f64>> {
    let count = count.max(1);
    let half = (count / 2) as i32;
    (0..count as i32)
        .map(|i| {
            let k = i - half;
            base.iter()
                .map(|&p| {
                    if p == 0.0 {
                        k as f64 * (factor - 1.0) * 0.1
                    } else {
                        p * factor.powi(k)
                    }
                })
                .collect()
        })
        .collect()
}

/// A fitted model: the parameters plus the function they plug into.
#[derive(Debug, Clone)]
pub struct FittedModel<F> {
    model: F,
    result: FitResult,
}

impl<F> FittedModel<F>
where
    F: Fn(f64, &[f64]) -> f64,
{
    pub fn new(model: F, result: FitResult) -> Self {
        Self { model, result }
    }

    pub fn result(&self) -> &FitResult {
        &self.result
    }

    pub fn params(&self) -> &[f64] {
        &self.result.params
    }

    pub fn residual(&self) -> f64 {
        self.result.residual
    }

    /// Evaluate the fitted curve at `t`.
    pub fn eval(&self, t: f64) -> f64 {
        (self.model)(t, &self.result.params)
    }

    /// Evaluate on `n` evenly spaced points spanning `[t0, t1]` (inclusive).
    pub fn grid(&self, t0: f64, t1: f64, n: usize) -> CurveGrid {
        let n = n.max(2);
        let mut t = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let u = i as f64 / (n as f64 - 1.0);
            let ti = t0 + u * (t1 - t0);
            t.push(ti);
            y.push(self.eval(ti));
        }
        CurveGrid { t, y }
    }
}

fn fill_residuals<F>(model: &F, samples: &[Sample], params: &[f64], out: &mut DVector<f64>) -> f64
where
    F: Fn(f64, &[f64]) -> f64 + ?Sized,
{
    let mut cost = 0.0;
    for (i, s) in samples.iter().enumerate() {
        let r = model(s.t, params) - s.y;
        out[i] = r;
        cost += r * r;
    }
    if cost.is_finite() { cost } else { f64::INFINITY }
}

fn damped_step(
    jac: &DMatrix<f64>,
    residuals: &DVector<f64>,
    scale: &[f64],
    lambda: f64,
) -> Option<DVector<f64>> {
    let (m, n) = jac.shape();
    let mut aug = DMatrix::<f64>::zeros(m + n, n);
    let mut rhs = DVector::<f64>::zeros(m + n);

    aug.view_mut((0, 0), (m, n)).copy_from(jac);
    for i in 0..m {
        rhs[i] = -residuals[i];
    }
    for j in 0..n {
        aug[(m + j, j)] = (lambda * scale[j]).sqrt();
    }

    solve_least_squares(&aug, &rhs)
}
