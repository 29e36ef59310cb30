//! Fixed-step RK4 integration over a caller-supplied time grid.
//!
//! The derivative is written into an output slice (`f(t, x, dxdt)`) so the
//! inner loop never allocates. Between two grid points we take
//! `OdeOptions::substeps` equal RK4 steps; only the grid states are returned.

use tracing::warn;

use crate::domain::OdeOptions;
use crate::error::FitError;

/// Largest grid `uniform_grid` will build.
pub const MAX_GRID_POINTS: usize = 10_000_000;

/// Integrate `dx/dt = derivative(t, x)` from `initial_state` at `time_grid[0]`.
///
/// Returns one state per grid point; the first is `initial_state` itself.
///
/// # Errors
/// - `InvalidInput` for an empty grid or state, non-finite grid times, a
///   decreasing grid, zero substeps, or a divergence bound that is not a
///   positive finite number
/// - `IntegrationDiverged` as soon as any component is non-finite or exceeds
///   `opts.divergence_bound` in magnitude
pub fn simulate_ode<F>(
    derivative: F,
    initial_state: &[f64],
    time_grid: &[f64],
    opts: &OdeOptions,
) -> Result<Vec<Vec<f64>>, FitError>
where
    F: Fn(f64, &[f64], &mut [f64]),
{
    let dim = initial_state.len();
    if dim == 0 {
        return Err(FitError::InvalidInput("initial state is empty".into()));
    }
    let Some(&t0) = time_grid.first() else {
        return Err(FitError::InvalidInput("time grid is empty".into()));
    };
    if time_grid.iter().any(|t| !t.is_finite()) {
        return Err(FitError::InvalidInput("time grid contains non-finite values".into()));
    }
    if time_grid.windows(2).any(|w| w[1] < w[0]) {
        return Err(FitError::InvalidInput("time grid must be non-decreasing".into()));
    }
    if opts.substeps == 0 {
        return Err(FitError::InvalidInput("substeps must be >= 1".into()));
    }
    let bound = opts.divergence_bound;
    if !(bound.is_finite() && bound > 0.0) {
        return Err(FitError::InvalidInput(format!(
            "divergence bound must be a positive finite number, got {bound}"
        )));
    }

    let mut x = initial_state.to_vec();
    check_bounds(t0, &x, opts.divergence_bound)?;

    let mut k1 = vec![0.0; dim];
    let mut k2 = vec![0.0; dim];
    let mut k3 = vec![0.0; dim];
    let mut k4 = vec![0.0; dim];
    let mut tmp = vec![0.0; dim];

    let mut out = Vec::with_capacity(time_grid.len());
    out.push(x.clone());

    for w in time_grid.windows(2) {
        let (ta, tb) = (w[0], w[1]);
        let h = (tb - ta) / opts.substeps as f64;
        if h > 0.0 {
            for s in 0..opts.substeps {
                let t = ta + h * s as f64;

                derivative(t, &x, &mut k1);
                for i in 0..dim {
                    tmp[i] = x[i] + 0.5 * h * k1[i];
                }
                derivative(t + 0.5 * h, &tmp, &mut k2);
                for i in 0..dim {
                    tmp[i] = x[i] + 0.5 * h * k2[i];
                }
                derivative(t + 0.5 * h, &tmp, &mut k3);
                for i in 0..dim {
                    tmp[i] = x[i] + h * k3[i];
                }
                derivative(t + h, &tmp, &mut k4);

                for i in 0..dim {
                    x[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
                }
                check_bounds(t + h, &x, opts.divergence_bound)?;
            }
        }
        out.push(x.clone());
    }

    Ok(out)
}

fn check_bounds(t: f64, x: &[f64], bound: f64) -> Result<(), FitError> {
    for &v in x {
        if !v.is_finite() || v.abs() > bound {
            warn!(t, value = v, bound, "integration diverged");
            return Err(FitError::IntegrationDiverged {
                time: t,
                magnitude: v.abs(),
            });
        }
    }
    Ok(())
}

/// `dx/dt = rate · x` for every component.
pub fn growth_derivative(rate: f64) -> impl Fn(f64, &[f64], &mut [f64]) + Copy {
    move |_t: f64, x: &[f64], out: &mut [f64]| {
        for (o, &xi) in out.iter_mut().zip(x) {
            *o = rate * xi;
        }
    }
}

/// Evenly spaced points from `t0` to `t1` with spacing close to `dt`.
///
/// The last point is always exactly `t1`.
pub fn uniform_grid(t0: f64, t1: f64, dt: f64) -> Result<Vec<f64>, FitError> {
    if !(t0.is_finite() && t1.is_finite() && dt.is_finite() && dt > 0.0 && t1 >= t0) {
        return Err(FitError::InvalidInput(format!(
            "invalid time grid: t0={t0}, t1={t1}, dt={dt} (need finite values, dt>0, t1>=t0)"
        )));
    }
    let steps = ((t1 - t0) / dt).round().max(1.0);
    if !steps.is_finite() || steps >= MAX_GRID_POINTS as f64 {
        return Err(FitError::InvalidInput(format!(
            "time grid from {t0} to {t1} with dt={dt} needs more than {MAX_GRID_POINTS} points"
        )));
    }
    let steps = steps as usize;
    let h = (t1 - t0) / steps as f64;
    let mut grid: Vec<f64> = (0..steps).map(|i| t0 + h * i as f64).collect();
    grid.push(t1);
    Ok(grid)
}

/// First time component `component` reaches `target`, by linear interpolation
/// between grid points. `None` if it never does.
pub fn first_crossing(times: &[f64], states: &[Vec<f64>], component: usize, target: f64) -> Option<f64> {
    let values = states
        .iter()
        .map(|s| s.get(component).copied())
        .collect::<Option<Vec<f64>>>()?;
    let n = times.len().min(values.len());
    if n == 0 {
        return None;
    }
    if values[0] == target {
        return Some(times[0]);
    }
    for i in 1..n {
        let (xa, xb) = (values[i - 1] - target, values[i] - target);
        if xb == 0.0 {
            return Some(times[i]);
        }
        if xa * xb < 0.0 {
            let u = xa / (xa - xb);
            return Some(times[i - 1] + u * (times[i] - times[i - 1]));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_growth_matches_closed_form() {
        let grid = uniform_grid(0.0, 20.0, 1.0).unwrap();
        assert_eq!(grid.len(), 21);

        let states = simulate_ode(growth_derivative(0.05), &[10.0], &grid, &OdeOptions::default()).unwrap();
        assert_eq!(states.len(), 21);
        assert_eq!(states[0], vec![10.0]);
        let expected = 10.0 * std::f64::consts::E;
        assert!((states[20][0] - expected).abs() < 1e-6, "x(20) = {}", states[20][0]);
        assert!((states[20][0] - 27.18).abs() < 0.01);
    }

    #[test]
    fn blow_up_is_reported_as_divergence() {
        let grid = uniform_grid(0.0, 2.0, 0.1).unwrap();
        let opts = OdeOptions {
            substeps: 10,
            divergence_bound: 1e6,
        };
        let square = |_t: f64, x: &[f64], out: &mut [f64]| out[0] = x[0] * x[0];
        let err = simulate_ode(square, &[1.0], &grid, &opts).unwrap_err();
        match err {
            FitError::IntegrationDiverged { time, magnitude } => {
                assert!(time > 0.9 && time <= 2.0, "diverged at {time}");
                assert!(magnitude > 1e6 || magnitude.is_nan());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_grids() {
        let f = growth_derivative(1.0);
        let opts = OdeOptions::default();
        assert!(matches!(simulate_ode(f, &[1.0], &[], &opts), Err(FitError::InvalidInput(_))));
        assert!(matches!(simulate_ode(f, &[], &[0.0, 1.0], &opts), Err(FitError::InvalidInput(_))));
        assert!(matches!(
            simulate_ode(f, &[1.0], &[0.0, 2.0, 1.0], &opts),
            Err(FitError::InvalidInput(_))
        ));
        assert!(uniform_grid(1.0, 0.0, 0.1).is_err());
    }

    #[test]
    fn oversized_grids_are_rejected_before_allocating() {
        assert!(matches!(uniform_grid(0.0, 1e300, 1e-300), Err(FitError::InvalidInput(_))));
        assert!(matches!(uniform_grid(0.0, 300.0, 1e-9), Err(FitError::InvalidInput(_))));
        assert_eq!(uniform_grid(0.0, 1.0, 1e-6).unwrap().len(), 1_000_001);
    }

    #[test]
    fn divergence_bound_must_be_positive_and_finite() {
        let f = growth_derivative(10.0);
        let grid = [0.0, 2.0];
        for bound in [f64::NAN, f64::INFINITY, 0.0, -1.0] {
            let opts = OdeOptions {
                divergence_bound: bound,
                ..OdeOptions::default()
            };
            assert!(
                matches!(simulate_ode(f, &[1.0], &grid, &opts), Err(FitError::InvalidInput(_))),
                "bound {bound} was accepted"
            );
        }
    }

    #[test]
    fn single_point_grid_returns_initial_state() {
        let states = simulate_ode(growth_derivative(1.0), &[3.0, 4.0], &[5.0], &OdeOptions::default()).unwrap();
        assert_eq!(states, vec![vec![3.0, 4.0]]);
    }

    #[test]
    fn time_to_eightfold_density() {
        let rate = 0.05;
        let grid = uniform_grid(0.0, 60.0, 1.0).unwrap();
        let states = simulate_ode(growth_derivative(rate), &[10.0], &grid, &OdeOptions::default()).unwrap();
        let t = first_crossing(&grid, &states, 0, 80.0).unwrap();
        assert!((t - 8f64.ln() / rate).abs() < 0.01, "t = {t}");

        assert!(first_crossing(&grid, &states, 0, 1e9).is_none());
        assert!(first_crossing(&grid, &states, 3, 80.0).is_none());
        assert_eq!(first_crossing(&grid, &states, 0, 10.0), Some(0.0));
    }
}
