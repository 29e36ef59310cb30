//! Shared "fit" and "simulate" workflows.
//!
//! Keeping these in one place keeps the command handlers down to presentation:
//! load samples -> fit (single or multi-start) -> residuals
//! build grid -> integrate -> optional threshold crossing

use tracing::{debug, info};

use crate::domain::{FitConfig, FitResult, Sample, SimulateConfig, SimulationKind};
use crate::error::FitError;
use crate::fit::{fit_model, fit_multistart, resolve_guess, spread_guesses};
use crate::io::read_samples;
use crate::models::model_fn;
use crate::ode::calcium::{CalciumParams, STATE_NAMES, calcium_derivative};
use crate::ode::{first_crossing, growth_derivative, simulate_ode, uniform_grid};
use crate::report::{SampleResidual, compute_residuals};

/// Geometric factor between neighbouring multi-start guesses.
const START_SPREAD: f64 = 2.0;

/// All computed outputs of a single `growthfit fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub samples: Vec<Sample>,
    pub guess: Vec<f64>,
    pub result: FitResult,
    pub residuals: Vec<SampleResidual>,
}

/// All computed outputs of a single `growthfit simulate` run.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub times: Vec<f64>,
    pub states: Vec<Vec<f64>>,
    pub names: Vec<&'static str>,
    /// `(target, time)` when a crossing target was requested.
    pub crossing: Option<(f64, Option<f64>)>,
}

/// Gather samples from the data file (if any) followed by inline points.
pub fn load_samples(config: &FitConfig) -> Result<Vec<Sample>, FitError> {
    let mut samples = match &config.data_path {
        Some(path) => read_samples(path, config.delimiter)?,
        None => Vec::new(),
    };
    samples.extend(config.points.iter().copied());
    if samples.is_empty() {
        return Err(FitError::InvalidInput(
            "no samples: pass --data FILE and/or --point T,Y".into(),
        ));
    }
    Ok(samples)
}

/// Execute the fit workflow and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<FitRun, FitError> {
    let samples = load_samples(config)?;
    info!(n = samples.len(), model = config.model.display_name(), "loaded samples");

    let guess = resolve_guess(config.model, &samples, config.guess.as_deref())?;
    debug!(?guess, "initial guess");

    let model = model_fn(config.model);
    let result = if config.starts > 1 {
        let guesses = spread_guesses(&guess, config.starts, START_SPREAD);
        fit_multistart(&samples, &model, &guesses, &config.options)?
    } else {
        fit_model(&samples, config.model, Some(guess.as_slice()), &config.options)?
    };
    info!(residual = result.residual, iterations = result.iterations, "fit converged");

    let residuals = compute_residuals(&samples, &model, &result.params)?;

    Ok(FitRun {
        samples,
        guess,
        result,
        residuals,
    })
}

/// Execute a simulation and return the trajectory.
pub fn run_simulation(config: &SimulateConfig) -> Result<SimulationRun, FitError> {
    let times = uniform_grid(config.t_start, config.t_end, config.dt)?;

    match &config.kind {
        SimulationKind::Growth {
            x0,
            rate,
            target_factor,
        } => {
            let states = simulate_ode(growth_derivative(*rate), &[*x0], &times, &config.options)?;
            let crossing = target_factor.map(|factor| {
                let target = x0 * factor;
                (target, first_crossing(&times, &states, 0, target))
            });
            Ok(SimulationRun {
                times,
                states,
                names: vec!["x"],
                crossing,
            })
        }
        SimulationKind::Calcium(params) => {
            params.validate()?;
            let states = simulate_ode(calcium_derivative(params), &params.initial, &times, &config.options)?;
            Ok(SimulationRun {
                times,
                states,
                names: STATE_NAMES.to_vec(),
                crossing: None,
            })
        }
    }
}

/// Default parameters, or the JSON overrides at `path`.
pub fn load_calcium_params(path: Option<&std::path::Path>) -> Result<CalciumParams, FitError> {
    match path {
        Some(p) => CalciumParams::from_json_file(p),
        None => Ok(CalciumParams::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitOptions, ModelKind, OdeOptions};

    fn fit_config(points: Vec<Sample>) -> FitConfig {
        FitConfig {
            data_path: None,
            points,
            delimiter: b',',
            model: ModelKind::Exponential,
            guess: Some(vec![10.0, 0.0]),
            starts: 1,
            options: FitOptions::default(),
            grid_points: 11,
            export_curve: None,
            export: None,
        }
    }

    #[test]
    fn fit_run_on_inline_points() {
        let run = run_fit(&fit_config(vec![Sample::new(0.0, 10.0), Sample::new(20.0, 20.0)])).unwrap();
        assert_eq!(run.samples.len(), 2);
        assert!((run.result.params[1] - std::f64::consts::LN_2 / 20.0).abs() < 1e-6);
        assert!(run.residuals.iter().all(|r| r.residual.abs() < 1e-6));
    }

    #[test]
    fn fit_run_without_samples_is_rejected() {
        let err = run_fit(&fit_config(Vec::new())).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
    }

    #[test]
    fn fit_run_with_one_sample_is_insufficient() {
        let err = run_fit(&fit_config(vec![Sample::new(0.0, 10.0)])).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { .. }));
    }

    #[test]
    fn fit_run_rejects_guess_of_wrong_length_for_every_start_count() {
        for starts in [1, 3] {
            let mut config = fit_config(vec![Sample::new(0.0, 10.0), Sample::new(20.0, 20.0)]);
            config.guess = Some(vec![10.0, 0.0, 1.0]);
            config.starts = starts;
            assert!(matches!(run_fit(&config), Err(FitError::InvalidInput(_))));
        }
    }

    #[test]
    fn fit_run_keeps_the_derived_guess() {
        let mut config = fit_config(vec![Sample::new(0.0, 10.0), Sample::new(20.0, 20.0)]);
        config.guess = None;
        let run = run_fit(&config).unwrap();
        assert_eq!(run.guess.len(), 2);
        assert!((run.guess[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn multistart_run_matches_single_start_answer() {
        let points: Vec<Sample> = (0..8)
            .map(|i| {
                let t = i as f64 * 2.0;
                Sample::new(t, 3.0 * (0.2 * t).exp())
            })
            .collect();
        let mut config = fit_config(points);
        config.starts = 4;
        config.guess = Some(vec![1.0, 0.1]);
        let run = run_fit(&config).unwrap();
        assert!((run.result.params[0] - 3.0).abs() < 1e-6);
        assert!((run.result.params[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn growth_simulation_reports_eightfold_time() {
        let config = SimulateConfig {
            kind: SimulationKind::Growth {
                x0: 10.0,
                rate: 0.05,
                target_factor: Some(8.0),
            },
            t_start: 0.0,
            t_end: 60.0,
            dt: 0.5,
            options: OdeOptions::default(),
        };
        let run = run_simulation(&config).unwrap();
        assert_eq!(run.times.len(), 121);
        let (target, time) = run.crossing.unwrap();
        assert_eq!(target, 80.0);
        assert!((time.unwrap() - 8f64.ln() / 0.05).abs() < 0.01);
    }
}
