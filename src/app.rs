//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - folds flags into run configs
//! - runs fits / simulations and prints reports
//! - writes optional exports

use std::io::Write;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, FitArgs, GrowthArgs, OdeArgs, SynthArgs, System};
use crate::data::{SynthConfig, generate_samples};
use crate::domain::{FitConfig, FitOptions, OdeOptions, SimulateConfig, SimulationKind};
use crate::error::AppError;
use crate::io::{
    build_curve_file, parse_point, read_curve_json, write_curve_json, write_residuals_csv, write_samples,
};

pub mod pipeline;

/// RK4 sub-steps per grid interval when `--substeps` is not given.
const GROWTH_SUBSTEPS: usize = 10;
/// The calcium exchange is stiff; keep the RK4 step near 1e-4 for unit grid spacing.
const CALCIUM_SUBSTEPS: usize = 10_000;

/// Entry point for the `growthfit` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Simulate(args) => match args.system {
            System::Growth(g) => handle_simulate(growth_config(&g)),
            System::Calcium(c) => {
                let params = pipeline::load_calcium_params(c.params.as_deref())?;
                let config = SimulateConfig {
                    kind: SimulationKind::Calcium(params),
                    t_start: c.ode.t_start,
                    t_end: c.t_end,
                    dt: c.ode.dt,
                    options: ode_options(&c.ode, CALCIUM_SUBSTEPS),
                };
                handle_simulate(config)
            }
        },
        Command::Synth(args) => handle_synth(args),
        Command::Show(args) => {
            let curve = read_curve_json(&args.curve)?;
            print!("{}", crate::report::format_curve_file(&curve));
            Ok(())
        }
    }
}

fn growth_config(g: &GrowthArgs) -> SimulateConfig {
    SimulateConfig {
        kind: SimulationKind::Growth {
            x0: g.x0,
            rate: g.rate,
            target_factor: g.target_factor,
        },
        t_start: g.ode.t_start,
        t_end: g.t_end,
        dt: g.ode.dt,
        options: ode_options(&g.ode, GROWTH_SUBSTEPS),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args)?;
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_fit_summary(config.model, &run.result, &run.guess, &run.samples, &config)
    );
    println!("{}", crate::report::format_residual_table(&run.residuals));

    if let Some(path) = &config.export {
        write_residuals_csv(path, &run.residuals)?;
        info!(path = %path.display(), "wrote residuals CSV");
    }
    if let Some(path) = &config.export_curve {
        let curve = build_curve_file(config.model, &run.result, &run.samples, config.grid_points);
        write_curve_json(path, &curve)?;
        info!(path = %path.display(), "wrote curve JSON");
    }

    Ok(())
}

fn handle_simulate(config: SimulateConfig) -> Result<(), AppError> {
    let run = pipeline::run_simulation(&config)?;
    println!(
        "{}",
        crate::report::format_trajectory(&run.times, &run.states, &run.names)
    );
    if let Some((target, time)) = run.crossing {
        match time {
            Some(t) => println!("Reached {target:.4} at t = {t:.4}"),
            None => println!("Never reached {target:.4} before t = {:.4}", config.t_end),
        }
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = SynthConfig {
        model: args.model,
        params: args.params.clone(),
        t_start: args.t_start,
        t_end: args.t_end,
        n: args.n,
        noise: args.noise,
        seed: args.seed,
    };
    let samples = generate_samples(&config)?;
    let delimiter = delimiter_byte(args.delimiter)?;

    match &args.out {
        Some(path) => {
            write_samples(path, &samples, delimiter)?;
            info!(path = %path.display(), n = samples.len(), "wrote samples");
        }
        None => {
            let sep = args.delimiter;
            let mut stdout = std::io::stdout().lock();
            for s in &samples {
                writeln!(stdout, "{}{sep}{}", s.t, s.y)
                    .map_err(|e| AppError::new(2, format!("Failed to write samples: {e}")))?;
            }
        }
    }
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    let points = args
        .points
        .iter()
        .map(|p| parse_point(p))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FitConfig {
        data_path: args.data.clone(),
        points,
        delimiter: delimiter_byte(args.delimiter)?,
        model: args.model,
        guess: if args.guess.is_empty() {
            None
        } else {
            Some(args.guess.clone())
        },
        starts: args.starts.max(1),
        options: FitOptions::with_max_iterations(args.max_iter),
        grid_points: args.grid_points,
        export_curve: args.export_curve.clone(),
        export: args.export.clone(),
    })
}

fn ode_options(args: &OdeArgs, default_substeps: usize) -> OdeOptions {
    OdeOptions {
        substeps: args.substeps.unwrap_or(default_substeps),
        divergence_bound: args.divergence_bound,
    }
}

fn delimiter_byte(c: char) -> Result<u8, AppError> {
    match c {
        '"' | '\n' | '\r' => Err(AppError::new(
            2,
            format!("Delimiter {c:?} conflicts with CSV quoting or line breaks."),
        )),
        c if c.is_ascii() => Ok(c as u8),
        _ => Err(AppError::new(2, format!("Delimiter '{c}' must be a single ASCII character."))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelKind, Sample};

    #[test]
    fn fit_args_fold_into_config() {
        let cli = Cli::parse_from([
            "growthfit", "fit", "--point", "0,10", "--point", "20,20", "--starts", "0", "--delimiter", ";",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = fit_config_from_args(&args).unwrap();
        assert_eq!(config.points, vec![Sample::new(0.0, 10.0), Sample::new(20.0, 20.0)]);
        assert_eq!(config.delimiter, b';');
        assert_eq!(config.starts, 1);
        assert_eq!(config.guess, None);
        assert_eq!(config.model, ModelKind::Exponential);
    }

    #[test]
    fn malformed_inline_point_maps_to_input_exit_code() {
        let cli = Cli::parse_from(["growthfit", "fit", "--point", "zero,10"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let err = fit_config_from_args(&args).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        assert_eq!(delimiter_byte('\t').unwrap(), b'\t');
        assert!(delimiter_byte('§').is_err());
    }

    #[test]
    fn quote_and_line_break_delimiters_are_rejected() {
        for c in ['"', '\n', '\r'] {
            assert_eq!(delimiter_byte(c).unwrap_err().exit_code(), 2);
        }
        assert_eq!(delimiter_byte(';').unwrap(), b';');
    }

    #[test]
    fn default_growth_run_reaches_eightfold_target() {
        let cli = Cli::parse_from(["growthfit", "simulate", "growth", "--target-factor", "8"]);
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        let System::Growth(g) = args.system else {
            panic!("expected growth");
        };
        let run = pipeline::run_simulation(&growth_config(&g)).unwrap();
        let (target, time) = run.crossing.unwrap();
        assert_eq!(target, 80.0);
        assert!((time.unwrap() - 8f64.ln() / 0.05).abs() < 0.01);
    }

    #[test]
    fn nan_divergence_bound_is_input_error() {
        let cli = Cli::parse_from(["growthfit", "simulate", "growth", "--divergence-bound", "NaN"]);
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        let System::Growth(g) = args.system else {
            panic!("expected growth");
        };
        let err: AppError = pipeline::run_simulation(&growth_config(&g)).unwrap_err().into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn substeps_fall_back_per_system() {
        let args = OdeArgs {
            t_start: 0.0,
            dt: 1.0,
            substeps: None,
            divergence_bound: 1e6,
        };
        assert_eq!(ode_options(&args, CALCIUM_SUBSTEPS).substeps, CALCIUM_SUBSTEPS);
        let args = OdeArgs {
            substeps: Some(3),
            ..args
        };
        assert_eq!(ode_options(&args, GROWTH_SUBSTEPS).substeps, 3);
    }
}
