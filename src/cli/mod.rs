//! Command-line parsing for the growth fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting/simulation code. Defaults that users commonly tune can also come
//! from the environment (or a `.env` file loaded at startup).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ModelKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "growthfit", version, about = "Least-squares growth model fitting and ODE simulation")]
pub struct Cli {
    /// Log filter (e.g. `info`, `growth_fit=debug`). `RUST_LOG` takes precedence.
    #[arg(long, global = true, env = "GROWTHFIT_LOG", default_value = "warn")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a growth model to samples and print parameters and residuals.
    Fit(FitArgs),
    /// Integrate a built-in ODE system and print the trajectory.
    Simulate(SimulateArgs),
    /// Generate a headerless sample file from a known model.
    Synth(SynthArgs),
    /// Print a curve JSON written by `fit --export-curve`.
    Show(ShowArgs),
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Headerless two-column sample file (`t,y` per line).
    #[arg(long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Extra sample given inline as `T,Y` (repeatable).
    #[arg(long = "point", value_name = "T,Y", allow_hyphen_values = true)]
    pub points: Vec<String>,

    /// Field delimiter of the sample file.
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Model to fit.
    #[arg(short, long, value_enum, default_value_t = ModelKind::Exponential)]
    pub model: ModelKind,

    /// Initial parameter guess, comma separated (derived from the data if omitted).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub guess: Vec<f64>,

    /// Number of starting points (spread geometrically around the guess).
    #[arg(long, default_value_t = 1)]
    pub starts: usize,

    /// Optimizer step cap.
    #[arg(long = "max-iter", env = "GROWTHFIT_MAX_ITER", default_value_t = 10_000)]
    pub max_iter: usize,

    /// Points in the exported fitted grid.
    #[arg(long, default_value_t = 101)]
    pub grid_points: usize,

    /// Export the curve (model + params + fitted grid) to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,

    /// Export per-sample residuals to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    #[command(subcommand)]
    pub system: System,
}

#[derive(Debug, Subcommand)]
pub enum System {
    /// First-order growth `dx/dt = rate * x`.
    Growth(GrowthArgs),
    /// Cytosol / ER / mitochondria calcium exchange.
    Calcium(CalciumArgs),
}

/// Integrator options shared by every system.
#[derive(Debug, Args, Clone)]
pub struct OdeArgs {
    /// Start time.
    #[arg(long, default_value_t = 0.0)]
    pub t_start: f64,

    /// Output grid spacing.
    #[arg(long, default_value_t = 1.0)]
    pub dt: f64,

    /// RK4 sub-steps per grid interval (system-specific default).
    #[arg(long)]
    pub substeps: Option<usize>,

    /// Abort when any state component exceeds this magnitude.
    #[arg(long, env = "GROWTHFIT_DIVERGENCE_BOUND", default_value_t = 1e12)]
    pub divergence_bound: f64,
}

#[derive(Debug, Args, Clone)]
pub struct GrowthArgs {
    /// Initial density.
    #[arg(long, default_value_t = 10.0)]
    pub x0: f64,

    /// Growth rate constant.
    #[arg(long, default_value_t = 0.05)]
    pub rate: f64,

    /// End time. A target the trajectory has not reached by then is reported as never reached.
    #[arg(long, default_value_t = 60.0)]
    pub t_end: f64,

    /// Report when the density first reaches `x0 * FACTOR`.
    #[arg(long, value_name = "FACTOR")]
    pub target_factor: Option<f64>,

    #[command(flatten)]
    pub ode: OdeArgs,
}

#[derive(Debug, Args, Clone)]
pub struct CalciumArgs {
    /// End time.
    #[arg(long, default_value_t = 300.0)]
    pub t_end: f64,

    /// JSON file overriding model constants / initial state.
    #[arg(long, value_name = "JSON")]
    pub params: Option<PathBuf>,

    #[command(flatten)]
    pub ode: OdeArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Model to sample.
    #[arg(short, long, value_enum, default_value_t = ModelKind::Exponential)]
    pub model: ModelKind,

    /// Model parameters, comma separated.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = [10.0, 0.05])]
    pub params: Vec<f64>,

    #[arg(long, default_value_t = 0.0)]
    pub t_start: f64,

    #[arg(long, default_value_t = 20.0)]
    pub t_end: f64,

    /// Number of samples.
    #[arg(short, long, default_value_t = 21)]
    pub n: usize,

    /// Standard deviation of additive Gaussian noise.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// RNG seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output file (stdout if omitted).
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Field delimiter.
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Curve JSON file.
    #[arg(value_name = "JSON")]
    pub curve: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_args_parse_points_and_guess() {
        let cli = Cli::parse_from([
            "growthfit", "fit", "--point", "0,10", "--point", "20,20", "--guess", "10,0", "--max-iter", "500",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.points, vec!["0,10", "20,20"]);
        assert_eq!(args.guess, vec![10.0, 0.0]);
        assert_eq!(args.max_iter, 500);
        assert_eq!(args.model, ModelKind::Exponential);
    }

    #[test]
    fn simulate_growth_defaults() {
        let cli = Cli::parse_from(["growthfit", "simulate", "growth", "--target-factor", "8"]);
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        let System::Growth(g) = args.system else {
            panic!("expected growth");
        };
        assert_eq!(g.x0, 10.0);
        assert_eq!(g.t_end, 60.0);
        assert_eq!(g.target_factor, Some(8.0));
        assert_eq!(g.ode.substeps, None);
    }

    #[test]
    fn show_takes_a_curve_path() {
        let cli = Cli::parse_from(["growthfit", "show", "curve.json"]);
        let Command::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.curve, PathBuf::from("curve.json"));
    }

    #[test]
    fn model_aliases_are_accepted() {
        let cli = Cli::parse_from(["growthfit", "synth", "-m", "power", "--params", "2,-0.5"]);
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!(args.model, ModelKind::PowerLaw);
        assert_eq!(args.params, vec![2.0, -0.5]);
    }
}
