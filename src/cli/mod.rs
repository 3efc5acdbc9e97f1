//! Command-line parsing for the Φ figure generator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::SystemSize;
use crate::fit::DEFAULT_MAX_EVALUATIONS;

/// Results file written by the entanglement experiment.
pub const DEFAULT_INPUT: &str = "results/consciousness_maximum_entanglement_results.json";
pub const DEFAULT_OUT_DIR: &str = "figures";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "phifig", version, about = "Stochastic-resonance fits and figures for integrated information (Φ)")]
pub struct Cli {
    /// Debug logging on stderr (otherwise `RUST_LOG`, default warn).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the XLarge cohort and write the four SVG figures (default).
    Figures(FiguresArgs),
    /// Fit one or all cohorts, print the report, and optionally plot/export.
    Fit(FitArgs),
    /// Plot a previously exported fit JSON in the terminal.
    Plot(PlotArgs),
    /// Write a synthetic results file with the experiment's schema.
    Synth(SynthArgs),
}

/// Initial guess and evaluation cap shared by every fitting command.
#[derive(Debug, Args, Clone)]
pub struct FitKnobs {
    /// Initial amplitude `a`.
    #[arg(long, default_value_t = 0.02, allow_negative_numbers = true)]
    pub a0: f64,

    /// Initial damping `b`.
    #[arg(long, default_value_t = 0.02, allow_negative_numbers = true)]
    pub b0: f64,

    /// Initial offset `c`.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub c0: f64,

    /// Cap on model evaluations per fit.
    #[arg(long = "max-evals", default_value_t = DEFAULT_MAX_EVALUATIONS)]
    pub max_evals: usize,
}

/// Options for rendering the figures.
#[derive(Debug, Args, Clone)]
pub struct FiguresArgs {
    /// Experiment results JSON.
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Directory the SVG figures are written to.
    #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
    pub out_dir: PathBuf,

    /// Cohort used for the stochastic-resonance figure.
    #[arg(long, value_enum, default_value_t = SystemSize::XLarge)]
    pub size: SystemSize,

    /// Figure width (pixels).
    #[arg(long, default_value_t = 900)]
    pub fig_width: u32,

    /// Figure height (pixels).
    #[arg(long, default_value_t = 600)]
    pub fig_height: u32,

    #[command(flatten)]
    pub knobs: FitKnobs,
}

/// Options for fitting and reporting.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Experiment results JSON.
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Cohort to fit.
    #[arg(short, long, value_enum, default_value_t = SystemSize::XLarge)]
    pub size: SystemSize,

    /// Fit every cohort (in parallel) and print a summary table.
    #[arg(long)]
    pub all: bool,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the fit (params + curve grid) to JSON.
    #[arg(long = "export-fit")]
    pub export_fit: Option<PathBuf>,

    /// Export one summary row per fitted cohort to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    #[command(flatten)]
    pub knobs: FitKnobs,
}

/// Options for plotting a saved fit.
#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Fit JSON file produced by `phifig fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Options for the synthetic generator.
#[derive(Debug, Args)]
pub struct SynthArgs {
    /// Where to write the results JSON.
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    pub output: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Standard deviation of the measurement noise added to Φ (bits).
    #[arg(long, default_value_t = 0.0015)]
    pub noise_sd: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_flags_parse() {
        let cli = Cli::parse_from([
            "phifig", "fit", "--size", "large", "--all", "--b0", "-0.5", "--max-evals", "10", "-v",
        ]);
        assert!(cli.verbose);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit command");
        };
        assert_eq!(args.size, SystemSize::Large);
        assert!(args.all);
        assert_eq!(args.knobs.b0, -0.5);
        assert_eq!(args.knobs.max_evals, 10);
        assert_eq!(args.input, PathBuf::from(DEFAULT_INPUT));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
