//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads results and runs the fits
//! - prints reports/plots
//! - writes figures and optional exports

use clap::Parser;
use tracing::debug;

use crate::cli::{Cli, Command, FiguresArgs, FitArgs, FitKnobs, PlotArgs, SynthArgs};
use crate::data::{SynthConfig, generate_results, write_results};
use crate::domain::{ResonanceParams, RunConfig};
use crate::error::AppError;
use crate::plot::FigureStyle;

pub mod pipeline;

/// Entry point for the `phifig` binary.
pub fn run() -> Result<(), AppError> {
    // `phifig` and `phifig -o out/` behave like `phifig figures ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);
    init_tracing(cli.verbose);

    match cli.command {
        Command::Figures(args) => handle_figures(&args),
        Command::Fit(args) => handle_fit(&args),
        Command::Plot(args) => handle_plot(&args),
        Command::Synth(args) => handle_synth(&args),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    // A second init (tests, embedding) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn handle_figures(args: &FiguresArgs) -> Result<(), AppError> {
    let config = run_config_from_figures(args);
    debug!(?config, "figures");
    let run = pipeline::run_figures(&config)?;

    println!("{}", crate::report::format_fit_report(&run.fit));
    println!("Figures written to {}:", config.out_dir.display());
    for path in &run.figures {
        println!("  {}", path.display());
    }
    Ok(())
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = run_config_from_fit(args);
    debug!(?config, "fit");
    let run = pipeline::run_fit(&config)?;

    if config.all_sizes {
        println!("{}", crate::report::format_cohort_table(&run.fits));
    }
    println!("{}", crate::report::format_fit_report(run.primary()));

    if config.plot {
        let fit = run.primary();
        let plot = crate::plot::render_ascii_plot(
            &fit.observations,
            &fit.outcome,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    pipeline::write_exports(&config, &run)
}

fn handle_plot(args: &PlotArgs) -> Result<(), AppError> {
    let fit = crate::io::read_fit_json(&args.fit)?;
    let plot = crate::plot::render_ascii_plot_from_fit_file(&fit, args.width, args.height);
    println!("{plot}");
    Ok(())
}

fn handle_synth(args: &SynthArgs) -> Result<(), AppError> {
    let config = SynthConfig {
        seed: args.seed,
        noise_sd: args.noise_sd,
        ..SynthConfig::default()
    };
    let results = generate_results(&config)?;
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::io(format!("Failed to create directory '{}': {e}", parent.display()))
        })?;
    }
    write_results(&args.output, &results)?;
    println!(
        "Wrote {} synthetic records to {}",
        results.results.len(),
        args.output.display()
    );
    Ok(())
}

fn initial_guess(knobs: &FitKnobs) -> ResonanceParams {
    ResonanceParams::new(knobs.a0, knobs.b0, knobs.c0)
}

pub fn run_config_from_figures(args: &FiguresArgs) -> RunConfig {
    RunConfig {
        input: args.input.clone(),
        out_dir: args.out_dir.clone(),
        size: args.size,
        all_sizes: false,
        initial_guess: initial_guess(&args.knobs),
        max_evaluations: args.knobs.max_evals,
        plot: false,
        plot_width: 0,
        plot_height: 0,
        export_fit: None,
        export_summary: None,
        style: FigureStyle {
            width: args.fig_width,
            height: args.fig_height,
            ..FigureStyle::default()
        },
    }
}

pub fn run_config_from_fit(args: &FitArgs) -> RunConfig {
    RunConfig {
        input: args.input.clone(),
        out_dir: crate::cli::DEFAULT_OUT_DIR.into(),
        size: args.size,
        all_sizes: args.all,
        initial_guess: initial_guess(&args.knobs),
        max_evaluations: args.knobs.max_evals,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_fit: args.export_fit.clone(),
        export_summary: args.export.clone(),
        style: FigureStyle::default(),
    }
}

/// Rewrite argv so `phifig` defaults to `phifig figures`.
///
/// Rules:
/// - `phifig`                          -> `phifig figures`
/// - `phifig -o out ...`               -> `phifig figures -o out ...`
/// - `phifig --help/--version/-h/-V`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("figures".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "figures" | "fit" | "plot" | "synth");
    if is_subcommand {
        return argv;
    }

    // A leading flag belongs to the default command.
    if arg1.starts_with('-') {
        argv.insert(1, "figures".to_string());
    }
    argv
}
