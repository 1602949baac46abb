//! Poly CLI entry point

use anyhow::{Context, Result};
use poly::config::cli::Cli;
use poly::config::{toml, validator, FileConfig, RunConfig};
use poly::coordinator::Coordinator;
use poly::{evaluator, output, telemetry};
use std::io;
use std::process::ExitCode;
use tracing::debug;

fn main() -> ExitCode {
    // Usage errors exit 1 before anything is created; --help and --version exit 0
    let cli = match Cli::try_parse_args() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    telemetry::init(&config.logging);

    debug!(
        degree = config.degree(),
        last_x = config.last_x,
        evaluator = %config.evaluator.kind,
        "configuration loaded"
    );

    let evaluator = evaluator::from_config(&config.evaluator);
    let coordinator = Coordinator::new(
        config.coefficients.clone(),
        config.state_path.clone(),
        evaluator,
    );

    let stdout = io::stdout();
    let mut sink = output::sink_for(config.output.format, stdout.lock());
    let summary = coordinator
        .run(config.last_x, sink.as_mut())
        .context("Polynomial evaluation failed")?;

    debug!(
        rounds = summary.values.len(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "done"
    );
    Ok(())
}

/// Build the run configuration from CLI arguments and the optional TOML file
fn build_config(cli: &Cli) -> Result<RunConfig> {
    let file = match cli.config {
        Some(ref path) => toml::parse_toml_file(path)?,
        None => FileConfig::default(),
    };

    let config = toml::merge_cli_with_config(cli, file);
    validator::validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}
