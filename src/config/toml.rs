//! TOML configuration file parsing
//!
//! ```toml
//! [evaluator]
//! kind = "command"
//! program = "/usr/local/bin/mul"
//!
//! [output]
//! format = "json"
//!
//! [logging]
//! level = "poly=debug"
//! ```

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<FileConfig> {
    let config: FileConfig = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with file configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, file: FileConfig) -> RunConfig {
    let FileConfig {
        mut evaluator,
        mut output,
        mut logging,
    } = file;

    if let Some(kind) = cli.evaluator {
        evaluator.kind = kind;
    }
    if let Some(ref program) = cli.program {
        evaluator.program = Some(program.clone());
    }
    if let Some(format) = cli.format {
        output.format = format;
    }
    if cli.debug {
        logging.debug = true;
    }

    RunConfig {
        last_x: cli.last_x,
        state_path: cli.state_file.clone(),
        coefficients: cli.coefficients.clone(),
        evaluator,
        output,
        logging,
    }
}
