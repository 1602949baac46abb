//! Configuration module
//!
//! Handles CLI argument parsing, the optional TOML configuration file, and
//! validation. CLI values take precedence over file values.

pub mod cli;
pub mod toml;
pub mod validator;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete configuration of one evaluation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Last evaluation point k (k + 1 rounds are run)
    pub last_x: u64,
    /// Shared state record file
    pub state_path: PathBuf,
    /// a0..an, a0 being the constant term
    pub coefficients: Vec<i64>,
    pub evaluator: EvaluatorConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl RunConfig {
    /// Polynomial degree n
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }
}

/// Settings that may come from a TOML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Term evaluator selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluatorConfig {
    #[serde(default)]
    pub kind: EvaluatorKind,
    /// Program to run (`command`), or replacement for `expr`
    #[serde(default)]
    pub program: Option<PathBuf>,
}

/// Term evaluator implementation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatorKind {
    /// Run `expr` once per term
    #[default]
    Expr,
    /// Run a custom program taking the factors as arguments
    Command,
    /// Multiply in-process
    Native,
}

impl fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluatorKind::Expr => write!(f, "expr"),
            EvaluatorKind::Command => write!(f, "command"),
            EvaluatorKind::Native => write!(f, "native"),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One integer per line
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `poly=debug`
    #[serde(default)]
    pub level: Option<String>,
    /// Shortcut for `poly=debug`
    #[serde(default)]
    pub debug: bool,
}
