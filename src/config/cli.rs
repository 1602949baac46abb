//! CLI argument parsing using clap

use super::{EvaluatorKind, OutputFormat};
use clap::Parser;
use std::path::PathBuf;

/// Evaluate a polynomial at x = 0..=k with a ring of worker threads
#[derive(Parser, Debug)]
#[command(name = "poly")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Last evaluation point k; prints p(0) through p(k)
    #[arg(value_name = "K")]
    pub last_x: u64,

    /// Shared state record file, created and removed by the run
    #[arg(value_name = "F")]
    pub state_file: PathBuf,

    /// Coefficients a0 .. an, a0 being the constant term
    #[arg(value_name = "A", required = true, num_args = 1.., allow_negative_numbers = true)]
    pub coefficients: Vec<i64>,

    /// Term evaluator [default: expr]
    #[arg(long, value_enum)]
    pub evaluator: Option<EvaluatorKind>,

    /// Program used by the `command` evaluator (or in place of `expr`)
    #[arg(long, value_name = "PATH")]
    pub program: Option<PathBuf>,

    /// Output format [default: text]
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE", env = "POLY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments, leaving the exit decision to the caller
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("poly").chain(args.iter().copied()))
    }

    #[test]
    fn test_positional_arguments() {
        let cli = parse(&["2", "/tmp/s", "1", "2", "3"]).unwrap();
        assert_eq!(cli.last_x, 2);
        assert_eq!(cli.state_file, PathBuf::from("/tmp/s"));
        assert_eq!(cli.coefficients, vec![1, 2, 3]);
        assert_eq!(cli.evaluator, None);
        assert!(!cli.debug);
    }

    #[test]
    fn test_negative_coefficients() {
        let cli = parse(&["1", "s", "-4", "0", "-1"]).unwrap();
        assert_eq!(cli.coefficients, vec![-4, 0, -1]);
    }

    #[test]
    fn test_options() {
        let cli = parse(&["--evaluator", "native", "--format", "json", "--debug", "0", "s", "5"]).unwrap();
        assert_eq!(cli.evaluator, Some(EvaluatorKind::Native));
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(cli.debug);
    }

    #[test]
    fn test_usage_errors() {
        // No coefficients
        assert!(parse(&["2", "s"]).is_err());
        // Nothing at all
        assert!(parse(&[]).is_err());
        // Negative k
        assert!(parse(&["-1", "s", "1"]).is_err());
        // Non-integer coefficient
        assert!(parse(&["1", "s", "x"]).is_err());
        // Unknown evaluator
        assert!(parse(&["--evaluator", "gpu", "1", "s", "1"]).is_err());
    }

    #[test]
    fn test_help_is_not_a_usage_error() {
        let err = parse(&["--help"]).unwrap_err();
        assert!(!err.use_stderr());
    }
}
