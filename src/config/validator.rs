//! Configuration validation

use super::*;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Validate complete configuration
pub fn validate_config(config: &RunConfig) -> Result<()> {
    validate_polynomial(config)?;
    validate_state_path(config)?;
    validate_evaluator(&config.evaluator)?;
    validate_logging(&config.logging)?;

    Ok(())
}

/// Validate coefficients and evaluation range
fn validate_polynomial(config: &RunConfig) -> Result<()> {
    if config.coefficients.is_empty() {
        anyhow::bail!("at least one coefficient is required");
    }

    // Workers raise x to powers as a signed integer
    if config.last_x > i64::MAX as u64 {
        anyhow::bail!("k must be at most {}, got {}", i64::MAX, config.last_x);
    }

    Ok(())
}

/// Validate the shared state record location
fn validate_state_path(config: &RunConfig) -> Result<()> {
    if config.state_path.as_os_str().is_empty() {
        anyhow::bail!("state file path must not be empty");
    }

    if config.state_path.is_dir() {
        anyhow::bail!(
            "state file path {} is a directory",
            config.state_path.display()
        );
    }

    Ok(())
}

/// Validate evaluator selection
fn validate_evaluator(evaluator: &EvaluatorConfig) -> Result<()> {
    if let Some(ref program) = evaluator.program {
        if program.as_os_str().is_empty() {
            anyhow::bail!("evaluator program must not be empty");
        }
    }

    match evaluator.kind {
        EvaluatorKind::Command if evaluator.program.is_none() => {
            anyhow::bail!("the command evaluator requires --program");
        }
        EvaluatorKind::Native if evaluator.program.is_some() => {
            eprintln!("Warning: --program is ignored by the native evaluator");
        }
        _ => {}
    }

    Ok(())
}

/// Validate the log filter directive
fn validate_logging(logging: &LoggingConfig) -> Result<()> {
    if let Some(ref level) = logging.level {
        if let Err(e) = EnvFilter::try_new(level) {
            anyhow::bail!("invalid logging level {:?}: {}", level, e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn base_config() -> RunConfig {
        RunConfig {
            last_x: 2,
            state_path: PathBuf::from("/tmp/poly-state"),
            coefficients: vec![1, 2, 3],
            evaluator: EvaluatorConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_no_coefficients() {
        let mut config = base_config();
        config.coefficients.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_last_x_range() {
        let mut config = base_config();
        config.last_x = i64::MAX as u64;
        assert!(validate_config(&config).is_ok());
        config.last_x = u64::MAX;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_state_path_directory() {
        let dir = TempDir::new().unwrap();
        let mut config = base_config();
        config.state_path = dir.path().to_path_buf();
        assert!(validate_config(&config).is_err());

        config.state_path = PathBuf::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_command_requires_program() {
        let mut config = base_config();
        config.evaluator.kind = EvaluatorKind::Command;
        assert!(validate_config(&config).is_err());

        config.evaluator.program = Some(PathBuf::from("/usr/local/bin/mul"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_logging_level() {
        let mut config = base_config();
        config.logging.level = Some("poly=debug".to_string());
        assert!(validate_config(&config).is_ok());

        config.logging.level = Some("poly=loud".to_string());
        assert!(validate_config(&config).is_err());
    }
}
