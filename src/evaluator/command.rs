//! Subprocess term evaluator
//!
//! Runs an external program once per term and reads the decimal product back
//! from its standard output. The call is synchronous: the worker holding the
//! token blocks until the child exits.
//!
//! # Argument styles
//!
//! - **Expr**: `expr 3 '*' 2 '*' 2`. `expr` exits with status 1 when the result
//!   is zero, so status 1 is accepted as long as stdout holds an integer.
//! - **Plain**: `program 3 2 2`. The program must print the product and exit 0.

use super::{EvalError, TermEvaluator};
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tracing::trace;

/// How factors are passed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentStyle {
    /// Factors interleaved with `*` operators, `expr` syntax
    Expr,
    /// Factors as plain positional arguments
    Plain,
}

impl ArgumentStyle {
    fn accepts(self, output: &Output) -> bool {
        match self {
            ArgumentStyle::Expr => matches!(output.status.code(), Some(0) | Some(1)),
            ArgumentStyle::Plain => output.status.success(),
        }
    }
}

/// Evaluator delegating each product to an external program
#[derive(Debug, Clone)]
pub struct CommandEvaluator {
    program: PathBuf,
    display_name: String,
    style: ArgumentStyle,
}

impl CommandEvaluator {
    pub fn new(program: PathBuf, style: ArgumentStyle) -> Self {
        let display_name = program.to_string_lossy().into_owned();
        Self {
            program,
            display_name,
            style,
        }
    }

    fn arguments(&self, factors: &[i64]) -> Vec<String> {
        match self.style {
            ArgumentStyle::Expr => {
                let mut args = Vec::with_capacity(factors.len() * 2);
                for (i, factor) in factors.iter().enumerate() {
                    if i > 0 {
                        args.push("*".to_string());
                    }
                    args.push(factor.to_string());
                }
                args
            }
            ArgumentStyle::Plain => factors.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl TermEvaluator for CommandEvaluator {
    fn product(&self, factors: &[i64]) -> Result<i64, EvalError> {
        if factors.is_empty() {
            return Err(EvalError::NoFactors);
        }

        let args = self.arguments(factors);
        trace!(program = %self.display_name, ?args, "running term evaluator");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| EvalError::Spawn {
                program: self.display_name.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = stdout.trim();

        match (self.style.accepts(&output), text.parse::<i64>()) {
            (true, Ok(value)) => Ok(value),
            (true, Err(_)) if output.status.success() => Err(EvalError::Output {
                program: self.display_name.clone(),
                output: text.to_string(),
            }),
            _ => Err(EvalError::Status {
                program: self.display_name.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        &self.display_name
    }
}
