//! Term evaluator abstraction
//!
//! A term evaluator turns a list of integer factors into their product. Workers
//! call it once per round to compute `coefficient * x^position`. The ring does
//! not care how the product is obtained, so the evaluator is injected as a
//! trait object.
//!
//! # Implementations
//!
//! - **command**: runs an external program and reads the product back from its
//!   standard output (`expr` by default)
//! - **native**: checked in-process multiplication
//! - **mock**: recording test double with configurable failures

pub mod command;
pub mod mock;
pub mod native;

use crate::config::{EvaluatorConfig, EvaluatorKind};
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use thiserror::Error;

use command::{ArgumentStyle, CommandEvaluator};
use native::NativeEvaluator;

/// Program used when the `expr` evaluator is selected without an override
pub const DEFAULT_EXPR_PROGRAM: &str = "expr";

/// Errors raised while computing a term
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("term evaluator needs at least one factor")]
    NoFactors,

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` failed with {status}: {stderr}")]
    Status {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{program}` printed non-integer output {output:?}")]
    Output { program: String, output: String },

    #[error("product of {0:?} overflows a 64-bit integer")]
    Overflow(Vec<i64>),

    #[error("{0}")]
    Injected(String),
}

/// Capability computing the product of a list of factors
///
/// Evaluators are shared by every worker thread, so they must be `Send + Sync`.
pub trait TermEvaluator: Send + Sync {
    /// Multiply `factors` together
    ///
    /// # Errors
    ///
    /// Returns an error if `factors` is empty, the product cannot be computed,
    /// or the result does not fit in an `i64`.
    fn product(&self, factors: &[i64]) -> Result<i64, EvalError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Factors of the term `coefficient * x^position`
///
/// The power is expressed by repeating `x` `position` times after the
/// coefficient, so the evaluator only ever multiplies.
pub fn term_factors(coefficient: i64, x: i64, position: usize) -> Vec<i64> {
    let mut factors = Vec::with_capacity(position + 1);
    factors.push(coefficient);
    factors.extend(std::iter::repeat(x).take(position));
    factors
}

/// Build the evaluator selected by the configuration
pub fn from_config(config: &EvaluatorConfig) -> Arc<dyn TermEvaluator> {
    match config.kind {
        EvaluatorKind::Expr => {
            let program = config
                .program
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPR_PROGRAM));
            Arc::new(CommandEvaluator::new(program, ArgumentStyle::Expr))
        }
        EvaluatorKind::Command => {
            // The validator rejects `command` without a program
            let program = config.program.clone().unwrap_or_default();
            Arc::new(CommandEvaluator::new(program, ArgumentStyle::Plain))
        }
        EvaluatorKind::Native => Arc::new(NativeEvaluator::new()),
    }
}
