//! Poly - polynomial evaluation over a token ring
//!
//! Evaluates p(x) = a0 + a1·x + … + an·xⁿ at x = 0, 1, …, k. Each term is owned
//! by its own worker thread; the workers form a ring and pass a token from one
//! to the next. Only the token holder may touch the shared state record, so the
//! record needs no lock.
//!
//! # Architecture
//!
//! - **Coordinator**: creates the record and the ring, drives one round per x
//! - **Workers**: one per coefficient, add their term and pass the token on
//! - **Shared state record**: file-backed header plus identity table
//! - **Term evaluators**: pluggable product capability (`expr`, program, native)
//!
//! # Example
//!
//! ```
//! use poly::coordinator::Coordinator;
//! use poly::evaluator::native::NativeEvaluator;
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir()?;
//! let coordinator = Coordinator::new(
//!     vec![1, 2, 3],
//!     dir.path().join("state"),
//!     Arc::new(NativeEvaluator::new()),
//! );
//!
//! let mut results: Vec<(u64, i64)> = Vec::new();
//! let summary = coordinator.run(2, &mut results)?;
//! assert_eq!(summary.values, vec![1, 6, 17]);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod coordinator;
pub mod evaluator;
pub mod output;
pub mod ring;
pub mod state;
pub mod telemetry;
pub mod worker;

// Re-export commonly used types
pub use config::RunConfig;
pub use coordinator::{Coordinator, RunError, RunSummary};
pub use evaluator::TermEvaluator;

/// Result type used throughout Poly
pub type Result<T> = anyhow::Result<T>;
