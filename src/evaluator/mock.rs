//! Mock term evaluator for testing
//!
//! Computes products in-process like the native evaluator, but records every
//! call and can be told to fail, panic, or stall. Clones share their state, so
//! a test can keep one handle while the ring owns another.
//!
//! # Example
//!
//! ```
//! use poly::evaluator::TermEvaluator;
//! use poly::evaluator::mock::MockEvaluator;
//!
//! let eval = MockEvaluator::new();
//! assert_eq!(eval.product(&[3, 2, 2]).unwrap(), 12);
//!
//! eval.set_should_fail(true);
//! assert!(eval.product(&[1]).is_err());
//! assert_eq!(eval.calls(), vec![vec![3, 2, 2], vec![1]]);
//! ```

use super::native::NativeEvaluator;
use super::{EvalError, TermEvaluator};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct MockSettings {
    should_fail: bool,
    should_panic: bool,
    fail_on_call: Option<usize>,
    delay: Option<Duration>,
}

/// Recording evaluator with configurable misbehaviour
#[derive(Debug, Clone, Default)]
pub struct MockEvaluator {
    settings: Arc<Mutex<MockSettings>>,
    calls: Arc<Mutex<Vec<Vec<i64>>>>,
}

impl MockEvaluator {
    /// Create a mock that succeeds on every call
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent call
    pub fn set_should_fail(&self, should_fail: bool) {
        self.settings.lock().unwrap().should_fail = should_fail;
    }

    /// Panic inside `product` on every subsequent call
    pub fn set_should_panic(&self, should_panic: bool) {
        self.settings.lock().unwrap().should_panic = should_panic;
    }

    /// Fail only the call with this zero-based index
    pub fn set_fail_on_call(&self, call: Option<usize>) {
        self.settings.lock().unwrap().fail_on_call = call;
    }

    /// Sleep this long inside every call
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.settings.lock().unwrap().delay = delay;
    }

    /// Factor lists received so far, in call order
    pub fn calls(&self) -> Vec<Vec<i64>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl TermEvaluator for MockEvaluator {
    fn product(&self, factors: &[i64]) -> Result<i64, EvalError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(factors.to_vec());
            calls.len() - 1
        };

        // Copy the settings out so a panic below never poisons the lock
        let (should_fail, should_panic, fail_on_call, delay) = {
            let s = self.settings.lock().unwrap();
            (s.should_fail, s.should_panic, s.fail_on_call, s.delay)
        };

        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if should_panic {
            panic!("mock evaluator panic on {:?}", factors);
        }
        if should_fail || fail_on_call == Some(index) {
            return Err(EvalError::Injected(format!(
                "mock evaluator failure on call {}",
                index
            )));
        }

        NativeEvaluator::new().product(factors)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
