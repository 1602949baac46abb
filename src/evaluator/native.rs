//! In-process term evaluator
//!
//! Multiplies the factors directly with overflow checks. Useful when spawning
//! one process per term is not wanted.

use super::{EvalError, TermEvaluator};

/// Evaluator using checked `i64` multiplication
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeEvaluator;

impl NativeEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl TermEvaluator for NativeEvaluator {
    fn product(&self, factors: &[i64]) -> Result<i64, EvalError> {
        let (first, rest) = factors.split_first().ok_or(EvalError::NoFactors)?;
        rest.iter()
            .try_fold(*first, |acc, &factor| acc.checked_mul(factor))
            .ok_or_else(|| EvalError::Overflow(factors.to_vec()))
    }

    fn name(&self) -> &str {
        "native"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_single_factor() {
        assert_eq!(NativeEvaluator::new().product(&[7]).unwrap(), 7);
    }

    #[test]
    fn test_product_many_factors() {
        let eval = NativeEvaluator::new();
        assert_eq!(eval.product(&[3, 2, 2]).unwrap(), 12);
        assert_eq!(eval.product(&[-4, 3]).unwrap(), -12);
        assert_eq!(eval.product(&[9, 0, 0]).unwrap(), 0);
    }

    #[test]
    fn test_product_no_factors() {
        assert!(matches!(
            NativeEvaluator::new().product(&[]),
            Err(EvalError::NoFactors)
        ));
    }

    #[test]
    fn test_product_overflow() {
        let result = NativeEvaluator::new().product(&[i64::MAX, 2]);
        match result {
            Err(EvalError::Overflow(factors)) => assert_eq!(factors, vec![i64::MAX, 2]),
            other => panic!("expected overflow, got {:?}", other),
        }
    }
}
