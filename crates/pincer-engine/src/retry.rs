//! Per-step retry budget.

use std::time::Duration;

/// Bounded retry allowance for one lifecycle step.
///
/// Every step starts with a fresh budget; attempts never carry over
/// from one step to the next, so no step can starve a later one.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    attempts_remaining: u32,
    delay: Duration,
}

impl RetryBudget {
    #[must_use]
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts_remaining: attempts,
            delay,
        }
    }

    /// Spend one attempt.
    ///
    /// Returns false once the budget is exhausted; the caller then
    /// runs the step's fallback instead of retrying again.
    pub fn consume(&mut self) -> bool {
        if self.attempts_remaining == 0 {
            return false;
        }
        self.attempts_remaining -= 1;
        true
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.attempts_remaining
    }

    /// Pause between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_counts_down() {
        let mut budget = RetryBudget::new(2, Duration::from_millis(100));

        assert!(budget.consume());
        assert_eq!(budget.remaining(), 1);
        assert!(budget.consume());
        assert_eq!(budget.remaining(), 0);

        assert!(!budget.consume());
        assert!(!budget.consume());
    }

    #[test]
    fn test_zero_budget_never_allows() {
        let mut budget = RetryBudget::new(0, Duration::ZERO);
        assert!(!budget.consume());
    }
}
