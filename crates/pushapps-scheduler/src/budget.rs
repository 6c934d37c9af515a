//! Per-identifier retry budget

use dashmap::DashMap;

/// Remaining retries keyed by task identifier
///
/// Entries are created lazily on the first charged failure of an identifier
/// and live for one scheduler run.
#[derive(Debug)]
pub struct RetryBudget {
    max_retries: u32,
    remaining: DashMap<String, u32>,
}

impl RetryBudget {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            remaining: DashMap::new(),
        }
    }

    /// Charge one retry to `identifier`; `false` once the budget is spent
    pub fn try_consume(&self, identifier: &str) -> bool {
        let mut remaining = self
            .remaining
            .entry(identifier.to_string())
            .or_insert(self.max_retries);

        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }

    /// Remaining retries, `None` if the identifier never failed
    pub fn remaining(&self, identifier: &str) -> Option<u32> {
        self.remaining.get(identifier).map(|r| *r)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
