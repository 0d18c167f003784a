//! Test outcome tallies shared between the parser, store, and views.

use serde::{Deserialize, Serialize};

/// Counters extracted from a set of test report files.
///
/// `success` already accounts for flaky and failed tests; the reported total
/// of a parsed report equals `success + flaky + failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestTally {
    pub success: i64,
    pub skipped: i64,
    pub flaky: i64,
    pub failed: i64,
}

impl TestTally {
    /// Total number of reported tests.
    pub fn total(&self) -> i64 {
        self.success + self.flaky + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total() {
        let tally = TestTally {
            success: 10,
            skipped: 2,
            flaky: 1,
            failed: 3,
        };
        assert_eq!(tally.total(), 14);
    }
}
