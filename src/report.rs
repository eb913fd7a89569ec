use crate::counters::OutcomeCounts;
use crate::source::CommitPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialReport {
    pub policy: CommitPolicy,
    pub start_value: i64,
    pub rows: u64,
    pub disconnect_every: u64,
    pub totals: OutcomeCounts,
    /// Counting cycles closed, including the tail after the last disconnect
    pub cycles: u64,
    pub distinct_rows: u64,
    pub exact_min: Option<i64>,
    pub exact_max: Option<i64>,
    pub filter_bits: usize,
    pub filter_hashes: usize,
    pub filter_insertions: usize,
    pub elapsed_ms: u64,
}

impl TrialReport {
    /// Observed share of logically new rows the filter claimed to have seen.
    pub fn observed_false_positive_rate(&self) -> f64 {
        if self.distinct_rows == 0 {
            return 0.0;
        }
        self.totals.false_positives as f64 / self.distinct_rows as f64
    }

    /// Checks the outcome expected of the commit policy. Returns one message
    /// per violated expectation.
    pub fn check_expectations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let totals = &self.totals;

        if self.policy.expects_duplicates() {
            if totals.duplicates == 0 {
                violations.push(format!(
                    "{} commit policy should produce duplicates, got none",
                    self.policy
                ));
            }
        } else if totals.duplicates != 0 {
            violations.push(format!(
                "{} commit policy should prevent duplicates, got {}",
                self.policy, totals.duplicates
            ));
        }
        if totals.false_positives == 0 {
            violations.push(
                "Undersized filter should yield false positives, got none"
                    .to_string(),
            );
        }
        if totals.false_negatives != 0 {
            violations.push(format!(
                "Filter must never yield false negatives, got {}",
                totals.false_negatives
            ));
        }
        if self.distinct_rows != self.rows {
            violations.push(format!(
                "Classified {} distinct rows out of {}",
                self.distinct_rows, self.rows
            ));
        }
        violations
    }
}

impl std::fmt::Display for TrialReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[TOTAL {}] Duplications: {}, FP: {}, FN: {} (rows {}..={}, {} cycles, {} ms)",
            self.policy,
            self.totals.duplicates,
            self.totals.false_positives,
            self.totals.false_negatives,
            self.exact_min.unwrap_or_default(),
            self.exact_max.unwrap_or_default(),
            self.cycles,
            self.elapsed_ms
        )
    }
}

/// Two trials with identical inputs that differ only in commit policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyComparison {
    pub periodic: TrialReport,
    pub immediate: TrialReport,
}

impl PolicyComparison {
    pub fn check_expectations(&self) -> Vec<String> {
        let mut violations = self.periodic.check_expectations();
        violations.extend(self.immediate.check_expectations());
        violations
    }
}
