use crate::classifier::Outcome;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Plain snapshot of the four outcome counters.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct OutcomeCounts {
    pub duplicates: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub uniques: u64,
}

impl OutcomeCounts {
    pub fn total(&self) -> u64 {
        self.duplicates + self.false_positives + self.false_negatives + self.uniques
    }

    /// Events the filter reported as already seen.
    pub fn filter_positives(&self) -> u64 {
        self.duplicates + self.false_positives
    }

    pub fn merge(&mut self, other: &OutcomeCounts) {
        self.duplicates += other.duplicates;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.uniques += other.uniques;
    }
}

impl std::fmt::Display for OutcomeCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Dup.: {}, FP: {}, FN: {}, Unique: {}",
            self.duplicates,
            self.false_positives,
            self.false_negatives,
            self.uniques
        )
    }
}

/// Monotonic atomic accumulators, one per outcome.
#[derive(Debug, Default)]
pub struct OutcomeCounters {
    duplicates: AtomicU64,
    false_positives: AtomicU64,
    false_negatives: AtomicU64,
    uniques: AtomicU64,
}

impl OutcomeCounters {
    pub fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Duplicate => &self.duplicates,
            Outcome::FalsePositive => &self.false_positives,
            Outcome::FalseNegative => &self.false_negatives,
            Outcome::Unique => &self.uniques,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> OutcomeCounts {
        OutcomeCounts {
            duplicates: self.duplicates.load(Ordering::Relaxed),
            false_positives: self.false_positives.load(Ordering::Relaxed),
            false_negatives: self.false_negatives.load(Ordering::Relaxed),
            uniques: self.uniques.load(Ordering::Relaxed),
        }
    }

    /// Reads and zeroes every counter. Each counter is swapped atomically, so
    /// no increment is lost between the read and the reset.
    pub fn take(&self) -> OutcomeCounts {
        OutcomeCounts {
            duplicates: self.duplicates.swap(0, Ordering::Relaxed),
            false_positives: self.false_positives.swap(0, Ordering::Relaxed),
            false_negatives: self.false_negatives.swap(0, Ordering::Relaxed),
            uniques: self.uniques.swap(0, Ordering::Relaxed),
        }
    }

    pub fn add(&self, counts: &OutcomeCounts) {
        self.duplicates
            .fetch_add(counts.duplicates, Ordering::Relaxed);
        self.false_positives
            .fetch_add(counts.false_positives, Ordering::Relaxed);
        self.false_negatives
            .fetch_add(counts.false_negatives, Ordering::Relaxed);
        self.uniques.fetch_add(counts.uniques, Ordering::Relaxed);
    }
}

/// Per-cycle counters plus the running totals of one trial.
#[derive(Debug, Default)]
pub struct TrialCounters {
    cycle: OutcomeCounters,
    totals: OutcomeCounters,
    completed_cycles: AtomicU64,
}

impl TrialCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: Outcome) {
        self.cycle.record(outcome);
    }

    /// Live counters of the current cycle.
    pub fn cycle(&self) -> OutcomeCounts {
        self.cycle.snapshot()
    }

    /// Totals of all closed cycles.
    pub fn totals(&self) -> OutcomeCounts {
        self.totals.snapshot()
    }

    /// Closed totals plus whatever the open cycle has counted so far.
    pub fn cumulative(&self) -> OutcomeCounts {
        let mut counts = self.totals();
        counts.merge(&self.cycle());
        counts
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles.load(Ordering::Relaxed)
    }

    /// Closes the current cycle: moves its counters into the totals and
    /// starts the next cycle from zero. Returns the closed cycle's counts.
    pub fn close_cycle(&self) -> OutcomeCounts {
        let closed = self.cycle.take();
        self.totals.add(&closed);
        self.completed_cycles.fetch_add(1, Ordering::Relaxed);
        closed
    }
}
