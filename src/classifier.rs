use crate::bloom::MembershipFilter;
use crate::counters::TrialCounters;
use crate::error::Result;
use crate::event::Event;
use crate::exact::ExactSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Filter and exact set agree the row was seen before.
    Duplicate,
    /// Filter claims "seen" for a row that is logically new.
    FalsePositive,
    /// Filter says "never seen" for a row the exact set already holds. The
    /// filter's one-sided guarantee forbids this.
    FalseNegative,
    Unique,
}

/// Pairs an approximate filter (keyed by position token) with an exact set
/// (keyed by payload value) and classifies each event by their agreement.
///
/// A classifier is driven by a single consumer. With several consumers the
/// query/insert pairs of one event must run under one lock.
pub struct Classifier<F> {
    filter: F,
    exact: ExactSet,
    counters: Arc<TrialCounters>,
}

impl<F: MembershipFilter> Classifier<F> {
    pub fn new(filter: F) -> Self {
        Self::with_counters(filter, Arc::new(TrialCounters::new()))
    }

    pub fn with_counters(filter: F, counters: Arc<TrialCounters>) -> Self {
        Self {
            filter,
            exact: ExactSet::new(),
            counters,
        }
    }

    pub fn classify(&mut self, event: &Event) -> Result<Outcome> {
        let seen = self.exact.contains(event.payload_value);

        let outcome = if self.filter.might_contain(event.position_token)? {
            if seen {
                Outcome::Duplicate
            } else {
                Outcome::FalsePositive
            }
        } else if seen {
            error!(
                payload_value = event.payload_value,
                position_token = event.position_token,
                "Filter reported a previously classified row as never seen"
            );
            Outcome::FalseNegative
        } else {
            Outcome::Unique
        };

        self.counters.record(outcome);
        self.exact.add(event.payload_value);
        self.filter.insert(event.position_token)?;

        Ok(outcome)
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn exact(&self) -> &ExactSet {
        &self.exact
    }

    pub fn counters(&self) -> &Arc<TrialCounters> {
        &self.counters
    }
}
