//! Redelivery verification harness for change-data-capture streams.
//!
//! A trial inserts rows into a data store while a change source streams them
//! back, and periodically severs the source's replication connection so it
//! has to restart from its last committed offset. Every delivered insert is
//! classified against two structures:
//!
//! * an approximate Bloom filter keyed by the event's log position, and
//! * an exact ordered set keyed by the row's payload value.
//!
//! Classification:
//!     * filter hit, row known      -> Duplicate
//!     * filter hit, row unknown    -> FalsePositive
//!     * filter miss, row known     -> FalseNegative (never acceptable)
//!     * filter miss, row unknown   -> Unique
//!
//! Running the same workload under a periodic and an immediate offset commit
//! policy shows how much redelivery each policy allows, and whether the filter
//! stays within its configured error rate.
//!
//! Notes:
//!     * The filter and the exact set use different keys. Redelivered records
//!       keep their log position, so a redelivery is always a filter hit.
//!     * The filter is deliberately undersized, so false positives are
//!       expected and counted.
//!     * Filter and exact set belong to the single consumer task of a trial.

pub mod barrier;
pub mod bloom;
pub mod classifier;
pub mod common;
pub mod compare;
pub mod counters;
mod error;
pub mod event;
pub mod exact;
mod hash;
pub mod injector;
pub mod report;
pub mod settings;
pub mod simulated;
pub mod source;
pub mod trial;
pub mod workload;

pub use barrier::{Phase, PhaseBarrier, ReadyNotifier, StartGate};
pub use bloom::{
    BloomFilter, BloomFilterConfig, BloomFilterConfigBuilder, BloomParams,
    FilterStats, MembershipFilter,
};
pub use classifier::{Classifier, Outcome};
pub use compare::{compare_policies, run_policy, with_deadline};
pub use counters::{OutcomeCounters, OutcomeCounts, TrialCounters};
pub use error::{HarnessError, Result};
pub use event::{Event, OperationKind};
pub use exact::ExactSet;
pub use hash::{
    HashFunction, default_hash_function, double_hash_function,
    expected_false_positive_rate, key_bytes, optimal_bit_vector_size,
    optimal_num_hashes, salted_digest_hash,
};
pub use injector::FailureInjector;
pub use report::{PolicyComparison, TrialReport};
pub use settings::{HarnessSettings, HarnessSettingsBuilder};
pub use simulated::{
    SimulatedSource, SimulatedSourceConfig, SimulatedSourceConfigBuilder,
    SimulatedStore, SimulatedStoreConfig, SimulatedStoreConfigBuilder,
};
pub use source::{ChangeStream, CommitPolicy, DataStore};
pub use trial::{
    FilterSizing, RunController, TrialConfig, TrialConfigBuilder, TrialHandle,
    TrialState, consume_events,
};
pub use workload::WorkloadGenerator;
