use eos_bloom_rs::{
    CommitPolicy, FilterSizing, Result, RunController, SimulatedSource,
    SimulatedSourceConfigBuilder, SimulatedStore, SimulatedStoreConfig,
    TrialConfigBuilder, TrialReport,
};
use std::{sync::Arc, time::Duration};

/// Outer deadline for a whole trial; running past it fails the test.
pub const TRIAL_DEADLINE: Duration = Duration::from_secs(120);

/// Store and source wired together for one trial.
pub struct TestRig {
    pub store: Arc<SimulatedStore>,
    pub source: SimulatedSource,
}

impl TestRig {
    pub fn new(policy: CommitPolicy) -> Self {
        let store = Arc::new(
            SimulatedStore::new(SimulatedStoreConfig::default())
                .expect("Failed to create store"),
        );
        let config = SimulatedSourceConfigBuilder::default()
            .commit_policy(policy)
            .reconnect_backoff(Duration::from_millis(2))
            .build()
            .expect("Failed to build source config");
        let source = SimulatedSource::new(Arc::clone(&store), config);
        Self { store, source }
    }
}

/// Runs one trial on a fresh rig and fails the test on deadline.
#[allow(dead_code)]
pub async fn run_trial(
    policy: CommitPolicy,
    start_value: i64,
    row_count: u64,
    disconnect_every: u64,
    filter: FilterSizing,
) -> Result<TrialReport> {
    let rig = TestRig::new(policy);
    let config = TrialConfigBuilder::default()
        .start_value(start_value)
        .row_count(row_count)
        .disconnect_every(disconnect_every)
        .filter(filter)
        .build()
        .expect("Failed to build trial config");
    let controller = RunController::new(config, rig.store)?;

    tokio::time::timeout(TRIAL_DEADLINE, controller.run(rig.source))
        .await
        .expect("Trial exceeded its deadline")
}

#[allow(dead_code)]
pub fn undersized_filter() -> FilterSizing {
    FilterSizing::TargetRate {
        capacity: 30_000,
        false_positive_rate: 0.05,
    }
}
