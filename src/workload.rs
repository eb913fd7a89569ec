use crate::barrier::StartGate;
use crate::error::{HarnessError, Result};
use crate::injector::{FailureInjector, SETTLE_GRACE};
use crate::source::DataStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Inserts `row_count` rows with consecutive payload values starting at
/// `start_value`.
pub struct WorkloadGenerator {
    store: Arc<dyn DataStore>,
    start_value: i64,
    row_count: u64,
}

impl WorkloadGenerator {
    pub fn new(
        store: Arc<dyn DataStore>,
        start_value: i64,
        row_count: u64,
    ) -> Self {
        Self {
            store,
            start_value,
            row_count,
        }
    }

    /// Waits for the source at `gate`, then inserts every row, letting the
    /// injector observe each insertion. Returns the number of rows written.
    pub async fn run(
        self,
        gate: StartGate,
        mut injector: FailureInjector,
    ) -> Result<u64> {
        gate.arrive().await;
        info!(
            start_value = self.start_value,
            row_count = self.row_count,
            "Starting data generation"
        );

        let mut value = self.start_value;
        for ordinal in 1..=self.row_count {
            self.store.insert_row(value).await?;
            injector.observe(ordinal);
            if ordinal < self.row_count {
                value = value.checked_add(1).ok_or_else(|| {
                    HarnessError::InvalidConfig(format!(
                        "Payload value overflow after {ordinal} rows"
                    ))
                })?;
            }
        }

        debug!(
            disconnects = injector.disconnects_issued(),
            "Data generation stopped, settling disconnects"
        );
        injector.settle(SETTLE_GRACE).await;
        Ok(self.row_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrier::PhaseBarrier;
    use crate::counters::TrialCounters;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        values: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl DataStore for RecordingStore {
        async fn insert_row(&self, value: i64) -> Result<()> {
            self.values.lock().unwrap().push(value);
            Ok(())
        }

        async fn terminate_replication_connections(&self) -> Result<usize> {
            Ok(0)
        }
    }

    async fn generate(
        store: Arc<RecordingStore>,
        start_value: i64,
        row_count: u64,
    ) -> Result<u64> {
        let (gate, notifier) = PhaseBarrier::new().split();
        let injector = FailureInjector::new(
            store.clone(),
            Arc::new(TrialCounters::new()),
            2,
        )?;
        let generator = WorkloadGenerator::new(store, start_value, row_count);
        let (written, ()) =
            tokio::join!(generator.run(gate, injector), notifier.notify());
        written
    }

    #[tokio::test]
    async fn test_consecutive_values() {
        let store = Arc::new(RecordingStore::default());
        assert_eq!(generate(store.clone(), 7, 4).await.unwrap(), 4);
        assert_eq!(*store.values.lock().unwrap(), vec![7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn test_range_ending_at_max_value() {
        let store = Arc::new(RecordingStore::default());
        generate(store.clone(), i64::MAX - 1, 2).await.unwrap();
        assert_eq!(*store.values.lock().unwrap(), vec![i64::MAX - 1, i64::MAX]);
    }

    #[tokio::test]
    async fn test_overflow_is_an_error() {
        let store = Arc::new(RecordingStore::default());
        let result = generate(store.clone(), i64::MAX, 3).await;
        assert!(matches!(result, Err(HarnessError::InvalidConfig(_))));
        assert_eq!(*store.values.lock().unwrap(), vec![i64::MAX]);
    }
}
