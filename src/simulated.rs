//! In-memory stand-ins for the data store and change-data-capture source.
//!
//! The store keeps an append-only change log where every row gets a
//! monotonically increasing log position, much like a write-ahead log. The
//! source tails that log over a "replication connection", tracks the offset
//! it has durably committed according to its [`CommitPolicy`], and resumes
//! from that offset whenever its connection is terminated.
use crate::barrier::ReadyNotifier;
use crate::error::{HarnessError, Result};
use crate::event::Event;
use crate::source::{ChangeStream, CommitPolicy, DataStore};
use async_trait::async_trait;
use derive_builder::Builder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRecord {
    pub value: i64,
    pub position: i64,
}

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct SimulatedStoreConfig {
    /// Log position of the first record
    #[builder(default = "0x0160_0000")]
    pub base_position: i64,

    /// Distance between consecutive log positions
    #[builder(default = "56")]
    pub position_stride: i64,
}

impl Default for SimulatedStoreConfig {
    fn default() -> Self {
        Self {
            base_position: 0x0160_0000,
            position_stride: 56,
        }
    }
}

pub struct SimulatedStore {
    config: SimulatedStoreConfig,
    log: RwLock<Vec<ChangeRecord>>,
    head: watch::Sender<usize>,
    epoch: watch::Sender<u64>,
    replication_active: AtomicBool,
}

impl SimulatedStore {
    pub fn new(config: SimulatedStoreConfig) -> Result<Self> {
        if config.position_stride <= 0 {
            return Err(HarnessError::InvalidConfig(
                "Position stride must be > 0".into(),
            ));
        }
        let (head, _) = watch::channel(0);
        let (epoch, _) = watch::channel(0);
        Ok(Self {
            config,
            log: RwLock::new(Vec::new()),
            head,
            epoch,
            replication_active: AtomicBool::new(false),
        })
    }

    pub fn len(&self) -> usize {
        *self.head.borrow()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record_at(&self, index: usize) -> Result<Option<ChangeRecord>> {
        let log = self
            .log
            .read()
            .map_err(|e| HarnessError::Store(e.to_string()))?;
        Ok(log.get(index).copied())
    }

    /// Opens the replication connection, replacing any previous one.
    pub fn open_replication(&self) -> ReplicationConnection {
        self.replication_active.store(true, Ordering::SeqCst);
        let epoch = self.epoch.subscribe();
        let current = *epoch.borrow();
        ReplicationConnection { current, epoch }
    }

    pub fn subscribe_head(&self) -> watch::Receiver<usize> {
        self.head.subscribe()
    }
}

#[async_trait]
impl DataStore for SimulatedStore {
    async fn insert_row(&self, value: i64) -> Result<()> {
        {
            let mut log = self
                .log
                .write()
                .map_err(|e| HarnessError::Store(e.to_string()))?;
            let position = self.config.base_position
                + log.len() as i64 * self.config.position_stride;
            log.push(ChangeRecord { value, position });
            self.head.send_replace(log.len());
        }
        // Round trip to the store.
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn terminate_replication_connections(&self) -> Result<usize> {
        if !self.replication_active.swap(false, Ordering::SeqCst) {
            return Ok(0);
        }
        self.epoch.send_modify(|epoch| *epoch += 1);
        Ok(1)
    }
}

/// Live while the store has not terminated it.
pub struct ReplicationConnection {
    current: u64,
    epoch: watch::Receiver<u64>,
}

impl ReplicationConnection {
    pub fn is_terminated(&self) -> bool {
        *self.epoch.borrow() != self.current
    }

    /// Resolves once the connection is terminated.
    pub async fn terminated(&mut self) {
        let current = self.current;
        // A dropped store also ends the connection.
        let _ = self.epoch.wait_for(|epoch| *epoch != current).await;
    }
}

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct SimulatedSourceConfig {
    #[builder(default = "CommitPolicy::periodic(Duration::from_secs(10))")]
    pub commit_policy: CommitPolicy,

    /// Pause before reconnecting after the connection was lost
    #[builder(default = "Duration::from_millis(10)")]
    pub reconnect_backoff: Duration,
}

enum StreamExit {
    ConnectionLost,
    Shutdown,
}

/// Change-data-capture connector over a [`SimulatedStore`].
pub struct SimulatedSource {
    store: Arc<SimulatedStore>,
    config: SimulatedSourceConfig,
    committed: usize,
}

impl SimulatedSource {
    pub fn new(store: Arc<SimulatedStore>, config: SimulatedSourceConfig) -> Self {
        Self {
            store,
            config,
            committed: 0,
        }
    }

    fn flush_interval(&self) -> Option<Duration> {
        match self.config.commit_policy {
            CommitPolicy::Periodic { flush_interval } => Some(flush_interval),
            CommitPolicy::Immediate => None,
        }
    }

    async fn stream(
        &mut self,
        connection: &mut ReplicationConnection,
        events: &mpsc::Sender<Event>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<StreamExit> {
        let mut head = self.store.subscribe_head();
        let mut position = self.committed;
        let mut last_flush = Instant::now();
        let flush_interval = self.flush_interval();
        let idle_tick = flush_interval.unwrap_or(Duration::from_secs(1));

        loop {
            if connection.is_terminated() {
                return Ok(StreamExit::ConnectionLost);
            }
            if let Some(interval) = flush_interval {
                if last_flush.elapsed() >= interval {
                    debug!(
                        from = self.committed,
                        to = position,
                        "Flushing offsets"
                    );
                    self.committed = position;
                    last_flush = Instant::now();
                }
            }

            let Some(record) = self.store.record_at(position)? else {
                tokio::select! {
                    _ = head.wait_for(|len| *len > position) => {}
                    _ = connection.terminated() => {
                        return Ok(StreamExit::ConnectionLost);
                    }
                    _ = shutdown.changed() => return Ok(StreamExit::Shutdown),
                    _ = tokio::time::sleep(idle_tick) => {}
                }
                continue;
            };

            let event = Event::insert(record.value, record.position);
            tokio::select! {
                sent = events.send(event) => {
                    if sent.is_err() {
                        return Ok(StreamExit::Shutdown);
                    }
                }
                _ = connection.terminated() => {
                    return Ok(StreamExit::ConnectionLost);
                }
                _ = shutdown.changed() => return Ok(StreamExit::Shutdown),
            }
            trace!(position, lsn = record.position, "Delivered record");

            position += 1;
            if flush_interval.is_none() {
                self.committed = position;
            }
        }
    }
}

#[async_trait]
impl ChangeStream for SimulatedSource {
    fn commit_policy(&self) -> CommitPolicy {
        self.config.commit_policy
    }

    async fn run(
        mut self,
        ready: ReadyNotifier,
        events: mpsc::Sender<Event>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut ready = Some(ready);
        let mut reconnects = 0u64;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let mut connection = self.store.open_replication();
            info!(
                policy = %self.config.commit_policy,
                resume_from = self.committed,
                "Replication connection established"
            );
            if let Some(ready) = ready.take() {
                ready.notify().await;
            }

            match self.stream(&mut connection, &events, &mut shutdown).await? {
                StreamExit::Shutdown => break,
                StreamExit::ConnectionLost => {
                    reconnects += 1;
                    warn!(
                        reconnects,
                        resume_from = self.committed,
                        "Replication connection lost, restarting"
                    );
                    tokio::time::sleep(self.config.reconnect_backoff).await;
                }
            }
        }

        info!(reconnects, "Change source stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrier::PhaseBarrier;

    fn store() -> Arc<SimulatedStore> {
        Arc::new(SimulatedStore::new(SimulatedStoreConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_positions_are_monotonic() {
        let store = store();
        for value in 1..=3 {
            store.insert_row(value).await.unwrap();
        }
        let positions: Vec<i64> = (0..3)
            .map(|i| store.record_at(i).unwrap().unwrap().position)
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(store.len(), 3);
        assert!(store.record_at(3).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_terminate_only_hits_active_connection() {
        let store = store();
        assert_eq!(store.terminate_replication_connections().await.unwrap(), 0);

        let connection = store.open_replication();
        assert!(!connection.is_terminated());
        assert_eq!(store.terminate_replication_connections().await.unwrap(), 1);
        assert!(connection.is_terminated());
        assert_eq!(store.terminate_replication_connections().await.unwrap(), 0);
    }

    /// Streams ten rows, idles for `idle`, severs the connection and collects
    /// everything delivered until row 11 arrives.
    async fn redelivered_after_restart(
        policy: CommitPolicy,
        idle: Duration,
    ) -> Vec<i64> {
        let store = store();
        for value in 1..=10 {
            store.insert_row(value).await.unwrap();
        }

        let config = SimulatedSourceConfigBuilder::default()
            .commit_policy(policy)
            .reconnect_backoff(Duration::from_millis(1))
            .build()
            .unwrap();
        let source = SimulatedSource::new(store.clone(), config);
        let (gate, notifier) = PhaseBarrier::new().split();
        let (tx, mut rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle =
            tokio::spawn(async move { source.run(notifier, tx, shutdown_rx).await });
        gate.arrive().await;

        let mut values = Vec::new();
        for _ in 0..10 {
            values.push(rx.recv().await.unwrap().payload_value);
        }
        tokio::time::sleep(idle).await;
        store.terminate_replication_connections().await.unwrap();
        store.insert_row(11).await.unwrap();

        loop {
            let event = rx.recv().await.unwrap();
            values.push(event.payload_value);
            if event.payload_value == 11 {
                break;
            }
        }

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
        values
    }

    #[tokio::test]
    async fn test_immediate_commit_resumes_after_last_delivery() {
        let values =
            redelivered_after_restart(CommitPolicy::Immediate, Duration::ZERO)
                .await;
        assert_eq!(values, (1..=11).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_periodic_commit_redelivers_unflushed() {
        let values = redelivered_after_restart(
            CommitPolicy::periodic(Duration::from_secs(60)),
            Duration::ZERO,
        )
        .await;
        // Nothing was flushed, so the restart replays the whole log.
        assert_eq!(values.len(), 21);
        assert_eq!(&values[10..20], &(1..=10).collect::<Vec<_>>()[..]);
    }

    #[tokio::test]
    async fn test_periodic_commit_resumes_from_flushed_offset() {
        // The idle source ticks at the flush interval, so the offset of all
        // ten delivered rows gets flushed before the disconnect.
        let values = redelivered_after_restart(
            CommitPolicy::periodic(Duration::from_millis(1)),
            Duration::from_millis(100),
        )
        .await;
        assert_eq!(values, (1..=11).collect::<Vec<_>>());
    }
}
