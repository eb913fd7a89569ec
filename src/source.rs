//! Boundaries to the collaborators the harness drives but does not own: the
//! data store the workload writes to, and the change stream reading it back.
use crate::barrier::ReadyNotifier;
use crate::error::Result;
use crate::event::Event;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// How often the change source durably persists its resume position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CommitPolicy {
    /// Resume position flushed on a fixed timer.
    Periodic { flush_interval: Duration },
    /// Resume position flushed after every delivered event.
    Immediate,
}

impl CommitPolicy {
    pub fn periodic(flush_interval: Duration) -> Self {
        CommitPolicy::Periodic { flush_interval }
    }

    /// Whether restarts are expected to redeliver events.
    pub fn expects_duplicates(&self) -> bool {
        matches!(self, CommitPolicy::Periodic { .. })
    }
}

impl std::fmt::Display for CommitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitPolicy::Periodic { .. } => write!(f, "PERIODIC"),
            CommitPolicy::Immediate => write!(f, "IMMEDIATE"),
        }
    }
}

/// The store the workload generator writes rows into.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    /// Inserts one row carrying `value`.
    async fn insert_row(&self, value: i64) -> Result<()>;

    /// Terminates the change source's active replication connections, never
    /// the caller's own. Returns how many were terminated.
    async fn terminate_replication_connections(&self) -> Result<usize>;
}

/// An at-least-once stream of change events.
#[async_trait]
pub trait ChangeStream: Send + 'static {
    fn commit_policy(&self) -> CommitPolicy;

    /// Streams events into `events` until `shutdown` flips or the receiver is
    /// dropped. `ready` must be notified once, when the connector task has
    /// started.
    async fn run(
        self,
        ready: ReadyNotifier,
        events: mpsc::Sender<Event>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()>;
}
