use crate::counters::TrialCounters;
use crate::error::{HarnessError, Result};
use crate::source::DataStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How long [`FailureInjector::settle`] waits for a disconnect before
/// abandoning it.
pub const SETTLE_GRACE: Duration = Duration::from_secs(1);

/// Forces the change source to reconnect every `disconnect_every`
/// insertions, closing the current counting cycle each time.
pub struct FailureInjector {
    store: Arc<dyn DataStore>,
    counters: Arc<TrialCounters>,
    disconnect_every: u64,
    pending: Vec<JoinHandle<()>>,
}

impl FailureInjector {
    pub fn new(
        store: Arc<dyn DataStore>,
        counters: Arc<TrialCounters>,
        disconnect_every: u64,
    ) -> Result<Self> {
        if disconnect_every == 0 {
            return Err(HarnessError::InvalidConfig(
                "Disconnect interval must be > 0".into(),
            ));
        }
        Ok(Self {
            store,
            counters,
            disconnect_every,
            pending: Vec::new(),
        })
    }

    /// Called after the `ordinal`-th insertion (1-based). Never waits on the
    /// disconnect itself.
    pub fn observe(&mut self, ordinal: u64) -> bool {
        if ordinal % self.disconnect_every != 0 {
            return false;
        }

        let closed = self.counters.close_cycle();
        info!(ordinal, "[LOCAL] {closed}");

        let store = Arc::clone(&self.store);
        self.pending.push(tokio::spawn(async move {
            match store.terminate_replication_connections().await {
                Ok(terminated) => {
                    info!(ordinal, terminated, "Terminate backend result")
                }
                Err(e) => {
                    warn!(ordinal, error = %e, "Failed to terminate replication connection")
                }
            }
        }));
        true
    }

    pub fn disconnects_issued(&self) -> usize {
        self.pending.len()
    }

    /// Gives every issued disconnect up to `grace` to finish, then aborts
    /// the ones still running. Failures were already logged; a panicked or
    /// abandoned disconnect is only logged as well.
    pub async fn settle(self, grace: Duration) {
        let deadline = tokio::time::Instant::now() + grace;
        for mut handle in self.pending {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "Disconnect task did not complete")
                }
                Err(_) => {
                    handle.abort();
                    warn!(?grace, "Abandoning disconnect that did not finish");
                }
            }
        }
    }
}
