//! Start-of-trial rendezvous between the workload generator and the change
//! source.
//!
//! A [`PhaseBarrier`] is built fresh for every trial and split into two
//! single-use handles. Each handle is consumed by its arrival, so a barrier
//! can never be waited on twice.
use std::sync::Arc;
use tokio::sync::{Barrier, watch};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingStart,
    Running,
}

pub struct PhaseBarrier {
    barrier: Arc<Barrier>,
    phase: Arc<watch::Sender<Phase>>,
}

impl PhaseBarrier {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(Phase::AwaitingStart);
        Self {
            barrier: Arc::new(Barrier::new(2)),
            phase: Arc::new(phase),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Splits the barrier into the generator's gate and the source's ready
    /// notifier.
    pub fn split(self) -> (StartGate, ReadyNotifier) {
        let gate = StartGate {
            arrival: Arrival {
                barrier: Arc::clone(&self.barrier),
                phase: Arc::clone(&self.phase),
                party: "workload",
            },
        };
        let notifier = ReadyNotifier {
            arrival: Arrival {
                barrier: self.barrier,
                phase: self.phase,
                party: "source",
            },
        };
        (gate, notifier)
    }
}

impl Default for PhaseBarrier {
    fn default() -> Self {
        Self::new()
    }
}

struct Arrival {
    barrier: Arc<Barrier>,
    phase: Arc<watch::Sender<Phase>>,
    party: &'static str,
}

impl Arrival {
    async fn arrive(self) {
        debug!(party = self.party, "Arrived at start barrier");
        let result = self.barrier.wait().await;
        // Both parties publish, so neither returns before the phase flips.
        self.phase.send_replace(Phase::Running);
        if result.is_leader() {
            info!("Source ready and workload armed, trial running");
        }
    }
}

/// Held by the workload generator; blocks until the source is ready.
pub struct StartGate {
    arrival: Arrival,
}

impl StartGate {
    pub async fn arrive(self) {
        self.arrival.arrive().await
    }
}

/// Single-fire "connector task started" notification handed to the source.
pub struct ReadyNotifier {
    arrival: Arrival,
}

impl ReadyNotifier {
    pub async fn notify(self) {
        self.arrival.arrive().await
    }
}
