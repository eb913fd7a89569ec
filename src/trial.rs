//! Run controller: drives one end-to-end trial for a change stream and
//! reports what the classifier saw.
use crate::barrier::{Phase, PhaseBarrier};
use crate::bloom::{
    BloomFilter, BloomFilterConfigBuilder, FilterStats, MembershipFilter,
};
use crate::classifier::{Classifier, Outcome};
use crate::counters::{OutcomeCounts, TrialCounters};
use crate::error::{HarnessError, Result};
use crate::event::Event;
use crate::injector::FailureInjector;
use crate::report::TrialReport;
use crate::source::{ChangeStream, CommitPolicy, DataStore};
use crate::workload::WorkloadGenerator;
use derive_builder::Builder;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

/// How the trial's filter is sized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterSizing {
    /// Hand-built: explicit bit count and hash count.
    Explicit { bit_count: usize, hash_count: usize },
    /// Derived from expected insertions and a target false positive rate.
    TargetRate {
        capacity: usize,
        false_positive_rate: f64,
    },
}

impl FilterSizing {
    pub fn build(&self) -> Result<BloomFilter> {
        match *self {
            FilterSizing::Explicit {
                bit_count,
                hash_count,
            } => BloomFilter::new(bit_count, hash_count),
            FilterSizing::TargetRate {
                capacity,
                false_positive_rate,
            } => {
                let config = BloomFilterConfigBuilder::default()
                    .capacity(capacity)
                    .false_positive_rate(false_positive_rate)
                    .build()
                    .map_err(|e| HarnessError::InvalidConfig(e.to_string()))?;
                BloomFilter::from_config(&config)
            }
        }
    }
}

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct TrialConfig {
    /// Payload value of the first inserted row
    #[builder(default = "1")]
    pub start_value: i64,

    /// Number of logical rows to insert
    #[builder(default = "30_000")]
    pub row_count: u64,

    /// Force a source disconnect after every N insertions
    #[builder(default = "5_000")]
    pub disconnect_every: u64,

    #[builder(default = "FilterSizing::TargetRate { capacity: 30_000, false_positive_rate: 0.05 }")]
    pub filter: FilterSizing,

    /// Bound of the delivery channel between source and classifier
    #[builder(default = "1024")]
    pub channel_capacity: usize,
}

impl TrialConfig {
    pub fn validate(&self) -> Result<()> {
        if self.row_count == 0 {
            return Err(HarnessError::InvalidConfig(
                "Row count must be > 0".into(),
            ));
        }
        if self.disconnect_every == 0 {
            return Err(HarnessError::InvalidConfig(
                "Disconnect interval must be > 0".into(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(HarnessError::InvalidConfig(
                "Channel capacity must be > 0".into(),
            ));
        }
        self.last_value()?;
        Ok(())
    }

    /// Payload value of the last inserted row.
    pub fn last_value(&self) -> Result<i64> {
        i64::try_from(self.row_count.saturating_sub(1))
            .ok()
            .and_then(|offset| self.start_value.checked_add(offset))
            .ok_or_else(|| {
                HarnessError::InvalidConfig(format!(
                    "{} rows starting at {} overflow the payload range",
                    self.row_count, self.start_value
                ))
            })
    }
}

/// Everything one trial mutates. Built fresh per trial and consumed by it.
pub struct TrialState {
    classifier: Classifier<BloomFilter>,
    counters: Arc<TrialCounters>,
}

impl TrialState {
    pub fn new(config: &TrialConfig) -> Result<Self> {
        let counters = Arc::new(TrialCounters::new());
        let filter = config.filter.build()?;
        Ok(Self {
            classifier: Classifier::with_counters(filter, Arc::clone(&counters)),
            counters,
        })
    }

    pub fn counters(&self) -> &Arc<TrialCounters> {
        &self.counters
    }
}

/// Classifies delivered inserts until `expected_rows` distinct rows were
/// seen. A false negative aborts with an error.
pub async fn consume_events<F: MembershipFilter>(
    classifier: &mut Classifier<F>,
    events: &mut mpsc::Receiver<Event>,
    expected_rows: usize,
) -> Result<()> {
    while classifier.exact().len() < expected_rows {
        let Some(event) = events.recv().await else {
            return Err(HarnessError::ChannelClosed(format!(
                "source stopped after {} of {} rows",
                classifier.exact().len(),
                expected_rows
            )));
        };
        if !event.is_insert() {
            trace!(?event, "Skipping non-insert event");
            continue;
        }

        if classifier.classify(&event)? == Outcome::FalseNegative {
            return Err(HarnessError::FalseNegative {
                payload_value: event.payload_value,
                position_token: event.position_token,
            });
        }
    }
    Ok(())
}

pub struct RunController {
    config: TrialConfig,
    store: Arc<dyn DataStore>,
}

impl RunController {
    pub fn new(config: TrialConfig, store: Arc<dyn DataStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    /// Runs one trial to completion.
    pub async fn run<S: ChangeStream>(&self, source: S) -> Result<TrialReport> {
        self.start(source, self.config.row_count, self.config.disconnect_every)?
            .wait()
            .await
    }

    /// Starts a trial of `row_count` rows with a forced disconnect every
    /// `disconnect_every` insertions and returns a handle to observe it.
    pub fn start<S: ChangeStream>(
        &self,
        source: S,
        row_count: u64,
        disconnect_every: u64,
    ) -> Result<TrialHandle> {
        let config = TrialConfig {
            row_count,
            disconnect_every,
            ..self.config.clone()
        };
        config.validate()?;

        let state = TrialState::new(&config)?;
        let counters = Arc::clone(state.counters());
        let policy = source.commit_policy();

        let barrier = PhaseBarrier::new();
        let phase = barrier.subscribe();
        let (gate, notifier) = barrier.split();

        let (events_tx, mut events_rx) = mpsc::channel(config.channel_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            %policy,
            start_value = config.start_value,
            row_count,
            disconnect_every,
            "Starting trial"
        );

        let injector = FailureInjector::new(
            Arc::clone(&self.store),
            Arc::clone(&counters),
            disconnect_every,
        )?;

        let source_task =
            tokio::spawn(source.run(notifier, events_tx, shutdown_rx));
        let generator = WorkloadGenerator::new(
            Arc::clone(&self.store),
            config.start_value,
            row_count,
        );
        let generator_task = tokio::spawn(generator.run(gate, injector));

        let mut classifier = state.classifier;
        let expected_rows = row_count as usize;
        let consumer_task = tokio::spawn(async move {
            consume_events(&mut classifier, &mut events_rx, expected_rows)
                .await?;
            Ok::<_, HarnessError>(classifier)
        });

        Ok(TrialHandle {
            config,
            policy,
            counters,
            phase,
            started: Instant::now(),
            shutdown: shutdown_tx,
            source: source_task,
            generator: generator_task,
            consumer: consumer_task,
        })
    }
}

/// A running trial.
pub struct TrialHandle {
    config: TrialConfig,
    policy: CommitPolicy,
    counters: Arc<TrialCounters>,
    phase: watch::Receiver<Phase>,
    started: Instant,
    shutdown: watch::Sender<bool>,
    source: JoinHandle<Result<()>>,
    generator: JoinHandle<Result<u64>>,
    consumer: JoinHandle<Result<Classifier<BloomFilter>>>,
}

/// Dropping a handle before [`TrialHandle::wait`] returns, e.g. on an outer
/// deadline, stops every task of the trial.
impl Drop for TrialHandle {
    fn drop(&mut self) {
        self.generator.abort();
        self.consumer.abort();
        self.source.abort();
    }
}

async fn join<T>(handle: &mut JoinHandle<Result<T>>) -> Result<T> {
    handle.await?
}

impl TrialHandle {
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Counters of the cycle in progress.
    pub fn cycle(&self) -> OutcomeCounts {
        self.counters.cycle()
    }

    /// Totals of closed cycles.
    pub fn totals(&self) -> OutcomeCounts {
        self.counters.totals()
    }

    pub fn counters(&self) -> &Arc<TrialCounters> {
        &self.counters
    }

    /// Blocks until every row was generated and classified, then stops the
    /// source and returns the report. Any task failure aborts the trial.
    pub async fn wait(mut self) -> Result<TrialReport> {
        let joined = tokio::try_join!(
            join(&mut self.generator),
            join(&mut self.consumer)
        );

        let _ = self.shutdown.send(true);
        let (rows, classifier) = match joined {
            Ok(done) => done,
            Err(e) => {
                error!(error = %e, "Trial aborted");
                self.generator.abort();
                self.consumer.abort();
                self.source.abort();
                return Err(e);
            }
        };
        join(&mut self.source).await?;

        let tail = self.counters.close_cycle();
        debug!("[LOCAL] {tail}");

        let totals = self.counters.totals();
        info!(
            "[TOTAL {}] Duplications: {}, FP: {}, FN: {}",
            self.policy,
            totals.duplicates,
            totals.false_positives,
            totals.false_negatives
        );

        let filter = classifier.filter();
        let exact = classifier.exact();
        Ok(TrialReport {
            policy: self.policy,
            start_value: self.config.start_value,
            rows,
            disconnect_every: self.config.disconnect_every,
            totals,
            cycles: self.counters.completed_cycles(),
            distinct_rows: exact.len() as u64,
            exact_min: exact.min(),
            exact_max: exact.max(),
            filter_bits: filter.bit_count(),
            filter_hashes: filter.hash_count(),
            filter_insertions: filter.insert_count(),
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        })
    }
}
