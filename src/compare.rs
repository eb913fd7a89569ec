//! Runs trials against the in-memory store and source.
use crate::error::{HarnessError, Result};
use crate::report::{PolicyComparison, TrialReport};
use crate::settings::HarnessSettings;
use crate::simulated::{
    SimulatedSource, SimulatedSourceConfigBuilder, SimulatedStore,
    SimulatedStoreConfig,
};
use crate::source::CommitPolicy;
use crate::trial::RunController;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Fails with [`HarnessError::DeadlineExceeded`] if `future` does not finish
/// within `deadline`.
pub async fn with_deadline<T>(
    deadline: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| HarnessError::DeadlineExceeded(deadline))?
}

/// One trial of `settings.row_count` rows starting at `start_value`, on a
/// fresh store and source.
pub async fn run_policy(
    settings: &HarnessSettings,
    policy: CommitPolicy,
    start_value: i64,
) -> Result<TrialReport> {
    let store = Arc::new(SimulatedStore::new(SimulatedStoreConfig::default())?);
    let source_config = SimulatedSourceConfigBuilder::default()
        .commit_policy(policy)
        .build()
        .map_err(|e| HarnessError::InvalidConfig(e.to_string()))?;
    let source = SimulatedSource::new(Arc::clone(&store), source_config);

    let controller =
        RunController::new(settings.trial_config(start_value), store)?;
    with_deadline(settings.deadline, controller.run(source)).await
}

/// Runs the periodic policy, then the immediate one on the following range
/// of payload values.
pub async fn compare_policies(
    settings: &HarnessSettings,
) -> Result<PolicyComparison> {
    let next_start = i64::try_from(settings.row_count)
        .ok()
        .and_then(|rows| settings.start_value.checked_add(rows))
        .ok_or_else(|| {
            HarnessError::InvalidConfig(format!(
                "Second range after {} rows starting at {} overflows",
                settings.row_count, settings.start_value
            ))
        })?;
    settings.trial_config(next_start).validate()?;

    let periodic = run_policy(
        settings,
        CommitPolicy::periodic(settings.flush_interval),
        settings.start_value,
    )
    .await?;
    info!("{periodic}");

    let immediate =
        run_policy(settings, CommitPolicy::Immediate, next_start).await?;
    info!("{immediate}");

    Ok(PolicyComparison {
        periodic,
        immediate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::HarnessSettingsBuilder;

    #[tokio::test]
    async fn test_overflowing_second_range_is_rejected_upfront() {
        let settings = HarnessSettingsBuilder::default()
            .start_value(i64::MAX - 15)
            .row_count(10)
            .build()
            .unwrap();

        let started = std::time::Instant::now();
        let result = compare_policies(&settings).await;
        assert!(matches!(result, Err(HarnessError::InvalidConfig(_))));
        // Rejected before the periodic trial ran its rows.
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_deadline_is_fatal() {
        let result = with_deadline(
            Duration::from_millis(10),
            std::future::pending::<Result<()>>(),
        )
        .await;
        assert!(matches!(result, Err(HarnessError::DeadlineExceeded(_))));
    }
}
