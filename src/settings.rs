use crate::error::{HarnessError, Result};
use crate::trial::{FilterSizing, TrialConfig};
use derive_builder::Builder;
use std::str::FromStr;
use std::time::Duration;

/// Inputs shared by every trial of a run.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(pattern = "owned")]
pub struct HarnessSettings {
    #[builder(default = "30_000")]
    pub row_count: u64,
    #[builder(default = "1")]
    pub start_value: i64,
    #[builder(default = "5_000")]
    pub disconnect_every: u64,
    #[builder(default = "Duration::from_secs(10)")]
    pub flush_interval: Duration,
    #[builder(default = "30_000")]
    pub bloom_capacity: usize,
    #[builder(default = "0.05")]
    pub bloom_false_positive_rate: f64,
    #[builder(default = "1024")]
    pub channel_capacity: usize,
    /// Outer limit for a whole run; exceeding it fails the run
    #[builder(default = "Duration::from_secs(600)")]
    pub deadline: Duration,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            row_count: 30_000,
            start_value: 1,
            disconnect_every: 5_000,
            flush_interval: Duration::from_secs(10),
            bloom_capacity: 30_000,
            bloom_false_positive_rate: 0.05,
            channel_capacity: 1024,
            deadline: Duration::from_secs(600),
        }
    }
}

fn env_or<T>(var_name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Ok(value) = std::env::var(var_name) else {
        return Ok(default);
    };
    match value.parse::<T>() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(HarnessError::EnvParseError {
            var_name: var_name.to_string(),
            value,
            error: e.to_string(),
        }),
    }
}

impl HarnessSettings {
    /// Reads `EOS_*` variables, loading a `.env` file first if present.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            row_count: env_or("EOS_ROW_COUNT", defaults.row_count)?,
            start_value: env_or("EOS_START_VALUE", defaults.start_value)?,
            disconnect_every: env_or(
                "EOS_DISCONNECT_EVERY",
                defaults.disconnect_every,
            )?,
            flush_interval: Duration::from_millis(env_or(
                "EOS_FLUSH_INTERVAL_MS",
                defaults.flush_interval.as_millis() as u64,
            )?),
            bloom_capacity: env_or("EOS_BLOOM_CAPACITY", defaults.bloom_capacity)?,
            bloom_false_positive_rate: env_or(
                "EOS_BLOOM_FPR",
                defaults.bloom_false_positive_rate,
            )?,
            channel_capacity: env_or(
                "EOS_CHANNEL_CAPACITY",
                defaults.channel_capacity,
            )?,
            deadline: Duration::from_secs(env_or(
                "EOS_DEADLINE_SECS",
                defaults.deadline.as_secs(),
            )?),
        })
    }

    pub fn trial_config(&self, start_value: i64) -> TrialConfig {
        TrialConfig {
            start_value,
            row_count: self.row_count,
            disconnect_every: self.disconnect_every,
            filter: FilterSizing::TargetRate {
                capacity: self.bloom_capacity,
                false_positive_rate: self.bloom_false_positive_rate,
            },
            channel_capacity: self.channel_capacity,
        }
    }
}
