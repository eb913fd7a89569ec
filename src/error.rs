use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Index out of bounds: {index} >= {capacity}")]
    IndexOutOfBounds { index: usize, capacity: usize },

    #[error(
        "False negative: payload {payload_value} was classified before but the filter has never seen position {position_token}"
    )]
    FalseNegative {
        payload_value: i64,
        position_token: i64,
    },

    #[error("Delivery channel closed: {0}")]
    ChannelClosed(String),

    #[error("Data store operation failed: {0}")]
    Store(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error(
        "Failed to parse environment variable {var_name}: value '{value}' - {error}"
    )]
    EnvParseError {
        var_name: String,
        value: String,
        error: String,
    },

    #[error("Trial did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

impl From<tokio::task::JoinError> for HarnessError {
    fn from(err: tokio::task::JoinError) -> Self {
        HarnessError::Task(err.to_string())
    }
}
