use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

/// One decoded change notification.
///
/// `payload_value` identifies the logical row and is stable across
/// redeliveries. `position_token` is the record's position in the source's
/// change log (an LSN); it is what the approximate filter sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub payload_value: i64,
    pub position_token: i64,
    pub operation: OperationKind,
}

impl Event {
    pub fn insert(payload_value: i64, position_token: i64) -> Self {
        Self {
            payload_value,
            position_token,
            operation: OperationKind::Insert,
        }
    }

    pub fn is_insert(&self) -> bool {
        self.operation == OperationKind::Insert
    }
}
