use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::DomainError;

/// Opaque resumption data (cursors, sync tokens) carried between runs.
pub type SyncState = Map<String, Value>;

/// One execution of one task for one connection.
///
/// An entry is a resumption source only once `completed_at` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    id: i64,
    task_name: String,
    connection_id: u64,
    started_at: i64,
    completed_at: Option<i64>,
    state: SyncState,
}

impl LedgerEntry {
    pub fn reconstitute(
        id: i64,
        task_name: String,
        connection_id: u64,
        started_at: i64,
        completed_at: Option<i64>,
        state: SyncState,
    ) -> Self {
        Self {
            id,
            task_name,
            connection_id,
            started_at,
            completed_at,
            state,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<i64> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }
}

pub fn encode_state(state: &SyncState) -> Result<String, DomainError> {
    Ok(serde_json::to_string(state)?)
}

pub fn decode_state(text: &str) -> Result<SyncState, DomainError> {
    if text.trim().is_empty() {
        return Ok(SyncState::new());
    }
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(SyncState::new()),
        other => Err(DomainError::invalid_input(format!(
            "ledger state must be a JSON object, got {}",
            other
        ))),
    }
}

/// Milliseconds since the Unix epoch.
pub fn current_timestamp_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_state_defaults_to_empty() {
        assert!(decode_state("").unwrap().is_empty());
        assert!(decode_state("null").unwrap().is_empty());
        assert!(decode_state("[1]").is_err());
    }

    #[test]
    fn test_state_roundtrip_keeps_cursor() {
        let mut state = SyncState::new();
        state.insert("page_token".to_string(), Value::from("abc"));
        let decoded = decode_state(&encode_state(&state).unwrap()).unwrap();
        assert_eq!(decoded.get("page_token"), Some(&Value::from("abc")));
    }
}
