use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::LedgerRepository;
use crate::domain::{current_timestamp_millis, DomainError, LedgerEntry, SyncState};

/// Process-local ledger; nothing survives a restart.
pub struct InMemoryLedgerRepository {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    async fn update(
        &self,
        id: i64,
        state: &SyncState,
        completed_at: Option<i64>,
    ) -> Result<(), DomainError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| DomainError::storage(format!("No ledger entry with id {}", id)))?;

        *entry = LedgerEntry::reconstitute(
            entry.id(),
            entry.task_name().to_string(),
            entry.connection_id(),
            entry.started_at(),
            completed_at.or(entry.completed_at()),
            state.clone(),
        );
        Ok(())
    }
}

impl Default for InMemoryLedgerRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn start(&self, task_name: &str, connection_id: u64) -> Result<LedgerEntry, DomainError> {
        let mut entries = self.entries.lock().await;
        let entry = LedgerEntry::reconstitute(
            entries.len() as i64 + 1,
            task_name.to_string(),
            connection_id,
            current_timestamp_millis(),
            None,
            SyncState::new(),
        );
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn checkpoint(&self, id: i64, state: &SyncState) -> Result<(), DomainError> {
        self.update(id, state, None).await
    }

    async fn complete(&self, id: i64, state: &SyncState) -> Result<(), DomainError> {
        self.update(id, state, Some(current_timestamp_millis())).await
    }

    async fn last_completed(
        &self,
        task_name: &str,
        connection_id: u64,
    ) -> Result<Option<LedgerEntry>, DomainError> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .filter(|e| e.task_name() == task_name && e.connection_id() == connection_id)
            .filter(|e| e.is_completed())
            .max_by_key(|e| (e.completed_at(), e.id()))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LedgerEntry>, DomainError> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().find(|e| e.id() == id).cloned())
    }

    async fn list(
        &self,
        task_name: &str,
        connection_id: u64,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .filter(|e| e.task_name() == task_name && e.connection_id() == connection_id)
            .cloned()
            .collect())
    }
}
