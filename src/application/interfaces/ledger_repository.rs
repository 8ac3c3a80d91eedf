use async_trait::async_trait;

use crate::domain::{DomainError, LedgerEntry, SyncState};

/// Durable per-(task, connection) execution records.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Insert a new entry stamped as started now, with an empty state.
    async fn start(&self, task_name: &str, connection_id: u64) -> Result<LedgerEntry, DomainError>;

    /// Overwrite the state of an in-flight entry without completing it.
    async fn checkpoint(&self, id: i64, state: &SyncState) -> Result<(), DomainError>;

    /// Persist the final state and stamp the completion time.
    async fn complete(&self, id: i64, state: &SyncState) -> Result<(), DomainError>;

    /// The most recently completed entry, ignoring in-flight and abandoned runs.
    async fn last_completed(
        &self,
        task_name: &str,
        connection_id: u64,
    ) -> Result<Option<LedgerEntry>, DomainError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<LedgerEntry>, DomainError>;

    /// All entries for a task and connection, oldest first.
    async fn list(&self, task_name: &str, connection_id: u64)
        -> Result<Vec<LedgerEntry>, DomainError>;
}
