use async_trait::async_trait;

use crate::domain::{DomainError, NewRawRecord, RawRecord};

/// Append-only storage for raw relations. There is deliberately no update.
#[async_trait]
pub trait RawRecordRepository: Send + Sync {
    async fn ensure_relation(&self, table: &str) -> Result<(), DomainError>;

    /// Append one row and return its assigned id.
    async fn append(&self, table: &str, record: &NewRawRecord) -> Result<i64, DomainError>;

    /// Every row, in id order.
    async fn scan(&self, table: &str) -> Result<Vec<RawRecord>, DomainError>;

    async fn count(&self, table: &str) -> Result<u64, DomainError>;
}
