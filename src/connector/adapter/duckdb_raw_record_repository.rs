use std::sync::Arc;

use async_trait::async_trait;
use duckdb::{params, Connection};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::RawRecordRepository;
use crate::domain::{current_timestamp_millis, DomainError, NewRawRecord, RawRecord};

use super::duckdb_storage::{quote_identifier, DuckdbStorage};

/// Raw relations: one append-only table per stream.
pub struct DuckdbRawRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DuckdbRawRecordRepository {
    pub fn new(storage: &DuckdbStorage) -> Self {
        Self::with_connection(storage.shared_connection())
    }

    /// Create a new adapter using an existing shared connection.
    pub fn with_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RawRecordRepository for DuckdbRawRecordRepository {
    async fn ensure_relation(&self, table: &str) -> Result<(), DomainError> {
        let quoted = quote_identifier(table)?;
        let sequence = quote_identifier(&format!("seq_{}", table))?;
        let conn = self.conn.lock().await;

        conn.execute_batch(&format!(
            r#"
            CREATE SEQUENCE IF NOT EXISTS {sequence} START 1;

            CREATE TABLE IF NOT EXISTS {quoted} (
                id BIGINT PRIMARY KEY DEFAULT nextval('seq_{table}'),
                params TEXT NOT NULL,
                data BLOB NOT NULL,
                url TEXT NOT NULL DEFAULT '',
                input BLOB,
                created_at BIGINT NOT NULL
            );
            "#
        ))
        .map_err(|e| {
            DomainError::storage(format!("Failed to initialize raw relation {}: {}", table, e))
        })?;

        debug!("DuckDB raw relation {} initialized", table);
        Ok(())
    }

    async fn append(&self, table: &str, record: &NewRawRecord) -> Result<i64, DomainError> {
        let quoted = quote_identifier(table)?;
        let conn = self.conn.lock().await;

        conn.query_row(
            &format!(
                "INSERT INTO {} (params, data, url, input, created_at) \
                 VALUES (?, ?, ?, ?, ?) RETURNING id",
                quoted
            ),
            params![
                record.params,
                record.data,
                record.url,
                record.input,
                current_timestamp_millis(),
            ],
            |row| row.get(0),
        )
        .map_err(|e| DomainError::storage(format!("Failed to append to {}: {}", table, e)))
    }

    async fn scan(&self, table: &str) -> Result<Vec<RawRecord>, DomainError> {
        let quoted = quote_identifier(table)?;
        let conn = self.conn.lock().await;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, params, data, url, input, created_at FROM {} ORDER BY id",
                quoted
            ))
            .map_err(|e| DomainError::storage(format!("Failed to prepare statement: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(RawRecord::reconstitute(
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<Vec<u8>>>(4)?.unwrap_or_default(),
                    row.get::<_, i64>(5)?,
                ))
            })
            .map_err(|e| DomainError::storage(format!("Failed to scan {}: {}", table, e)))?;

        let mut records = Vec::new();
        for row in rows {
            records
                .push(row.map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?);
        }

        Ok(records)
    }

    async fn count(&self, table: &str) -> Result<u64, DomainError> {
        let quoted = quote_identifier(table)?;
        let conn = self.conn.lock().await;

        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quoted), [], |row| {
                row.get(0)
            })
            .map_err(|e| DomainError::storage(format!("Failed to count {}: {}", table, e)))?;

        Ok(count as u64)
    }
}
