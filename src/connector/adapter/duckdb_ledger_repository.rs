use std::sync::Arc;

use async_trait::async_trait;
use duckdb::{params, Connection, Row};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::LedgerRepository;
use crate::domain::{
    current_timestamp_millis, decode_state, encode_state, DomainError, LedgerEntry, SyncState,
    LEDGER_TABLE,
};

use super::duckdb_storage::DuckdbStorage;

const SELECT_COLUMNS: &str = "id, task_name, connection_id, started, completed, state";

pub struct DuckdbLedgerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DuckdbLedgerRepository {
    pub async fn new(storage: &DuckdbStorage) -> Result<Self, DomainError> {
        Self::with_connection(storage.shared_connection()).await
    }

    /// Create a new adapter using an existing shared connection.
    pub async fn with_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, DomainError> {
        let conn_guard = conn.lock().await;
        Self::initialize_schema(&conn_guard)?;
        drop(conn_guard);

        Ok(Self { conn })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), DomainError> {
        conn.execute_batch(&format!(
            r#"
            CREATE SEQUENCE IF NOT EXISTS seq{table} START 1;

            CREATE TABLE IF NOT EXISTS {table} (
                id BIGINT PRIMARY KEY DEFAULT nextval('seq{table}'),
                task_name TEXT NOT NULL,
                connection_id BIGINT NOT NULL,
                started BIGINT NOT NULL,
                completed BIGINT,
                state TEXT NOT NULL DEFAULT '{{}}'
            );
            "#,
            table = LEDGER_TABLE
        ))
        .map_err(|e| DomainError::storage(format!("Failed to initialize ledger schema: {}", e)))?;

        debug!("DuckDB ledger table initialized");
        Ok(())
    }

    fn read_row(row: &Row<'_>) -> duckdb::Result<(i64, String, i64, i64, Option<i64>, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn to_entry(
        (id, task_name, connection_id, started, completed, state): (
            i64,
            String,
            i64,
            i64,
            Option<i64>,
            String,
        ),
    ) -> Result<LedgerEntry, DomainError> {
        Ok(LedgerEntry::reconstitute(
            id,
            task_name,
            connection_id as u64,
            started,
            completed,
            decode_state(&state)?,
        ))
    }

    fn query_entries(
        conn: &Connection,
        sql: &str,
        params: &[&dyn duckdb::ToSql],
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DomainError::storage(format!("Failed to prepare statement: {}", e)))?;

        let rows = stmt
            .query_map(params, Self::read_row)
            .map_err(|e| DomainError::storage(format!("Failed to query ledger: {}", e)))?;

        let mut entries = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?;
            entries.push(Self::to_entry(row)?);
        }
        Ok(entries)
    }

    fn update_state(
        conn: &Connection,
        id: i64,
        state: &SyncState,
        completed: Option<i64>,
    ) -> Result<(), DomainError> {
        let state = encode_state(state)?;
        let updated = match completed {
            Some(completed) => conn.execute(
                &format!("UPDATE {} SET state = ?, completed = ? WHERE id = ?", LEDGER_TABLE),
                params![state, completed, id],
            ),
            None => conn.execute(
                &format!("UPDATE {} SET state = ? WHERE id = ?", LEDGER_TABLE),
                params![state, id],
            ),
        }
        .map_err(|e| DomainError::storage(format!("Failed to update ledger entry: {}", e)))?;

        if updated == 0 {
            return Err(DomainError::storage(format!("No ledger entry with id {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for DuckdbLedgerRepository {
    async fn start(&self, task_name: &str, connection_id: u64) -> Result<LedgerEntry, DomainError> {
        let conn = self.conn.lock().await;
        let started = current_timestamp_millis();

        let id: i64 = conn
            .query_row(
                &format!(
                    "INSERT INTO {} (task_name, connection_id, started, state) \
                     VALUES (?, ?, ?, '{{}}') RETURNING id",
                    LEDGER_TABLE
                ),
                params![task_name, connection_id as i64, started],
                |row| row.get(0),
            )
            .map_err(|e| DomainError::storage(format!("Failed to start ledger entry: {}", e)))?;

        debug!("Ledger entry {} started for {}", id, task_name);
        Ok(LedgerEntry::reconstitute(
            id,
            task_name.to_string(),
            connection_id,
            started,
            None,
            SyncState::new(),
        ))
    }

    async fn checkpoint(&self, id: i64, state: &SyncState) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        Self::update_state(&conn, id, state, None)
    }

    async fn complete(&self, id: i64, state: &SyncState) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        Self::update_state(&conn, id, state, Some(current_timestamp_millis()))
    }

    async fn last_completed(
        &self,
        task_name: &str,
        connection_id: u64,
    ) -> Result<Option<LedgerEntry>, DomainError> {
        let conn = self.conn.lock().await;
        let entries = Self::query_entries(
            &conn,
            &format!(
                "SELECT {} FROM {} \
                 WHERE task_name = ? AND connection_id = ? AND completed IS NOT NULL \
                 ORDER BY completed DESC, id DESC LIMIT 1",
                SELECT_COLUMNS, LEDGER_TABLE
            ),
            params![task_name, connection_id as i64],
        )?;
        Ok(entries.into_iter().next())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LedgerEntry>, DomainError> {
        let conn = self.conn.lock().await;
        let entries = Self::query_entries(
            &conn,
            &format!("SELECT {} FROM {} WHERE id = ?", SELECT_COLUMNS, LEDGER_TABLE),
            params![id],
        )?;
        Ok(entries.into_iter().next())
    }

    async fn list(
        &self,
        task_name: &str,
        connection_id: u64,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        let conn = self.conn.lock().await;
        Self::query_entries(
            &conn,
            &format!(
                "SELECT {} FROM {} WHERE task_name = ? AND connection_id = ? ORDER BY id",
                SELECT_COLUMNS, LEDGER_TABLE
            ),
            params![task_name, connection_id as i64],
        )
    }
}
