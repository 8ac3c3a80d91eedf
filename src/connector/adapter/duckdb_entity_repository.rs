use std::sync::Arc;

use async_trait::async_trait;
use duckdb::types::Value as SqlValue;
use duckdb::{params_from_iter, Connection, Row};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::EntityRepository;
use crate::domain::{DomainError, Entity, EntitySchema, FieldDef, FieldKind};

use super::duckdb_storage::{quote_identifier, DuckdbStorage};

/// Tool and domain relations, one table per [`EntitySchema`].
pub struct DuckdbEntityRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DuckdbEntityRepository {
    pub fn new(storage: &DuckdbStorage) -> Self {
        Self::with_connection(storage.shared_connection())
    }

    /// Create a new adapter using an existing shared connection.
    pub fn with_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn column_list(schema: &EntitySchema) -> Result<String, DomainError> {
        let columns = schema
            .fields()
            .iter()
            .map(|f| quote_identifier(f.name()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns.join(", "))
    }

    fn to_sql(field: &FieldDef, value: Option<&Value>) -> Result<SqlValue, DomainError> {
        let value = match value {
            None | Some(Value::Null) => return Ok(SqlValue::Null),
            Some(value) => value,
        };

        let mismatch = || {
            DomainError::storage(format!(
                "value {} does not fit {} column {}",
                value,
                field.kind(),
                field.name()
            ))
        };

        Ok(match field.kind() {
            FieldKind::Text | FieldKind::Timestamp => match value {
                Value::String(s) => SqlValue::Text(s.clone()),
                other => SqlValue::Text(other.to_string()),
            },
            FieldKind::Integer => SqlValue::BigInt(value.as_i64().ok_or_else(mismatch)?),
            FieldKind::Float => SqlValue::Double(value.as_f64().ok_or_else(mismatch)?),
            FieldKind::Boolean => SqlValue::Boolean(value.as_bool().ok_or_else(mismatch)?),
            FieldKind::Json => SqlValue::Text(serde_json::to_string(value)?),
        })
    }

    fn read_field(row: &Row<'_>, index: usize, kind: FieldKind) -> duckdb::Result<Value> {
        Ok(match kind {
            FieldKind::Text | FieldKind::Timestamp => {
                row.get::<_, Option<String>>(index)?.map_or(Value::Null, Value::String)
            }
            FieldKind::Integer => row.get::<_, Option<i64>>(index)?.map_or(Value::Null, Value::from),
            FieldKind::Float => row.get::<_, Option<f64>>(index)?.map_or(Value::Null, Value::from),
            FieldKind::Boolean => row.get::<_, Option<bool>>(index)?.map_or(Value::Null, Value::Bool),
            // Parsed after the row is read so that bad JSON surfaces as a domain error.
            FieldKind::Json => row.get::<_, Option<String>>(index)?.map_or(Value::Null, Value::String),
        })
    }
}

#[async_trait]
impl EntityRepository for DuckdbEntityRepository {
    async fn ensure_relation(&self, schema: &EntitySchema) -> Result<(), DomainError> {
        let table = quote_identifier(schema.table())?;

        let mut columns = Vec::new();
        for field in schema.fields() {
            columns.push(format!(
                "{} {}",
                quote_identifier(field.name())?,
                field.kind().sql_type()
            ));
        }
        let keys = schema
            .primary_keys()
            .map(|f| quote_identifier(f.name()))
            .collect::<Result<Vec<_>, _>>()?;

        let conn = self.conn.lock().await;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}));",
            table,
            columns.join(", "),
            keys.join(", ")
        ))
        .map_err(|e| {
            DomainError::storage(format!(
                "Failed to initialize relation {}: {}",
                schema.table(),
                e
            ))
        })?;

        debug!("DuckDB relation {} initialized for {}", schema.table(), schema.type_name());
        Ok(())
    }

    async fn upsert(&self, schema: &EntitySchema, entity: &Entity) -> Result<(), DomainError> {
        if entity.type_name() != schema.type_name() {
            return Err(DomainError::invalid_input(format!(
                "cannot store {} in {}",
                entity.type_name(),
                schema.table()
            )));
        }

        let values = schema
            .fields()
            .iter()
            .map(|f| Self::to_sql(f, entity.get(f.name())))
            .collect::<Result<Vec<_>, _>>()?;
        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            quote_identifier(schema.table())?,
            Self::column_list(schema)?,
            placeholders
        );

        let conn = self.conn.lock().await;
        conn.execute(&sql, params_from_iter(values))
            .map_err(|e| DomainError::storage(format!("Failed to upsert into {}: {}", schema.table(), e)))?;

        Ok(())
    }

    async fn scan(&self, schema: &EntitySchema) -> Result<Vec<Entity>, DomainError> {
        let keys = schema
            .primary_keys()
            .map(|f| quote_identifier(f.name()))
            .collect::<Result<Vec<_>, _>>()?;
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            Self::column_list(schema)?,
            quote_identifier(schema.table())?,
            keys.join(", ")
        );
        let kinds: Vec<FieldKind> = schema.fields().iter().map(FieldDef::kind).collect();

        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DomainError::storage(format!("Failed to prepare statement: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                kinds
                    .iter()
                    .enumerate()
                    .map(|(i, kind)| Self::read_field(row, i, *kind))
                    .collect::<duckdb::Result<Vec<Value>>>()
            })
            .map_err(|e| DomainError::storage(format!("Failed to scan {}: {}", schema.table(), e)))?;

        let mut entities = Vec::new();
        for row in rows {
            let values =
                row.map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?;

            let mut entity = Entity::new(schema.type_name());
            for (field, value) in schema.fields().iter().zip(values) {
                let value = match (field.kind(), value) {
                    (FieldKind::Json, Value::String(text)) => serde_json::from_str(&text)?,
                    (_, value) => value,
                };
                entity.set(field.name(), value);
            }
            entities.push(entity);
        }

        Ok(entities)
    }

    async fn count(&self, schema: &EntitySchema) -> Result<u64, DomainError> {
        let table = quote_identifier(schema.table())?;
        let conn = self.conn.lock().await;

        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .map_err(|e| DomainError::storage(format!("Failed to count {}: {}", schema.table(), e)))?;

        Ok(count as u64)
    }
}
