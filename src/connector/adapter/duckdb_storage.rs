use std::path::Path;
use std::sync::Arc;

use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{DomainError, StorageEndpoint};

/// One DuckDB connection shared by every repository of a plugin invocation.
///
/// DuckDB only allows one write connection per file, so the ledger, raw and
/// entity repositories are all built on the same handle.
#[derive(Clone)]
pub struct DuckdbStorage {
    conn: Arc<Mutex<Connection>>,
}

impl DuckdbStorage {
    pub fn open(endpoint: &StorageEndpoint) -> Result<Self, DomainError> {
        match endpoint {
            StorageEndpoint::InMemory => Self::in_memory(),
            StorageEndpoint::File(path) => Self::open_file(path),
        }
    }

    pub fn open_file(db_path: &Path) -> Result<Self, DomainError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)
            .map_err(|e| DomainError::storage(format!("Failed to open DuckDB database: {}", e)))?;
        debug!("Opened DuckDB database at {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, DomainError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DomainError::storage(format!("Failed to open DuckDB in-memory DB: {}", e))
        })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Returns a clone of the shared connection Arc.
    pub fn shared_connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }
}

/// Double-quote a relation or column name after checking it is a plain
/// identifier.
pub(crate) fn quote_identifier(name: &str) -> Result<String, DomainError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid {
        return Err(DomainError::storage(format!(
            "'{}' is not a valid relation identifier",
            name
        )));
    }
    Ok(format!("\"{}\"", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("_raw_ci_pipelines").unwrap(), "\"_raw_ci_pipelines\"");
        assert!(quote_identifier("pipelines; DROP TABLE x").is_err());
        assert!(quote_identifier("9lives").is_err());
        assert!(quote_identifier("").is_err());
    }
}
