use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::domain::DomainError;

/// Where the pipeline relations live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEndpoint {
    InMemory,
    File(PathBuf),
}

impl StorageEndpoint {
    /// Parse a `db_url` value.
    ///
    /// Accepts `duckdb://<path>`, `duckdb::memory:`, `:memory:` or a bare path.
    pub fn parse(db_url: &str) -> Result<Self, DomainError> {
        let url = db_url.trim();
        if url.is_empty() {
            return Err(DomainError::config("db_url is empty"));
        }
        if url == ":memory:" || url == "duckdb::memory:" || url == "duckdb://:memory:" {
            return Ok(StorageEndpoint::InMemory);
        }
        if let Some(path) = url.strip_prefix("duckdb://") {
            // Query arguments are meaningless for an embedded database.
            let path = path.split('?').next().unwrap_or(path);
            if path.is_empty() {
                return Err(DomainError::config("db_url has no database path"));
            }
            return Ok(StorageEndpoint::File(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = url.split_once("://") {
            return Err(DomainError::config(format!(
                "unsupported storage scheme '{}'",
                scheme
            )));
        }
        Ok(StorageEndpoint::File(PathBuf::from(url)))
    }
}

/// The opaque configuration mapping a plugin is constructed with.
///
/// `connection_id` and `db_url` are required; every other key is left for
/// streams to interpret.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginConfig {
    connection_id: u64,
    storage: StorageEndpoint,
    raw: Map<String, Value>,
}

impl PluginConfig {
    pub fn from_json(value: Value) -> Result<Self, DomainError> {
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(DomainError::config(format!(
                "plugin configuration must be a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn from_map(raw: Map<String, Value>) -> Result<Self, DomainError> {
        let connection_id = match raw.get("connection_id") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
        .ok_or_else(|| DomainError::config("missing or invalid connection_id"))?;

        let db_url = raw
            .get("db_url")
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::config("missing db_url conf parameter"))?;
        let storage = StorageEndpoint::parse(db_url)?;

        Ok(Self {
            connection_id,
            storage,
            raw,
        })
    }

    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    pub fn storage(&self) -> &StorageEndpoint {
        &self.storage
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    /// A stream-specific string parameter that must be present.
    pub fn require_str(&self, key: &str) -> Result<&str, DomainError> {
        self.get_str(key)
            .ok_or_else(|| DomainError::config(format!("missing '{}' conf parameter", key)))
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_requires_connection_id() {
        let err = PluginConfig::from_json(json!({"db_url": ":memory:"})).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_config_requires_db_url() {
        let err = PluginConfig::from_json(json!({"connection_id": 1})).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_config_keeps_stream_parameters() {
        let config = PluginConfig::from_json(json!({
            "connection_id": "7",
            "db_url": "duckdb:///tmp/sync.duckdb?threads=2",
            "project_slug": "gh/acme/api"
        }))
        .unwrap();

        assert_eq!(config.connection_id(), 7);
        assert_eq!(
            config.storage(),
            &StorageEndpoint::File(PathBuf::from("/tmp/sync.duckdb"))
        );
        assert_eq!(config.require_str("project_slug").unwrap(), "gh/acme/api");
        assert!(config.require_str("token").is_err());
    }

    #[test]
    fn test_storage_endpoint_rejects_foreign_schemes() {
        assert!(StorageEndpoint::parse("mysql://root@localhost/lake").is_err());
        assert_eq!(
            StorageEndpoint::parse(":memory:").unwrap(),
            StorageEndpoint::InMemory
        );
    }
}
