use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Explicit identity of a plugin; never inferred from code location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginIdentity {
    pub name: String,
    pub description: String,
}

impl PluginIdentity {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub resource: String,
    pub handler: String,
    pub method: String,
}

/// Stage metadata the host uses to schedule and invoke a subtask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskMeta {
    pub name: String,
    pub entry_point_name: String,
    pub required: bool,
    pub enabled_by_default: bool,
    pub description: String,
    pub domain_types: Vec<String>,
    pub arguments: Vec<String>,
}

/// One line of `list-subtasks` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskListing {
    pub name: String,
    pub description: String,
    /// `[verb, stream]`
    pub command: Vec<String>,
    pub domain_types: Vec<String>,
}

/// Progress record streamed to the host while a stage runs.
///
/// The host applies `current`/`total` when `current` is non-zero and
/// `increment` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoteProgress {
    pub increment: u64,
    pub current: u64,
    pub total: u64,
}

impl RemoteProgress {
    pub fn increment(by: u64) -> Self {
        Self {
            increment: by,
            ..Self::default()
        }
    }

    pub fn absolute(current: u64, total: u64) -> Self {
        Self {
            increment: 0,
            current,
            total,
        }
    }
}

/// Input of a plugin API handler call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiParamsInput {
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub query: Map<String, Value>,
    #[serde(default)]
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiParamsOutput {
    pub body: Value,
    pub status: u16,
    pub content_type: String,
}

impl ApiParamsOutput {
    pub fn ok(body: Value) -> Self {
        Self {
            body,
            status: 200,
            content_type: "application/json".to_string(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Descriptor sent to the host's registration endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationPayload {
    pub name: String,
    pub description: String,
    pub connection_schema: Value,
    pub plugin_path: String,
    pub api_endpoints: Vec<ApiEndpoint>,
    pub subtask_metas: Vec<SubtaskMeta>,
    pub generated_api_schema: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_serialization() {
        let json = serde_json::to_string(&RemoteProgress::increment(1)).unwrap();
        assert_eq!(json, r#"{"increment":1,"current":0,"total":0}"#);
    }

    #[test]
    fn test_api_input_defaults() {
        let input: ApiParamsInput = serde_json::from_str("{}").unwrap();
        assert!(input.params.is_empty());
        assert!(input.body.is_null());
    }
}
