use serde_json::{Map, Value};

use crate::domain::{ApiParamsInput, DomainError, PluginConfig, StageKind};

/// `collect|extract|convert <ctx> <stream>`
#[derive(Debug, Clone)]
pub struct StageRequest {
    pub stage: StageKind,
    pub config: PluginConfig,
    pub stream: String,
}

impl StageRequest {
    pub fn decode(stage: StageKind, ctx: &str, stream: &str) -> Result<Self, DomainError> {
        Ok(Self {
            stage,
            config: PluginConfig::from_map(decode_context(ctx)?)?,
            stream: decode_stream_name(stream)?,
        })
    }
}

/// `call <handler> <ctx> <input>`
#[derive(Debug, Clone)]
pub struct ApiCallRequest {
    pub handler: String,
    pub ctx: Map<String, Value>,
    pub input: ApiParamsInput,
}

impl ApiCallRequest {
    pub fn decode(handler: &str, ctx: &str, input: &str) -> Result<Self, DomainError> {
        let input = if input.trim().is_empty() {
            ApiParamsInput::default()
        } else {
            serde_json::from_str(input).map_err(|e| {
                DomainError::invalid_input(format!("malformed API handler input: {}", e))
            })?
        };

        Ok(Self {
            handler: handler.to_string(),
            ctx: decode_context(ctx)?,
            input,
        })
    }
}

/// The JSON config mapping handed over by the host.
pub fn decode_context(arg: &str) -> Result<Map<String, Value>, DomainError> {
    match serde_json::from_str::<Value>(arg) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DomainError::config(format!(
            "context must be a JSON object, got {}",
            other
        ))),
        Err(e) => Err(DomainError::config(format!("malformed context JSON: {}", e))),
    }
}

/// A stream argument is a JSON string; a bare name is accepted too.
pub fn decode_stream_name(arg: &str) -> Result<String, DomainError> {
    let name = match serde_json::from_str::<Value>(arg) {
        Ok(Value::String(name)) => name,
        _ => arg.trim().to_string(),
    };
    if name.is_empty() {
        return Err(DomainError::unknown_stream(arg));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_name_forms() {
        assert_eq!(decode_stream_name(r#""pipelines""#).unwrap(), "pipelines");
        assert_eq!(decode_stream_name("pipelines").unwrap(), "pipelines");
        assert!(decode_stream_name("  ").unwrap_err().is_unknown_stream());
    }

    #[test]
    fn test_stage_request_requires_db_url() {
        let err = StageRequest::decode(StageKind::Collect, r#"{"connection_id": 1}"#, "pipelines")
            .unwrap_err();
        assert!(err.is_config_error());

        let request = StageRequest::decode(
            StageKind::Extract,
            r#"{"connection_id": 7, "db_url": ":memory:"}"#,
            r#""workflows""#,
        )
        .unwrap();
        assert_eq!(request.config.connection_id(), 7);
        assert_eq!(request.stream, "workflows");
    }

    #[test]
    fn test_malformed_context_is_config_error() {
        assert!(decode_context("[1, 2]").unwrap_err().is_config_error());
        assert!(decode_context("{not json").unwrap_err().is_config_error());
    }

    #[test]
    fn test_api_call_input_defaults() {
        let request = ApiCallRequest::decode("test_connection", "{}", "").unwrap();
        assert!(request.input.body.is_null());
        assert!(request.ctx.is_empty());
    }
}
