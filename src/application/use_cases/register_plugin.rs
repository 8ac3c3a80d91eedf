use std::sync::Arc;

use schemars::JsonSchema;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::application::RegistryClient;
use crate::domain::{DomainError, RegistrationPayload};

use super::sync_plugin::PluginDefinition;

/// JSON Schema of a plugin's connection type.
pub fn connection_schema_for<T: JsonSchema>() -> Result<Value, DomainError> {
    Ok(serde_json::to_value(schemars::schema_for!(T))?)
}

/// The registration handshake: one request, no retry.
pub struct RegisterPluginUseCase {
    registry: Arc<dyn RegistryClient>,
}

impl RegisterPluginUseCase {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self { registry }
    }

    pub async fn execute(
        &self,
        definition: &PluginDefinition,
    ) -> Result<RegistrationPayload, DomainError> {
        let payload = Self::payload(definition);
        self.registry.register(&payload).await?;
        info!(
            "Registered plugin {} with {} subtasks",
            payload.name,
            payload.subtask_metas.len()
        );
        Ok(payload)
    }

    pub fn payload(definition: &PluginDefinition) -> RegistrationPayload {
        RegistrationPayload {
            name: definition.name().to_string(),
            description: definition.identity().description.clone(),
            connection_schema: definition.connection_schema().clone(),
            plugin_path: definition.plugin_path().to_string(),
            api_endpoints: definition.api_endpoints().to_vec(),
            subtask_metas: definition.subtask_metas(),
            generated_api_schema: generate_api_schema(definition),
        }
    }
}

/// OpenAPI document describing the connection resource and the plugin's own
/// endpoints, served by the host under `/plugins/{name}`.
pub fn generate_api_schema(definition: &PluginDefinition) -> Value {
    let name = definition.name();
    let connection_ref = json!({ "$ref": "#/components/schemas/connection" });

    let mut paths = Map::new();
    paths.insert(
        format!("/plugins/{}/connections", name),
        json!({
            "get": {
                "summary": "List connections",
                "responses": { "200": json_response(json!({ "type": "array", "items": connection_ref })) }
            },
            "post": {
                "summary": "Create a connection",
                "requestBody": { "content": { "application/json": { "schema": connection_ref } } },
                "responses": { "201": json_response(connection_ref.clone()) }
            }
        }),
    );
    paths.insert(
        format!("/plugins/{}/connections/{{connectionId}}", name),
        json!({
            "parameters": [{
                "name": "connectionId",
                "in": "path",
                "required": true,
                "schema": { "type": "integer" }
            }],
            "get": {
                "summary": "Get a connection",
                "responses": { "200": json_response(connection_ref.clone()) }
            },
            "patch": {
                "summary": "Update a connection",
                "requestBody": { "content": { "application/json": { "schema": connection_ref } } },
                "responses": { "200": json_response(connection_ref.clone()) }
            },
            "delete": {
                "summary": "Delete a connection",
                "responses": { "200": json_response(connection_ref.clone()) }
            }
        }),
    );

    for endpoint in definition.api_endpoints() {
        let path = format!("/plugins/{}/{}", name, endpoint.resource.trim_start_matches('/'));
        let operation = json!({
            "operationId": endpoint.handler,
            "responses": { "200": json_response(json!({})) }
        });
        let entry = paths
            .entry(path)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert(endpoint.method.to_ascii_lowercase(), operation);
        }
    }

    json!({
        "openapi": "3.0.2",
        "info": {
            "title": format!("{} plugin", name),
            "description": definition.identity().description,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": paths,
        "components": {
            "schemas": { "connection": definition.connection_schema() }
        }
    })
}

fn json_response(schema: Value) -> Value {
    json!({
        "description": "OK",
        "content": { "application/json": { "schema": schema } }
    })
}
