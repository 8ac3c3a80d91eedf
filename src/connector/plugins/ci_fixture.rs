//! A CI plugin that reads pipelines and workflows from newline-delimited JSON
//! files instead of a live API.
//!
//! Layout under the connection's `source_dir`:
//!
//! ```text
//! pipelines.jsonl            one pipeline object per line
//! workflows/<pipeline>.jsonl the workflows of one pipeline
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::application::{
    connection_schema_for, ApiHandler, CollectContext, CollectStream, CollectedItem,
    PluginDefinition, Stream, StreamBehavior,
};
use crate::connector::adapter::JsonLinesSource;
use crate::domain::catalog::devops::{
    cicd_pipeline, cicd_pipeline_relationship, cicd_pipeline_relationship_schema,
    cicd_pipeline_schema, CicdResult, CicdStatus,
};
use crate::domain::{
    derive_domain_id, tool_table_name, ApiParamsInput, ApiParamsOutput, DomainError, Entity,
    EntitySchema, FieldDef, FieldKind, PluginConfig, PluginIdentity, SyncState,
};

pub const CI_PLUGIN_NAME: &str = "ci";
pub const PIPELINES_STREAM: &str = "pipelines";
pub const WORKFLOWS_STREAM: &str = "workflows";

const SOURCE_DIR_KEY: &str = "source_dir";
const OFFSET_KEY: &str = "offset";

/// Connection settings stored by the host for this plugin.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CiFixtureConnection {
    /// Display name of the connection.
    pub name: String,
    /// Directory holding `pipelines.jsonl` and `workflows/`.
    pub source_dir: String,
}

pub fn ci_pipeline_schema() -> EntitySchema {
    EntitySchema::new(
        "CiPipeline",
        tool_table_name(CI_PLUGIN_NAME, "pipelines"),
        vec![
            FieldDef::key("id", FieldKind::Integer),
            FieldDef::new("name", FieldKind::Text),
            FieldDef::new("status", FieldKind::Text),
            FieldDef::new("branch", FieldKind::Text),
            FieldDef::new("created_at", FieldKind::Timestamp),
            FieldDef::new("finished_at", FieldKind::Timestamp),
            FieldDef::new("duration", FieldKind::Float),
            FieldDef::new("web_url", FieldKind::Text),
            FieldDef::new("labels", FieldKind::Json),
        ],
    )
    .expect("Invalid CiPipeline schema")
}

pub fn ci_workflow_schema() -> EntitySchema {
    EntitySchema::new(
        "CiWorkflow",
        tool_table_name(CI_PLUGIN_NAME, "workflows"),
        vec![
            FieldDef::key("id", FieldKind::Integer),
            FieldDef::new("pipeline_id", FieldKind::Integer),
            FieldDef::new("name", FieldKind::Text),
            FieldDef::new("status", FieldKind::Text),
            FieldDef::new("created_at", FieldKind::Timestamp),
            FieldDef::new("finished_at", FieldKind::Timestamp),
            FieldDef::new("duration", FieldKind::Float),
        ],
    )
    .expect("Invalid CiWorkflow schema")
}

/// The shipped plugin: `pipelines` plus its `workflows` substream.
pub fn ci_fixture_plugin() -> Result<PluginDefinition, DomainError> {
    let pipelines = Stream::new(
        CI_PLUGIN_NAME,
        PIPELINES_STREAM,
        ci_pipeline_schema(),
        cicd_pipeline_schema(),
        Arc::new(PipelinesBehavior),
    );
    let workflows = Stream::new(
        CI_PLUGIN_NAME,
        WORKFLOWS_STREAM,
        ci_workflow_schema(),
        cicd_pipeline_schema(),
        Arc::new(WorkflowsBehavior::new()),
    )
    .with_parent(PIPELINES_STREAM)
    .with_related_domain_schema(cicd_pipeline_relationship_schema());

    let plugin = PluginDefinition::new(
        PluginIdentity::new(CI_PLUGIN_NAME, "Collects CI pipelines and workflows from JSON files"),
        connection_schema_for::<CiFixtureConnection>()?,
    )
    .with_stream(pipelines)?
    .with_stream(workflows)?
    .with_api_endpoint(
        "connections/test",
        "POST",
        "test_connection",
        Arc::new(TestConnectionHandler),
    );
    Ok(plugin)
}

fn source_dir(config: &PluginConfig) -> Result<PathBuf, DomainError> {
    Ok(PathBuf::from(config.require_str(SOURCE_DIR_KEY)?))
}

struct PipelinesBehavior;

impl StreamBehavior for PipelinesBehavior {
    fn collect(&self, ctx: CollectContext, state: SyncState) -> CollectStream {
        let dir = match source_dir(&ctx.config) {
            Ok(dir) => dir,
            Err(e) => return futures_util::stream::once(async move { Err(e) }).boxed(),
        };
        let offset = state.get(OFFSET_KEY).and_then(Value::as_u64).unwrap_or(0);
        let path = dir.join("pipelines.jsonl");
        let url = path.display().to_string();

        JsonLinesSource::new(path)
            .read_from(offset)
            .map_ok(move |(payload, next)| {
                let mut next_state = state.clone();
                next_state.insert(OFFSET_KEY.to_string(), json!(next));
                (CollectedItem::new(payload).with_url(url.clone()), next_state)
            })
            .boxed()
    }

    fn convert(&self, tool: &Entity) -> Result<Vec<Entity>, DomainError> {
        let status = tool.get_str("status").unwrap_or_default();
        let pipeline = with_timings(
            cicd_pipeline(tool.get_str("name").unwrap_or_default(), cicd_status(status)),
            tool,
        )
        .with("result", cicd_result(status).map(|r| r.as_str()))
        .with("type", "CI")
        .with(
            "environment",
            tool.get("labels")
                .and_then(|labels| labels.get("environment"))
                .cloned()
                .unwrap_or(Value::Null),
        );
        Ok(vec![pipeline])
    }
}

struct WorkflowsBehavior {
    pipeline_schema: EntitySchema,
    workflow_schema: EntitySchema,
}

impl WorkflowsBehavior {
    fn new() -> Self {
        Self {
            pipeline_schema: ci_pipeline_schema(),
            workflow_schema: ci_workflow_schema(),
        }
    }
}

impl StreamBehavior for WorkflowsBehavior {
    /// Every run re-reads the workflows of each pipeline; the tool relation
    /// is keyed, so duplicates in the raw relation are harmless.
    fn collect(&self, ctx: CollectContext, state: SyncState) -> CollectStream {
        let (dir, pipeline_id) = match (source_dir(&ctx.config), ctx.parent.as_ref()) {
            (Ok(dir), Some(parent)) => (dir, parent.get("id").cloned().unwrap_or(Value::Null)),
            (Err(e), _) => return futures_util::stream::once(async move { Err(e) }).boxed(),
            (Ok(_), None) => {
                return futures_util::stream::once(async {
                    Err(DomainError::invalid_input("workflows are collected per pipeline"))
                })
                .boxed()
            }
        };
        let path = workflows_file(&dir, &pipeline_id);
        let url = path.display().to_string();

        JsonLinesSource::new(path)
            .allow_missing()
            .read_from(0)
            .map_ok(move |(mut payload, _)| {
                if let Value::Object(obj) = &mut payload {
                    obj.insert("pipeline_id".to_string(), pipeline_id.clone());
                }
                (CollectedItem::new(payload).with_url(url.clone()), state.clone())
            })
            .boxed()
    }

    fn convert(&self, tool: &Entity) -> Result<Vec<Entity>, DomainError> {
        let status = tool.get_str("status").unwrap_or_default();
        let workflow = with_timings(
            cicd_pipeline(tool.get_str("name").unwrap_or_default(), cicd_status(status)),
            tool,
        )
        .with("result", cicd_result(status).map(|r| r.as_str()))
        .with("type", "CI");

        let mut produced = vec![workflow];
        if let Some(pipeline_id) = tool.get("pipeline_id").filter(|v| !v.is_null()) {
            let parent = Entity::new(self.pipeline_schema.type_name()).with("id", pipeline_id.clone());
            produced.push(cicd_pipeline_relationship(
                &derive_domain_id(CI_PLUGIN_NAME, &self.pipeline_schema, &parent),
                &derive_domain_id(CI_PLUGIN_NAME, &self.workflow_schema, tool),
            ));
        }
        Ok(produced)
    }
}

fn workflows_file(dir: &Path, pipeline_id: &Value) -> PathBuf {
    let name = match pipeline_id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    dir.join("workflows").join(format!("{}.jsonl", name))
}

fn with_timings(entity: Entity, tool: &Entity) -> Entity {
    let duration = tool
        .get("duration")
        .and_then(Value::as_f64)
        .map(|secs| json!(secs.round() as i64))
        .unwrap_or(Value::Null);

    entity
        .with("created_date", tool.get("created_at").cloned().unwrap_or(Value::Null))
        .with("finished_date", tool.get("finished_at").cloned().unwrap_or(Value::Null))
        .with("duration_sec", duration)
}

fn cicd_status(status: &str) -> CicdStatus {
    match status.to_ascii_lowercase().as_str() {
        "created" | "pending" | "running" | "waiting" => CicdStatus::InProgress,
        "manual" => CicdStatus::Manual,
        _ => CicdStatus::Done,
    }
}

fn cicd_result(status: &str) -> Option<CicdResult> {
    match status.to_ascii_lowercase().as_str() {
        "success" | "passed" => Some(CicdResult::Success),
        "failed" | "error" => Some(CicdResult::Failure),
        "canceled" | "cancelled" | "skipped" => Some(CicdResult::Abort),
        "manual" => Some(CicdResult::Manual),
        _ => None,
    }
}

/// Checks that the connection's source directory holds a pipelines file.
struct TestConnectionHandler;

#[async_trait]
impl ApiHandler for TestConnectionHandler {
    async fn handle(
        &self,
        ctx: &Map<String, Value>,
        input: ApiParamsInput,
    ) -> Result<ApiParamsOutput, DomainError> {
        let connection: CiFixtureConnection = match serde_json::from_value(input.body) {
            Ok(connection) => connection,
            Err(_) => match ctx.get(SOURCE_DIR_KEY).and_then(Value::as_str) {
                Some(dir) => CiFixtureConnection {
                    name: String::new(),
                    source_dir: dir.to_string(),
                },
                None => {
                    return Ok(ApiParamsOutput::ok(json!({
                        "success": false,
                        "message": "source_dir is required",
                    }))
                    .with_status(400))
                }
            },
        };

        let pipelines = Path::new(&connection.source_dir).join("pipelines.jsonl");
        match tokio::fs::metadata(&pipelines).await {
            Ok(meta) if meta.is_file() => Ok(ApiParamsOutput::ok(json!({
                "success": true,
                "message": "success",
            }))),
            _ => Ok(ApiParamsOutput::ok(json!({
                "success": false,
                "message": format!("{} is not readable", pipelines.display()),
            }))
            .with_status(400)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_declares_both_streams() {
        let plugin = ci_fixture_plugin().unwrap();
        assert_eq!(plugin.streams().len(), 2);
        assert!(plugin.stream(WORKFLOWS_STREAM).unwrap().is_substream());
        assert!(plugin.stream("deployments").unwrap_err().is_unknown_stream());
        assert_eq!(plugin.subtask_metas().len(), 6);
    }

    #[test]
    fn test_pipeline_conversion() {
        let tool = ci_pipeline_schema()
            .project(&json!({
                "id": 42,
                "name": "build",
                "status": "failed",
                "duration": 61.6,
                "labels": {"environment": "PRODUCTION"},
            }))
            .unwrap();

        let produced = PipelinesBehavior.convert(&tool).unwrap();
        assert_eq!(produced.len(), 1);
        let pipeline = &produced[0];
        assert_eq!(pipeline.get_str("status"), Some("DONE"));
        assert_eq!(pipeline.get_str("result"), Some("FAILURE"));
        assert_eq!(pipeline.get("duration_sec"), Some(&json!(62)));
        assert_eq!(pipeline.get_str("environment"), Some("PRODUCTION"));
    }

    #[test]
    fn test_workflow_conversion_links_parent() {
        let tool = ci_workflow_schema()
            .project(&json!({"id": 7, "pipeline_id": 42, "name": "lint", "status": "running"}))
            .unwrap();

        let produced = WorkflowsBehavior::new().convert(&tool).unwrap();
        assert_eq!(produced.len(), 2);
        assert_eq!(produced[0].get_str("status"), Some("IN_PROGRESS"));
        assert_eq!(produced[0].get("result"), Some(&Value::Null));
        assert_eq!(produced[1].get_str("parent_pipeline_id"), Some("ci:CiPipeline:42"));
        assert_eq!(produced[1].get_str("child_pipeline_id"), Some("ci:CiWorkflow:7"));
    }

    #[test]
    fn test_connection_schema_lists_fields() {
        let plugin = ci_fixture_plugin().unwrap();
        let properties = &plugin.connection_schema()["properties"];
        assert!(properties.get("source_dir").is_some());
        assert!(properties.get("name").is_some());
    }
}
