use std::sync::Arc;

use futures_util::stream::BoxStream;
use serde_json::Value;

use crate::domain::{
    raw_table_name, task_description, task_name, DomainError, Entity, EntitySchema, PluginConfig,
    StageKind, SyncState,
};

/// One payload pulled from the source.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedItem {
    pub payload: Value,
    /// Where the payload came from, if the source knows.
    pub url: Option<String>,
}

impl CollectedItem {
    pub fn new(payload: Value) -> Self {
        Self { payload, url: None }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl From<Value> for CollectedItem {
    fn from(payload: Value) -> Self {
        Self::new(payload)
    }
}

/// Lazy `(payload, next_state)` sequence produced by a collect behavior.
pub type CollectStream = BoxStream<'static, Result<(CollectedItem, SyncState), DomainError>>;

/// What a collect behavior gets to work with.
#[derive(Debug, Clone)]
pub struct CollectContext {
    pub config: Arc<PluginConfig>,
    /// The parent tool entity, for substreams.
    pub parent: Option<Entity>,
}

/// The source-specific behavior of a stream.
///
/// `collect` is the only required hook for data acquisition; `extract` defaults
/// to projecting the payload onto the tool schema by field name.
pub trait StreamBehavior: Send + Sync {
    fn collect(&self, ctx: CollectContext, state: SyncState) -> CollectStream;

    fn extract(&self, schema: &EntitySchema, payload: &Value) -> Result<Entity, DomainError> {
        schema.project(payload)
    }

    /// Zero or more domain entities for one tool entity.
    fn convert(&self, tool: &Entity) -> Result<Vec<Entity>, DomainError>;
}

/// Static definition of one data resource.
///
/// A substream is a stream with a `parent`; its collection runs once per
/// persisted parent tool entity.
#[derive(Clone)]
pub struct Stream {
    plugin: String,
    name: String,
    raw_table: String,
    tool_schema: EntitySchema,
    domain_schemas: Vec<EntitySchema>,
    parent: Option<String>,
    behavior: Arc<dyn StreamBehavior>,
}

impl Stream {
    pub fn new(
        plugin: impl Into<String>,
        name: impl Into<String>,
        tool_schema: EntitySchema,
        domain_schema: EntitySchema,
        behavior: Arc<dyn StreamBehavior>,
    ) -> Self {
        let plugin = plugin.into();
        let name = name.into();
        Self {
            raw_table: raw_table_name(&plugin, &name),
            plugin,
            name,
            tool_schema,
            domain_schemas: vec![domain_schema],
            parent: None,
            behavior,
        }
    }

    /// Make this a substream of the named stream.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declare an additional domain type this stream's conversion may emit.
    pub fn with_related_domain_schema(mut self, schema: EntitySchema) -> Self {
        self.domain_schemas.push(schema);
        self
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualified_name(&self) -> String {
        format!("{}_{}", self.plugin, self.name)
    }

    pub fn raw_table(&self) -> &str {
        &self.raw_table
    }

    pub fn tool_schema(&self) -> &EntitySchema {
        &self.tool_schema
    }

    /// The principal domain type.
    pub fn domain_schema(&self) -> &EntitySchema {
        &self.domain_schemas[0]
    }

    pub fn domain_schemas(&self) -> &[EntitySchema] {
        &self.domain_schemas
    }

    pub fn domain_schema_for(&self, type_name: &str) -> Result<&EntitySchema, DomainError> {
        self.domain_schemas
            .iter()
            .find(|s| s.type_name() == type_name)
            .ok_or_else(|| {
                DomainError::invalid_input(format!(
                    "stream {} does not declare domain type {}",
                    self.name, type_name
                ))
            })
    }

    pub fn domain_type_names(&self) -> Vec<String> {
        self.domain_schemas
            .iter()
            .map(|s| s.type_name().to_string())
            .collect()
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_substream(&self) -> bool {
        self.parent.is_some()
    }

    pub fn behavior(&self) -> Arc<dyn StreamBehavior> {
        Arc::clone(&self.behavior)
    }

    pub fn task_name(&self, stage: StageKind) -> String {
        task_name(stage, &self.plugin, &self.name)
    }

    pub fn task_description(&self, stage: StageKind) -> String {
        task_description(stage, &self.plugin, &self.name)
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("plugin", &self.plugin)
            .field("name", &self.name)
            .field("raw_table", &self.raw_table)
            .field("tool_type", &self.tool_schema.type_name())
            .field("domain_types", &self.domain_type_names())
            .field("parent", &self.parent)
            .finish()
    }
}
