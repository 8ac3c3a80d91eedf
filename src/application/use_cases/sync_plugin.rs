use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::{ApiHandler, EntityRepository, RawRecordRepository, Stream};
use crate::domain::{
    ApiEndpoint, DomainError, PluginConfig, PluginIdentity, RunReport, StageKind, SubtaskListing,
    SubtaskMeta,
};

use super::collector::Collector;
use super::convertor::Convertor;
use super::extractor::Extractor;
use super::pipeline_runner::{ProgressSender, StagedPipelineRunner};

/// Everything a plugin declares about itself. Needs no storage.
#[derive(Clone)]
pub struct PluginDefinition {
    identity: PluginIdentity,
    connection_schema: Value,
    plugin_path: String,
    streams: Vec<Stream>,
    api_endpoints: Vec<ApiEndpoint>,
    api_handlers: HashMap<String, Arc<dyn ApiHandler>>,
}

impl PluginDefinition {
    pub fn new(identity: PluginIdentity, connection_schema: Value) -> Self {
        let plugin_path = identity.name.clone();
        Self {
            identity,
            connection_schema,
            plugin_path,
            streams: Vec::new(),
            api_endpoints: Vec::new(),
            api_handlers: HashMap::new(),
        }
    }

    pub fn with_plugin_path(mut self, path: impl Into<String>) -> Self {
        self.plugin_path = path.into();
        self
    }

    /// Register a stream. A substream's parent must already be registered.
    pub fn with_stream(mut self, stream: Stream) -> Result<Self, DomainError> {
        if stream.plugin() != self.identity.name {
            return Err(DomainError::invalid_input(format!(
                "stream {} belongs to plugin {}, not {}",
                stream.name(),
                stream.plugin(),
                self.identity.name
            )));
        }
        if self.streams.iter().any(|s| s.name() == stream.name()) {
            return Err(DomainError::invalid_input(format!(
                "stream {} is declared twice",
                stream.name()
            )));
        }
        if let Some(parent) = stream.parent() {
            self.stream(parent)?;
        }

        self.streams.push(stream);
        Ok(self)
    }

    pub fn with_api_endpoint(
        mut self,
        resource: impl Into<String>,
        method: impl Into<String>,
        handler_name: impl Into<String>,
        handler: Arc<dyn ApiHandler>,
    ) -> Self {
        let handler_name = handler_name.into();
        self.api_endpoints.push(ApiEndpoint {
            resource: resource.into(),
            handler: handler_name.clone(),
            method: method.into().to_ascii_uppercase(),
        });
        self.api_handlers.insert(handler_name, handler);
        self
    }

    pub fn identity(&self) -> &PluginIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn connection_schema(&self) -> &Value {
        &self.connection_schema
    }

    pub fn plugin_path(&self) -> &str {
        &self.plugin_path
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn stream(&self, name: &str) -> Result<&Stream, DomainError> {
        self.streams
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| DomainError::unknown_stream(name))
    }

    pub fn api_endpoints(&self) -> &[ApiEndpoint] {
        &self.api_endpoints
    }

    pub fn api_handler(&self, name: &str) -> Result<Arc<dyn ApiHandler>, DomainError> {
        self.api_handlers
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::invalid_input(format!("no API handler named {}", name)))
    }

    /// Every (stream, stage) pair, streams in declaration order.
    pub fn subtask_listings(&self) -> Vec<SubtaskListing> {
        self.streams
            .iter()
            .flat_map(|stream| {
                StageKind::ALL.into_iter().map(move |stage| SubtaskListing {
                    name: stream.task_name(stage),
                    description: stream.task_description(stage),
                    command: vec![stage.verb().to_string(), stream.name().to_string()],
                    domain_types: stream.domain_type_names(),
                })
            })
            .collect()
    }

    pub fn subtask_metas(&self) -> Vec<SubtaskMeta> {
        self.streams
            .iter()
            .flat_map(|stream| {
                StageKind::ALL.into_iter().map(move |stage| SubtaskMeta {
                    name: stream.task_name(stage),
                    entry_point_name: stage.verb().to_string(),
                    required: true,
                    enabled_by_default: true,
                    description: stream.task_description(stage),
                    domain_types: stream.domain_type_names(),
                    arguments: vec![stream.name().to_string()],
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for PluginDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDefinition")
            .field("identity", &self.identity)
            .field("plugin_path", &self.plugin_path)
            .field("streams", &self.streams)
            .field("api_endpoints", &self.api_endpoints)
            .finish()
    }
}

/// A plugin bound to one connection's configuration and storage.
pub struct SyncPlugin {
    definition: Arc<PluginDefinition>,
    config: Arc<PluginConfig>,
    runner: StagedPipelineRunner,
    raw_repo: Arc<dyn RawRecordRepository>,
    entity_repo: Arc<dyn EntityRepository>,
}

impl SyncPlugin {
    pub fn new(
        definition: Arc<PluginDefinition>,
        config: PluginConfig,
        runner: StagedPipelineRunner,
        raw_repo: Arc<dyn RawRecordRepository>,
        entity_repo: Arc<dyn EntityRepository>,
    ) -> Self {
        Self {
            definition,
            config: Arc::new(config),
            runner,
            raw_repo,
            entity_repo,
        }
    }

    pub fn definition(&self) -> &PluginDefinition {
        &self.definition
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub async fn run_stage(
        &self,
        stage: StageKind,
        stream: &str,
        cancel: &CancellationToken,
        progress: Option<ProgressSender>,
    ) -> Result<RunReport, DomainError> {
        match stage {
            StageKind::Collect => self.collect(stream, cancel, progress).await,
            StageKind::Extract => self.extract(stream, cancel, progress).await,
            StageKind::Convert => self.convert(stream, cancel, progress).await,
        }
    }

    pub async fn collect(
        &self,
        stream: &str,
        cancel: &CancellationToken,
        progress: Option<ProgressSender>,
    ) -> Result<RunReport, DomainError> {
        let stream = self.definition.stream(stream)?;
        let parent = stream
            .parent()
            .map(|name| self.definition.stream(name))
            .transpose()?;

        self.raw_repo.ensure_relation(stream.raw_table()).await?;
        if let Some(parent) = parent {
            self.entity_repo.ensure_relation(parent.tool_schema()).await?;
        }

        info!("Collecting {} for connection {}", stream.qualified_name(), self.config.connection_id());
        let collector = Collector::new(
            stream.clone(),
            parent,
            Arc::clone(&self.config),
            Arc::clone(&self.raw_repo),
            Arc::clone(&self.entity_repo),
        )?;
        self.runner
            .run(&collector, self.config.connection_id(), cancel, progress)
            .await
    }

    pub async fn extract(
        &self,
        stream: &str,
        cancel: &CancellationToken,
        progress: Option<ProgressSender>,
    ) -> Result<RunReport, DomainError> {
        let stream = self.definition.stream(stream)?;

        self.raw_repo.ensure_relation(stream.raw_table()).await?;
        self.entity_repo.ensure_relation(stream.tool_schema()).await?;

        info!("Extracting {} for connection {}", stream.qualified_name(), self.config.connection_id());
        let extractor = Extractor::new(
            stream.clone(),
            Arc::clone(&self.raw_repo),
            Arc::clone(&self.entity_repo),
        );
        self.runner
            .run(&extractor, self.config.connection_id(), cancel, progress)
            .await
    }

    pub async fn convert(
        &self,
        stream: &str,
        cancel: &CancellationToken,
        progress: Option<ProgressSender>,
    ) -> Result<RunReport, DomainError> {
        let stream = self.definition.stream(stream)?;

        self.entity_repo.ensure_relation(stream.tool_schema()).await?;
        for schema in stream.domain_schemas() {
            self.entity_repo.ensure_relation(schema).await?;
        }

        info!("Converting {} for connection {}", stream.qualified_name(), self.config.connection_id());
        let convertor = Convertor::new(stream.clone(), Arc::clone(&self.entity_repo));
        self.runner
            .run(&convertor, self.config.connection_id(), cancel, progress)
            .await
    }
}
