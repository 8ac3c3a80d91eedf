use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{stream, StreamExt, TryStreamExt};
use serde_json::{json, Map, Value};

use crate::application::{
    CollectContext, CollectedItem, EntityRepository, RawRecordRepository, Stream,
};
use crate::domain::{DomainError, Entity, EntitySchema, NewRawRecord, PluginConfig, StageKind, SyncState};

use super::pipeline_runner::{FetchStream, Stage};

/// One collected payload together with the parent it was collected for.
#[derive(Debug, Clone)]
pub struct CollectorItem {
    pub item: CollectedItem,
    pub parent: Option<Entity>,
}

/// Appends every collected payload to the stream's raw relation.
pub struct Collector {
    stream: Stream,
    parent_schema: Option<EntitySchema>,
    config: Arc<PluginConfig>,
    raw_repo: Arc<dyn RawRecordRepository>,
    entity_repo: Arc<dyn EntityRepository>,
}

impl Collector {
    /// `parent` must be the resolved parent stream when `stream` is a substream.
    pub fn new(
        stream: Stream,
        parent: Option<&Stream>,
        config: Arc<PluginConfig>,
        raw_repo: Arc<dyn RawRecordRepository>,
        entity_repo: Arc<dyn EntityRepository>,
    ) -> Result<Self, DomainError> {
        let parent_schema = match (stream.parent(), parent) {
            (None, _) => None,
            (Some(expected), Some(parent)) if parent.name() == expected => {
                Some(parent.tool_schema().clone())
            }
            (Some(expected), _) => return Err(DomainError::unknown_stream(expected)),
        };

        Ok(Self {
            stream,
            parent_schema,
            config,
            raw_repo,
            entity_repo,
        })
    }

    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    fn params_for(&self, parent: Option<&Entity>) -> Value {
        let mut params = Map::new();
        params.insert("connection_id".into(), json!(self.config.connection_id()));

        if let (Some(schema), Some(parent)) = (&self.parent_schema, parent) {
            for key in schema.primary_keys() {
                let value = parent.get(key.name()).cloned().unwrap_or(Value::Null);
                params.insert(key.name().to_string(), value);
            }
        }

        Value::Object(params)
    }
}

#[async_trait]
impl Stage for Collector {
    type Item = CollectorItem;

    fn task_name(&self) -> String {
        self.stream.task_name(StageKind::Collect)
    }

    fn fetch(&self, state: SyncState) -> FetchStream<CollectorItem> {
        let behavior = self.stream.behavior();
        let config = Arc::clone(&self.config);

        let Some(parent_schema) = self.parent_schema.clone() else {
            let ctx = CollectContext {
                config,
                parent: None,
            };
            return behavior
                .collect(ctx, state)
                .map_ok(|(item, next)| (CollectorItem { item, parent: None }, next))
                .boxed();
        };

        // One collection per persisted parent, in storage order.
        let entity_repo = Arc::clone(&self.entity_repo);
        stream::once(async move { entity_repo.scan(&parent_schema).await })
            .map_ok(move |parents| {
                let behavior = Arc::clone(&behavior);
                let config = Arc::clone(&config);
                let state = state.clone();
                stream::iter(parents)
                    .map(move |parent| {
                        let ctx = CollectContext {
                            config: Arc::clone(&config),
                            parent: Some(parent.clone()),
                        };
                        behavior.collect(ctx, state.clone()).map_ok(move |(item, next)| {
                            let item = CollectorItem {
                                item,
                                parent: Some(parent.clone()),
                            };
                            (item, next)
                        })
                    })
                    .flatten()
            })
            .try_flatten()
            .boxed()
    }

    async fn process(&self, collected: CollectorItem) -> Result<(), DomainError> {
        let CollectorItem { item, parent } = collected;

        let mut record = NewRawRecord::from_payload(&item.payload)?
            .with_params(&self.params_for(parent.as_ref()));
        if let Some(url) = item.url {
            record = record.with_url(url);
        }
        if let Some(parent) = &parent {
            record = record.with_input(serde_json::to_vec(&parent.to_json())?);
        }

        self.raw_repo.append(self.stream.raw_table(), &record).await?;
        Ok(())
    }
}
