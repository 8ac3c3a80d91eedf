use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{stream, StreamExt, TryStreamExt};
use tracing::trace;

use crate::application::{EntityRepository, Stream};
use crate::domain::{derive_domain_id, DomainError, Entity, StageKind, SyncState};

use super::pipeline_runner::{FetchStream, Stage};

/// Maps every tool entity of a stream to zero or more domain entities.
pub struct Convertor {
    stream: Stream,
    entity_repo: Arc<dyn EntityRepository>,
}

impl Convertor {
    pub fn new(stream: Stream, entity_repo: Arc<dyn EntityRepository>) -> Self {
        Self {
            stream,
            entity_repo,
        }
    }
}

#[async_trait]
impl Stage for Convertor {
    type Item = Entity;

    fn task_name(&self) -> String {
        self.stream.task_name(StageKind::Convert)
    }

    fn fetch(&self, state: SyncState) -> FetchStream<Entity> {
        let entity_repo = Arc::clone(&self.entity_repo);
        let schema = self.stream.tool_schema().clone();

        stream::once(async move { entity_repo.scan(&schema).await })
            .map_ok(move |tools| {
                let state = state.clone();
                stream::iter(tools.into_iter().map(move |tool| Ok((tool, state.clone()))))
            })
            .try_flatten()
            .boxed()
    }

    async fn process(&self, tool: Entity) -> Result<(), DomainError> {
        let produced = self.stream.behavior().convert(&tool)?;

        for mut entity in produced {
            let schema = self.stream.domain_schema_for(entity.type_name())?;
            if schema.is_id_keyed() {
                let id = derive_domain_id(self.stream.plugin(), self.stream.tool_schema(), &tool);
                trace!("{} -> {}", entity.type_name(), id);
                entity.set("id", id);
            }
            let entity = schema.conform(entity)?;
            self.entity_repo.upsert(schema, &entity).await?;
        }

        Ok(())
    }
}
