use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{stream, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::application::{EntityRepository, RawRecordRepository, Stream};
use crate::domain::{DomainError, StageKind, SyncState};

use super::pipeline_runner::{FetchStream, Stage};

/// Re-reads the whole raw relation and upserts one tool entity per row.
///
/// Raw rows are never modified, so extraction can be repeated at will; the
/// state passes through unchanged.
pub struct Extractor {
    stream: Stream,
    raw_repo: Arc<dyn RawRecordRepository>,
    entity_repo: Arc<dyn EntityRepository>,
}

impl Extractor {
    pub fn new(
        stream: Stream,
        raw_repo: Arc<dyn RawRecordRepository>,
        entity_repo: Arc<dyn EntityRepository>,
    ) -> Self {
        Self {
            stream,
            raw_repo,
            entity_repo,
        }
    }
}

#[async_trait]
impl Stage for Extractor {
    type Item = Value;

    fn task_name(&self) -> String {
        self.stream.task_name(StageKind::Extract)
    }

    fn fetch(&self, state: SyncState) -> FetchStream<Value> {
        let raw_repo = Arc::clone(&self.raw_repo);
        let table = self.stream.raw_table().to_string();

        stream::once(async move { raw_repo.scan(&table).await })
            .map_ok(move |rows| {
                let state = state.clone();
                stream::iter(
                    rows.into_iter()
                        .map(move |row| row.payload().map(|payload| (payload, state.clone()))),
                )
            })
            .try_flatten()
            .boxed()
    }

    async fn process(&self, payload: Value) -> Result<(), DomainError> {
        let schema = self.stream.tool_schema();
        let entity = self.stream.behavior().extract(schema, &payload)?;
        let entity = schema.conform(entity)?;
        self.entity_repo.upsert(schema, &entity).await
    }
}
