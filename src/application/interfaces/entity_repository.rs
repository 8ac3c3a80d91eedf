use async_trait::async_trait;

use crate::domain::{DomainError, Entity, EntitySchema};

/// Storage for tool and domain relations, keyed by each schema's primary key.
#[async_trait]
pub trait EntityRepository: Send + Sync {
    async fn ensure_relation(&self, schema: &EntitySchema) -> Result<(), DomainError>;

    /// Insert or replace by primary key.
    async fn upsert(&self, schema: &EntitySchema, entity: &Entity) -> Result<(), DomainError>;

    /// Full scan in storage iteration order.
    async fn scan(&self, schema: &EntitySchema) -> Result<Vec<Entity>, DomainError>;

    async fn count(&self, schema: &EntitySchema) -> Result<u64, DomainError>;
}
