use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::{ApiParamsInput, ApiParamsOutput, DomainError};

/// A plugin-provided handler behind one declared API endpoint.
#[async_trait]
pub trait ApiHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &Map<String, Value>,
        input: ApiParamsInput,
    ) -> Result<ApiParamsOutput, DomainError>;
}
