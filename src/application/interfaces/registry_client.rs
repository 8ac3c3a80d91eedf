use async_trait::async_trait;

use crate::domain::{DomainError, RegistrationPayload};

/// The host's plugin registration endpoint.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Send the descriptor once. Any non-success answer is a transport error.
    async fn register(&self, payload: &RegistrationPayload) -> Result<(), DomainError>;
}
