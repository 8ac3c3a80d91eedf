use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::application::RegistryClient;
use crate::domain::{DomainError, RegistrationPayload};

const REGISTER_PATH: &str = "/plugins/register";

/// Posts the plugin descriptor to the host's registration endpoint.
pub struct HttpRegistryClient {
    client: reqwest::Client,
    url: String,
}

impl HttpRegistryClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let base: String = endpoint.into();
        let url = format!("{}{REGISTER_PATH}", base.trim_end_matches('/'));
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn register(&self, payload: &RegistrationPayload) -> Result<(), DomainError> {
        debug!("Registering plugin {} at {}", payload.name, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| DomainError::transport(format!("registration request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Registration endpoint returned {status}: {body}");
            return Err(DomainError::transport(format!(
                "plugin registration failed with status {status}"
            )));
        }

        Ok(())
    }
}
