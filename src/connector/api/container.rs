use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::application::{
    PluginDefinition, RegisterPluginUseCase, RunLocks, StagedPipelineRunner, SyncPlugin,
};
use crate::connector::adapter::{
    DuckdbEntityRepository, DuckdbLedgerRepository, DuckdbRawRecordRepository, DuckdbStorage,
    HttpRegistryClient, OutputChannel,
};
use crate::domain::{DomainError, FailurePolicy, PluginConfig, DEFAULT_CHECKPOINT_INTERVAL};

pub struct ContainerConfig {
    /// Where NDJSON results go; the host opens fd 3 for this.
    pub output_channel: PathBuf,
    pub checkpoint_interval: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            output_channel: PathBuf::from(crate::connector::adapter::DEFAULT_OUTPUT_CHANNEL),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Composition root for one plugin process.
///
/// Descriptor operations need nothing but the definition; storage is only
/// opened when a stage runs, using the `db_url` of that invocation.
pub struct Container {
    definition: Arc<PluginDefinition>,
    locks: Arc<RunLocks>,
    cancel: CancellationToken,
    config: ContainerConfig,
}

impl Container {
    pub fn new(definition: PluginDefinition, config: ContainerConfig) -> Result<Self> {
        if config.checkpoint_interval == 0 {
            return Err(DomainError::config("checkpoint interval must be at least 1").into());
        }

        Ok(Self {
            definition: Arc::new(definition),
            locks: Arc::new(RunLocks::new()),
            cancel: CancellationToken::new(),
            config,
        })
    }

    pub fn definition(&self) -> Arc<PluginDefinition> {
        Arc::clone(&self.definition)
    }

    /// Token cancelled by SIGTERM/SIGINT; shared by every run of this process.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn sync_plugin(&self, config: PluginConfig) -> Result<SyncPlugin> {
        let storage = DuckdbStorage::open(config.storage())?;
        debug!("Opened storage {:?} for connection {}", config.storage(), config.connection_id());

        let ledger = Arc::new(DuckdbLedgerRepository::new(&storage).await?);
        let raw_repo = Arc::new(DuckdbRawRecordRepository::new(&storage));
        let entity_repo = Arc::new(DuckdbEntityRepository::new(&storage));

        let runner = StagedPipelineRunner::new(ledger)
            .with_checkpoint_interval(self.config.checkpoint_interval)?
            .with_failure_policy(self.config.failure_policy)
            .with_locks(Arc::clone(&self.locks));

        Ok(SyncPlugin::new(
            self.definition(),
            config,
            runner,
            raw_repo,
            entity_repo,
        ))
    }

    pub fn register_use_case(&self, endpoint: &str) -> RegisterPluginUseCase {
        RegisterPluginUseCase::new(Arc::new(HttpRegistryClient::new(endpoint)))
    }

    pub async fn output_channel(&self) -> Result<OutputChannel> {
        Ok(OutputChannel::open(&self.config.output_channel).await?)
    }

    pub fn checkpoint_interval(&self) -> usize {
        self.config.checkpoint_interval
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.config.failure_policy
    }
}
