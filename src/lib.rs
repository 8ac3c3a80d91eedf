pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use application::{
    ApiHandler, CollectContext, CollectStream, CollectedItem, EntityRepository, LedgerRepository,
    PluginDefinition, RawRecordRepository, RegisterPluginUseCase, RegistryClient, RunLocks, Stage,
    StagedPipelineRunner, Stream, StreamBehavior, SyncPlugin,
};

pub use cli::Commands;

pub use connector::{
    ci_fixture_plugin, Container, ContainerConfig, DuckdbEntityRepository, DuckdbLedgerRepository,
    DuckdbRawRecordRepository, DuckdbStorage, HttpRegistryClient, InMemoryLedgerRepository,
    OutputChannel, Router,
};

pub use domain::{
    DomainError, Entity, EntitySchema, FailurePolicy, FieldDef, FieldKind, LedgerEntry,
    PluginConfig, PluginIdentity, RemoteProgress, RunReport, RunStatus, StageKind, SyncState,
};
