use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::LedgerRepository;
use crate::domain::{
    DomainError, FailurePolicy, RemoteProgress, RunReport, RunStatus, SyncState,
    DEFAULT_CHECKPOINT_INTERVAL,
};

/// Lazy `(item, next_state)` sequence produced by [`Stage::fetch`].
pub type FetchStream<T> = BoxStream<'static, Result<(T, SyncState), DomainError>>;

/// Receives one [`RemoteProgress`] per processed item and one on completion.
pub type ProgressSender = mpsc::UnboundedSender<RemoteProgress>;

/// The two extension points of a resumable run.
#[async_trait]
pub trait Stage: Send + Sync {
    type Item: Send + 'static;

    /// Ledger key; unique per (plugin, stream, stage).
    fn task_name(&self) -> String;

    /// Produce items starting from the last completed state.
    fn fetch(&self, state: SyncState) -> FetchStream<Self::Item>;

    async fn process(&self, item: Self::Item) -> Result<(), DomainError>;
}

/// In-process single-flight registry keyed by (task name, connection id).
#[derive(Debug, Default)]
pub struct RunLocks {
    active: Mutex<HashSet<(String, u64)>>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(
        self: &Arc<Self>,
        task_name: &str,
        connection_id: u64,
    ) -> Result<RunGuard, DomainError> {
        let key = (task_name.to_string(), connection_id);
        if !self.active_set().insert(key.clone()) {
            return Err(DomainError::already_running(format!(
                "{} for connection {}",
                task_name, connection_id
            )));
        }
        Ok(RunGuard {
            locks: Arc::clone(self),
            key,
        })
    }

    pub fn is_running(&self, task_name: &str, connection_id: u64) -> bool {
        self.active_set()
            .contains(&(task_name.to_string(), connection_id))
    }

    fn active_set(&self) -> MutexGuard<'_, HashSet<(String, u64)>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its key when dropped.
#[derive(Debug)]
pub struct RunGuard {
    locks: Arc<RunLocks>,
    key: (String, u64),
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.locks.active_set().remove(&self.key);
    }
}

/// Generic resumable run loop shared by collect, extract and convert.
///
/// Every run opens a fresh ledger entry, resumes from the state of the most
/// recently completed entry, checkpoints `next_state` before processing every
/// `checkpoint_interval`-th item, and stamps completion only once the fetch
/// sequence is exhausted.
#[derive(Clone)]
pub struct StagedPipelineRunner {
    ledger: Arc<dyn LedgerRepository>,
    locks: Arc<RunLocks>,
    checkpoint_interval: usize,
    failure_policy: FailurePolicy,
}

impl StagedPipelineRunner {
    pub fn new(ledger: Arc<dyn LedgerRepository>) -> Self {
        Self {
            ledger,
            locks: Arc::new(RunLocks::new()),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_checkpoint_interval(mut self, interval: usize) -> Result<Self, DomainError> {
        if interval == 0 {
            return Err(DomainError::config("checkpoint interval must be at least 1"));
        }
        self.checkpoint_interval = interval;
        Ok(self)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Share a single-flight registry between runners.
    pub fn with_locks(mut self, locks: Arc<RunLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn ledger(&self) -> Arc<dyn LedgerRepository> {
        Arc::clone(&self.ledger)
    }

    pub fn checkpoint_interval(&self) -> usize {
        self.checkpoint_interval
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub async fn run<S>(
        &self,
        stage: &S,
        connection_id: u64,
        cancel: &CancellationToken,
        progress: Option<ProgressSender>,
    ) -> Result<RunReport, DomainError>
    where
        S: Stage + ?Sized,
    {
        let task_name = stage.task_name();
        let _guard = self.locks.try_acquire(&task_name, connection_id)?;

        let entry = self.ledger.start(&task_name, connection_id).await?;
        let state = self
            .ledger
            .last_completed(&task_name, connection_id)
            .await?
            .map(|last| last.state().clone())
            .unwrap_or_default();

        debug!(
            "Starting {} (ledger entry {}) for connection {} from state {:?}",
            task_name,
            entry.id(),
            connection_id,
            state
        );

        let mut report = RunReport {
            ledger_id: entry.id(),
            task_name: task_name.clone(),
            items: 0,
            checkpoints: 0,
            status: RunStatus::Completed,
        };

        match self
            .iterate(stage, entry.id(), state, cancel, progress.as_ref(), &mut report)
            .await
        {
            Ok(Some(final_state)) => {
                self.ledger.complete(entry.id(), &final_state).await?;
                if let Some(tx) = &progress {
                    let _ = tx.send(RemoteProgress::absolute(report.items, report.items));
                }
                info!(
                    "{} completed: {} items, {} checkpoints",
                    task_name, report.items, report.checkpoints
                );
                Ok(report)
            }
            Ok(None) => {
                warn!(
                    "{} cancelled after {} items; ledger entry {} left incomplete",
                    task_name,
                    report.items,
                    entry.id()
                );
                report.status = RunStatus::Cancelled;
                Ok(report)
            }
            Err(e) => self.fail(report, e),
        }
    }

    /// Returns the final state, or `None` if cancelled.
    async fn iterate<S>(
        &self,
        stage: &S,
        ledger_id: i64,
        state: SyncState,
        cancel: &CancellationToken,
        progress: Option<&ProgressSender>,
        report: &mut RunReport,
    ) -> Result<Option<SyncState>, DomainError>
    where
        S: Stage + ?Sized,
    {
        let interval = self.checkpoint_interval as u64;
        let mut current = state.clone();
        let mut items = stage.fetch(state);
        let mut position: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(None),
                next = items.next() => next,
            };
            let Some(next) = next else {
                break;
            };
            let (item, next_state) = next?;

            if position % interval == 0 {
                self.ledger.checkpoint(ledger_id, &next_state).await?;
                report.checkpoints += 1;
                debug!("Checkpoint at position {} for ledger entry {}", position, ledger_id);
            }

            stage.process(item).await?;

            current = next_state;
            position += 1;
            report.items = position;
            if let Some(tx) = progress {
                let _ = tx.send(RemoteProgress::increment(1));
            }
        }

        Ok(Some(current))
    }

    fn fail(&self, mut report: RunReport, err: DomainError) -> Result<RunReport, DomainError> {
        let message = err.to_string();
        error!(
            "{} failed after {} items (ledger entry {} left incomplete): {}",
            report.task_name, report.items, report.ledger_id, message
        );
        match self.failure_policy {
            FailurePolicy::Propagate => {
                Err(DomainError::stage_execution(report.task_name, message))
            }
            FailurePolicy::LogAndReturn => {
                report.status = RunStatus::Failed(message);
                Ok(report)
            }
        }
    }
}
