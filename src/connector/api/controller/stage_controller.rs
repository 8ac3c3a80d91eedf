use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use crate::connector::adapter::StageRequest;
use crate::domain::{RunReport, RunStatus, StageKind};

use super::super::Container;

/// `collect|extract|convert <ctx> <stream>`: runs one stage and streams its
/// progress records to the output channel as they happen.
pub struct StageController<'a> {
    container: &'a Container,
}

impl<'a> StageController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn run(&self, stage: StageKind, ctx: String, stream: String) -> Result<String> {
        let request = StageRequest::decode(stage, &ctx, &stream)?;
        let plugin = self.container.sync_plugin(request.config).await?;
        let mut channel = self.container.output_channel().await?;
        let cancel = self.container.cancellation_token();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (stage, stream) = (request.stage, request.stream);
        // Storage calls block, so the run gets its own task and the channel
        // is written as each record arrives.
        let run = tokio::spawn(async move {
            plugin.run_stage(stage, &stream, &cancel, Some(tx)).await
        });

        let mut sent = Ok(());
        while let Some(progress) = rx.recv().await {
            if sent.is_ok() {
                sent = channel.send(&progress).await;
            }
        }

        let report = run.await??;
        sent?;

        info!("{} finished with status {:?}", report.task_name, report.status);
        Ok(self.format_report(&report))
    }

    fn format_report(&self, report: &RunReport) -> String {
        let status = match &report.status {
            RunStatus::Completed => "completed".to_string(),
            RunStatus::Cancelled => "cancelled".to_string(),
            RunStatus::Failed(reason) => format!("failed: {}", reason),
        };
        format!(
            "{} {} ({} items, {} checkpoints, ledger entry {})",
            report.task_name, status, report.items, report.checkpoints, report.ledger_id
        )
    }
}
