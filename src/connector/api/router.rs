use anyhow::{anyhow, Result};

use crate::domain::StageKind;
use crate::Commands;

use super::container::Container;
use super::controller::{
    CallController, ListSubtasksController, PluginInfoController, StageController,
    StartupController,
};

pub struct Router<'a> {
    stage_controller: StageController<'a>,
    list_subtasks_controller: ListSubtasksController<'a>,
    startup_controller: StartupController<'a>,
    plugin_info_controller: PluginInfoController<'a>,
    call_controller: CallController<'a>,
}

impl<'a> Router<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            stage_controller: StageController::new(container),
            list_subtasks_controller: ListSubtasksController::new(container),
            startup_controller: StartupController::new(container),
            plugin_info_controller: PluginInfoController::new(container),
            call_controller: CallController::new(container),
        }
    }

    pub async fn route(&self, command: Commands) -> Result<String> {
        match command {
            Commands::Startup { endpoint } => self.startup_controller.startup(endpoint).await,
            Commands::Collect { ctx, stream } => {
                self.stage_controller
                    .run(StageKind::Collect, ctx, stream)
                    .await
            }
            Commands::Extract { ctx, stream } => {
                self.stage_controller
                    .run(StageKind::Extract, ctx, stream)
                    .await
            }
            Commands::Convert { ctx, stream } => {
                self.stage_controller
                    .run(StageKind::Convert, ctx, stream)
                    .await
            }
            Commands::ListSubtasks => self.list_subtasks_controller.list().await,
            Commands::PluginInfo => self.plugin_info_controller.info().await,
            Commands::Call {
                handler,
                ctx,
                input,
            } => self.call_controller.call(handler, ctx, input).await,
            Commands::Handler(args) => {
                let mut args = args.into_iter();
                let handler = args.next().ok_or_else(|| anyhow!("missing handler name"))?;
                let ctx = args.next().unwrap_or_else(|| "{}".to_string());
                let input = args.next().unwrap_or_else(|| "{}".to_string());
                self.call_controller.call(handler, ctx, input).await
            }
        }
    }
}
