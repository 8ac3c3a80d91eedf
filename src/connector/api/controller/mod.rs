pub mod call_controller;
pub mod list_subtasks_controller;
pub mod plugin_info_controller;
pub mod stage_controller;
pub mod startup_controller;

pub use call_controller::CallController;
pub use list_subtasks_controller::ListSubtasksController;
pub use plugin_info_controller::PluginInfoController;
pub use stage_controller::StageController;
pub use startup_controller::StartupController;
