mod collector;
mod convertor;
mod extractor;
mod pipeline_runner;
mod register_plugin;
mod sync_plugin;

pub use collector::*;
pub use convertor::*;
pub use extractor::*;
pub use pipeline_runner::*;
pub use register_plugin::*;
pub use sync_plugin::*;
