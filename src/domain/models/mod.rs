mod config;
mod entity;
mod ledger;
mod protocol;
mod raw_record;
mod stage;

pub use config::*;
pub use entity::*;
pub use ledger::*;
pub use protocol::*;
pub use raw_record::*;
pub use stage::*;
