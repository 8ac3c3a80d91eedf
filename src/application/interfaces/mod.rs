mod api_handler;
mod entity_repository;
mod ledger_repository;
mod raw_record_repository;
mod registry_client;
mod stream;

pub use api_handler::*;
pub use entity_repository::*;
pub use ledger_repository::*;
pub use raw_record_repository::*;
pub use registry_client::*;
pub use stream::*;
