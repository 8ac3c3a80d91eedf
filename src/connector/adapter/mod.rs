mod duckdb_entity_repository;
mod duckdb_ledger_repository;
mod duckdb_raw_record_repository;
mod duckdb_storage;
mod http_registry_client;
mod in_memory_ledger_repository;
pub mod ipc;
mod json_lines_source;

pub use duckdb_entity_repository::*;
pub use duckdb_ledger_repository::*;
pub use duckdb_raw_record_repository::*;
pub use duckdb_storage::DuckdbStorage;
pub use http_registry_client::*;
pub use in_memory_ledger_repository::*;
pub use ipc::*;
pub use json_lines_source::*;
