//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Storage (DuckDB for the ledger, raw and entity relations)
//! - Host control protocol (registration client, output channel, signals)
//! - The shipped plugins and the command surface that drives them

pub mod adapter;
pub mod api;
pub mod plugins;

pub use adapter::*;
pub use api::*;
pub use plugins::*;
