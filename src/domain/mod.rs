//! # Domain Layer
//!
//! Entity catalog, ledger and protocol models, and the pure functions the
//! pipeline relies on (domain-ID derivation, task naming).
//! This layer is independent of storage engines and transports.

mod error;
pub mod catalog;
pub mod models;
pub mod services;

pub use error::*;
pub use models::*;
pub use services::*;
