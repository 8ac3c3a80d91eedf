//! # Application Layer
//!
//! The staged pipeline runner, its three stage specializations, and the
//! plugin-level use cases that coordinate domain and connector layers.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
