//! Shared domain-layer entity types that every plugin converts into.

pub mod devops;
