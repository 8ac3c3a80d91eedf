//! Plugins shipped with the binary.

mod ci_fixture;

pub use ci_fixture::*;
