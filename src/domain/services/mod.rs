//! Pure functions shared by every stage.

mod domain_id;
mod naming;

pub use domain_id::*;
pub use naming::*;
