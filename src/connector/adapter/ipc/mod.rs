//! Process-boundary plumbing for the host control protocol.

mod invocation;
mod output_channel;
mod signals;

pub use invocation::*;
pub use output_channel::*;
pub use signals::*;
