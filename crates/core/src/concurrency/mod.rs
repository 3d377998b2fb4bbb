//! Fixed-size worker pool and the fork-join latch used by index searches.

mod latch;
mod pool;

pub use latch::CompletionLatch;
pub use pool::{Scope, WorkerPool};
