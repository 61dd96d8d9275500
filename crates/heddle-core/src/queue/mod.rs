//! Queue module: pending invocations and retry timing.

mod execution;
mod item;
mod retry;

pub use execution::ExecutionQueue;
pub use item::QueueItem;
pub use retry::RetryPolicy;
