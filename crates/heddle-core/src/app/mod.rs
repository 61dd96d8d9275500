//! Application layer: execution, dependency resolution and batch scheduling.

pub mod builder;
pub mod executor;
pub mod resolver;
pub mod scheduler;

pub use self::builder::SchedulerBuilder;
pub use self::executor::RetryExecutor;
pub use self::resolver::{DependencyResolver, Resolution};
pub use self::scheduler::{BatchReport, BatchScheduler};
