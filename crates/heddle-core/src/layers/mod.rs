//! Wrappers that add behaviour around a `TaskFn`.
//!
//! Each wrapper is itself a `TaskFn`, so they stack:
//!
//! ```ignore
//! let fetch = task_fn(fetch_url).memoized_for(Duration::from_secs(60)).timed();
//! registry.register("fetch", Arc::new(fetch), 3, Vec::<TaskName>::new())?;
//! ```

mod counter;
mod memoize;
mod timed;

use std::time::Duration;

use crate::handler::TaskFn;

pub use counter::CallCounter;
pub use memoize::Memoized;
pub use timed::Timed;

pub trait TaskFnExt: TaskFn + Sized {
    /// Cache successful outputs per argument value, forever.
    fn memoized(self) -> Memoized<Self> {
        Memoized::new(self)
    }

    /// Cache successful outputs per argument value for `ttl`.
    fn memoized_for(self, ttl: Duration) -> Memoized<Self> {
        Memoized::with_ttl(self, ttl)
    }

    fn counted(self) -> CallCounter<Self> {
        CallCounter::new(self)
    }

    fn timed(self) -> Timed<Self> {
        Timed::new(self)
    }
}

impl<T: TaskFn + Sized> TaskFnExt for T {}
