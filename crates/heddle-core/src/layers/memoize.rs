use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::{TaskArgs, TaskOutput};
use crate::error::TaskError;
use crate::handler::TaskFn;

struct Entry {
    output: TaskOutput,
    stored_at: Instant,
}

/// Caches successful outputs keyed by the serialized arguments.
///
/// Object keys serialize in sorted order, so two argument values that compare
/// equal share a cache entry. Errors are never cached. With a TTL, expired
/// entries are pruned on every insert; without one the cache grows with the
/// number of distinct arguments.
///
/// The lock is not held while the inner task runs; two concurrent misses for
/// the same key both invoke the task and the later result wins.
pub struct Memoized<T> {
    inner: T,
    ttl: Option<Duration>,
    cache: Mutex<HashMap<String, Entry>>,
}

impl<T> Memoized<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            ttl: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ttl(inner: T, ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new(inner)
        }
    }

    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.lock().await.len()
    }

    fn is_fresh(&self, entry: &Entry) -> bool {
        match self.ttl {
            Some(ttl) => entry.stored_at.elapsed() < ttl,
            None => true,
        }
    }
}

#[async_trait]
impl<T: TaskFn> TaskFn for Memoized<T> {
    async fn invoke(&self, args: &TaskArgs) -> Result<TaskOutput, TaskError> {
        let key = args.to_string();

        {
            let mut cache = self.cache.lock().await;
            let hit = cache
                .get(&key)
                .filter(|entry| self.is_fresh(entry))
                .map(|entry| entry.output.clone());
            if let Some(output) = hit {
                tracing::trace!(key = %key, "memoized hit");
                return Ok(output);
            }
            // stale or missing
            cache.remove(&key);
        }

        let output = self.inner.invoke(args).await?;
        let mut cache = self.cache.lock().await;
        if self.ttl.is_some() {
            cache.retain(|_, entry| self.is_fresh(entry));
        }
        cache.insert(
            key,
            Entry {
                output: output.clone(),
                stored_at: Instant::now(),
            },
        );
        Ok(output)
    }
}
