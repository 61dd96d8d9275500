//! Run id generation.

use ulid::Ulid;

use crate::domain::RunId;
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_run_id(&self) -> RunId;
}

/// ULID generator whose timestamp part comes from the injected clock, so a
/// `FixedClock` yields ids with a predictable time component.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_run_id(&self) -> RunId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        RunId::from_ulid(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
