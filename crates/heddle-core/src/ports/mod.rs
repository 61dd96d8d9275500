//! Ports: dependencies the host may inject.
//!
//! Defaults are `SystemClock` and `UlidGenerator<SystemClock>`; tests swap in
//! `FixedClock` for deterministic timestamps.

pub mod clock;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
