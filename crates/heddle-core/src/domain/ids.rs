//! Strongly-typed identifiers.
//!
//! `Id<T>` wraps a ULID and uses a zero-sized marker type so that ids of
//! different kinds cannot be mixed up. ULIDs sort by creation time, so run
//! ids generated from the same clock order the same way records do.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for id kinds. Provides the `Display` prefix.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Marker for one recorded invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Run {}

impl IdMarker for Run {
    fn prefix() -> &'static str {
        "run-"
    }
}

/// Identifier of a `RunRecord`.
pub type RunId = Id<Run>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix() {
        let ulid = Ulid::new();
        let id = RunId::from_ulid(ulid);
        assert_eq!(id.to_string(), format!("run-{ulid}"));
        assert_eq!(id.as_ulid(), ulid);
    }

    #[test]
    fn serializes_as_bare_ulid() {
        let ulid = Ulid::new();
        let id: RunId = ulid.into();
        let s = serde_json::to_string(&id).unwrap();
        assert_eq!(s, format!("\"{ulid}\""));
        let back: RunId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn marker_adds_no_size() {
        assert_eq!(std::mem::size_of::<RunId>(), std::mem::size_of::<Ulid>());
    }
}
