//! Persisted vote records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Category, Origin, Timestamp};

/// Store-assigned surrogate key. Unique and strictly increasing in insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoteId(u64);

impl VoteId {
    /// First id handed out by an empty ledger.
    pub const FIRST: Self = Self(1);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for VoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single accepted vote. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: VoteId,
    pub category: Category,
    pub origin: Origin,
    /// Assigned by the store at insert time, never by the caller.
    pub submitted_at: Timestamp,
}
