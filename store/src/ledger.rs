//! Vote ledger storage trait.

use poll_types::{Category, Origin, Tally, Timestamp, VoteId, VoteRecord};

use crate::StoreError;

/// Durable, append-only table of accepted votes.
///
/// Records are keyed by a store-assigned [`VoteId`] and indexed by
/// `(origin, submitted_at)` so the per-origin cooldown check is a range scan
/// rather than a table scan. There is no update or delete.
///
/// Every method is individually atomic and reads the committed state at call
/// time. A check followed by an insert is two operations, not one.
pub trait LedgerStore {
    /// Append one vote. The store assigns the id and stamps `submitted_at`
    /// from its own clock.
    fn record_vote(&self, category: Category, origin: &Origin) -> Result<VoteRecord, StoreError>;

    /// True iff `origin` has a record with `submitted_at > now - window_ms`.
    ///
    /// The comparison is strict: a vote exactly `window_ms` old no longer counts.
    fn has_voted_recently(
        &self,
        origin: &Origin,
        now: Timestamp,
        window_ms: u64,
    ) -> Result<bool, StoreError>;

    /// Newest `submitted_at` recorded for `origin`, if any.
    fn last_vote_at(&self, origin: &Origin) -> Result<Option<Timestamp>, StoreError>;

    /// Count every record per category. Categories without votes report 0.
    fn tally(&self) -> Result<Tally, StoreError>;

    /// Look up a single record.
    fn get_vote(&self, id: VoteId) -> Result<VoteRecord, StoreError>;

    /// Total number of records.
    fn vote_count(&self) -> Result<u64, StoreError> {
        self.tally().map(|t| t.total())
    }
}

impl<S: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<S> {
    fn record_vote(&self, category: Category, origin: &Origin) -> Result<VoteRecord, StoreError> {
        (**self).record_vote(category, origin)
    }

    fn has_voted_recently(
        &self,
        origin: &Origin,
        now: Timestamp,
        window_ms: u64,
    ) -> Result<bool, StoreError> {
        (**self).has_voted_recently(origin, now, window_ms)
    }

    fn last_vote_at(&self, origin: &Origin) -> Result<Option<Timestamp>, StoreError> {
        (**self).last_vote_at(origin)
    }

    fn tally(&self) -> Result<Tally, StoreError> {
        (**self).tally()
    }

    fn get_vote(&self, id: VoteId) -> Result<VoteRecord, StoreError> {
        (**self).get_vote(id)
    }

    fn vote_count(&self) -> Result<u64, StoreError> {
        (**self).vote_count()
    }
}
