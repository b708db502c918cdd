//! The accept/reject rule for a single vote attempt.

use std::sync::Arc;

use poll_store::LedgerStore;
use poll_types::{Category, Clock, Origin, Tally, Timestamp};

use crate::summary::TallySummary;
use crate::AdmissionError;

/// One vote per origin per minute.
pub const COOLDOWN_WINDOW_MS: u64 = 60_000;

/// Admits or rejects vote attempts against a ledger.
///
/// The eligibility check and the insert are two separate storage operations.
/// Two overlapping attempts from the same origin can both pass the check and
/// both be recorded; attempts that are strictly sequenced are always
/// rate-limited correctly.
pub struct AdmissionPolicy<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore> AdmissionPolicy<S> {
    /// `clock` must be the same clock the store stamps records with.
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate a raw category name, then [`submit`](Self::submit) it.
    pub fn submit_vote(&self, category: &str, origin: &Origin) -> Result<Tally, AdmissionError> {
        let category: Category = category
            .parse()
            .map_err(|_| AdmissionError::InvalidCategory(category.to_string()))?;
        self.submit(category, origin)
    }

    /// Record a vote for `category` unless `origin` voted within the last
    /// [`COOLDOWN_WINDOW_MS`]. Returns the freshly recomputed tally.
    pub fn submit(&self, category: Category, origin: &Origin) -> Result<Tally, AdmissionError> {
        let now = self.clock.now();

        if self
            .store
            .has_voted_recently(origin, now, COOLDOWN_WINDOW_MS)?
        {
            let retry_after_ms = self.retry_after(origin, now)?;
            return Err(AdmissionError::DuplicateVote {
                origin: origin.clone(),
                retry_after_ms,
            });
        }

        self.store.record_vote(category, origin)?;
        Ok(self.store.tally()?)
    }

    pub fn current_tally(&self) -> Result<Tally, AdmissionError> {
        Ok(self.store.tally()?)
    }

    /// Current tally reduced to percentages and a winner.
    pub fn summary(&self) -> Result<TallySummary, AdmissionError> {
        self.current_tally().map(TallySummary::from)
    }

    /// Milliseconds until `origin` becomes eligible again.
    fn retry_after(&self, origin: &Origin, now: Timestamp) -> Result<u64, AdmissionError> {
        let last = self.store.last_vote_at(origin)?;
        Ok(last.map_or(0, |last| {
            COOLDOWN_WINDOW_MS.saturating_sub(last.elapsed_since(now))
        }))
    }
}
