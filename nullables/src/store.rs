//! Thread-safe in-memory ledger for tests.

use poll_store::{LedgerStore, StoreError};
use poll_types::{Category, Clock, Origin, Tally, Timestamp, VoteId, VoteRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// An in-memory vote ledger for testing.
///
/// Records are kept in insertion order; lookups are linear scans. Call
/// [`NullLedgerStore::set_unavailable`] to make every operation fail with
/// [`StoreError::Unavailable`].
pub struct NullLedgerStore {
    votes: Mutex<Vec<VoteRecord>>,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
}

impl NullLedgerStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            votes: Mutex::new(Vec::new()),
            clock,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate the backing storage going away (or coming back).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of every record, oldest first.
    pub fn records(&self) -> Vec<VoteRecord> {
        self.votes.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("null store switched off".to_string()));
        }
        Ok(())
    }
}

impl LedgerStore for NullLedgerStore {
    fn record_vote(&self, category: Category, origin: &Origin) -> Result<VoteRecord, StoreError> {
        self.check_available()?;
        let mut votes = self.votes.lock().unwrap();
        let id = votes.last().map_or(VoteId::FIRST, |r| r.id.next());
        let record = VoteRecord {
            id,
            category,
            origin: origin.clone(),
            submitted_at: self.clock.now(),
        };
        votes.push(record.clone());
        Ok(record)
    }

    fn has_voted_recently(
        &self,
        origin: &Origin,
        now: Timestamp,
        window_ms: u64,
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self
            .votes
            .lock()
            .unwrap()
            .iter()
            .any(|r| &r.origin == origin && r.submitted_at.is_within(window_ms, now)))
    }

    fn last_vote_at(&self, origin: &Origin) -> Result<Option<Timestamp>, StoreError> {
        self.check_available()?;
        Ok(self
            .votes
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.origin == origin)
            .map(|r| r.submitted_at)
            .max())
    }

    fn tally(&self) -> Result<Tally, StoreError> {
        self.check_available()?;
        Ok(self.votes.lock().unwrap().iter().map(|r| r.category).collect())
    }

    fn get_vote(&self, id: VoteId) -> Result<VoteRecord, StoreError> {
        self.check_available()?;
        self.votes
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("vote {id}")))
    }
}
