//! LMDB implementation of LedgerStore.
//!
//! Two databases:
//! - `votes`: key `id_be_u64(8)` → bincode [`VoteRecord`]. Big-endian ids sort
//!   in insertion order, so the last key is the highest id handed out.
//! - `votes_by_origin`: key `blake2b_256(origin)(32) ++ submitted_at_be_u64(8)
//!   ++ id_be_u64(8)` → empty. Origins are unbounded client input while LMDB
//!   keys are capped at 511 bytes, so the index holds a fixed-width digest and
//!   the full origin lives only in the record. The big-endian timestamp makes
//!   the cooldown check a single range scan within one origin's key space.
//!
//! A record and its index entry are written in the same write transaction.

use std::ops::Bound;
use std::sync::Arc;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use heed::types::Bytes;
use heed::{Database, Env};

use poll_store::{LedgerStore, StoreError};
use poll_types::{Category, Clock, Origin, Tally, Timestamp, VoteId, VoteRecord};

use crate::{LmdbEnvironment, LmdbError};

type Blake2b256 = Blake2b<U32>;

const ORIGIN_DIGEST_LEN: usize = 32;
pub(crate) const INDEX_KEY_LEN: usize = ORIGIN_DIGEST_LEN + 8 + 8;

pub struct LmdbLedgerStore {
    pub(crate) env: Arc<Env>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    pub(crate) votes_by_origin_db: Database<Bytes, Bytes>,
    pub(crate) clock: Arc<dyn Clock>,
}

/// Fixed-width stand-in for `origin` inside index keys.
fn origin_digest(origin: &Origin) -> [u8; ORIGIN_DIGEST_LEN] {
    let mut hasher = Blake2b256::new();
    hasher.update(origin.as_str().as_bytes());
    let mut digest = [0u8; ORIGIN_DIGEST_LEN];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

fn index_key(
    digest: &[u8; ORIGIN_DIGEST_LEN],
    submitted_at: Timestamp,
    id: VoteId,
) -> [u8; INDEX_KEY_LEN] {
    let mut key = [0u8; INDEX_KEY_LEN];
    key[..ORIGIN_DIGEST_LEN].copy_from_slice(digest);
    key[ORIGIN_DIGEST_LEN..ORIGIN_DIGEST_LEN + 8]
        .copy_from_slice(&submitted_at.as_millis().to_be_bytes());
    key[ORIGIN_DIGEST_LEN + 8..].copy_from_slice(&id.as_u64().to_be_bytes());
    key
}

/// Build the composite index key `digest ++ submitted_at_be ++ id_be`.
pub(crate) fn origin_index_key(
    origin: &Origin,
    submitted_at: Timestamp,
    id: VoteId,
) -> [u8; INDEX_KEY_LEN] {
    index_key(&origin_digest(origin), submitted_at, id)
}

fn submitted_at_from_key(key: &[u8]) -> Result<Timestamp, LmdbError> {
    let raw: [u8; 8] = key
        .get(ORIGIN_DIGEST_LEN..ORIGIN_DIGEST_LEN + 8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| LmdbError::Serialization("truncated origin index key".to_string()))?;
    Ok(Timestamp::new(u64::from_be_bytes(raw)))
}

fn id_key(id: VoteId) -> [u8; 8] {
    id.as_u64().to_be_bytes()
}

fn id_from_key(key: &[u8]) -> Result<VoteId, LmdbError> {
    let raw: [u8; 8] = key
        .try_into()
        .map_err(|_| LmdbError::Serialization("vote key is not 8 bytes".to_string()))?;
    Ok(VoteId::new(u64::from_be_bytes(raw)))
}

/// Drop every origin index entry and re-derive the index from `votes`.
///
/// Runs in one write transaction. Returns the number of entries written.
pub(crate) fn rebuild_origin_index(environment: &LmdbEnvironment) -> Result<u64, LmdbError> {
    let mut wtxn = environment.env().write_txn()?;

    let mut keys = Vec::new();
    for entry in environment.votes_db.iter(&wtxn)? {
        let (_, value) = entry?;
        let record: VoteRecord = bincode::deserialize(value)?;
        keys.push(origin_index_key(&record.origin, record.submitted_at, record.id));
    }

    environment.votes_by_origin_db.clear(&mut wtxn)?;
    for key in &keys {
        environment.votes_by_origin_db.put(&mut wtxn, key, &[])?;
    }
    wtxn.commit()?;
    Ok(keys.len() as u64)
}

impl LedgerStore for LmdbLedgerStore {
    fn record_vote(&self, category: Category, origin: &Origin) -> Result<VoteRecord, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        // LMDB allows one writer at a time, so reading the last key inside the
        // write transaction yields a unique, increasing id.
        let id = match self.votes_db.last(&wtxn).map_err(LmdbError::from)? {
            Some((key, _)) => id_from_key(key)?.next(),
            None => VoteId::FIRST,
        };

        let record = VoteRecord {
            id,
            category,
            origin: origin.clone(),
            submitted_at: self.clock.now(),
        };
        let bytes = bincode::serialize(&record).map_err(LmdbError::from)?;

        self.votes_db
            .put(&mut wtxn, &id_key(id), &bytes)
            .map_err(LmdbError::from)?;
        let entry_key = origin_index_key(origin, record.submitted_at, id);
        self.votes_by_origin_db
            .put(&mut wtxn, &entry_key, &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;

        tracing::trace!(id = %record.id, category = %category, origin = %origin, "vote recorded");
        Ok(record)
    }

    fn has_voted_recently(
        &self,
        origin: &Origin,
        now: Timestamp,
        window_ms: u64,
    ) -> Result<bool, StoreError> {
        let digest = origin_digest(origin);
        let lower = index_key(&digest, now.window_start(window_ms), VoteId::new(0));
        let upper = index_key(&digest, Timestamp::new(u64::MAX), VoteId::new(u64::MAX));
        let bounds = (
            Bound::Included(lower.as_slice()),
            Bound::Included(upper.as_slice()),
        );

        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut iter = self
            .votes_by_origin_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;
        match iter.next() {
            Some(entry) => {
                entry.map_err(LmdbError::from)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn last_vote_at(&self, origin: &Origin) -> Result<Option<Timestamp>, StoreError> {
        let digest = origin_digest(origin);
        let lower = index_key(&digest, Timestamp::EPOCH, VoteId::new(0));
        let upper = index_key(&digest, Timestamp::new(u64::MAX), VoteId::new(u64::MAX));
        let bounds = (
            Bound::Included(lower.as_slice()),
            Bound::Included(upper.as_slice()),
        );

        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut iter = self
            .votes_by_origin_db
            .rev_range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;
        match iter.next() {
            Some(entry) => {
                let (key, _) = entry.map_err(LmdbError::from)?;
                Ok(Some(submitted_at_from_key(key)?))
            }
            None => Ok(None),
        }
    }

    fn tally(&self) -> Result<Tally, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.votes_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut tally = Tally::default();
        for entry in iter {
            let (_key, val) = entry.map_err(LmdbError::from)?;
            let record: VoteRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
            tally.add(record.category);
        }
        Ok(tally)
    }

    fn get_vote(&self, id: VoteId) -> Result<VoteRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .votes_db
            .get(&rtxn, &id_key(id))
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("vote {id}")))?;
        let record: VoteRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(record)
    }

    fn vote_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.votes_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    const WINDOW: u64 = 60_000;

    /// Settable clock so tests can place votes at exact times.
    struct TestClock(AtomicU64);

    impl TestClock {
        fn set(&self, millis: u64) {
            self.0.store(millis, Ordering::SeqCst);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Timestamp {
            Timestamp::new(self.0.load(Ordering::SeqCst))
        }
    }

    fn open_test_env() -> (tempfile::TempDir, crate::LmdbEnvironment, Arc<TestClock>) {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(TestClock(AtomicU64::new(0)));
        let env =
            crate::LmdbEnvironment::open_with_clock(dir.path(), 1 << 20, clock.clone()).unwrap();
        (dir, env, clock)
    }

    fn origin(s: &str) -> Origin {
        Origin::new(s).unwrap()
    }

    #[test]
    fn empty_ledger_tallies_zero() {
        let (_dir, env, _clock) = open_test_env();
        let store = env.ledger_store();
        assert_eq!(store.tally().unwrap(), Tally::new(0, 0));
        assert_eq!(store.vote_count().unwrap(), 0);
        assert_eq!(store.last_vote_at(&origin("1.2.3.4")).unwrap(), None);
    }

    #[test]
    fn record_vote_assigns_increasing_ids_and_store_time() {
        let (_dir, env, clock) = open_test_env();
        let store = env.ledger_store();

        clock.set(1_000);
        let first = store.record_vote(Category::Jjajang, &origin("a")).unwrap();
        clock.set(2_000);
        let second = store.record_vote(Category::Jjamppong, &origin("b")).unwrap();

        assert_eq!(first.id, VoteId::FIRST);
        assert!(second.id > first.id);
        assert_eq!(first.submitted_at, Timestamp::new(1_000));
        assert_eq!(second.submitted_at, Timestamp::new(2_000));
        assert_eq!(store.get_vote(second.id).unwrap(), second);
    }

    #[test]
    fn record_vote_increments_only_its_category() {
        let (_dir, env, _clock) = open_test_env();
        let store = env.ledger_store();
        store.record_vote(Category::Jjamppong, &origin("x")).unwrap();
        let before = store.tally().unwrap();

        store.record_vote(Category::Jjajang, &origin("y")).unwrap();
        let after = store.tally().unwrap();

        assert_eq!(after.count_a, before.count_a + 1);
        assert_eq!(after.count_b, before.count_b);
    }

    #[test]
    fn tally_is_idempotent() {
        let (_dir, env, _clock) = open_test_env();
        let store = env.ledger_store();
        store.record_vote(Category::Jjajang, &origin("x")).unwrap();
        assert_eq!(store.tally().unwrap(), store.tally().unwrap());
    }

    #[test]
    fn recent_vote_boundary_is_strict() {
        let (_dir, env, clock) = open_test_env();
        let store = env.ledger_store();
        let o = origin("1.2.3.4");

        clock.set(100_000);
        store.record_vote(Category::Jjajang, &o).unwrap();

        assert!(store.has_voted_recently(&o, Timestamp::new(100_000), WINDOW).unwrap());
        assert!(store.has_voted_recently(&o, Timestamp::new(159_999), WINDOW).unwrap());
        // Exactly one window old: eligible again.
        assert!(!store.has_voted_recently(&o, Timestamp::new(160_000), WINDOW).unwrap());
    }

    #[test]
    fn vote_at_epoch_is_recent_until_window_elapses() {
        let (_dir, env, clock) = open_test_env();
        let store = env.ledger_store();
        let o = origin("1.2.3.4");

        clock.set(0);
        store.record_vote(Category::Jjajang, &o).unwrap();

        assert!(store.has_voted_recently(&o, Timestamp::new(30_000), WINDOW).unwrap());
        assert!(!store.has_voted_recently(&o, Timestamp::new(60_000), WINDOW).unwrap());
    }

    #[test]
    fn origins_do_not_bleed_into_each_other() {
        let (_dir, env, clock) = open_test_env();
        let store = env.ledger_store();

        clock.set(10);
        store.record_vote(Category::Jjajang, &origin("1.2.3.45")).unwrap();

        let now = Timestamp::new(20);
        assert!(!store.has_voted_recently(&origin("1.2.3.4"), now, WINDOW).unwrap());
        assert!(!store.has_voted_recently(&origin("1.2.3.456"), now, WINDOW).unwrap());
        assert!(store.has_voted_recently(&origin("1.2.3.45"), now, WINDOW).unwrap());
    }

    #[test]
    fn origin_longer_than_lmdb_key_limit_is_rate_limited() {
        let (_dir, env, clock) = open_test_env();
        let store = env.ledger_store();
        let long = origin(&"a".repeat(2_000));

        clock.set(1_000);
        let record = store.record_vote(Category::Jjajang, &long).unwrap();
        assert_eq!(record.origin, long);
        assert_eq!(store.get_vote(record.id).unwrap().origin, long);

        assert!(store.has_voted_recently(&long, Timestamp::new(30_000), WINDOW).unwrap());
        assert!(!store.has_voted_recently(&long, Timestamp::new(61_000), WINDOW).unwrap());
        assert_eq!(store.last_vote_at(&long).unwrap(), Some(Timestamp::new(1_000)));
        // A shorter origin sharing the same leading bytes is unaffected.
        let shorter = origin(&"a".repeat(1_999));
        assert!(!store.has_voted_recently(&shorter, Timestamp::new(30_000), WINDOW).unwrap());
    }

    #[test]
    fn arbitrary_origin_strings_are_kept_apart() {
        let (_dir, env, clock) = open_test_env();
        let store = env.ledger_store();
        let origins = [
            "짜장면.example",
            "1.2.3.4, 10.0.0.1",
            "1.2.3.4,",
            "  spaced  ",
            "\u{0}nul",
            "2001:db8::1",
        ];

        clock.set(5_000);
        for raw in origins {
            store.record_vote(Category::Jjamppong, &origin(raw)).unwrap();
        }

        let now = Timestamp::new(10_000);
        for raw in origins {
            assert!(store.has_voted_recently(&origin(raw), now, WINDOW).unwrap(), "{raw:?}");
        }
        for raw in ["1.2.3.4", "짜장면", "spaced", "2001:db8::2"] {
            assert!(!store.has_voted_recently(&origin(raw), now, WINDOW).unwrap(), "{raw:?}");
        }
        assert_eq!(store.tally().unwrap(), Tally::new(0, origins.len() as u64));
    }

    #[test]
    fn rebuilt_index_matches_recorded_votes() {
        let (_dir, env, clock) = open_test_env();
        let store = env.ledger_store();
        clock.set(7_000);
        store.record_vote(Category::Jjajang, &origin("a")).unwrap();
        store.record_vote(Category::Jjajang, &origin(&"b".repeat(900))).unwrap();

        assert_eq!(rebuild_origin_index(&env).unwrap(), 2);
        assert!(store
            .has_voted_recently(&origin(&"b".repeat(900)), Timestamp::new(8_000), WINDOW)
            .unwrap());
        assert!(crate::check_integrity(&env).unwrap().is_healthy());
    }

    #[test]
    fn last_vote_at_returns_newest() {
        let (_dir, env, clock) = open_test_env();
        let store = env.ledger_store();
        let o = origin("10.0.0.1");

        for t in [5_000, 70_000, 200_000] {
            clock.set(t);
            store.record_vote(Category::Jjamppong, &o).unwrap();
        }
        clock.set(300_000);
        store.record_vote(Category::Jjajang, &origin("10.0.0.10")).unwrap();

        assert_eq!(store.last_vote_at(&o).unwrap(), Some(Timestamp::new(200_000)));
    }

    #[test]
    fn votes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = crate::LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
            let store = env.ledger_store();
            store.record_vote(Category::Jjajang, &origin("a")).unwrap();
            store.record_vote(Category::Jjajang, &origin("b")).unwrap();
        }
        let env = crate::LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
        let store = env.ledger_store();
        assert_eq!(store.tally().unwrap(), Tally::new(2, 0));
        let next = store.record_vote(Category::Jjamppong, &origin("c")).unwrap();
        assert_eq!(next.id, VoteId::new(3));
    }

    #[test]
    fn missing_vote_is_not_found() {
        let (_dir, env, _clock) = open_test_env();
        let err = env.ledger_store().get_vote(VoteId::new(42)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn concurrent_writers_get_unique_ids() {
        let (_dir, env, _clock) = open_test_env();
        let store = Arc::new(env.ledger_store());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let o = Origin::new(format!("10.0.0.{t}")).unwrap();
                    (0..25)
                        .map(|_| store.record_vote(Category::Jjajang, &o).unwrap().id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<VoteId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 100);
        assert_eq!(store.tally().unwrap(), Tally::new(100, 0));
    }
}
