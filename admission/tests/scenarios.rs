//! End-to-end admission scenarios, run against both the in-memory ledger and
//! a real LMDB environment sharing the same deterministic clock.

use std::sync::Arc;

use poll_admission::{classify_winner, percentage, AdmissionError, AdmissionPolicy, Winner};
use poll_nullables::{NullClock, NullLedgerStore};
use poll_store::LedgerStore;
use poll_store_lmdb::{LmdbEnvironment, LmdbLedgerStore};
use poll_types::{Category, Origin, Tally};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn origin(s: &str) -> Origin {
    Origin::new(s).unwrap()
}

fn null_policy() -> (Arc<NullClock>, AdmissionPolicy<NullLedgerStore>) {
    let clock = Arc::new(NullClock::new(0));
    let store = NullLedgerStore::new(clock.clone());
    (clock.clone(), AdmissionPolicy::new(store, clock))
}

fn lmdb_policy() -> (
    tempfile::TempDir,
    Arc<NullClock>,
    AdmissionPolicy<LmdbLedgerStore>,
) {
    let dir = tempfile::tempdir().expect("temp dir");
    let clock = Arc::new(NullClock::new(0));
    let env = LmdbEnvironment::open_with_clock(dir.path(), 1 << 20, clock.clone())
        .expect("open env");
    let policy = AdmissionPolicy::new(env.ledger_store(), clock.clone());
    (dir, clock, policy)
}

type Submit<'a> = &'a dyn Fn(&str, &str) -> Result<Tally, AdmissionError>;
type CurrentTally<'a> = &'a dyn Fn() -> Tally;

/// Runs `scenario` against both ledgers.
fn on_both_ledgers(scenario: impl Fn(&NullClock, Submit<'_>, CurrentTally<'_>)) {
    let (clock, policy) = null_policy();
    scenario(
        clock.as_ref(),
        &|c, o| policy.submit_vote(c, &origin(o)),
        &|| policy.current_tally().unwrap(),
    );

    let (_dir, clock, policy) = lmdb_policy();
    scenario(
        clock.as_ref(),
        &|c, o| policy.submit_vote(c, &origin(o)),
        &|| policy.current_tally().unwrap(),
    );
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn second_vote_within_window_is_duplicate() {
    on_both_ledgers(|clock, submit, tally| {
        clock.set(0);
        assert_eq!(submit("jjajang", "1.2.3.4").unwrap(), Tally::new(1, 0));

        clock.set(30_000);
        assert!(matches!(
            submit("jjamppong", "1.2.3.4"),
            Err(AdmissionError::DuplicateVote { .. })
        ));
        assert_eq!(tally(), Tally::new(1, 0));
    });
}

#[test]
fn distinct_origins_vote_independently() {
    on_both_ledgers(|clock, submit, tally| {
        clock.set(0);
        submit("jjajang", "1.2.3.4").unwrap();
        clock.set(10);
        submit("jjamppong", "5.6.7.8").unwrap();

        assert_eq!(tally(), Tally::new(1, 1));
        assert_eq!(classify_winner(&tally()), Winner::Tie);
    });
}

#[test]
fn vote_after_window_elapses_is_accepted() {
    on_both_ledgers(|clock, submit, tally| {
        clock.set(0);
        submit("jjajang", "1.2.3.4").unwrap();
        clock.set(60_001);
        submit("jjajang", "1.2.3.4").unwrap();

        assert_eq!(tally(), Tally::new(2, 0));
    });
}

#[test]
fn three_to_one_breakdown() {
    on_both_ledgers(|clock, submit, tally| {
        for (i, (category, o)) in [
            ("jjajang", "10.0.0.1"),
            ("jjajang", "10.0.0.2"),
            ("jjajang", "10.0.0.3"),
            ("jjamppong", "10.0.0.4"),
        ]
        .into_iter()
        .enumerate()
        {
            clock.set(i as u64 * 100);
            submit(category, o).unwrap();
        }

        let t = tally();
        assert_eq!(t, Tally::new(3, 1));
        assert_eq!(percentage(t.count_a, t.total()), 75);
        assert_eq!(percentage(t.count_b, t.total()), 25);
        assert_eq!(classify_winner(&t), Winner::Jjajang);
    });
}

#[test]
fn invalid_category_never_reaches_the_ledger() {
    on_both_ledgers(|_clock, submit, tally| {
        assert!(matches!(
            submit("tangsuyuk", "1.2.3.4"),
            Err(AdmissionError::InvalidCategory(_))
        ));
        assert_eq!(tally(), Tally::default());
    });
}

#[test]
fn long_origins_are_admitted_and_cooled_down() {
    on_both_ledgers(|clock, submit, tally| {
        let long = "x".repeat(2_000);
        clock.set(0);
        assert_eq!(submit("jjajang", &long).unwrap(), Tally::new(1, 0));

        clock.set(30_000);
        assert!(matches!(
            submit("jjamppong", &long),
            Err(AdmissionError::DuplicateVote { retry_after_ms: 30_000, .. })
        ));
        clock.set(60_000);
        assert_eq!(submit("jjamppong", &long).unwrap(), Tally::new(1, 1));
        assert_eq!(tally(), Tally::new(1, 1));
    });
}

#[test]
fn summary_reflects_lmdb_state_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(NullClock::new(0));
    {
        let env = LmdbEnvironment::open_with_clock(dir.path(), 1 << 20, clock.clone()).unwrap();
        let policy = AdmissionPolicy::new(env.ledger_store(), clock.clone());
        policy.submit(Category::Jjamppong, &origin("a")).unwrap();
        policy.submit(Category::Jjamppong, &origin("b")).unwrap();
    }

    // Still inside the window after a restart: the cooldown is durable.
    clock.set(1_000);
    let env = LmdbEnvironment::open_with_clock(dir.path(), 1 << 20, clock.clone()).unwrap();
    let policy = AdmissionPolicy::new(env.ledger_store(), clock.clone());
    assert!(policy.submit(Category::Jjajang, &origin("a")).is_err());

    let summary = policy.summary().unwrap();
    assert_eq!(summary.winner, Winner::Jjamppong);
    assert_eq!(summary.percent_jjamppong, 100);
    assert_eq!(policy.store().vote_count().unwrap(), 2);
}
