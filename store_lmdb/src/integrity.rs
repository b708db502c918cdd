//! Ledger consistency checks.
//!
//! Run on startup (or via `poll-daemon check`) to detect corruption early,
//! before the server starts admitting votes. Every vote must decode, sit
//! under its own id, and have exactly one matching origin index entry; every
//! index key must have the fixed digest layout.

use std::path::Path;

use poll_types::VoteRecord;

use crate::ledger::{origin_index_key, INDEX_KEY_LEN};
use crate::{LmdbEnvironment, LmdbError};

/// Problems beyond this many are counted but not listed.
const MAX_REPORTED_ERRORS: usize = 100;

/// Outcome of a consistency check.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub vote_entries: u64,
    pub index_entries: u64,
    pub errors: Vec<String>,
    /// Problems found but left out of `errors`.
    pub suppressed: usize,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }

    fn fail(&mut self, problem: String) {
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(problem);
        } else {
            self.suppressed += 1;
        }
    }
}

/// Walk the whole ledger inside one read transaction.
///
/// Only failing to start the transaction is a hard error; everything found
/// while walking is recorded in the report.
pub fn check_integrity(environment: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let rtxn = environment.env().read_txn()?;
    let votes_db = environment.votes_db;
    let index_db = environment.votes_by_origin_db;
    let mut report = IntegrityReport {
        vote_entries: votes_db.len(&rtxn)?,
        index_entries: index_db.len(&rtxn)?,
        ..IntegrityReport::default()
    };

    for entry in votes_db.iter(&rtxn)? {
        let (key, value) = match entry {
            Ok(kv) => kv,
            Err(e) => {
                report.fail(format!("unreadable vote entry: {e}"));
                continue;
            }
        };
        let record: VoteRecord = match bincode::deserialize(value) {
            Ok(record) => record,
            Err(e) => {
                report.fail(format!("vote key {key:02x?} does not decode: {e}"));
                continue;
            }
        };
        let expected_key = record.id.as_u64().to_be_bytes();
        if key != expected_key.as_slice() {
            report.fail(format!("vote {} stored under key {key:02x?}", record.id));
        }
        let index_key = origin_index_key(&record.origin, record.submitted_at, record.id);
        match index_db.get(&rtxn, &index_key) {
            Ok(Some(_)) => {}
            Ok(None) => report.fail(format!(
                "vote {} from {} has no origin index entry",
                record.id, record.origin
            )),
            Err(e) => report.fail(format!("origin index lookup for vote {} failed: {e}", record.id)),
        }
    }

    for entry in index_db.iter(&rtxn)? {
        match entry {
            Ok((key, _)) if key.len() != INDEX_KEY_LEN => report.fail(format!(
                "origin index key is {} bytes, expected {INDEX_KEY_LEN}",
                key.len()
            )),
            Ok(_) => {}
            Err(e) => report.fail(format!("unreadable origin index entry: {e}")),
        }
    }

    if report.vote_entries != report.index_entries {
        report.fail(format!(
            "origin index has {} entries for {} votes",
            report.index_entries, report.vote_entries
        ));
    }

    tracing::debug!(
        votes = report.vote_entries,
        index = report.index_entries,
        problems = report.errors.len() + report.suppressed,
        "integrity check finished"
    );
    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
