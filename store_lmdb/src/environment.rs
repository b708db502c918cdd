//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use poll_types::{Clock, SystemClock};

use crate::ledger::LmdbLedgerStore;
use crate::meta::LmdbMetaStore;
use crate::migration::Migrator;
use crate::LmdbError;

/// Named databases inside the environment.
pub(crate) const VOTES_DB: &str = "votes";
pub(crate) const VOTES_BY_ORIGIN_DB: &str = "votes_by_origin";
pub(crate) const META_DB: &str = "meta";

const MAX_DBS: u32 = 8;

/// Wraps the LMDB environment and all database handles.
///
/// Opened once at process start and handed to whoever needs a store; there
/// is no global handle.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
    clock: Arc<dyn Clock>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    pub(crate) votes_by_origin_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, stamping votes
    /// with the system clock.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        Self::open_with_clock(path, map_size, Arc::new(SystemClock))
    }

    /// Open or create an LMDB environment whose ledger stamps votes with `clock`.
    ///
    /// Creating the databases is idempotent, so reopening an existing
    /// directory is safe. Pending schema migrations run before this returns.
    pub fn open_with_clock(
        path: &Path,
        map_size: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: each data directory is opened by a single environment per
        // process; the daemon never opens the same path twice.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let votes_db = env.create_database(&mut wtxn, Some(VOTES_DB))?;
        let votes_by_origin_db = env.create_database(&mut wtxn, Some(VOTES_BY_ORIGIN_DB))?;
        let meta_db = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
            clock,
            votes_db,
            votes_by_origin_db,
            meta_db,
        };

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Migrator::run(&environment)?;

        Ok(environment)
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A handle on the vote ledger. Handles are cheap and share the environment.
    pub fn ledger_store(&self) -> LmdbLedgerStore {
        LmdbLedgerStore {
            env: Arc::clone(&self.env),
            votes_db: self.votes_db,
            votes_by_origin_db: self.votes_by_origin_db,
            clock: Arc::clone(&self.clock),
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}
