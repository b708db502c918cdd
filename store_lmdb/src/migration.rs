//! Schema versioning for the ledger environment.
//!
//! `STEPS[n]` upgrades an environment from version `n` to `n + 1`. Opening an
//! environment applies every pending step in order and then records the new
//! version; an environment stamped with a version this build does not know
//! is refused rather than guessed at.

use poll_store::MetaStore;

use crate::ledger::rebuild_origin_index;
use crate::{LmdbEnvironment, LmdbError};

/// The schema version that the current code expects.
pub const CURRENT_SCHEMA_VERSION: u32 = STEPS.len() as u32;

/// Meta key describing the key layout of the ledger databases.
pub const LAYOUT_KEY: &str = "layout";

const LAYOUT_V1: &[u8] = b"votes=id_be64;votes_by_origin=len_be32|origin|ts_be64|id_be64";
const LAYOUT_V2: &[u8] = b"votes=id_be64;votes_by_origin=blake2b256(origin)|ts_be64|id_be64";

type Step = fn(&LmdbEnvironment) -> Result<(), LmdbError>;

const STEPS: &[Step] = &[stamp_initial_layout, hash_origin_index];

/// v0 -> v1. The databases themselves are created on open; a blank
/// environment only needs its layout recorded.
fn stamp_initial_layout(environment: &LmdbEnvironment) -> Result<(), LmdbError> {
    environment.meta_store().put_meta(LAYOUT_KEY, LAYOUT_V1)?;
    Ok(())
}

/// v1 -> v2. Index keys embedding the raw origin overflow LMDB's key limit
/// for long origins; re-key the index on the origin digest.
fn hash_origin_index(environment: &LmdbEnvironment) -> Result<(), LmdbError> {
    let rebuilt = rebuild_origin_index(environment)?;
    tracing::info!(entries = rebuilt, "re-keyed origin index");
    environment.meta_store().put_meta(LAYOUT_KEY, LAYOUT_V2)?;
    Ok(())
}

/// Brings an environment's schema up to [`CURRENT_SCHEMA_VERSION`].
pub struct Migrator;

impl Migrator {
    pub fn run(environment: &LmdbEnvironment) -> Result<(), LmdbError> {
        let meta_store = environment.meta_store();
        let stored = meta_store.get_schema_version()?;
        if stored > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::Schema(format!(
                "on-disk schema v{stored} is newer than supported v{CURRENT_SCHEMA_VERSION}"
            )));
        }
        if stored == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = stored, "ledger schema is current");
            return Ok(());
        }

        for (from, step) in STEPS.iter().enumerate().skip(stored as usize) {
            tracing::info!(from, to = from + 1, "upgrading ledger schema");
            step(environment)?;
        }
        meta_store.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        Ok(())
    }
}
