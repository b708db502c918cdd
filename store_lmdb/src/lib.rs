//! LMDB storage backend for the poll.
//!
//! Implements the storage traits from `poll-store` using the `heed` LMDB bindings.
//! The ledger maps to two databases (records and the origin index) plus a
//! metadata database, all within a single environment.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod ledger;
pub mod meta;
pub mod migration;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use ledger::LmdbLedgerStore;
pub use meta::LmdbMetaStore;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION, LAYOUT_KEY};
