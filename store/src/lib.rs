//! Abstract storage traits for the poll.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The admission policy and the HTTP layer depend only on the traits.

pub mod error;
pub mod ledger;
pub mod meta;

pub use error::StoreError;
pub use ledger::LedgerStore;
pub use meta::MetaStore;
