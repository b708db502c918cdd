//! Metadata storage trait.

use crate::StoreError;

/// Trait for storing database metadata (schema version and similar bookkeeping).
///
/// A generic key-value store for internal bookkeeping that doesn't belong in
/// the vote ledger itself.
pub trait MetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Stored schema version, or 0 for a fresh database.
    fn get_schema_version(&self) -> Result<u32, StoreError>;

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}
