//! LMDB implementation of MetaStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use poll_store::{MetaStore, StoreError};

use crate::LmdbError;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Small key-value table for ledger bookkeeping (schema version, layout).
pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbMetaStore {
    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        Ok(self.meta_db.get(&rtxn, key)?.map(<[u8]>::to_vec))
    }

    fn write(&self, key: &[u8], value: &[u8]) -> Result<(), LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        self.meta_db.put(&mut wtxn, key, value)?;
        wtxn.commit()?;
        Ok(())
    }
}

impl MetaStore for LmdbMetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        Ok(self.write(key.as_bytes(), value)?)
    }

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.read(key.as_bytes())?
            .ok_or_else(|| LmdbError::NotFound(format!("meta key {key:?}")).into())
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        let Some(bytes) = self.read(SCHEMA_VERSION_KEY)? else {
            return Ok(0);
        };
        let raw: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
            LmdbError::Serialization(format!(
                "schema_version is {} bytes, expected 4",
                bytes.len()
            ))
        })?;
        Ok(u32::from_le_bytes(raw))
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        Ok(self.write(SCHEMA_VERSION_KEY, &version.to_le_bytes())?)
    }
}
