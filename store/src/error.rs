use thiserror::Error;

/// Failure reported by a ledger backend.
///
/// Callers above the store only distinguish "record missing" from "the
/// ledger cannot be used right now"; the remaining variants carry detail
/// for logs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no such entry: {0}")]
    NotFound(String),

    /// The backend rejected or failed an operation.
    #[error("ledger backend failure: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded.
    #[error("ledger encoding error: {0}")]
    Serialization(String),

    /// The backend cannot be reached at all (I/O failure, switched off).
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}
