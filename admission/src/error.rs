use poll_store::StoreError;
use poll_types::Origin;
use thiserror::Error;

/// Why a vote attempt was not admitted. Nothing is persisted in any case.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("invalid vote category: {0:?}")]
    InvalidCategory(String),

    #[error("origin {origin} already voted within the cooldown window; retry in {retry_after_ms}ms")]
    DuplicateVote { origin: Origin, retry_after_ms: u64 },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),
}

impl AdmissionError {
    /// Stable machine-readable reason, used for metrics labels.
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionError::InvalidCategory(_) => "invalid_category",
            AdmissionError::DuplicateVote { .. } => "duplicate",
            AdmissionError::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}
