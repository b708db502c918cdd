//! Errors raised while constructing core types from untrusted input.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("unknown vote category: {0:?}")]
    UnknownCategory(String),

    #[error("origin must not be empty")]
    EmptyOrigin,
}
