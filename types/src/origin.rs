//! Voter origin identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Opaque string identifying where a vote attempt came from (typically a
/// network address).
///
/// The value is taken at face value from request metadata. It is only used
/// for cooldown enforcement and is never verified, so a spoofed origin
/// defeats the cooldown.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Origin(String);

impl Origin {
    /// Sentinel used when a request carries no origin metadata at all.
    pub const UNKNOWN: &'static str = "unknown";

    /// Create an origin, rejecting the empty string.
    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if s.is_empty() {
            return Err(TypesError::EmptyOrigin);
        }
        Ok(Self(s))
    }

    /// The shared `"unknown"` origin.
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
