//! The two fixed poll options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// One of exactly two vote options. No other value is ever persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Black-bean noodles (짜장면).
    Jjajang,
    /// Spicy seafood noodle soup (짬뽕).
    Jjamppong,
}

impl Category {
    /// Wire name, as accepted by [`FromStr`] and emitted by serde.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Jjajang => "jjajang",
            Category::Jjamppong => "jjamppong",
        }
    }

    /// Human-readable label used in response messages.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Jjajang => "짜장면",
            Category::Jjamppong => "짬뽕",
        }
    }
}

impl FromStr for Category {
    type Err = TypesError;

    /// Exact, case-sensitive match on the wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jjajang" => Ok(Category::Jjajang),
            "jjamppong" => Ok(Category::Jjamppong),
            other => Err(TypesError::UnknownCategory(other.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
