//! Fundamental types for the poll.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! the two fixed vote categories, voter origins, millisecond timestamps and clocks,
//! persisted vote records, and derived tallies.

pub mod category;
pub mod error;
pub mod origin;
pub mod record;
pub mod tally;
pub mod time;

pub use category::Category;
pub use error::TypesError;
pub use origin::Origin;
pub use record::{VoteId, VoteRecord};
pub use tally::Tally;
pub use time::{Clock, SystemClock, Timestamp};
