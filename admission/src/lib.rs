//! Vote admission for the poll.
//!
//! Decides whether a vote attempt is accepted (one vote per origin per
//! cooldown window), persists accepted votes through a [`poll_store::LedgerStore`],
//! and reduces tallies to the winner and percentage breakdown shown on the
//! results page.

pub mod error;
pub mod policy;
pub mod summary;

pub use error::AdmissionError;
pub use policy::{AdmissionPolicy, COOLDOWN_WINDOW_MS};
pub use summary::{classify_winner, percentage, TallySummary, Winner};
