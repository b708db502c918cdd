//! Nullable infrastructure for deterministic testing.
//!
//! The ledger and the admission policy reach the outside world only through
//! the `Clock` and `LedgerStore` traits. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod store;

pub use clock::NullClock;
pub use store::NullLedgerStore;
