//! HTTP API for the poll.
//!
//! Provides endpoints for:
//! - Casting a vote (`POST /api/vote`)
//! - Reading running totals (`GET /api/vote`)
//! - Reading the results summary with percentages and winner (`GET /api/result`)
//! - Liveness (`GET /health`) and Prometheus metrics (`GET /metrics`)

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod origin;
pub mod server;

pub use error::RpcError;
pub use metrics::PollMetrics;
pub use origin::extract_origin;
pub use server::{router, AppState, RpcServer};
