//! HTTP error types and their JSON envelope.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use poll_utils::format_duration_ms;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("malformed request body: {0}")]
    InvalidJson(String),

    #[error("invalid vote type; choose jjajang or jjamppong")]
    InvalidVoteType,

    #[error("you already voted within the last minute; try again in {}", retry_wait(.retry_after_ms))]
    DuplicateVote { retry_after_ms: u64 },

    #[error("failed to read the vote tally: {0}")]
    Database(String),

    #[error("failed to process the vote: {0}")]
    Server(String),
}

fn retry_wait(retry_after_ms: &u64) -> String {
    format_duration_ms(*retry_after_ms)
}

/// Error envelope returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl RpcError {
    /// Stable error code clients can switch on.
    pub fn code(&self) -> &'static str {
        match self {
            RpcError::InvalidJson(_) => "INVALID_JSON",
            RpcError::InvalidVoteType => "INVALID_VOTE_TYPE",
            RpcError::DuplicateVote { .. } => "DUPLICATE_VOTE",
            RpcError::Database(_) => "DATABASE_ERROR",
            RpcError::Server(_) => "SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::InvalidJson(_) | RpcError::InvalidVoteType => StatusCode::BAD_REQUEST,
            RpcError::DuplicateVote { .. } => StatusCode::TOO_MANY_REQUESTS,
            RpcError::Database(_) | RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Storage details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            RpcError::Database(_) => "failed to read the vote tally".to_string(),
            RpcError::Server(_) => "failed to process the vote".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code(),
            message: self.public_message(),
        };
        let mut response = (self.status(), Json(body)).into_response();

        if let RpcError::DuplicateVote { retry_after_ms } = self {
            let secs = retry_after_ms.div_ceil(1_000).max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses() {
        let cases = [
            (RpcError::InvalidJson("eof".into()), "INVALID_JSON", 400),
            (RpcError::InvalidVoteType, "INVALID_VOTE_TYPE", 400),
            (RpcError::DuplicateVote { retry_after_ms: 1 }, "DUPLICATE_VOTE", 429),
            (RpcError::Database("io".into()), "DATABASE_ERROR", 500),
            (RpcError::Server("io".into()), "SERVER_ERROR", 500),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status().as_u16(), status);
        }
    }

    #[test]
    fn duplicate_sets_retry_after_header() {
        let response = RpcError::DuplicateVote { retry_after_ms: 29_500 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "30");
    }

    #[test]
    fn storage_details_are_not_exposed() {
        let err = RpcError::Server("mdb_put: MDB_MAP_FULL".into());
        assert!(!err.public_message().contains("MDB"));
    }
}
