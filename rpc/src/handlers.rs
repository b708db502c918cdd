//! HTTP request handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use poll_admission::{AdmissionError, TallySummary};
use poll_store::LedgerStore;
use poll_types::{Category, Tally};

use crate::error::RpcError;
use crate::origin::extract_origin;
use crate::server::AppState;

// ── Vote ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct VotesResponse {
    pub success: bool,
    pub message: String,
    pub votes: Tally,
}

/// `GET /api/vote`: current totals.
pub async fn get_votes<S>(State(state): State<AppState<S>>) -> Result<Json<VotesResponse>, RpcError>
where
    S: LedgerStore + Send + Sync + 'static,
{
    let policy = Arc::clone(&state.policy);
    let votes = run_blocking(move || policy.current_tally())
        .await
        .map_err(|e| {
            state.note_storage_error(&e);
            RpcError::Database(e.to_string())
        })?;

    Ok(Json(VotesResponse {
        success: true,
        message: "vote tally loaded".to_string(),
        votes,
    }))
}

/// `POST /api/vote` with body `{"type": "jjajang" | "jjamppong"}`.
///
/// The body is parsed by hand so that any well-formed JSON without a valid
/// `type` maps to `INVALID_VOTE_TYPE`, and only unparseable bodies map to
/// `INVALID_JSON`.
pub async fn post_vote<S>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, RpcError>
where
    S: LedgerStore + Send + Sync + 'static,
{
    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|e| RpcError::InvalidJson(e.to_string()))?;

    let category = match payload.get("type").and_then(|v| v.as_str()) {
        Some(raw) => raw.parse::<Category>().map_err(|_| {
            state.note_rejection("invalid_category");
            RpcError::InvalidVoteType
        })?,
        None => {
            state.note_rejection("invalid_category");
            return Err(RpcError::InvalidVoteType);
        }
    };

    let origin = extract_origin(&headers);
    if origin.is_unknown() {
        tracing::debug!("vote carries no origin headers; using the shared unknown origin");
    }
    let started = Instant::now();
    let policy = Arc::clone(&state.policy);
    let vote_origin = origin.clone();
    let outcome = run_blocking(move || policy.submit(category, &vote_origin)).await;
    if let Some(metrics) = &state.metrics {
        metrics
            .submit_duration_ms
            .observe(started.elapsed().as_secs_f64() * 1_000.0);
    }

    match outcome {
        Ok(votes) => {
            tracing::info!(%origin, %category, total = votes.total(), "vote accepted");
            if let Some(metrics) = &state.metrics {
                metrics.votes_accepted.inc();
            }
            let response = VotesResponse {
                success: true,
                message: format!("your vote for {} has been recorded", category.label()),
                votes,
            };
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(AdmissionError::DuplicateVote { retry_after_ms, .. }) => {
            tracing::debug!(%origin, retry_after_ms, "duplicate vote rejected");
            state.note_rejection("duplicate");
            Err(RpcError::DuplicateVote { retry_after_ms })
        }
        Err(AdmissionError::InvalidCategory(raw)) => {
            tracing::debug!(%origin, category = %raw, "invalid category rejected");
            state.note_rejection("invalid_category");
            Err(RpcError::InvalidVoteType)
        }
        Err(e) => {
            state.note_storage_error(&e);
            Err(RpcError::Server(e.to_string()))
        }
    }
}

// ── Results ──────────────────────────────────────────────────────────────

/// `GET /api/result`: totals reduced to percentages and a winner.
pub async fn get_result<S>(State(state): State<AppState<S>>) -> Result<Json<TallySummary>, RpcError>
where
    S: LedgerStore + Send + Sync + 'static,
{
    let policy = Arc::clone(&state.policy);
    let summary = run_blocking(move || policy.summary())
        .await
        .map_err(|e| {
            state.note_storage_error(&e);
            RpcError::Database(e.to_string())
        })?;
    Ok(Json(summary))
}

// ── Operations ───────────────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

/// `GET /metrics`: Prometheus text exposition, or 404 when collection is off.
pub async fn metrics<S>(State(state): State<AppState<S>>) -> Response
where
    S: LedgerStore + Send + Sync + 'static,
{
    let Some(metrics) = &state.metrics else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match metrics.encode() {
        Ok(text) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response(),
        Err(e) => RpcError::Server(e.to_string()).into_response(),
    }
}

/// Ledger access blocks on LMDB I/O, so it runs off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, AdmissionError>
where
    F: FnOnce() -> Result<T, AdmissionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap_or_else(|e| {
        Err(AdmissionError::StorageUnavailable(
            poll_store::StoreError::Backend(format!("ledger task failed: {e}")),
        ))
    })
}

impl<S> AppState<S> {
    fn note_rejection(&self, reason: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_rejection(reason);
        }
    }

    fn note_storage_error(&self, e: &AdmissionError) {
        tracing::error!(error = %e, "ledger storage failure");
        if let Some(metrics) = &self.metrics {
            metrics.storage_errors.inc();
        }
    }
}
