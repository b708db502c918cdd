//! Axum-based HTTP server.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};

use poll_admission::AdmissionPolicy;
use poll_store::LedgerStore;

use crate::error::RpcError;
use crate::handlers;
use crate::metrics::PollMetrics;

/// Shared state handed to every handler.
pub struct AppState<S> {
    pub policy: Arc<AdmissionPolicy<S>>,
    /// `None` disables metric collection and serves an empty `/metrics`.
    pub metrics: Option<Arc<PollMetrics>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            policy: Arc::clone(&self.policy),
            metrics: self.metrics.clone(),
        }
    }
}

/// Build the application router.
pub fn router<S>(state: AppState<S>) -> Router
where
    S: LedgerStore + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/api/vote",
            get(handlers::get_votes::<S>).post(handlers::post_vote::<S>),
        )
        .route("/api/result", get(handlers::get_result::<S>))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics::<S>))
        .with_state(state)
}

pub struct RpcServer<S> {
    pub bind_address: String,
    pub port: u16,
    /// Exact browser origin allowed by CORS; `None` allows any origin.
    pub allowed_origin: Option<String>,
    pub state: AppState<S>,
}

impl<S> RpcServer<S>
where
    S: LedgerStore + Send + Sync + 'static,
{
    pub fn new(bind_address: impl Into<String>, port: u16, state: AppState<S>) -> Self {
        Self {
            bind_address: bind_address.into(),
            port,
            allowed_origin: None,
            state,
        }
    }

    pub fn with_allowed_origin(mut self, origin: Option<String>) -> Self {
        self.allowed_origin = origin;
        self
    }

    fn cors(&self) -> Result<CorsLayer, RpcError> {
        let allow_origin = match &self.allowed_origin {
            Some(origin) => AllowOrigin::exact(
                HeaderValue::from_str(origin)
                    .map_err(|e| RpcError::Server(format!("invalid CORS origin {origin:?}: {e}")))?,
            ),
            None => AllowOrigin::any(),
        };
        Ok(CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE])
            .allow_origin(allow_origin)
            .max_age(Duration::from_secs(60 * 60)))
    }

    /// Bind and serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn start<F>(self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.state.clone()).layer(self.cors()?);

        let address = format!("{}:{}", self.bind_address, self.port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {address}: {e}")))?;
        tracing::info!("HTTP server listening on {}", address);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
