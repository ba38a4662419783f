//! Kubernetes-style health probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
}

/// Liveness probe — the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — the store answers queries.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.store.count_zones().await {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "not ready")
        }
    }
}
