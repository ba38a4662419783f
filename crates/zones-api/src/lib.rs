//! # zones-api — Axum HTTP Service
//!
//! HTTP boundary of the zones service. Decodes requests into the validated
//! types of `zones-core`, delegates to the store (`zones-store`) and the
//! batch coordinator (`zones-batch`), and maps every failure through
//! [`AppError`].
//!
//! ## API Surface
//!
//! | Prefix | Module |
//! |--------|--------|
//! | `/zones*` | [`routes::zones`] |
//! | `/health/*` | [`routes::health`] |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - Sits at the top of the dependency DAG.
//! - No business logic in route handlers; validation lives in `zones-core`.
//! - Handlers see the store and the coordinator only as trait objects, so
//!   tests run against in-memory fakes.

pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;

/// Request body limit. Zone geometries can run to many thousands of points.
const BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

/// Assemble the application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = routes::zones::router()
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let health = routes::health::router().with_state(state);

    Router::new().merge(health).merge(api)
}
