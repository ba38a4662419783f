//! # Middleware Stack
//!
//! - [`metrics`]: request counters and latency histograms via the `metrics` facade.
//!
//! Request tracing is `tower_http::trace::TraceLayer`, mounted in [`crate::app`].

pub mod metrics;
