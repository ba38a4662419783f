//! # API Route Modules
//!
//! - `health` — liveness and readiness probes.
//! - `zones` — zone ingestion, lookup, deletion, single and batch containment.

pub mod health;
pub mod zones;
