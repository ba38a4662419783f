//! # zones-core — Domain Types for the Zones Service
//!
//! The leaf crate of the workspace. It turns untrusted GeoJSON-like input
//! into typed, validated values and defines the query types the rest of the
//! service passes around. Every other crate depends on `zones-core`; it
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Closed geometry variant.** [`Geometry`] is `Polygon | MultiPolygon`.
//!    The kind string is matched once, in [`geometry::decode_geometry`];
//!    adding a kind means adding a variant and a match arm.
//!
//! 2. **Validated constructors.** [`ZoneId`], [`ZoneIdSet`] and [`Point`] can
//!    only be built through constructors that enforce their invariants, so a
//!    value of these types is valid by construction.
//!
//! 3. **Fail fast.** Every validation entry point returns the first
//!    [`ValidationError`] it meets. Partial collections and partial batches
//!    are never produced.
//!
//! ## Crate Policy
//!
//! - No I/O, no async, no dependencies on other `zones-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod geojson;
pub mod geometry;
pub mod query;

// Re-export primary types for ergonomic imports.
pub use error::ValidationError;
pub use geojson::{Feature, FeatureCollection, RawFeature, RawFeatureCollection, RawGeometry};
pub use geometry::{Geometry, GeometryKind, MultiPolygon, Polygon, Position, Ring};
pub use query::{
    validate_batch, BatchQuery, BatchQueryRequest, BatchResult, ContainsQuery,
    ContainsQueryRequest, Point, PointInput, ZoneContainment, ZoneGeoJson, ZoneId, ZoneIdSet,
    MAX_LATITUDE, MAX_LONGITUDE,
};
