//! # Validation Errors
//!
//! Every way caller input can be rejected before it reaches storage or the
//! batch worker pool. All variants are caller problems: they are surfaced
//! verbatim, never retried, and never logged as system errors.
//!
//! The `Display` strings are part of the HTTP contract (they become the
//! `error` field of 400 responses), so changing one is a breaking change.

use thiserror::Error;

/// Input validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The request envelope could not be deserialized at all.
    #[error("serialization error")]
    Serialization,

    /// A feature's geometry has no `type`.
    #[error("geometry is required")]
    GeometryTypeRequired,

    /// A feature's geometry has no `coordinates`.
    #[error("coordinates is required")]
    CoordinatesRequired,

    /// The geometry `type` is neither `Polygon` nor `MultiPolygon`.
    #[error("unsupported geometry type: {kind}")]
    UnsupportedGeometryType {
        /// The rejected kind, echoed exactly.
        kind: String,
    },

    /// The envelope `type` is not the literal `FeatureCollection`.
    #[error("not valid feature collection type: {kind}")]
    InvalidFeatureCollectionType {
        /// The rejected kind, echoed exactly.
        kind: String,
    },

    /// The collection has no features.
    #[error("features is required")]
    FeaturesRequired,

    /// Polygon coordinates failed to parse or decoded to nothing.
    #[error("not valid polygon coordinates")]
    InvalidPolygonCoordinates,

    /// MultiPolygon coordinates failed to parse or decoded to nothing.
    #[error("not valid multipolygon coordinates")]
    InvalidMultiPolygonCoordinates,

    /// A zone id is not a positive integer.
    #[error("invalid id")]
    InvalidZoneId,

    /// A zone id list was required but empty.
    #[error("ids cannot be empty")]
    EmptyIds,

    /// Two batch entries share the same key. The message does not echo it.
    #[error("duplicate key")]
    DuplicateKey {
        /// The first key seen twice.
        key: String,
    },

    /// A batch request carried no entries.
    #[error("empty data")]
    EmptyBatch,

    /// Latitude outside `[-90, 90]` or not a number.
    #[error("invalid latitude")]
    InvalidLatitude,

    /// Longitude outside `[-180, 180]` or not a number.
    #[error("invalid longitude")]
    InvalidLongitude,
}
