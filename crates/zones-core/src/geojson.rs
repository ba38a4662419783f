//! # Feature Collection Assembly
//!
//! Raw, untrusted GeoJSON envelope types and the assembler that validates
//! them into a [`FeatureCollection`] of typed geometries.
//!
//! The raw types are deliberately lenient: every member is optional so that
//! a missing `type` or `coordinates` surfaces as a specific
//! [`ValidationError`] rather than as a generic deserialization failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::geometry::{decode_geometry, Geometry};

/// The only accepted envelope `type`.
pub const FEATURE_COLLECTION: &str = "FeatureCollection";

/// Raw `FeatureCollection` envelope as received from the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFeatureCollection {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub features: Option<Vec<RawFeature>>,
}

/// Raw feature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFeature {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

/// Raw geometry object: a kind and an undecoded coordinate payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawGeometry {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Value>,
}

/// A validated feature. Properties are opaque and passed through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub kind: String,
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

/// A validated, non-empty feature collection, immutable once assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    features: Vec<Feature>,
}

impl FeatureCollection {
    /// Validate a raw envelope and decode every feature's geometry.
    ///
    /// Stops at the first failing feature; no partial collection is ever
    /// returned. Feature order and properties are preserved verbatim.
    pub fn assemble(raw: RawFeatureCollection) -> Result<Self, ValidationError> {
        if raw.kind != FEATURE_COLLECTION {
            return Err(ValidationError::InvalidFeatureCollectionType { kind: raw.kind });
        }

        let raw_features = match raw.features {
            Some(features) if !features.is_empty() => features,
            _ => return Err(ValidationError::FeaturesRequired),
        };

        let features = raw_features
            .into_iter()
            .map(Feature::decode)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { features })
    }

    /// Always `"FeatureCollection"`.
    pub fn kind(&self) -> &'static str {
        FEATURE_COLLECTION
    }

    /// The features in submission order. Never empty.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether there are no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Feature {
    fn decode(raw: RawFeature) -> Result<Self, ValidationError> {
        let raw_geometry = raw.geometry.unwrap_or_default();
        let geometry = decode_geometry(
            raw_geometry.kind.as_deref(),
            raw_geometry.coordinates.as_ref(),
        )?;
        Ok(Self {
            kind: raw.kind,
            geometry,
            properties: raw.properties.unwrap_or_default(),
        })
    }
}
