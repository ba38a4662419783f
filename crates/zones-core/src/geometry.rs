//! # Geometry Decoding
//!
//! Turns a geometry kind string plus a raw coordinate payload into a typed
//! [`Geometry`]. Decoding is pure and deterministic: malformed input is
//! reported, never retried.
//!
//! Only structural well-formedness is checked here. Ring closure and the
//! four-point minimum are enforced by the spatial store when the geometry is
//! persisted; this layer only guarantees that a decoded geometry has at least
//! one coordinate.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ValidationError;

/// A `(lon, lat)` coordinate pair.
pub type Position = [f64; 2];

/// An ordered sequence of positions. A well-formed ring is closed and has at
/// least four points; the store enforces both.
pub type Ring = Vec<Position>;

/// The closed set of supported geometry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// GeoJSON `Polygon`.
    Polygon,
    /// GeoJSON `MultiPolygon`.
    MultiPolygon,
}

impl GeometryKind {
    /// Look up a kind by its GeoJSON `type` string. Matching is exact.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "Polygon" => Some(Self::Polygon),
            "MultiPolygon" => Some(Self::MultiPolygon),
            _ => None,
        }
    }

    /// The GeoJSON `type` string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Polygon => "Polygon",
            Self::MultiPolygon => "MultiPolygon",
        }
    }
}

impl std::fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A polygon: an outer ring followed by zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    rings: Vec<Ring>,
}

impl Polygon {
    /// Build a polygon, rejecting one with no coordinates at all.
    pub fn new(rings: Vec<Ring>) -> Result<Self, ValidationError> {
        if rings.iter().all(|ring| ring.is_empty()) {
            return Err(ValidationError::InvalidPolygonCoordinates);
        }
        Ok(Self { rings })
    }

    /// The rings in submission order.
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    /// Total number of positions across all rings.
    pub fn point_count(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }
}

/// A collection of polygons.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPolygon {
    polygons: Vec<Vec<Ring>>,
}

impl MultiPolygon {
    /// Build a multipolygon, rejecting one with no coordinates at all.
    pub fn new(polygons: Vec<Vec<Ring>>) -> Result<Self, ValidationError> {
        let empty = polygons
            .iter()
            .flat_map(|rings| rings.iter())
            .all(|ring| ring.is_empty());
        if empty {
            return Err(ValidationError::InvalidMultiPolygonCoordinates);
        }
        Ok(Self { polygons })
    }

    /// The polygons in submission order, each as its ring sequence.
    ///
    /// Member polygons may individually be empty (e.g. `[[], [[...]]]`);
    /// the store decides whether that is acceptable.
    pub fn polygons(&self) -> &[Vec<Ring>] {
        &self.polygons
    }

    /// Total number of positions across all member polygons.
    pub fn point_count(&self) -> usize {
        self.polygons
            .iter()
            .flat_map(|rings| rings.iter())
            .map(Vec::len)
            .sum()
    }
}

/// A validated zone geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(Polygon),
    MultiPolygon(MultiPolygon),
}

impl Geometry {
    /// The kind of this geometry.
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Polygon(_) => GeometryKind::Polygon,
            Self::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    /// Number of rings, summed over member polygons for a multipolygon.
    pub fn ring_count(&self) -> usize {
        match self {
            Self::Polygon(p) => p.rings().len(),
            Self::MultiPolygon(mp) => mp.polygons().iter().map(Vec::len).sum(),
        }
    }

    /// Number of positions.
    pub fn point_count(&self) -> usize {
        match self {
            Self::Polygon(p) => p.point_count(),
            Self::MultiPolygon(mp) => mp.point_count(),
        }
    }
}

/// Decode a raw geometry.
///
/// `kind` and `coordinates` are the `type` and `coordinates` members of a
/// GeoJSON geometry object; an empty `kind` counts as missing. The kind is
/// checked before the coordinates, and the coordinates before the kind is
/// resolved, so a payload with neither reports `GeometryTypeRequired`.
pub fn decode_geometry(
    kind: Option<&str>,
    coordinates: Option<&Value>,
) -> Result<Geometry, ValidationError> {
    let kind = match kind {
        Some(k) if !k.is_empty() => k,
        _ => return Err(ValidationError::GeometryTypeRequired),
    };
    let coordinates = coordinates.ok_or(ValidationError::CoordinatesRequired)?;

    match GeometryKind::parse(kind) {
        Some(GeometryKind::Polygon) => decode_polygon(coordinates).map(Geometry::Polygon),
        Some(GeometryKind::MultiPolygon) => {
            decode_multi_polygon(coordinates).map(Geometry::MultiPolygon)
        }
        None => Err(ValidationError::UnsupportedGeometryType {
            kind: kind.to_string(),
        }),
    }
}

fn decode_polygon(coordinates: &Value) -> Result<Polygon, ValidationError> {
    let rings = Vec::<Ring>::deserialize(coordinates)
        .map_err(|_| ValidationError::InvalidPolygonCoordinates)?;
    Polygon::new(rings)
}

fn decode_multi_polygon(coordinates: &Value) -> Result<MultiPolygon, ValidationError> {
    let polygons = Vec::<Vec<Ring>>::deserialize(coordinates)
        .map_err(|_| ValidationError::InvalidMultiPolygonCoordinates)?;
    MultiPolygon::new(polygons)
}
