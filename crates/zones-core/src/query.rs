//! # Containment Query Types
//!
//! Zone identifiers, points, and the single and batch containment queries
//! built from them. Raw request shapes (`*Request`, [`PointInput`]) are what
//! the HTTP boundary deserializes; the validated types can only be reached
//! through their constructors.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Latitude bound, inclusive.
pub const MAX_LATITUDE: f64 = 90.0;

/// Longitude bound, inclusive.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Identifier of a stored zone. Always `>= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ZoneId(i64);

impl ZoneId {
    /// Validate a raw id.
    pub fn new(raw: i64) -> Result<Self, ValidationError> {
        if raw < 1 {
            return Err(ValidationError::InvalidZoneId);
        }
        Ok(Self(raw))
    }

    /// The raw integer value.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ZoneId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: i64 = s
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidZoneId)?;
        Self::new(raw)
    }
}

/// A non-empty set of zone ids that remembers first-insertion order.
///
/// Duplicates are collapsed. Order does not matter for evaluation but is
/// used as output order wherever results are listed per id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneIdSet {
    ids: Vec<ZoneId>,
}

impl ZoneIdSet {
    /// Validate a raw id list: it must be non-empty and every id must be
    /// positive.
    pub fn parse(raw: &[i64]) -> Result<Self, ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::EmptyIds);
        }
        let ids = raw
            .iter()
            .map(|&id| ZoneId::new(id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::dedup(ids))
    }

    /// Parse a comma-separated list such as the `ids` query parameter.
    pub fn from_query(raw: &str) -> Result<Self, ValidationError> {
        if raw.trim().is_empty() {
            return Err(ValidationError::EmptyIds);
        }
        let ids = raw
            .split(',')
            .map(str::parse::<ZoneId>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::dedup(ids))
    }

    fn dedup(ids: Vec<ZoneId>) -> Self {
        let mut seen = HashSet::with_capacity(ids.len());
        let ids = ids.into_iter().filter(|id| seen.insert(*id)).collect();
        Self { ids }
    }

    /// Ids in first-insertion order.
    pub fn as_slice(&self) -> &[ZoneId] {
        &self.ids
    }

    /// Raw integer ids, for binding to a store query.
    pub fn to_raw(&self) -> Vec<i64> {
        self.ids.iter().map(ZoneId::get).collect()
    }

    /// Number of distinct ids. Never zero.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set has no ids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A WGS84 point with validated coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    lon: f64,
    lat: f64,
}

impl Point {
    /// Validate a point. Latitude is checked first; NaN fails both checks.
    pub fn new(lon: f64, lat: f64) -> Result<Self, ValidationError> {
        if !(-MAX_LATITUDE..=MAX_LATITUDE).contains(&lat) {
            return Err(ValidationError::InvalidLatitude);
        }
        if !(-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&lon) {
            return Err(ValidationError::InvalidLongitude);
        }
        Ok(Self { lon, lat })
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }
}

/// Raw point as received on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointInput {
    pub lon: f64,
    pub lat: f64,
}

impl PointInput {
    pub fn validate(self) -> Result<Point, ValidationError> {
        Point::new(self.lon, self.lat)
    }
}

/// Raw single containment request: `{ids: [...], point: {lon, lat}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainsQueryRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
    pub point: PointInput,
}

impl ContainsQueryRequest {
    /// Ids are validated before the point.
    pub fn validate(self) -> Result<ContainsQuery, ValidationError> {
        let zone_ids = ZoneIdSet::parse(&self.ids)?;
        let point = self.point.validate()?;
        Ok(ContainsQuery { zone_ids, point })
    }
}

/// Validated single containment query.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainsQuery {
    pub zone_ids: ZoneIdSet,
    pub point: Point,
}

/// Per-zone answer to a single containment query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneContainment {
    pub id: i64,
    pub contains: bool,
}

/// A stored zone rendered back as GeoJSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneGeoJson {
    pub id: i64,
    pub geojson: Value,
}

/// Raw batch entry: `{key, ids: [...], point: {lon, lat}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchQueryRequest {
    pub key: String,
    #[serde(default)]
    pub ids: Vec<i64>,
    pub point: PointInput,
}

/// Validated batch entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchQuery {
    pub key: String,
    pub zone_ids: ZoneIdSet,
    pub point: Point,
}

/// Answer for one batch entry, correlated by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub key: String,
    pub contains: bool,
}

/// Validate a whole batch, rejecting it on the first invalid entry.
///
/// Checks, in order: the batch is non-empty, then for each entry its key is
/// unseen, its ids form a valid [`ZoneIdSet`], and its point is in range.
/// The key set is local to the call.
pub fn validate_batch(
    requests: Vec<BatchQueryRequest>,
) -> Result<Vec<BatchQuery>, ValidationError> {
    if requests.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }

    let mut keys: HashSet<String> = HashSet::with_capacity(requests.len());
    let mut queries = Vec::with_capacity(requests.len());
    for request in requests {
        if !keys.insert(request.key.clone()) {
            return Err(ValidationError::DuplicateKey { key: request.key });
        }
        let zone_ids = ZoneIdSet::parse(&request.ids)?;
        let point = request.point.validate()?;
        queries.push(BatchQuery {
            key: request.key,
            zone_ids,
            point,
        });
    }
    Ok(queries)
}
