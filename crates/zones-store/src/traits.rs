//! # Store Capability Traits
//!
//! The seams between the service and the spatial store. All traits require
//! `Send + Sync` so implementations can be shared across worker tasks, and
//! all are object-safe (`async_trait`) except the two associated-type traits
//! used generically by the batch coordinator.

use async_trait::async_trait;
use zones_core::{FeatureCollection, Point, ZoneContainment, ZoneGeoJson, ZoneId, ZoneIdSet};

use crate::error::StoreError;

/// Persists validated zones.
#[async_trait]
pub trait ZoneSaver: Send + Sync {
    /// Store every feature of `collection` under one new zone, atomically.
    async fn save_zone(&self, collection: &FeatureCollection) -> Result<ZoneId, StoreError>;
}

/// Reads zones back.
#[async_trait]
pub trait ZoneProvider: Send + Sync {
    /// Render each existing zone in `ids` as a GeoJSON feature collection,
    /// in `ids` order. Unknown ids are omitted.
    async fn zones_by_ids(&self, ids: &ZoneIdSet) -> Result<Vec<ZoneGeoJson>, StoreError>;

    /// Per-zone containment of `point`, in `ids` order. Unknown ids are
    /// omitted.
    async fn contains_point(
        &self,
        ids: &ZoneIdSet,
        point: Point,
    ) -> Result<Vec<ZoneContainment>, StoreError>;

    /// Number of stored zones.
    async fn count_zones(&self) -> Result<i64, StoreError>;
}

/// Deletes zones.
#[async_trait]
pub trait ZoneDeleter: Send + Sync {
    /// Delete a zone and its geometries. Returns `false` if it did not exist.
    async fn delete_zone(&self, id: ZoneId) -> Result<bool, StoreError>;
}

/// Everything the HTTP layer needs from the store.
pub trait ZoneStore: ZoneSaver + ZoneProvider + ZoneDeleter {}

impl<T: ZoneSaver + ZoneProvider + ZoneDeleter + ?Sized> ZoneStore for T {}

/// Source of connections for batch workers.
#[async_trait]
pub trait ConnectionPool: Send + Sync + 'static {
    /// The connection handed to one worker. Dropping it returns it to the pool.
    type Connection: Send + 'static;

    /// Acquire one connection, waiting if the pool is exhausted.
    async fn acquire(&self) -> Result<Self::Connection, StoreError>;

    /// Maximum number of connections the pool will hand out at once, if
    /// bounded.
    fn capacity(&self) -> Option<usize> {
        None
    }
}

/// Answers a single containment question over an externally supplied
/// connection.
///
/// Implementations must not mutate shared state and must be safe to call
/// concurrently on distinct connections. They never acquire or release
/// connections themselves.
#[async_trait]
pub trait ContainmentEvaluator: Send + Sync + 'static {
    /// The connection type this evaluator runs its query on.
    type Connection: Send;

    /// `true` iff the union of the persisted geometries of the zones in
    /// `zone_ids` contains `point`. Zones that do not exist contribute
    /// nothing, so a set of unknown ids yields `false`.
    async fn evaluate(
        &self,
        conn: &mut Self::Connection,
        zone_ids: &ZoneIdSet,
        point: Point,
    ) -> Result<bool, StoreError>;
}
