//! # PostGIS Store
//!
//! [`PgZoneStore`] implements every store capability over a `sqlx::PgPool`.
//!
//! Zones live in two tables: `zone` (one row per zone) and `zone_geometry`
//! (one row per feature, SRID 4326, properties as JSONB). Geometries are
//! shipped as WKB and parsed by PostGIS, which is also where ring validity
//! is enforced; its rejections surface as [`StoreError::GeometryRejected`].

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::Postgres;
use zones_core::{FeatureCollection, Point, ZoneContainment, ZoneGeoJson, ZoneId, ZoneIdSet};

use crate::error::StoreError;
use crate::traits::{ConnectionPool, ContainmentEvaluator, ZoneDeleter, ZoneProvider, ZoneSaver};
use crate::wkb;

const INSERT_ZONE: &str = "INSERT INTO zone DEFAULT VALUES RETURNING id";

const INSERT_GEOMETRY: &str = "INSERT INTO zone_geometry (zone_id, geom, properties)
     VALUES ($1, ST_GeomFromWKB($2, 4326), $3)";

const SELECT_ZONES: &str = "SELECT zg.zone_id AS id,
            jsonb_build_object(
                'type', 'FeatureCollection',
                'features', jsonb_agg(
                    jsonb_build_object(
                        'type', 'Feature',
                        'geometry', ST_AsGeoJSON(zg.geom)::jsonb,
                        'properties', zg.properties
                    ) ORDER BY zg.id
                )
            ) AS geojson
     FROM zone_geometry zg
     WHERE zg.zone_id = ANY($1)
     GROUP BY zg.zone_id";

const SELECT_CONTAINS_PER_ZONE: &str = "SELECT zone_id AS id,
            COALESCE(ST_Contains(ST_Union(geom), ST_SetSRID(ST_MakePoint($2, $3), 4326)), false) AS contains
     FROM zone_geometry
     WHERE zone_id = ANY($1)
     GROUP BY zone_id";

const SELECT_CONTAINS_UNION: &str = "SELECT COALESCE(ST_Contains(ST_Union(geom), ST_SetSRID(ST_MakePoint($2, $3), 4326)), false)
     FROM zone_geometry
     WHERE zone_id = ANY($1)";

/// Connection pool settings.
#[derive(Clone)]
pub struct PoolSettings {
    pub dsn: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

// The DSN usually carries a password.
impl fmt::Debug for PoolSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolSettings")
            .field("dsn", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

/// Open a connection pool.
pub async fn connect(settings: &PoolSettings) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(&settings.dsn)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;

    tracing::info!(
        max_connections = settings.max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// PostGIS-backed zone store.
#[derive(Debug, Clone)]
pub struct PgZoneStore {
    pool: PgPool,
}

impl PgZoneStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct ZoneRow {
    id: i64,
    geojson: Value,
}

#[derive(sqlx::FromRow)]
struct ContainsRow {
    id: i64,
    contains: bool,
}

/// Reorder rows keyed by zone id into the order of `ids`, dropping ids the
/// store did not return.
fn in_request_order<T>(ids: &ZoneIdSet, rows: Vec<(i64, T)>) -> Vec<(i64, T)> {
    let mut by_id: HashMap<i64, T> = rows.into_iter().collect();
    ids.as_slice()
        .iter()
        .filter_map(|id| by_id.remove(&id.get()).map(|row| (id.get(), row)))
        .collect()
}

#[async_trait]
impl ZoneSaver for PgZoneStore {
    #[tracing::instrument(skip_all, fields(features = collection.len()))]
    async fn save_zone(&self, collection: &FeatureCollection) -> Result<ZoneId, StoreError> {
        // Dropping the transaction before commit rolls it back.
        let mut tx = self.pool.begin().await?;

        let zone_id: i64 = sqlx::query_scalar(INSERT_ZONE)
            .fetch_one(&mut *tx)
            .await?;

        for feature in collection.features() {
            let bytes = wkb::encode(&feature.geometry)?;
            sqlx::query(INSERT_GEOMETRY)
                .bind(zone_id)
                .bind(bytes)
                .bind(Json(&feature.properties))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::debug!(zone_id, "zone saved");

        ZoneId::new(zone_id)
            .map_err(|_| StoreError::Query(format!("store returned invalid zone id {zone_id}")))
    }
}

#[async_trait]
impl ZoneProvider for PgZoneStore {
    #[tracing::instrument(skip_all, fields(ids = ids.len()))]
    async fn zones_by_ids(&self, ids: &ZoneIdSet) -> Result<Vec<ZoneGeoJson>, StoreError> {
        let rows = sqlx::query_as::<_, ZoneRow>(SELECT_ZONES)
            .bind(ids.to_raw())
            .fetch_all(&self.pool)
            .await?;

        let rows = rows.into_iter().map(|r| (r.id, r.geojson)).collect();
        Ok(in_request_order(ids, rows)
            .into_iter()
            .map(|(id, geojson)| ZoneGeoJson { id, geojson })
            .collect())
    }

    #[tracing::instrument(skip_all, fields(ids = ids.len()))]
    async fn contains_point(
        &self,
        ids: &ZoneIdSet,
        point: Point,
    ) -> Result<Vec<ZoneContainment>, StoreError> {
        let rows = sqlx::query_as::<_, ContainsRow>(SELECT_CONTAINS_PER_ZONE)
            .bind(ids.to_raw())
            .bind(point.lon())
            .bind(point.lat())
            .fetch_all(&self.pool)
            .await?;

        let rows = rows.into_iter().map(|r| (r.id, r.contains)).collect();
        Ok(in_request_order(ids, rows)
            .into_iter()
            .map(|(id, contains)| ZoneContainment { id, contains })
            .collect())
    }

    async fn count_zones(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM zone")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ZoneDeleter for PgZoneStore {
    #[tracing::instrument(skip(self))]
    async fn delete_zone(&self, id: ZoneId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM zone WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ContainmentEvaluator for PgZoneStore {
    type Connection = PoolConnection<Postgres>;

    async fn evaluate(
        &self,
        conn: &mut Self::Connection,
        zone_ids: &ZoneIdSet,
        point: Point,
    ) -> Result<bool, StoreError> {
        let contains: bool = sqlx::query_scalar(SELECT_CONTAINS_UNION)
            .bind(zone_ids.to_raw())
            .bind(point.lon())
            .bind(point.lat())
            .fetch_one(&mut **conn)
            .await?;
        Ok(contains)
    }
}

#[async_trait]
impl ConnectionPool for PgPool {
    type Connection = PoolConnection<Postgres>;

    async fn acquire(&self) -> Result<Self::Connection, StoreError> {
        sqlx::Pool::acquire(self)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    fn capacity(&self) -> Option<usize> {
        usize::try_from(self.options().get_max_connections()).ok()
    }
}
