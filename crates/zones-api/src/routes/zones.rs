//! # Zone API
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | POST | `/zones` | GeoJSON FeatureCollection | 201 `{"id": n}` |
//! | GET | `/zones?ids=1,2` | | 200 `[{id, geojson}]` |
//! | DELETE | `/zones/{id}` | | 204 |
//! | POST | `/zones/contains` | `{ids, point}` | 200 `[{id, contains}]` |
//! | POST | `/zones/contains/batch` | `[{key, ids, point}]` | 200 `[{key, contains}]` |

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use zones_batch::Deadline;
use zones_core::{
    BatchQueryRequest, BatchResult, ContainsQueryRequest, FeatureCollection,
    RawFeatureCollection, ValidationError, ZoneContainment, ZoneGeoJson, ZoneId, ZoneIdSet,
};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Response to a successful zone creation.
#[derive(Debug, Serialize)]
pub struct CreateZoneResponse {
    pub id: ZoneId,
}

/// Query string of `GET /zones`.
#[derive(Debug, Default, Deserialize)]
pub struct ZonesParams {
    #[serde(default)]
    pub ids: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/zones", post(create_zone).get(get_zones))
        .route("/zones/{id}", delete(delete_zone))
        .route("/zones/contains", post(contains_point))
        .route("/zones/contains/batch", post(contains_batch))
}

/// POST /zones — validate a feature collection and store it as one zone.
async fn create_zone(
    State(state): State<AppState>,
    body: Result<Json<RawFeatureCollection>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateZoneResponse>), AppError> {
    let raw = extract_json(body)?;
    let collection = FeatureCollection::assemble(raw)?;

    let id = state.store.save_zone(&collection).await?;
    tracing::info!(zone_id = %id, features = collection.len(), "zone created");

    Ok((StatusCode::CREATED, Json(CreateZoneResponse { id })))
}

/// GET /zones?ids=1,2 — render stored zones as GeoJSON.
async fn get_zones(
    State(state): State<AppState>,
    params: Result<Query<ZonesParams>, QueryRejection>,
) -> Result<Json<Vec<ZoneGeoJson>>, AppError> {
    let Query(params) =
        params.map_err(|_| AppError::Validation(ValidationError::InvalidZoneId))?;
    let ids = ZoneIdSet::from_query(&params.ids)?;

    let zones = state.store.zones_by_ids(&ids).await?;
    Ok(Json(zones))
}

/// DELETE /zones/{id} — delete a zone. Deleting a missing zone succeeds.
async fn delete_zone(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: ZoneId = raw_id.parse()?;

    let existed = state.store.delete_zone(id).await?;
    tracing::info!(zone_id = %id, existed, "zone deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /zones/contains — per-zone containment of one point.
async fn contains_point(
    State(state): State<AppState>,
    body: Result<Json<ContainsQueryRequest>, JsonRejection>,
) -> Result<Json<Vec<ZoneContainment>>, AppError> {
    let query = extract_json(body)?.validate()?;

    let results = state
        .store
        .contains_point(&query.zone_ids, query.point)
        .await?;
    Ok(Json(results))
}

/// POST /zones/contains/batch — keyed containment queries on the worker pool.
///
/// The batch is cancelled when the configured deadline passes or when the
/// client goes away and this future is dropped.
async fn contains_batch(
    State(state): State<AppState>,
    body: Result<Json<Vec<BatchQueryRequest>>, JsonRejection>,
) -> Result<Json<Vec<BatchResult>>, AppError> {
    let requests = extract_json(body)?;

    let cancel = CancellationToken::new();
    let _on_drop = cancel.clone().drop_guard();
    let _deadline = Deadline::arm(cancel.clone(), state.batch_timeout());

    let results = state.batch.contains_batch(requests, &cancel).await?;
    Ok(Json(results))
}
