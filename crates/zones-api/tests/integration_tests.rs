//! # Integration Tests for zones-api
//!
//! Drives the full router with `tower::ServiceExt::oneshot` against an
//! in-memory store. The fake store doubles as the connection pool and
//! containment evaluator, so batch requests run through the real
//! coordinator. Containment in the fake is a bounding-box test, enough to
//! tell "inside the unit square" from "far away".

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use zones_api::{AppConfig, AppState};
use zones_batch::{BatchContainmentCoordinator, CoordinatorConfig};
use zones_core::{
    FeatureCollection, Geometry, Point, Position, ZoneContainment, ZoneGeoJson, ZoneId, ZoneIdSet,
};
use zones_store::{
    ConnectionPool, ContainmentEvaluator, StoreError, ZoneDeleter, ZoneProvider, ZoneSaver,
};

// -- In-memory store ----------------------------------------------------------

#[derive(Default)]
struct MemoryStore {
    zones: Mutex<BTreeMap<i64, FeatureCollection>>,
    next_id: AtomicUsize,
    broken: AtomicBool,
    evaluations: AtomicUsize,
}

impl MemoryStore {
    fn check(&self) -> Result<(), StoreError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StoreError::Query(
                "password authentication failed for user \"zones\"".into(),
            ));
        }
        Ok(())
    }

    fn positions(geometry: &Geometry) -> Vec<Position> {
        match geometry {
            Geometry::Polygon(p) => p.rings().iter().flatten().copied().collect(),
            Geometry::MultiPolygon(mp) => mp.polygons().iter().flatten().flatten().copied().collect(),
        }
    }

    fn zone_contains(collection: &FeatureCollection, point: Point) -> bool {
        collection.features().iter().any(|feature| {
            let positions = Self::positions(&feature.geometry);
            let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
            let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
            for [x, y] in positions {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
            point.lon() > min_x && point.lon() < max_x && point.lat() > min_y && point.lat() < max_y
        })
    }
}

#[async_trait]
impl ZoneSaver for MemoryStore {
    async fn save_zone(&self, collection: &FeatureCollection) -> Result<ZoneId, StoreError> {
        self.check()?;
        // Mirrors the spatial engine's ring check.
        for feature in collection.features() {
            let short_ring = match &feature.geometry {
                Geometry::Polygon(p) => p.rings().iter().any(|r| r.len() < 4),
                Geometry::MultiPolygon(mp) => mp.polygons().iter().flatten().any(|r| r.len() < 4),
            };
            if short_ring {
                return Err(StoreError::GeometryRejected {
                    message: "geometry requires more points".into(),
                });
            }
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        self.zones.lock().unwrap().insert(id, collection.clone());
        Ok(ZoneId::new(id).unwrap())
    }
}

#[async_trait]
impl ZoneProvider for MemoryStore {
    async fn zones_by_ids(&self, ids: &ZoneIdSet) -> Result<Vec<ZoneGeoJson>, StoreError> {
        self.check()?;
        let zones = self.zones.lock().unwrap();
        Ok(ids
            .as_slice()
            .iter()
            .filter_map(|id| {
                zones.get(&id.get()).map(|collection| ZoneGeoJson {
                    id: id.get(),
                    geojson: json!({
                        "type": "FeatureCollection",
                        "features": collection.features().iter().map(|f| json!({
                            "type": "Feature",
                            "geometry": {"type": f.geometry.kind().as_str()},
                            "properties": f.properties,
                        })).collect::<Vec<_>>(),
                    }),
                })
            })
            .collect())
    }

    async fn contains_point(
        &self,
        ids: &ZoneIdSet,
        point: Point,
    ) -> Result<Vec<ZoneContainment>, StoreError> {
        self.check()?;
        let zones = self.zones.lock().unwrap();
        Ok(ids
            .as_slice()
            .iter()
            .filter_map(|id| {
                zones.get(&id.get()).map(|collection| ZoneContainment {
                    id: id.get(),
                    contains: Self::zone_contains(collection, point),
                })
            })
            .collect())
    }

    async fn count_zones(&self) -> Result<i64, StoreError> {
        self.check()?;
        Ok(self.zones.lock().unwrap().len() as i64)
    }
}

#[async_trait]
impl ZoneDeleter for MemoryStore {
    async fn delete_zone(&self, id: ZoneId) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.zones.lock().unwrap().remove(&id.get()).is_some())
    }
}

#[async_trait]
impl ConnectionPool for MemoryStore {
    type Connection = ();

    async fn acquire(&self) -> Result<(), StoreError> {
        self.check()
    }

    fn capacity(&self) -> Option<usize> {
        Some(10)
    }
}

#[async_trait]
impl ContainmentEvaluator for MemoryStore {
    type Connection = ();

    async fn evaluate(
        &self,
        _conn: &mut (),
        zone_ids: &ZoneIdSet,
        point: Point,
    ) -> Result<bool, StoreError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let zones = self.zones.lock().unwrap();
        Ok(zone_ids.as_slice().iter().any(|id| {
            zones
                .get(&id.get())
                .is_some_and(|collection| Self::zone_contains(collection, point))
        }))
    }
}

// -- Helpers ------------------------------------------------------------------

fn test_app() -> (axum::Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let coordinator = BatchContainmentCoordinator::new(
        Arc::clone(&store),
        Arc::clone(&store),
        CoordinatorConfig::default(),
    );
    let state = AppState::new(store.clone(), Arc::new(coordinator), AppConfig::default());
    (zones_api::app(state), store)
}

fn unit_square() -> Value {
    json!([[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]])
}

fn collection(geometry: Value) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": geometry,
            "properties": {"name": "square"}
        }]
    })
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

async fn create_square(app: &axum::Router) -> i64 {
    let body = collection(json!({"type": "Polygon", "coordinates": unit_square()}));
    let (status, body) = send(app, post_json("/zones", &body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness() {
    let (app, _) = test_app();
    let (status, body) = send(&app, get("/health/liveness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_readiness() {
    let (app, _) = test_app();
    let (status, body) = send(&app, get("/health/readiness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ready");
}

#[tokio::test]
async fn test_readiness_fails_when_store_is_down() {
    let (app, store) = test_app();
    store.broken.store(true, Ordering::SeqCst);
    let (status, _) = send(&app, get("/health/readiness")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// -- Create Zone --------------------------------------------------------------

#[tokio::test]
async fn test_create_polygon_zone() {
    let (app, store) = test_app();
    let id = create_square(&app).await;
    assert_eq!(id, 1);
    assert_eq!(store.zones.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_multipolygon_zone() {
    let (app, _) = test_app();
    let body = collection(json!({
        "type": "MultiPolygon",
        "coordinates": [
            [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]],
            [[[10, 0], [11, 0], [11, 1], [10, 1], [10, 0]]]
        ]
    }));
    let (status, body) = send(&app, post_json("/zones", &body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].as_i64().unwrap() >= 1);
}

#[tokio::test]
async fn test_create_zone_malformed_json() {
    let (app, store) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/zones")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "serialization error"}));
    assert!(store.zones.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_zone_validation_messages() {
    let (app, _) = test_app();
    let cases = [
        (
            json!({"type": "FeatureCollection", "features": []}),
            "features is required",
        ),
        (
            json!({"type": "Feature", "features": []}),
            "not valid feature collection type: Feature",
        ),
        (
            collection(json!({"type": "NotPolygon", "coordinates": unit_square()})),
            "unsupported geometry type: NotPolygon",
        ),
        (
            collection(json!({"coordinates": unit_square()})),
            "geometry is required",
        ),
        (
            collection(json!({"type": "Polygon"})),
            "coordinates is required",
        ),
        (
            collection(json!({"type": "Polygon", "coordinates": [[[0, 0, 0]]]})),
            "not valid polygon coordinates",
        ),
        (
            collection(json!({"type": "MultiPolygon", "coordinates": [[0, 0]]})),
            "not valid multipolygon coordinates",
        ),
    ];

    for (payload, message) in cases {
        let (status, body) = send(&app, post_json("/zones", &payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert_eq!(body["error"], message, "payload {payload}");
    }
}

#[tokio::test]
async fn test_create_zone_geometry_rejected_by_store() {
    let (app, store) = test_app();
    let body = collection(json!({"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [0, 0]]]}));
    let (status, body) = send(&app, post_json("/zones", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "geometry requires more points");
    assert!(store.zones.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_zone_store_failure_is_opaque() {
    let (app, store) = test_app();
    store.broken.store(true, Ordering::SeqCst);
    let body = collection(json!({"type": "Polygon", "coordinates": unit_square()}));
    let (status, body) = send(&app, post_json("/zones", &body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "An internal error occurred");
    assert!(!body.to_string().contains("password"));
}

// -- Get Zones ----------------------------------------------------------------

#[tokio::test]
async fn test_get_zones_in_request_order() {
    let (app, _) = test_app();
    let first = create_square(&app).await;
    let second = create_square(&app).await;

    let (status, body) = send(&app, get(&format!("/zones?ids={second},{first},999"))).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|z| z["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![second, first]);
    assert_eq!(body[0]["geojson"]["type"], "FeatureCollection");
    assert_eq!(
        body[0]["geojson"]["features"][0]["properties"]["name"],
        "square"
    );
}

#[tokio::test]
async fn test_get_zones_requires_ids() {
    let (app, _) = test_app();
    for uri in ["/zones", "/zones?ids="] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ids cannot be empty");
    }
}

#[tokio::test]
async fn test_get_zones_rejects_bad_ids() {
    let (app, _) = test_app();
    for uri in ["/zones?ids=abc", "/zones?ids=0", "/zones?ids=1,-3", "/zones?ids=1,,2"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "invalid id", "{uri}");
    }
}

// -- Delete Zone --------------------------------------------------------------

#[tokio::test]
async fn test_delete_zone() {
    let (app, store) = test_app();
    let id = create_square(&app).await;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/zones/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(store.zones.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_missing_zone_is_a_no_op() {
    let (app, _) = test_app();
    let request = Request::builder()
        .method("DELETE")
        .uri("/zones/42")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_delete_zone_rejects_bad_id() {
    let (app, _) = test_app();
    for id in ["abc", "0", "-1"] {
        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/zones/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{id}");
        assert_eq!(body["error"], "invalid id");
    }
}

// -- Single Containment -------------------------------------------------------

#[tokio::test]
async fn test_contains_point() {
    let (app, _) = test_app();
    let id = create_square(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            "/zones/contains",
            &json!({"ids": [id, 77], "point": {"lon": 0.5, "lat": 0.5}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": id, "contains": true}]));

    let (_, body) = send(
        &app,
        post_json(
            "/zones/contains",
            &json!({"ids": [id], "point": {"lon": 50.0, "lat": 50.0}}),
        ),
    )
    .await;
    assert_eq!(body, json!([{"id": id, "contains": false}]));
}

#[tokio::test]
async fn test_contains_point_validation() {
    let (app, _) = test_app();
    let cases = [
        (json!({"ids": [], "point": {"lon": 0, "lat": 0}}), "ids cannot be empty"),
        (json!({"point": {"lon": 0, "lat": 0}}), "ids cannot be empty"),
        (json!({"ids": [0], "point": {"lon": 0, "lat": 0}}), "invalid id"),
        (json!({"ids": [1], "point": {"lon": 0, "lat": 90.5}}), "invalid latitude"),
        (json!({"ids": [1], "point": {"lon": -180.5, "lat": 0}}), "invalid longitude"),
        (json!({"ids": [1]}), "serialization error"),
    ];
    for (payload, message) in cases {
        let (status, body) = send(&app, post_json("/zones/contains", &payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert_eq!(body["error"], message, "payload {payload}");
    }
}

// -- Batch Containment --------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_contains() {
    let (app, _) = test_app();
    let id = create_square(&app).await;

    let batch = json!([
        {"key": "inside", "ids": [id], "point": {"lon": 0.5, "lat": 0.5}},
        {"key": "outside", "ids": [id], "point": {"lon": 5.0, "lat": 5.0}},
        {"key": "unknown", "ids": [404], "point": {"lon": 0.5, "lat": 0.5}}
    ]);
    let (status, body) = send(&app, post_json("/zones/contains/batch", &batch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {"key": "inside", "contains": true},
            {"key": "outside", "contains": false},
            {"key": "unknown", "contains": false}
        ])
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_many_keys() {
    let (app, store) = test_app();
    let id = create_square(&app).await;

    let batch: Vec<Value> = (0..120)
        .map(|i| json!({"key": format!("k{i}"), "ids": [id], "point": {"lon": 0.5, "lat": 0.5}}))
        .collect();
    let (status, body) = send(&app, post_json("/zones/contains/batch", &json!(batch))).await;
    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 120);
    assert!(results.iter().all(|r| r["contains"] == true));
    assert_eq!(store.evaluations.load(Ordering::SeqCst), 120);
}

#[tokio::test]
async fn test_batch_duplicate_key() {
    let (app, store) = test_app();
    let batch = json!([
        {"key": "a", "ids": [1], "point": {"lon": 0, "lat": 0}},
        {"key": "a", "ids": [2], "point": {"lon": 0, "lat": 0}}
    ]);
    let (status, body) = send(&app, post_json("/zones/contains/batch", &batch)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate key");
    assert_eq!(store.evaluations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_batch_empty() {
    let (app, _) = test_app();
    let (status, body) = send(&app, post_json("/zones/contains/batch", &json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty data");
}

#[tokio::test]
async fn test_batch_not_a_list() {
    let (app, _) = test_app();
    let (status, body) = send(
        &app,
        post_json("/zones/contains/batch", &json!({"key": "a"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "serialization error");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_store_failure_is_opaque() {
    let (app, store) = test_app();
    store.broken.store(true, Ordering::SeqCst);
    let batch = json!([
        {"key": "a", "ids": [1], "point": {"lon": 0, "lat": 0}},
        {"key": "b", "ids": [1], "point": {"lon": 0, "lat": 0}}
    ]);
    let (status, body) = send(&app, post_json("/zones/contains/batch", &batch)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "An internal error occurred");
}

// -- Routing ------------------------------------------------------------------

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _) = test_app();
    let (status, _) = send(&app, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
