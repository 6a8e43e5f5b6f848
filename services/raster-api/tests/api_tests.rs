//! Router-level tests driving the handlers with `oneshot`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use raster_api::config::ServiceConfig;
use raster_api::insitu::{InsituRecord, InsituTable};
use raster_api::state::AppState;
use raster_api::build_router;
use raster_sampler::{MemoryRasterStore, RasterStore};
use test_utils::fixtures::{self, pixel_center, NODATA_SENTINEL};
use test_utils::GeoTiffBuilder;

fn router_with(store: MemoryRasterStore, config: ServiceConfig, insitu: Option<InsituTable>) -> Router {
    let store: Arc<dyn RasterStore> = Arc::new(store);
    build_router(Arc::new(AppState::new(store, config, insitu)), None)
}

fn memory_router() -> Router {
    let store = MemoryRasterStore::new()
        .with_object("four.tif", fixtures::four_pixels().to_bytes())
        .with_object("seq.tif", fixtures::sequential_10x10().to_bytes())
        .with_object("nodata.tif", fixtures::all_nodata_4x4().to_bytes());
    router_with(store, ServiceConfig::default(), None)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_get_value() {
    let (status, body) = get(memory_router(), "/get_value?url=four.tif&lat=0.5&lon=1.5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"value": 4.0, "lat": 0.5, "lon": 1.5}));
}

#[tokio::test]
async fn test_get_value_nodata_is_404() {
    let (status, body) = get(memory_router(), "/get_value?url=nodata.tif&lat=1.5&lon=1.5").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "No data at this location"}));
}

#[tokio::test]
async fn test_get_value_missing_raster_is_404() {
    let (status, _) = get(memory_router(), "/get_value?url=absent.tif&lat=0.5&lon=0.5").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_value_bad_parameters() {
    let (status, body) = get(memory_router(), "/get_value?url=four.tif&lat=0.5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required parameter: lon");

    let (status, _) = get(memory_router(), "/get_value?url=four.tif&lat=95&lon=0.5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_transect() {
    let (start_lat, start_lon) = pixel_center(10, 2, 0);
    let (end_lat, end_lon) = pixel_center(10, 2, 9);
    let uri = format!(
        "/get_transect?url=seq.tif&start_lat={start_lat}&start_lon={start_lon}&end_lat={end_lat}&end_lon={end_lon}"
    );
    let (status, body) = get(memory_router(), &uri).await;

    assert_eq!(status, StatusCode::OK);
    let values: Vec<f64> = serde_json::from_value(body["values"].clone()).unwrap();
    let distances: Vec<f64> = serde_json::from_value(body["distances"].clone()).unwrap();
    assert_eq!(values, (20..30).map(f64::from).collect::<Vec<_>>());
    assert_eq!(values.len(), distances.len());
    assert_eq!(body["start_point"], json!({"lat": start_lat, "lon": start_lon}));
    assert_eq!(body["end_point"], json!({"lat": end_lat, "lon": end_lon}));
}

#[tokio::test]
async fn test_get_transect_without_data() {
    let (status, body) = get(
        memory_router(),
        "/get_transect?url=nodata.tif&start_lat=0.5&start_lon=0.5&end_lat=3.5&end_lon=3.5",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No valid data along transect");
}

#[tokio::test]
async fn test_timeseries_skips_nodata_day() {
    let dir = tempfile::tempdir().unwrap();
    let (lat, lon) = pixel_center(2, 0, 1);

    let day = |value: f32| GeoTiffBuilder::new(2, 2).data(vec![0.0, value, 0.0, 0.0]);
    day(1.5).write_to(dir.path().join("2024-06-01_chl.tif"));
    day(NODATA_SENTINEL).write_to(dir.path().join("2024-06-02_chl.tif"));
    day(3.5).write_to(dir.path().join("2024-06-03_chl.tif"));

    let config = ServiceConfig {
        url_template: format!("file://{}/{{date}}_{{variable}}.tif", dir.path().display()),
        ..ServiceConfig::default()
    };
    let app = build_router(Arc::new(AppState::from_config(config, None).unwrap()), None);

    let uri = format!(
        "/get_timeseries?lat={lat}&lon={lon}&variable=chl&start_date=2024-06-01&end_date=2024-06-03"
    );
    let (status, body) = get(app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["values"], json!([1.5, 3.5]));
    assert_eq!(body["dates"], json!(["2024-06-01", "2024-06-03"]));
    assert_eq!(body["location"], json!({"lat": lat, "lon": lon}));
    assert_eq!(body["variable"], "chl");
}

#[tokio::test]
async fn test_timeseries_errors() {
    let config = ServiceConfig {
        url_template: "{date}_{variable}.tif".to_string(),
        max_timeseries_days: 5,
        ..ServiceConfig::default()
    };
    let app = router_with(MemoryRasterStore::new(), config, None);

    let (status, _) = get(
        app.clone(),
        "/get_timeseries?lat=1&lon=1&variable=chl&start_date=2024-13-01&end_date=2024-06-03",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(
        app.clone(),
        "/get_timeseries?lat=1&lon=1&variable=chl&start_date=2024-06-01&end_date=2024-06-30",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(
        app,
        "/get_timeseries?lat=1&lon=1&variable=chl&start_date=2024-06-01&end_date=2024-06-03",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No data available for the selected date range");
}

#[tokio::test]
async fn test_polygon_stats() {
    let polygon = json!({
        "type": "Polygon",
        "coordinates": [[[-0.5, -0.5], [2.5, -0.5], [2.5, 2.5], [-0.5, 2.5], [-0.5, -0.5]]]
    });
    let (status, body) = post_json(
        memory_router(),
        "/get_polygon_stats",
        json!({"url": "four.tif", "polygon": polygon}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);
    assert_eq!(body["mean"], 2.5);
    assert_eq!(body["min"], 1.0);
    assert_eq!(body["max"], 4.0);
    assert_eq!(
        body["bounds"],
        json!({"min_x": 0.0, "min_y": 0.0, "max_x": 2.0, "max_y": 2.0})
    );
    assert_eq!(body["crs"], "EPSG:4326");
}

#[tokio::test]
async fn test_polygon_stats_errors() {
    let outside = json!({
        "type": "Polygon",
        "coordinates": [[[50, 50], [51, 50], [51, 51], [50, 51], [50, 50]]]
    });
    let (status, body) = post_json(
        memory_router(),
        "/get_polygon_stats",
        json!({"url": "four.tif", "polygon": outside}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], body["error"]);

    let (status, _) = post_json(
        memory_router(),
        "/get_polygon_stats",
        json!({"url": "four.tif", "polygon": {"type": "Point", "coordinates": [1, 1]}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        memory_router(),
        "/get_polygon_stats",
        json!({"url": "nodata.tif", "polygon": {
            "type": "Polygon",
            "coordinates": [[[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]]]
        }}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "raster has no valid data");

    let (status, _) = post_json(
        memory_router(),
        "/get_polygon_stats",
        json!({"url": "missing.tif", "polygon": {
            "type": "Polygon",
            "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]
        }}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

fn insitu_table() -> InsituTable {
    let record = |date: &str, lat: f64, value: f64| InsituRecord {
        variable: Some("chl".to_string()),
        date: Some(date.to_string()),
        lat: Some(lat),
        lon: Some(-72.9),
        value: Some(value),
    };
    InsituTable::from_records([
        record("2024-06-03", 41.0, 2.0),
        record("2024-06-01 10:30:00", 41.1, 3.0),
        record("2024-06-01", 41.2, 4.0),
    ])
}

#[tokio::test]
async fn test_insitu_routes() {
    let app = router_with(MemoryRasterStore::new(), ServiceConfig::default(), Some(insitu_table()));

    let (status, body) = get(app.clone(), "/get_insitu_data?variable=chl&date=2024-06-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["lat"], 41.1);
    assert_eq!(body["date"], "2024-06-01");

    let (status, body) = get(app.clone(), "/get_available_dates?variable=chl").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dates"], json!(["2024-06-01", "2024-06-03"]));

    let (status, body) = get(app, "/get_insitu_data?variable=chl&date=June").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid date: June");
}

#[tokio::test]
async fn test_insitu_routes_unavailable_without_table() {
    let (status, body) = get(memory_router(), "/get_available_dates?variable=chl").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "In-situ data is not loaded");
}

#[tokio::test]
async fn test_health_and_ready() {
    let (status, body) = get(memory_router(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let app = router_with(MemoryRasterStore::new(), ServiceConfig::default(), Some(insitu_table()));
    let (_, body) = get(app, "/ready").await;
    assert_eq!(body, json!({"ready": true, "insitu": true}));

    let (status, _) = get(memory_router(), "/metrics").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
