//! HTTP surface, driven through the router without binding a socket

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

use solar_power_predictor::api;
use solar_power_predictor::config::SeriesConfig;
use solar_power_predictor::ml::{FallbackConfig, InferenceAdapter};
use solar_power_predictor::serving::ServingContext;

fn fallback_app() -> Router {
    let adapter = InferenceAdapter::new(
        None,
        FallbackConfig {
            jitter: 0.0,
            ..Default::default()
        },
    );
    let ctx = ServingContext::new(adapter, None, SeriesConfig::default());
    api::router(ctx, Duration::from_secs(5))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn predict_uses_analytic_fallback_without_model() {
    let body = json!({
        "irradiation": 0.8,
        "ambient_temperature": 25.0,
        "module_temperature": 35.0,
        "hour": 12,
        "day": 15,
        "month": 6
    });
    let (status, json) = send(fallback_app(), post_json("/predict", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["prediction"], 224.0);
    assert_eq!(json["model_used"], "Analytic Estimate (Demo)");
    assert_eq!(json["note"], "Using analytic solar simulation");
    assert_eq!(json["source"], "analytic_fallback");
}

#[tokio::test]
async fn predict_missing_required_field_is_bad_request() {
    let body = json!({"ambient_temperature": 25.0, "module_temperature": 35.0, "hour": 12});
    let (status, json) = send(fallback_app(), post_json("/predict", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("irradiation"));
}

#[tokio::test]
async fn predict_out_of_range_hour_is_rejected() {
    let body = json!({
        "irradiation": 0.8,
        "ambient_temperature": 25.0,
        "module_temperature": 35.0,
        "hour": 24
    });
    let (status, json) = send(fallback_app(), post_json("/predict", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "ValidationError");
}

#[tokio::test]
async fn predict_malformed_json_is_bad_request() {
    let request = Request::post("/predict")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(fallback_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "BadRequest");
}

#[tokio::test]
async fn series_returns_synthetic_points() {
    let request = Request::get("/series").body(Body::empty()).unwrap();
    let (status, json) = send(fallback_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    let timestamps = json["timestamps"].as_array().unwrap();
    assert_eq!(timestamps.len(), 200);
    assert_eq!(json["actual"].as_array().unwrap().len(), 200);
    assert_eq!(json["predicted"].as_array().unwrap().len(), 200);
    assert_eq!(timestamps[0], "2024-06-01 00:00");
    assert_eq!(json["actual"][0], 0.0);
}

#[tokio::test]
async fn model_info_not_found_in_fallback_mode() {
    let request = Request::get("/model").body(Body::empty()).unwrap();
    let (status, json) = send(fallback_app(), request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "NotFound");
}

#[tokio::test]
async fn healthz_reports_mode() {
    let request = Request::get("/healthz").body(Body::empty()).unwrap();
    let (status, json) = send(fallback_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["mode"], "fallback");
}
