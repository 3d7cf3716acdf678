pub mod error;
pub mod health;
pub mod predict;
pub mod series;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::serving::ServingContext;

pub fn router(ctx: ServingContext, request_timeout: Duration) -> Router {
    Router::new()
        .route("/predict", post(predict::predict))
        .route("/series", get(series::series))
        .route("/model", get(health::model_info))
        .route("/healthz", get(health::healthz))
        .with_state(ctx)
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
                .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout)),
        )
        .layer(TraceLayer::new_for_http())
}
