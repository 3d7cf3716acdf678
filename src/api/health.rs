use axum::{extract::State, Json};
use serde::Serialize;

use super::error::ApiError;
use crate::ml::{ArtifactManifest, ModelKind, RegressionMetrics};
use crate::serving::ServingContext;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    /// `trained` or `fallback`
    mode: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// GET /healthz
pub async fn healthz(State(ctx): State<ServingContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mode: if ctx.is_fallback() { "fallback" } else { "trained" },
        timestamp: chrono::Utc::now(),
    })
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub model: ModelKind,
    pub label: &'static str,
    pub feature_names: Vec<String>,
    pub manifest: Option<ArtifactManifest>,
    pub metrics: std::collections::BTreeMap<ModelKind, RegressionMetrics>,
}

/// GET /model - description of the loaded artifact
pub async fn model_info(State(ctx): State<ServingContext>) -> Result<Json<ModelInfo>, ApiError> {
    let artifact = ctx
        .adapter
        .artifact()
        .ok_or_else(|| ApiError::NotFound("no trained model loaded".to_string()))?;

    Ok(Json(ModelInfo {
        model: artifact.model.kind(),
        label: artifact.label(),
        feature_names: artifact.feature_names().to_vec(),
        manifest: artifact.manifest.clone(),
        metrics: artifact.metrics.clone(),
    }))
}
