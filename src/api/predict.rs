//! POST /predict

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::ApiError;
use crate::ml::{PredictionRequest, PredictionResult, PredictionSource};
use crate::serving::ServingContext;

/// Request body. Sensor readings and `hour` are required by the inference
/// layer; calendar fields are optional and feed derived features.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PredictRequest {
    #[validate(range(min = 0.0))]
    pub irradiation: Option<f64>,
    pub ambient_temperature: Option<f64>,
    pub module_temperature: Option<f64>,
    #[validate(range(min = 0, max = 23))]
    pub hour: Option<u32>,
    #[validate(range(min = 1, max = 31))]
    pub day: Option<u32>,
    #[validate(range(min = 1, max = 12))]
    pub month: Option<u32>,
}

impl PredictRequest {
    pub fn into_request(self) -> PredictionRequest {
        let fields = [
            ("irradiation", self.irradiation),
            ("ambient_temperature", self.ambient_temperature),
            ("module_temperature", self.module_temperature),
            ("hour", self.hour.map(f64::from)),
            ("day", self.day.map(f64::from)),
            ("month", self.month.map(f64::from)),
        ];
        fields
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: f64,
    pub model_used: String,
    pub note: String,
    pub source: PredictionSource,
}

impl From<PredictionResult> for PredictResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            prediction: result.value,
            note: result.source.note().to_string(),
            model_used: result.label,
            source: result.source,
        }
    }
}

pub async fn predict(
    State(ctx): State<ServingContext>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(body) = payload?;
    body.validate()?;

    let result = ctx.predict(&body.into_request())?;
    tracing::info!(prediction = result.value, model = %result.label, "prediction served");
    Ok(Json(result.into()))
}
