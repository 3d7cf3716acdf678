//! ML Model Inference
//!
//! Request-time prediction. With a trained artifact the sparse request is
//! expanded into the exact feature vector the scaler was fit with, scaled and
//! passed to the regressor. Without one an analytic estimate is returned.

use std::collections::BTreeMap;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, warn};

use super::{FeatureVector, TrainedArtifact};
use crate::error::{PredictorError, Result};
use crate::features::derivation_for;

/// Raw fields every request must carry. Calendar fields are optional.
pub const REQUIRED_FIELDS: [&str; 4] = [
    "irradiation",
    "ambient_temperature",
    "module_temperature",
    "hour",
];

pub const FALLBACK_LABEL: &str = "Analytic Estimate (Demo)";

/// Sparse field name -> value mapping supplied by a caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionRequest {
    fields: BTreeMap<String, f64>,
}

impl PredictionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    /// Required raw fields must be present and finite
    pub fn validate(&self) -> Result<()> {
        for field in REQUIRED_FIELDS {
            match self.get(field) {
                None => {
                    return Err(PredictorError::InvalidInput(format!(
                        "missing required field '{}'",
                        field
                    )))
                }
                Some(value) if !value.is_finite() => {
                    return Err(PredictorError::InvalidInput(format!(
                        "field '{}' must be a finite number",
                        field
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn required(&self, name: &str) -> Result<f64> {
        self.get(name)
            .ok_or_else(|| PredictorError::InvalidInput(format!("missing required field '{}'", name)))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for PredictionRequest {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PredictionSource {
    TrainedModel,
    AnalyticFallback,
}

impl PredictionSource {
    pub fn note(&self) -> &'static str {
        match self {
            PredictionSource::TrainedModel => "Using trained model",
            PredictionSource::AnalyticFallback => "Using analytic solar simulation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Non-negative AC power, rounded to two decimals
    pub value: f64,
    pub source: PredictionSource,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Half-width of the uniform noise added to the estimate
    pub jitter: f64,
    pub max_output: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            jitter: 15.0,
            max_output: 500.0,
        }
    }
}

/// Closed-form estimate used when no trained artifact is available
#[derive(Debug, Clone, Default)]
pub struct AnalyticFallback {
    config: FallbackConfig,
}

impl AnalyticFallback {
    pub fn new(config: FallbackConfig) -> Self {
        Self { config }
    }

    /// Deterministic part of the estimate, before jitter and clamping.
    ///
    /// NOTE: `temp_effect` is only non-zero below 25 °C, which boosts cold
    /// panels instead of derating hot ones. Kept as-is for compatibility
    /// with previously published estimates.
    pub fn base_estimate(irradiation: f64, module_temperature: f64, hour: f64) -> f64 {
        let base = irradiation * 280.0;
        let time_factor = 1.0 - (hour - 12.0).abs() / 12.0;
        let temp_effect = ((module_temperature - 25.0) * -0.005).max(0.0);
        base * time_factor * (1.0 + temp_effect)
    }

    pub fn estimate<R: Rng + ?Sized>(&self, request: &PredictionRequest, rng: &mut R) -> Result<f64> {
        let raw = Self::base_estimate(
            request.required("irradiation")?,
            request.required("module_temperature")?,
            request.required("hour")?,
        );
        let noise = if self.config.jitter > 0.0 {
            rng.gen_range(-self.config.jitter..=self.config.jitter)
        } else {
            0.0
        };
        Ok((raw + noise).clamp(0.0, self.config.max_output.max(0.0)))
    }
}

/// Expand a sparse request into a vector matching `feature_names` exactly:
/// supplied values first, then the feature's derivation rule, then zero.
pub fn reconstruct_features(feature_names: &[String], request: &PredictionRequest) -> Result<FeatureVector> {
    let values = feature_names
        .iter()
        .map(|name| {
            request
                .get(name)
                .or_else(|| derivation_for(name).evaluate(name, |n| request.get(n)))
                .unwrap_or(0.0)
        })
        .collect();
    FeatureVector::new(values, feature_names.to_vec())
}

/// Serves predictions from a loaded artifact or the analytic fallback.
/// Read-only after construction; share it behind an `Arc`.
#[derive(Debug)]
pub struct InferenceAdapter {
    artifact: Option<TrainedArtifact>,
    fallback: AnalyticFallback,
}

impl InferenceAdapter {
    pub fn new(artifact: Option<TrainedArtifact>, fallback: FallbackConfig) -> Self {
        Self {
            artifact,
            fallback: AnalyticFallback::new(fallback),
        }
    }

    /// Load the artifact from `models_dir`. A missing artifact switches to
    /// the analytic fallback; a corrupt one is an error.
    pub fn load(models_dir: &Path, fallback: FallbackConfig) -> Result<Self> {
        let artifact = match TrainedArtifact::load(models_dir) {
            Ok(artifact) => Some(artifact),
            Err(PredictorError::ArtifactUnavailable(dir)) => {
                warn!(dir = %dir.display(), "no trained artifact, serving analytic estimates");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self::new(artifact, fallback))
    }

    pub fn artifact(&self) -> Option<&TrainedArtifact> {
        self.artifact.as_ref()
    }

    pub fn is_fallback(&self) -> bool {
        self.artifact.is_none()
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        self.predict_with_rng(request, &mut rand::thread_rng())
    }

    pub fn predict_with_rng<R: Rng + ?Sized>(
        &self,
        request: &PredictionRequest,
        rng: &mut R,
    ) -> Result<PredictionResult> {
        request.validate()?;

        let result = match &self.artifact {
            Some(artifact) => {
                let features = reconstruct_features(artifact.feature_names(), request)?;
                let scaled = artifact.scaler.transform_vector(&features)?;
                let raw = artifact.model.predict_one(&scaled.features)?;
                PredictionResult {
                    value: round2(raw.max(0.0)),
                    source: PredictionSource::TrainedModel,
                    label: artifact.label().to_string(),
                }
            }
            None => PredictionResult {
                value: round2(self.fallback.estimate(request, rng)?),
                source: PredictionSource::AnalyticFallback,
                label: FALLBACK_LABEL.to_string(),
            },
        };

        debug!(value = result.value, source = %result.source, "prediction");
        Ok(result)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
