//! Machine Learning Module
//!
//! Offline training and request-time inference for AC power prediction:
//! - Min-max scaling fit on the training partition
//! - Random forest (primary) and gradient-boosted trees (secondary) regressors
//! - Artifact persistence and loading
//! - Feature-vector reconstruction and the analytic fallback estimate

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{PredictorError, Result};

pub mod artifact;
#[cfg(feature = "boosting")]
pub mod boosting;
pub mod inference;
pub mod metrics;
pub mod scaler;
pub mod smartcore;
pub mod split;
pub mod training;

pub use artifact::{ArtifactManifest, TrainedArtifact};
pub use inference::{FallbackConfig, InferenceAdapter, PredictionRequest, PredictionResult, PredictionSource};
pub use metrics::RegressionMetrics;
pub use scaler::MinMaxScaler;
pub use training::{TrainingConfig, TrainingPipeline, TrainingReport};

/// Regressor families the pipeline can fit
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    GradientBoosting,
}

impl ModelKind {
    /// Human readable estimator name
    pub fn label(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "Random Forest",
            ModelKind::GradientBoosting => "Gradient Boosting",
        }
    }

    /// File name of the persisted model blob
    pub fn file_name(&self) -> String {
        format!("{}.bin", self)
    }
}

/// Fitted regressor
pub trait Regressor: Send + Sync {
    /// Predict one value per (already scaled) row
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>>;

    fn kind(&self) -> ModelKind;

    fn predict_one(&self, row: &[f64]) -> Result<f64> {
        self.predict(&[row.to_vec()])?
            .first()
            .copied()
            .ok_or_else(|| PredictorError::Model("regressor returned no prediction".to_string()))
    }
}

/// Named feature values in a fixed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureVector {
    pub fn new(features: Vec<f64>, feature_names: Vec<String>) -> Result<Self> {
        if features.len() != feature_names.len() {
            return Err(PredictorError::InputSizeMismatch {
                expected: feature_names.len(),
                actual: features.len(),
            });
        }
        Ok(Self {
            features,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Row-major matrix to smartcore's dense matrix
pub(crate) fn to_dense(rows: &[Vec<f64>]) -> Result<::smartcore::linalg::basic::matrix::DenseMatrix<f64>> {
    let n_samples = rows.len();
    let n_features = rows.first().map(Vec::len).unwrap_or(0);
    if n_samples == 0 || n_features == 0 {
        return Err(PredictorError::EmptyDataset);
    }

    let mut flat = Vec::with_capacity(n_samples * n_features);
    for row in rows {
        if row.len() != n_features {
            return Err(PredictorError::InputSizeMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }
        flat.extend_from_slice(row);
    }

    Ok(::smartcore::linalg::basic::matrix::DenseMatrix::new(
        n_samples, n_features, flat, false,
    ))
}
