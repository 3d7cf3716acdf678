//! Trained artifact persistence
//!
//! Layout of the models directory after a training run:
//! - `scaler.bin`             fitted min-max scaler (bincode)
//! - `random_forest.bin`      primary regressor (bincode)
//! - `gradient_boosting.bin`  secondary regressor, when it was fitted
//! - `metrics.json`           `{model: {MAE, RMSE, R2}}`
//! - `manifest.json`          feature order, recommendation, capability flags
//!
//! Every file is written to a temporary sibling and renamed into place so a
//! reader never observes a partial file.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{info, warn};

use super::smartcore::SmartcoreRandomForest;
use super::{MinMaxScaler, ModelKind, RegressionMetrics, Regressor};
use crate::error::{PredictorError, Result};

pub const SCALER_FILE: &str = "scaler.bin";
pub const METRICS_FILE: &str = "metrics.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Metrics keyed by regressor
pub type MetricsRecord = BTreeMap<ModelKind, RegressionMetrics>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Column order the scaler and regressors were fit with
    pub feature_names: Vec<String>,
    /// Regressor with the higher held-out R²
    pub recommended: ModelKind,
    /// Whether the secondary regressor could be fitted in the training build
    pub secondary_available: bool,
    pub models: Vec<ModelKind>,
    pub trained_at: DateTime<Utc>,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Read-only bundle loaded once per serving process
pub struct TrainedArtifact {
    pub scaler: MinMaxScaler,
    pub model: Box<dyn Regressor>,
    pub manifest: Option<ArtifactManifest>,
    pub metrics: MetricsRecord,
}

impl fmt::Debug for TrainedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedArtifact")
            .field("model", &self.model.kind())
            .field("feature_names", &self.scaler.feature_names())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl TrainedArtifact {
    /// Load the artifact from a models directory. The secondary regressor is
    /// preferred when its blob exists; the scaler and primary regressor are
    /// required, their absence is `ArtifactUnavailable`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let scaler_path = dir.join(SCALER_FILE);
        let primary_path = dir.join(ModelKind::RandomForest.file_name());
        if !scaler_path.exists() || !primary_path.exists() {
            return Err(PredictorError::ArtifactUnavailable(dir.to_path_buf()));
        }

        let scaler: MinMaxScaler = read_blob(&scaler_path)?;
        let model = load_preferred_model(dir)?;

        let manifest = read_json_if_exists::<ArtifactManifest>(&dir.join(MANIFEST_FILE))?;
        let metrics = read_json_if_exists::<MetricsRecord>(&dir.join(METRICS_FILE))?.unwrap_or_default();

        if let Some(manifest) = &manifest {
            if manifest.feature_names != scaler.feature_names() {
                return Err(PredictorError::Serialization(format!(
                    "manifest feature order {:?} disagrees with scaler order {:?}",
                    manifest.feature_names,
                    scaler.feature_names()
                )));
            }
        }

        info!(
            dir = %dir.display(),
            model = %model.kind(),
            features = ?scaler.feature_names(),
            "loaded trained artifact"
        );

        Ok(Self {
            scaler,
            model,
            manifest,
            metrics,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        self.scaler.feature_names()
    }

    /// Display name of the served regressor
    pub fn label(&self) -> &'static str {
        self.model.kind().label()
    }
}

#[cfg(feature = "boosting")]
fn load_preferred_model(dir: &Path) -> Result<Box<dyn Regressor>> {
    let secondary = dir.join(ModelKind::GradientBoosting.file_name());
    if secondary.exists() {
        let model: super::boosting::GradientBoostedTrees = read_blob(&secondary)?;
        return Ok(Box::new(model));
    }
    let model: SmartcoreRandomForest = read_blob(&dir.join(ModelKind::RandomForest.file_name()))?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "boosting"))]
fn load_preferred_model(dir: &Path) -> Result<Box<dyn Regressor>> {
    if dir.join(ModelKind::GradientBoosting.file_name()).exists() {
        warn!("gradient boosting artifact present but support is not compiled in, serving random forest");
    }
    let model: SmartcoreRandomForest = read_blob(&dir.join(ModelKind::RandomForest.file_name()))?;
    Ok(Box::new(model))
}

/// Serialize a value with bincode and write it atomically
pub fn write_blob<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    write_atomic(path, &bytes)
}

pub fn read_blob<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}

fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        warn!(path = %path.display(), "artifact file missing");
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Write to `<path>.tmp` then rename over `path`
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
