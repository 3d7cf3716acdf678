//! ML Model Training Pipeline
//!
//! Offline, single-threaded batch training: select canonical features, split
//! with a fixed seed, fit the scaler on the training partition only, fit the
//! regressors, score them on the held-out rows and persist the artifact.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::artifact::{self, ArtifactManifest, MetricsRecord, METRICS_FILE, MANIFEST_FILE, SCALER_FILE};
use super::smartcore::SmartcoreRandomForest;
use super::split::train_test_split;
use super::{MinMaxScaler, ModelKind, RegressionMetrics, Regressor};
use crate::dataset::{SensorTable, TARGET_COLUMN};
use crate::error::{PredictorError, Result};
use crate::features::select_features;

#[cfg(feature = "boosting")]
use super::boosting::{GradientBoostedTrees, GradientBoostingParameters};

/// Training Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub test_fraction: f64,
    pub seed: u64,
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub boosting_rounds: usize,
    pub learning_rate: f64,
    pub boosting_max_depth: u16,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            n_trees: 100,
            max_depth: None,
            boosting_rounds: 100,
            learning_rate: 0.1,
            boosting_max_depth: 3,
        }
    }
}

/// Summary of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub feature_names: Vec<String>,
    pub metrics: MetricsRecord,
    pub recommended: ModelKind,
    pub secondary_available: bool,
    pub train_rows: usize,
    pub test_rows: usize,
    pub dropped_rows: usize,
}

/// Feature matrix and target ready for splitting
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
    pub dropped_rows: usize,
}

/// Fitted, not yet persisted, training output
pub struct TrainingOutcome {
    pub scaler: MinMaxScaler,
    pub primary: SmartcoreRandomForest,
    #[cfg(feature = "boosting")]
    pub secondary: Option<GradientBoostedTrees>,
    pub report: TrainingReport,
}

pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Select canonical features and the target, dropping rows with a
    /// missing value in any of them.
    pub fn prepare(&self, table: &SensorTable) -> Result<PreparedData> {
        if !table.has_column(TARGET_COLUMN) {
            return Err(PredictorError::MissingColumn(TARGET_COLUMN.to_string()));
        }

        let feature_names = select_features(table);
        if feature_names.is_empty() {
            return Err(PredictorError::EmptyDataset);
        }

        let rows = table.to_rows(&feature_names)?;
        let target = table.numeric(TARGET_COLUMN)?;

        let mut x = Vec::with_capacity(rows.len());
        let mut y = Vec::with_capacity(rows.len());
        for (row, &value) in rows.into_iter().zip(target) {
            if value.is_nan() || row.iter().any(|v| v.is_nan()) {
                continue;
            }
            x.push(row);
            y.push(value);
        }

        let dropped_rows = table.len() - x.len();
        if dropped_rows > 0 {
            warn!(dropped_rows, "dropped rows with missing values");
        }
        if x.is_empty() {
            return Err(PredictorError::EmptyDataset);
        }

        Ok(PreparedData {
            feature_names,
            x,
            y,
            dropped_rows,
        })
    }

    /// Fit scaler and regressors and score them on the held-out partition
    pub fn fit(&self, table: &SensorTable) -> Result<TrainingOutcome> {
        let data = self.prepare(table)?;
        info!(features = ?data.feature_names, rows = data.x.len(), "training data prepared");

        let split = train_test_split(data.x.len(), self.config.test_fraction, self.config.seed)?;
        let pick = |indices: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
            indices
                .iter()
                .map(|&i| (data.x[i].clone(), data.y[i]))
                .unzip()
        };
        let (x_train, y_train) = pick(&split.train);
        let (x_test, y_test) = pick(&split.test);

        let scaler = MinMaxScaler::fit(data.feature_names.clone(), &x_train)?;
        let x_train = scaler.transform(&x_train)?;
        let x_test = scaler.transform(&x_test)?;

        let mut metrics = MetricsRecord::new();

        info!(n_trees = self.config.n_trees, "training random forest");
        let primary = SmartcoreRandomForest::train(
            &x_train,
            &y_train,
            SmartcoreRandomForest::parameters(self.config.n_trees, self.config.max_depth, self.config.seed),
        )?;
        let primary_metrics = RegressionMetrics::calculate(&y_test, &primary.predict(&x_test)?)?;
        info!(model = %ModelKind::RandomForest, %primary_metrics, "evaluated");
        metrics.insert(ModelKind::RandomForest, primary_metrics);

        #[cfg(feature = "boosting")]
        let secondary = {
            info!(rounds = self.config.boosting_rounds, "training gradient boosting");
            let params = GradientBoostingParameters {
                n_estimators: self.config.boosting_rounds,
                learning_rate: self.config.learning_rate,
                max_depth: self.config.boosting_max_depth,
                ..Default::default()
            };
            let model = GradientBoostedTrees::train(&x_train, &y_train, params)?;
            let secondary_metrics = RegressionMetrics::calculate(&y_test, &model.predict(&x_test)?)?;
            info!(model = %ModelKind::GradientBoosting, %secondary_metrics, "evaluated");
            metrics.insert(ModelKind::GradientBoosting, secondary_metrics);
            Some(model)
        };

        #[cfg(not(feature = "boosting"))]
        warn!("gradient boosting not available in this build, skipping secondary regressor");

        let recommended = recommend(&metrics);
        info!(model = recommended.label(), "best model");

        Ok(TrainingOutcome {
            scaler,
            primary,
            #[cfg(feature = "boosting")]
            secondary,
            report: TrainingReport {
                feature_names: data.feature_names,
                metrics,
                recommended,
                secondary_available: cfg!(feature = "boosting"),
                train_rows: split.train.len(),
                test_rows: split.test.len(),
                dropped_rows: data.dropped_rows,
            },
        })
    }

    /// Fit and persist. Re-running overwrites the previous artifact.
    pub fn run(&self, table: &SensorTable, models_dir: &Path) -> Result<TrainingReport> {
        let outcome = self.fit(table)?;
        outcome.persist(models_dir)?;
        Ok(outcome.report)
    }
}

impl TrainingOutcome {
    pub fn persist(&self, dir: &Path) -> Result<()> {
        artifact::write_blob(&dir.join(SCALER_FILE), &self.scaler)?;
        artifact::write_blob(&dir.join(ModelKind::RandomForest.file_name()), &self.primary)?;

        let mut models = vec![ModelKind::RandomForest];

        #[cfg(feature = "boosting")]
        if let Some(secondary) = &self.secondary {
            artifact::write_blob(&dir.join(ModelKind::GradientBoosting.file_name()), secondary)?;
            models.push(ModelKind::GradientBoosting);
        }

        // A stale secondary blob from an earlier run would otherwise be served
        let stale = dir.join(ModelKind::GradientBoosting.file_name());
        if !models.contains(&ModelKind::GradientBoosting) && stale.exists() {
            std::fs::remove_file(&stale)?;
        }

        artifact::write_json(&dir.join(METRICS_FILE), &self.report.metrics)?;

        let manifest = ArtifactManifest {
            feature_names: self.report.feature_names.clone(),
            recommended: self.report.recommended,
            secondary_available: self.report.secondary_available,
            models,
            trained_at: Utc::now(),
            train_rows: self.report.train_rows,
            test_rows: self.report.test_rows,
        };
        artifact::write_json(&dir.join(MANIFEST_FILE), &manifest)?;

        info!(dir = %dir.display(), "artifact saved");
        Ok(())
    }
}

/// Regressor with the higher R², the primary one on ties
pub fn recommend(metrics: &MetricsRecord) -> ModelKind {
    let primary = metrics.get(&ModelKind::RandomForest).map(|m| m.r2);
    let secondary = metrics.get(&ModelKind::GradientBoosting).map(|m| m.r2);
    match (primary, secondary) {
        (Some(p), Some(s)) if s > p => ModelKind::GradientBoosting,
        (None, Some(_)) => ModelKind::GradientBoosting,
        _ => ModelKind::RandomForest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn metrics(r2: f64) -> RegressionMetrics {
        RegressionMetrics { mae: 0.0, rmse: 0.0, r2 }
    }

    fn table(rows: usize) -> SensorTable {
        let irradiation: Vec<f64> = (0..rows).map(|i| (i % 10) as f64 / 10.0).collect();
        let hour: Vec<f64> = (0..rows).map(|i| (i % 24) as f64).collect();
        let ac_power = irradiation.iter().map(|v| v * 1000.0).collect();
        SensorTable::from_columns(vec![
            ("hour".to_string(), Column::Numeric(hour)),
            ("irradiation".to_string(), Column::Numeric(irradiation)),
            ("ac_power".to_string(), Column::Numeric(ac_power)),
        ])
        .unwrap()
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            n_trees: 10,
            boosting_rounds: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_recommend_prefers_primary_on_tie() {
        let mut record = MetricsRecord::new();
        record.insert(ModelKind::RandomForest, metrics(0.9));
        assert_eq!(recommend(&record), ModelKind::RandomForest);

        record.insert(ModelKind::GradientBoosting, metrics(0.9));
        assert_eq!(recommend(&record), ModelKind::RandomForest);

        record.insert(ModelKind::GradientBoosting, metrics(0.95));
        assert_eq!(recommend(&record), ModelKind::GradientBoosting);
    }

    #[test]
    fn test_prepare_requires_target() {
        let table = SensorTable::from_columns(vec![(
            "irradiation".to_string(),
            Column::Numeric(vec![0.1, 0.2]),
        )])
        .unwrap();
        let pipeline = TrainingPipeline::new(TrainingConfig::default());
        assert!(matches!(
            pipeline.prepare(&table),
            Err(PredictorError::MissingColumn(c)) if c == "ac_power"
        ));
    }

    #[test]
    fn test_prepare_requires_features() {
        let table = SensorTable::from_columns(vec![(
            "ac_power".to_string(),
            Column::Numeric(vec![1.0, 2.0]),
        )])
        .unwrap();
        let pipeline = TrainingPipeline::new(TrainingConfig::default());
        assert!(matches!(pipeline.prepare(&table), Err(PredictorError::EmptyDataset)));
    }

    #[test]
    fn test_prepare_drops_missing_values_in_canonical_order() {
        let table = SensorTable::from_columns(vec![
            ("hour".to_string(), Column::Numeric(vec![1.0, f64::NAN, 3.0])),
            ("irradiation".to_string(), Column::Numeric(vec![0.1, 0.2, 0.3])),
            ("ac_power".to_string(), Column::Numeric(vec![10.0, 20.0, f64::NAN])),
        ])
        .unwrap();
        let data = TrainingPipeline::new(TrainingConfig::default()).prepare(&table).unwrap();

        assert_eq!(data.feature_names, vec!["irradiation", "hour"]);
        assert_eq!(data.x, vec![vec![0.1, 1.0]]);
        assert_eq!(data.y, vec![10.0]);
        assert_eq!(data.dropped_rows, 2);
    }

    #[test]
    fn test_fit_reports_metrics_for_each_model() {
        let outcome = TrainingPipeline::new(small_config()).fit(&table(100)).unwrap();
        let report = &outcome.report;

        assert_eq!(report.train_rows, 80);
        assert_eq!(report.test_rows, 20);
        assert_eq!(report.feature_names, vec!["irradiation", "hour"]);
        assert!(report.metrics[&ModelKind::RandomForest].r2 > 0.5);
        assert_eq!(report.secondary_available, cfg!(feature = "boosting"));
        assert_eq!(
            report.metrics.contains_key(&ModelKind::GradientBoosting),
            cfg!(feature = "boosting")
        );
    }

    #[test]
    fn test_scaler_fit_on_training_rows_only() {
        // the largest irradiation value sits in the held-out partition
        let split = train_test_split(50, 0.2, 42).unwrap();
        let outlier_row = split.test[0];

        let base = table(50);
        let mut irradiation = base.numeric("irradiation").unwrap().to_vec();
        irradiation[outlier_row] = 100.0;
        let t = SensorTable::from_columns(vec![
            ("irradiation".to_string(), Column::Numeric(irradiation)),
            ("ac_power".to_string(), Column::Numeric(base.numeric("ac_power").unwrap().to_vec())),
        ])
        .unwrap();

        let outcome = TrainingPipeline::new(small_config()).fit(&t).unwrap();

        let scaled_outlier = outcome.scaler.transform_row(&[100.0]).unwrap()[0];
        assert!(scaled_outlier > 1.0, "scaled outlier {}", scaled_outlier);
    }

    #[test]
    fn test_fit_is_reproducible() {
        let pipeline = TrainingPipeline::new(small_config());
        let a = pipeline.fit(&table(60)).unwrap();
        let b = pipeline.fit(&table(60)).unwrap();
        assert_eq!(
            a.report.metrics[&ModelKind::RandomForest],
            b.report.metrics[&ModelKind::RandomForest]
        );
        assert_eq!(a.scaler, b.scaler);
    }

    #[test]
    fn test_fit_rejects_tiny_table() {
        let pipeline = TrainingPipeline::new(small_config());
        assert!(matches!(pipeline.fit(&table(1)), Err(PredictorError::EmptyDataset)));
    }
}
