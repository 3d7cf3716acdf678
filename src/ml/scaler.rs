//! Min-max feature scaling
//!
//! Fitted on the training partition only. The fitted scaler remembers the
//! column order it was fit with; that order is the contract request-time
//! feature reconstruction must reproduce.

use serde::{Deserialize, Serialize};

use super::FeatureVector;
use crate::error::{PredictorError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    feature_names: Vec<String>,
    data_min: Vec<f64>,
    data_max: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit per-column minimum and maximum
    pub fn fit(feature_names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        if rows.is_empty() {
            return Err(PredictorError::EmptyDataset);
        }

        let width = feature_names.len();
        let mut data_min = vec![f64::INFINITY; width];
        let mut data_max = vec![f64::NEG_INFINITY; width];

        for row in rows {
            check_width(width, row.len())?;
            for (i, &value) in row.iter().enumerate() {
                data_min[i] = data_min[i].min(value);
                data_max[i] = data_max[i].max(value);
            }
        }

        Ok(Self {
            feature_names,
            data_min,
            data_max,
        })
    }

    /// Column order the scaler was fit with
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Scale one row. Values outside the fitted range map outside [0, 1];
    /// constant columns are shifted only.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        check_width(self.feature_names.len(), row.len())?;
        Ok(row
            .iter()
            .zip(self.data_min.iter().zip(&self.data_max))
            .map(|(value, (min, max))| {
                let range = max - min;
                let range = if range == 0.0 { 1.0 } else { range };
                (value - min) / range
            })
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Scale a named feature vector, which must be in fit order
    pub fn transform_vector(&self, features: &FeatureVector) -> Result<FeatureVector> {
        if features.feature_names != self.feature_names {
            return Err(PredictorError::InvalidInput(format!(
                "feature order {:?} does not match scaler order {:?}",
                features.feature_names, self.feature_names
            )));
        }
        FeatureVector::new(self.transform_row(&features.features)?, self.feature_names.clone())
    }
}

fn check_width(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(PredictorError::InputSizeMismatch { expected, actual });
    }
    Ok(())
}
