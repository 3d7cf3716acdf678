//! Regression quality metrics
//!
//! MAE, RMSE and R² over a held-out partition, rounded to four decimals the
//! way they are persisted in `metrics.json`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PredictorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean Absolute Error
    #[serde(rename = "MAE")]
    pub mae: f64,
    /// Root Mean Square Error
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    /// Coefficient of determination, negative when worse than the mean
    #[serde(rename = "R2")]
    pub r2: f64,
}

impl RegressionMetrics {
    /// Calculate metrics from true and predicted values.
    ///
    /// When every true value is identical R² has no variance to explain: it
    /// is reported as 1.0 for an exact fit and 0.0 otherwise.
    pub fn calculate(y_true: &[f64], y_pred: &[f64]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(PredictorError::InputSizeMismatch {
                expected: y_true.len(),
                actual: y_pred.len(),
            });
        }

        if y_true.is_empty() {
            return Err(PredictorError::EmptyDataset);
        }

        let n = y_true.len() as f64;

        let mae = y_true
            .iter()
            .zip(y_pred)
            .map(|(t, p)| (t - p).abs())
            .sum::<f64>()
            / n;

        let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
        let rmse = (ss_res / n).sqrt();

        let mean = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Ok(Self {
            mae: round4(mae),
            rmse: round4(rmse),
            r2: round4(r2),
        })
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MAE={:.4}, RMSE={:.4}, R2={:.4}", self.mae, self.rmse, self.r2)
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
