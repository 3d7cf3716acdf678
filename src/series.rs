//! Actual vs. predicted time series for charting
//!
//! Historical when a prepared table and a trained artifact exist, otherwise a
//! synthetic diurnal curve.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::dataset::{SensorTable, TARGET_COLUMN, TIMESTAMP_COLUMN};
use crate::error::{PredictorError, Result};
use crate::ml::TrainedArtifact;

const SYNTHETIC_FORMAT: &str = "%Y-%m-%d %H:%M";
const DAYLIGHT_HOURS: std::ops::RangeInclusive<u32> = 6..=18;

/// Parallel arrays of equal length
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    pub timestamps: Vec<String>,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    fn push(&mut self, timestamp: String, actual: f64, predicted: f64) {
        self.timestamps.push(timestamp);
        self.actual.push(actual);
        self.predicted.push(predicted);
    }
}

/// Hourly points starting 2024-06-01 00:00. Daylight hours follow a gaussian
/// bell around noon with noise; night hours are zero.
pub fn synthetic<R: Rng + ?Sized>(points: usize, rng: &mut R) -> Series {
    let start = NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    let mut series = Series::default();
    for i in 0..points {
        let timestamp = start + Duration::hours(i as i64);
        let hour = (i % 24) as u32;

        let (actual, predicted) = if DAYLIGHT_HOURS.contains(&hour) {
            let h = hour as f64;
            let actual = 200.0 + 150.0 * (-(h - 12.0).powi(2) / 8.0).exp() + rng.gen_range(-15.0..=15.0);
            let predicted = actual + rng.gen_range(-8.0..=8.0);
            (round2(actual.max(0.0)), round2(predicted.max(0.0)))
        } else {
            (0.0, 0.0)
        };

        series.push(timestamp.format(SYNTHETIC_FORMAT).to_string(), actual, predicted);
    }
    series
}

/// Predictions for the last `limit` usable rows of a prepared table. Rows
/// with a missing feature or target are skipped.
pub fn historical(table: &SensorTable, artifact: &TrainedArtifact, limit: usize) -> Result<Series> {
    let target = table.numeric(TARGET_COLUMN)?;
    let rows = table.to_rows(artifact.feature_names())?;
    let timestamps = table.column(TIMESTAMP_COLUMN);

    let kept: Vec<usize> = (0..table.len())
        .rev()
        .filter(|&i| target[i].is_finite() && rows[i].iter().all(|v| v.is_finite()))
        .take(limit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if kept.is_empty() {
        return Err(PredictorError::EmptyDataset);
    }

    let features: Vec<Vec<f64>> = kept.iter().map(|&i| rows[i].clone()).collect();
    let scaled = artifact.scaler.transform(&features)?;
    let predicted = artifact.model.predict(&scaled)?;

    let mut series = Series::default();
    for (&i, p) in kept.iter().zip(predicted) {
        let timestamp = match timestamps {
            Some(col) => col.cell(i),
            None => i.to_string(),
        };
        series.push(timestamp, target[i], round2(p.max(0.0)));
    }
    debug!(points = series.len(), "historical series built");
    Ok(series)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use crate::ml::{MinMaxScaler, Regressor};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_synthetic_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        let series = synthetic(200, &mut rng);

        assert_eq!(series.len(), 200);
        assert_eq!(series.actual.len(), 200);
        assert_eq!(series.predicted.len(), 200);
        assert_eq!(series.timestamps[0], "2024-06-01 00:00");
        assert_eq!(series.timestamps[25], "2024-06-02 01:00");
    }

    #[test]
    fn test_synthetic_night_is_zero_and_day_positive() {
        let mut rng = StdRng::seed_from_u64(9);
        let series = synthetic(48, &mut rng);

        for (i, (a, p)) in series.actual.iter().zip(&series.predicted).enumerate() {
            let hour = i % 24;
            if (6..=18).contains(&hour) {
                assert!(*a >= 185.0, "hour {} actual {}", hour, a);
                assert!((a - p).abs() <= 8.0 + 1e-6);
            } else {
                assert_eq!((*a, *p), (0.0, 0.0));
            }
        }
        // noon peak: 350 ± 15
        assert!((335.0..=365.0).contains(&series.actual[12]));
    }

    struct Doubler;

    impl Regressor for Doubler {
        fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
            Ok(rows.iter().map(|r| r[0] * 2.0 - 0.5).collect())
        }

        fn kind(&self) -> crate::ml::ModelKind {
            crate::ml::ModelKind::RandomForest
        }
    }

    #[test]
    fn test_historical_uses_tail_and_skips_missing() {
        let table = SensorTable::from_columns(vec![
            (
                TIMESTAMP_COLUMN.to_string(),
                Column::Text((0..5).map(|i| format!("t{}", i)).collect()),
            ),
            (
                "irradiation".to_string(),
                Column::Numeric(vec![0.0, 0.25, f64::NAN, 0.75, 1.0]),
            ),
            (
                TARGET_COLUMN.to_string(),
                Column::Numeric(vec![0.0, 10.0, 20.0, 30.0, 40.0]),
            ),
        ])
        .unwrap();

        let scaler = MinMaxScaler::fit(vec!["irradiation".to_string()], &[vec![0.0], vec![1.0]]).unwrap();
        let artifact = TrainedArtifact {
            scaler,
            model: Box::new(Doubler),
            manifest: None,
            metrics: Default::default(),
        };

        let series = historical(&table, &artifact, 3).unwrap();
        assert_eq!(series.timestamps, vec!["t1", "t3", "t4"]);
        assert_eq!(series.actual, vec![10.0, 30.0, 40.0]);
        assert_eq!(series.predicted, vec![0.0, 1.0, 1.5]);
    }
}
