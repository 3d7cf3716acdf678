//! Feature engineering for the AC power models
//!
//! Calendar and cyclical hour features are derived from the `date_time`
//! column. The canonical schema below fixes the column order every fitted
//! scaler and regressor sees; request-time reconstruction uses the same table
//! so training and serving can never disagree on how a feature is computed.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use std::f64::consts::PI;
use tracing::warn;

use crate::dataset::{Column, SensorTable, TIMESTAMP_COLUMN};
use crate::error::{PredictorError, Result};

/// How a canonical feature is obtained when it is not supplied directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// Raw reading or calendar field, zero when absent
    Supplied,
    /// `(month - 1) * 30 + day`
    DayOfYearApprox,
    /// `sin(2π·hour/24)`
    SinHour,
    /// `cos(2π·hour/24)`
    CosHour,
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureDef {
    pub name: &'static str,
    pub derivation: Derivation,
}

/// Canonical ordered feature schema
pub const CANONICAL_FEATURES: [FeatureDef; 9] = [
    FeatureDef { name: "ambient_temperature", derivation: Derivation::Supplied },
    FeatureDef { name: "module_temperature", derivation: Derivation::Supplied },
    FeatureDef { name: "irradiation", derivation: Derivation::Supplied },
    FeatureDef { name: "hour", derivation: Derivation::Supplied },
    FeatureDef { name: "day", derivation: Derivation::Supplied },
    FeatureDef { name: "month", derivation: Derivation::Supplied },
    FeatureDef { name: "dayofyear", derivation: Derivation::DayOfYearApprox },
    FeatureDef { name: "sin_hour", derivation: Derivation::SinHour },
    FeatureDef { name: "cos_hour", derivation: Derivation::CosHour },
];

pub fn canonical_feature_names() -> impl Iterator<Item = &'static str> {
    CANONICAL_FEATURES.iter().map(|def| def.name)
}

/// Derivation rule for a feature name; names outside the schema are treated
/// as supplied values.
pub fn derivation_for(name: &str) -> Derivation {
    CANONICAL_FEATURES
        .iter()
        .find(|def| def.name == name)
        .map(|def| def.derivation)
        .unwrap_or(Derivation::Supplied)
}

impl Derivation {
    /// Evaluate the rule against a sparse set of known values. `None` means
    /// the inputs the rule needs are not available.
    pub fn evaluate<F>(&self, name: &str, lookup: F) -> Option<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        match self {
            Derivation::Supplied => lookup(name),
            Derivation::DayOfYearApprox => {
                let month = lookup("month")?;
                let day = lookup("day")?;
                Some((month - 1.0) * 30.0 + day)
            }
            Derivation::SinHour => lookup("hour").map(sin_hour),
            Derivation::CosHour => lookup("hour").map(cos_hour),
        }
    }
}

pub fn sin_hour(hour: f64) -> f64 {
    (2.0 * PI * hour / 24.0).sin()
}

pub fn cos_hour(hour: f64) -> f64 {
    (2.0 * PI * hour / 24.0).cos()
}

const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a plant export timestamp
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.naive_local()))
        .ok_or_else(|| PredictorError::Parse(format!("unrecognised timestamp '{}'", value)))
}

/// Add calendar and cyclical hour features derived from `date_time`.
///
/// Existing columns are never overwritten, so applying this twice yields the
/// same table as applying it once. Without a `date_time` column the input is
/// returned unchanged. An empty timestamp cell yields NaN features for that
/// row; a non-empty cell that does not parse is a `Parse` error.
pub fn build_features(table: &SensorTable) -> Result<SensorTable> {
    let mut out = table.clone();

    let raw = match table.column(TIMESTAMP_COLUMN) {
        Some(Column::Text(values)) => values,
        Some(Column::Numeric(_)) => {
            return Err(PredictorError::Parse(format!(
                "'{}' column holds numbers, expected timestamps",
                TIMESTAMP_COLUMN
            )))
        }
        None => return Ok(out),
    };

    // empty cells are missing instants; their derived values are NaN
    let instants = raw
        .iter()
        .enumerate()
        .map(|(row, value)| {
            if value.trim().is_empty() {
                return Ok(None);
            }
            parse_timestamp(value).map(Some).map_err(|e| match e {
                PredictorError::Parse(msg) => PredictorError::Parse(format!("row {}: {}", row, msg)),
                other => other,
            })
        })
        .collect::<Result<Vec<Option<NaiveDateTime>>>>()?;

    let missing = instants.iter().filter(|t| t.is_none()).count();
    if missing > 0 {
        warn!(missing, "rows without a timestamp, calendar features left empty");
    }

    let calendar = |f: fn(&NaiveDateTime) -> u32| {
        Column::Numeric(
            instants
                .iter()
                .map(|t| t.as_ref().map_or(f64::NAN, |t| f(t) as f64))
                .collect(),
        )
    };
    out.insert_if_absent("dayofyear", calendar(|t: &NaiveDateTime| t.ordinal()))?;
    out.insert_if_absent("hour", calendar(|t: &NaiveDateTime| t.hour()))?;
    out.insert_if_absent("day", calendar(|t: &NaiveDateTime| t.day()))?;
    out.insert_if_absent("month", calendar(|t: &NaiveDateTime| t.month()))?;

    if out.has_column("hour") {
        let hours = out.numeric("hour")?.to_vec();
        out.insert_if_absent("sin_hour", Column::Numeric(hours.iter().map(|&h| sin_hour(h)).collect()))?;
        out.insert_if_absent("cos_hour", Column::Numeric(hours.iter().map(|&h| cos_hour(h)).collect()))?;
    }

    Ok(out)
}

/// Canonical features present in the table, in canonical order
pub fn select_features(table: &SensorTable) -> Vec<String> {
    canonical_feature_names()
        .filter(|name| table.has_column(name))
        .map(str::to_string)
        .collect()
}
