//! Column-oriented sensor table
//!
//! Raw plant exports mix numeric readings with text columns (timestamps,
//! plant and inverter identifiers). A `SensorTable` keeps both kinds side by
//! side in header order and is the unit the feature pipeline operates on.

pub mod loader;

pub use loader::{load_csv, normalize_header, write_csv};

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};

/// Target column every training table must carry
pub const TARGET_COLUMN: &str = "ac_power";
/// Timestamp column used for calendar feature derivation
pub const TIMESTAMP_COLUMN: &str = "date_time";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell rendered as text, NaN as an empty cell
    pub fn cell(&self, row: usize) -> String {
        match self {
            Column::Numeric(values) if values[row].is_nan() => String::new(),
            Column::Numeric(values) => values[row].to_string(),
            Column::Text(values) => values[row].clone(),
        }
    }
}

/// Ordered set of equally sized named columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorTable {
    columns: Vec<(String, Column)>,
}

impl SensorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self> {
        let mut table = Self::new();
        for (name, column) in columns {
            if table.has_column(&name) {
                return Err(PredictorError::InvalidInput(format!(
                    "duplicate column '{}'",
                    name
                )));
            }
            table.push(name, column)?;
        }
        Ok(table)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.columns.first().map(|(_, c)| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Numeric view of a column; `MissingColumn` when absent or textual
    pub fn numeric(&self, name: &str) -> Result<&[f64]> {
        match self.column(name) {
            Some(Column::Numeric(values)) => Ok(values),
            Some(Column::Text(_)) => Err(PredictorError::InvalidInput(format!(
                "column '{}' is not numeric",
                name
            ))),
            None => Err(PredictorError::MissingColumn(name.to_string())),
        }
    }

    /// Adds a column unless one with the same name exists. Returns whether it
    /// was inserted.
    pub fn insert_if_absent(&mut self, name: &str, column: Column) -> Result<bool> {
        if self.has_column(name) {
            return Ok(false);
        }
        self.push(name.to_string(), column)?;
        Ok(true)
    }

    /// Row-major numeric matrix for the named columns, in the order given
    pub fn to_rows(&self, names: &[String]) -> Result<Vec<Vec<f64>>> {
        let columns = names
            .iter()
            .map(|name| self.numeric(name))
            .collect::<Result<Vec<_>>>()?;
        Ok((0..self.len())
            .map(|row| columns.iter().map(|c| c[row]).collect())
            .collect())
    }

    pub(crate) fn columns(&self) -> &[(String, Column)] {
        &self.columns
    }

    fn push(&mut self, name: String, column: Column) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.len() {
            return Err(PredictorError::InputSizeMismatch {
                expected: self.len(),
                actual: column.len(),
            });
        }
        self.columns.push((name, column));
        Ok(())
    }
}
