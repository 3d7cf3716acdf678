//! Error taxonomy shared by the feature, training and inference pipeline.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PredictorError>;

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Input size mismatch: expected {expected}, got {actual}")]
    InputSizeMismatch { expected: usize, actual: usize },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No trained artifact at {}", .0.display())]
    ArtifactUnavailable(PathBuf),

    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Model error: {0}")]
    Model(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PredictorError {
    /// Errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictorError::InvalidInput(_) | PredictorError::Parse(_))
    }
}

impl From<serde_json::Error> for PredictorError {
    fn from(error: serde_json::Error) -> Self {
        PredictorError::Serialization(error.to_string())
    }
}

impl From<bincode::Error> for PredictorError {
    fn from(error: bincode::Error) -> Self {
        PredictorError::Serialization(error.to_string())
    }
}

impl From<smartcore::error::Failed> for PredictorError {
    fn from(error: smartcore::error::Failed) -> Self {
        PredictorError::Model(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PredictorError::InputSizeMismatch { expected: 3, actual: 2 };
        assert_eq!(error.to_string(), "Input size mismatch: expected 3, got 2");

        let error = PredictorError::MissingColumn("ac_power".to_string());
        assert_eq!(error.to_string(), "Missing column: ac_power");
    }

    #[test]
    fn test_client_errors() {
        assert!(PredictorError::InvalidInput("hour".to_string()).is_client_error());
        assert!(!PredictorError::EmptyDataset.is_client_error());
    }
}
