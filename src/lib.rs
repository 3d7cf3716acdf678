//! Solar AC power prediction: sensor-table loading, feature engineering,
//! model training and an HTTP prediction service.

pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod ml;
pub mod series;
pub mod serving;
pub mod telemetry;

pub use error::{PredictorError, Result};
