//! Shared state handed to request handlers

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, SeriesConfig};
use crate::dataset::load_csv;
use crate::error::Result;
use crate::ml::{InferenceAdapter, PredictionRequest, PredictionResult};
use crate::series::{self, Series};

/// Built once at startup, read-only afterwards. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct ServingContext {
    pub adapter: Arc<InferenceAdapter>,
    /// Precomputed from the prepared table when an artifact is loaded
    history: Option<Arc<Series>>,
    series: SeriesConfig,
}

impl ServingContext {
    pub fn new(adapter: InferenceAdapter, history: Option<Series>, series: SeriesConfig) -> Self {
        Self {
            adapter: Arc::new(adapter),
            history: history.map(Arc::new),
            series,
        }
    }

    /// Load the artifact and historical series named by `config`. Missing
    /// artifacts or history degrade to analytic and synthetic output.
    pub fn load(config: &Config) -> Result<Self> {
        let adapter = InferenceAdapter::load(&config.paths.models_dir, config.fallback.clone())?;

        let history = match adapter.artifact() {
            Some(artifact) if config.paths.prepared_data.exists() => {
                match load_csv(&config.paths.prepared_data)
                    .and_then(|table| series::historical(&table, artifact, config.series.history_limit))
                {
                    Ok(series) => {
                        info!(points = series.len(), "serving historical series");
                        Some(series)
                    }
                    Err(e) => {
                        warn!(error = %e, "historical series unavailable, serving synthetic data");
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(Self::new(adapter, history, config.series.clone()))
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        self.adapter.predict(request)
    }

    pub fn series(&self) -> Series {
        match &self.history {
            Some(history) => history.as_ref().clone(),
            None => series::synthetic(self.series.points, &mut rand::thread_rng()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.adapter.is_fallback()
    }
}
