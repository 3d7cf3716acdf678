//! SmartCore RandomForest wrapper
//!
//! Primary regressor of the pipeline. Parameters are fixed per training run
//! (tree count, seed) so identical input yields an identical forest.

use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

use super::{to_dense, ModelKind, Regressor};
use crate::error::{PredictorError, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct SmartcoreRandomForest {
    model: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    /// Training parameters for reproducibility
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub seed: u64,
}

impl SmartcoreRandomForest {
    /// Forest parameters for a training run
    pub fn parameters(n_trees: usize, max_depth: Option<u16>, seed: u64) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            max_depth,
            min_samples_leaf: 1,
            min_samples_split: 2,
            n_trees,
            m: None,
            keep_samples: false,
            seed,
        }
    }

    /// Fit a forest on scaled rows
    pub fn train(x: &[Vec<f64>], y: &[f64], params: RandomForestRegressorParameters) -> Result<Self> {
        if x.len() != y.len() {
            return Err(PredictorError::InputSizeMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }

        let n_trees = params.n_trees;
        let max_depth = params.max_depth;
        let seed = params.seed;

        let x_matrix = to_dense(x)?;
        let model = RandomForestRegressor::fit(&x_matrix, &y.to_vec(), params)?;
        debug!(n_trees, samples = x.len(), "random forest fitted");

        Ok(Self {
            model,
            n_trees,
            max_depth,
            seed,
        })
    }
}

impl Regressor for SmartcoreRandomForest {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        let x = to_dense(rows)?;
        Ok(self.model.predict(&x)?)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::RandomForest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y = 2x1 + 3x2
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i % 8) as f64, (i / 8) as f64])
            .collect();
        let y = x.iter().map(|r| 2.0 * r[0] + 3.0 * r[1]).collect();
        (x, y)
    }

    #[test]
    fn test_random_forest_parameters() {
        let params = SmartcoreRandomForest::parameters(100, None, 42);
        assert_eq!(params.n_trees, 100);
        assert_eq!(params.max_depth, None);
        assert_eq!(params.seed, 42);
        assert!(!params.keep_samples);
    }

    #[test]
    fn test_train_and_predict() {
        let (x, y) = linear_data();
        let model = SmartcoreRandomForest::train(&x, &y, SmartcoreRandomForest::parameters(20, None, 42)).unwrap();

        assert_eq!(model.kind(), ModelKind::RandomForest);
        let pred = model.predict_one(&[4.0, 2.0]).unwrap();
        // true value 14
        assert!(pred > 9.0 && pred < 19.0, "prediction {}", pred);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = linear_data();
        let a = SmartcoreRandomForest::train(&x, &y, SmartcoreRandomForest::parameters(10, Some(6), 42)).unwrap();
        let b = SmartcoreRandomForest::train(&x, &y, SmartcoreRandomForest::parameters(10, Some(6), 42)).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_train_rejects_mismatch() {
        let (x, _) = linear_data();
        let result = SmartcoreRandomForest::train(&x, &[1.0], SmartcoreRandomForest::parameters(5, None, 42));
        assert!(matches!(result, Err(PredictorError::InputSizeMismatch { .. })));
    }

    #[test]
    fn test_bincode_roundtrip_predicts_identically() {
        let (x, y) = linear_data();
        let model = SmartcoreRandomForest::train(&x, &y, SmartcoreRandomForest::parameters(5, None, 42)).unwrap();

        let bytes = bincode::serialize(&model).unwrap();
        let restored: SmartcoreRandomForest = bincode::deserialize(&bytes).unwrap();
        assert_eq!(model.predict(&x).unwrap(), restored.predict(&x).unwrap());
    }
}
