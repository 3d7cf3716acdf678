//! Gradient-boosted regression trees
//!
//! Secondary regressor. Each stage is a shallow SmartCore decision tree fit
//! to the residuals of the ensemble so far (squared loss), added with a fixed
//! shrinkage factor. The initial prediction is the target mean.

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use tracing::debug;

use super::{to_dense, ModelKind, Regressor};
use crate::error::{PredictorError, Result};

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingParameters {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
    pub min_samples_leaf: usize,
}

impl Default for GradientBoostingParameters {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
}

impl GradientBoostedTrees {
    pub fn train(x: &[Vec<f64>], y: &[f64], params: GradientBoostingParameters) -> Result<Self> {
        if x.len() != y.len() {
            return Err(PredictorError::InputSizeMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }
        if params.n_estimators == 0 || params.learning_rate <= 0.0 {
            return Err(PredictorError::InvalidInput(
                "boosting needs at least one stage and a positive learning rate".to_string(),
            ));
        }

        let x_matrix = to_dense(x)?;
        let base_score = y.iter().sum::<f64>() / y.len() as f64;
        let mut current = vec![base_score; y.len()];

        let tree_params = DecisionTreeRegressorParameters::default()
            .with_max_depth(params.max_depth)
            .with_min_samples_leaf(params.min_samples_leaf);

        let mut trees = Vec::with_capacity(params.n_estimators);
        for _ in 0..params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, p)| t - p).collect();
            let tree = Tree::fit(&x_matrix, &residuals, tree_params.clone())?;
            let update = tree.predict(&x_matrix)?;
            for (p, u) in current.iter_mut().zip(update) {
                *p += params.learning_rate * u;
            }
            trees.push(tree);
        }
        debug!(stages = trees.len(), samples = x.len(), "gradient boosting fitted");

        Ok(Self {
            base_score,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    pub fn n_stages(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for GradientBoostedTrees {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        let x = to_dense(rows)?;
        let mut out = vec![self.base_score; rows.len()];
        for tree in &self.trees {
            let update = tree.predict(&x)?;
            for (p, u) in out.iter_mut().zip(update) {
                *p += self.learning_rate * u;
            }
        }
        Ok(out)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::GradientBoosting
    }
}
