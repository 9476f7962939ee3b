use crate::error::{Error, Result};
use crate::ml::tree::{ClassificationTree, Tree, TreeParams};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// `None` grows every tree until its leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub bootstrap: bool,
    /// Weight classes inversely to their frequency
    pub balanced_class_weight: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            max_depth: None,
            min_samples_split: 2,
            bootstrap: true,
            balanced_class_weight: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<Tree>,
    pub importances: Vec<f64>,
}

impl RandomForest {
    /// Fits every tree on the rayon pool. Tree `i` draws from a generator
    /// seeded with `seed + i`, so results do not depend on scheduling.
    pub fn fit(params: &ForestParams, rows: &[Vec<f64>], labels: &[u8], seed: u64) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::Training("cannot fit a forest on zero rows".to_string()));
        }
        if params.n_estimators == 0 {
            return Err(Error::Training("forest needs at least one tree".to_string()));
        }
        let n_features = rows[0].len();
        let max_features = ((n_features as f64).sqrt() as usize).max(1);
        let weights = class_weights(labels, params.balanced_class_weight);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            max_features,
            min_samples_split: params.min_samples_split.max(2),
        };

        let fitted: Vec<ClassificationTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let mut indices: Vec<usize> = if params.bootstrap {
                    (0..rows.len()).map(|_| rng.random_range(0..rows.len())).collect()
                } else {
                    (0..rows.len()).collect()
                };
                ClassificationTree::fit(rows, labels, &weights, &mut indices, tree_params, &mut rng)
            })
            .collect();

        let mut importances = vec![0.0; n_features];
        for tree in &fitted {
            for (total, v) in importances.iter_mut().zip(&tree.importances) {
                *total += v;
            }
        }
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            for v in &mut importances {
                *v /= sum;
            }
        }

        log::debug!("fitted {} trees over {} rows", fitted.len(), rows.len());
        Ok(Self {
            trees: fitted.into_iter().map(|t| t.tree).collect(),
            importances,
        })
    }

    /// Mean of the per-tree positive-class fractions
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }
}

/// `n / (2 · count_c)` per row when balanced, else 1
fn class_weights(labels: &[u8], balanced: bool) -> Vec<f64> {
    if !balanced {
        return vec![1.0; labels.len()];
    }
    let n = labels.len() as f64;
    let positives = labels.iter().filter(|&&l| l == 1).count() as f64;
    let negatives = n - positives;
    labels
        .iter()
        .map(|&l| {
            let count = if l == 1 { positives } else { negatives };
            n / (2.0 * count)
        })
        .collect()
}
