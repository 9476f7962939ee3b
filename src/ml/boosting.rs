//! Gradient-boosted trees on logistic loss.
//!
//! Each round fits a regression tree to the first and second derivatives of
//! the loss. Split gain is `½·(G_L²/(H_L+λ) + G_R²/(H_R+λ) − G²/(H+λ))` and
//! leaf weights are `−G/(H+λ)` scaled by the learning rate.

use crate::error::{Error, Result};
use crate::ml::tree::{partition, Node, Tree};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub reg_lambda: f64,
    pub min_child_weight: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 400,
            max_depth: 8,
            learning_rate: 0.05,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    /// Initial log-odds added to every prediction
    pub base_margin: f64,
    pub trees: Vec<Tree>,
    pub importances: Vec<f64>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct RoundGrower<'a> {
    rows: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    params: &'a BoostingParams,
    nodes: Vec<Node>,
    gain_totals: &'a mut [f64],
    split_counts: &'a mut [usize],
}

impl GradientBoosting {
    pub fn fit(params: &BoostingParams, rows: &[Vec<f64>], labels: &[u8], seed: u64) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::Training("cannot fit boosted trees on zero rows".to_string()));
        }
        let n = rows.len();
        let n_features = rows[0].len();
        let mut rng = StdRng::seed_from_u64(seed);

        let positive_rate = labels.iter().filter(|&&l| l == 1).count() as f64 / n as f64;
        let clipped = positive_rate.clamp(1e-6, 1.0 - 1e-6);
        let base_margin = (clipped / (1.0 - clipped)).ln();

        let mut margins = vec![base_margin; n];
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut gain_totals = vec![0.0; n_features];
        let mut split_counts = vec![0usize; n_features];

        let n_rows_sampled = sampled_count(n, params.subsample);
        let n_cols_sampled = sampled_count(n_features, params.colsample_bytree);

        for _ in 0..params.n_estimators {
            let mut grad = vec![0.0; n];
            let mut hess = vec![0.0; n];
            for i in 0..n {
                let p = sigmoid(margins[i]);
                grad[i] = p - f64::from(labels[i]);
                hess[i] = (p * (1.0 - p)).max(1e-16);
            }

            let mut row_sample = sample(&mut rng, n, n_rows_sampled).into_vec();
            let mut features = sample(&mut rng, n_features, n_cols_sampled).into_vec();
            features.sort_unstable();

            let mut grower = RoundGrower {
                rows,
                grad: &grad,
                hess: &hess,
                features: &features,
                params,
                nodes: Vec::new(),
                gain_totals: &mut gain_totals,
                split_counts: &mut split_counts,
            };
            grower.grow(&mut row_sample, 0);
            let tree = Tree { nodes: grower.nodes };

            for (margin, row) in margins.iter_mut().zip(rows) {
                *margin += tree.predict_row(row);
            }
            trees.push(tree);
        }

        // Average gain per split, normalized to sum to 1
        let mut importances: Vec<f64> = gain_totals
            .iter()
            .zip(&split_counts)
            .map(|(g, &c)| if c > 0 { g / c as f64 } else { 0.0 })
            .collect();
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            for v in &mut importances {
                *v /= sum;
            }
        }

        Ok(Self {
            base_margin,
            trees,
            importances,
        })
    }

    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        let margin = self.base_margin + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>();
        sigmoid(margin)
    }
}

fn sampled_count(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).round() as usize).clamp(1.min(total), total)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl RoundGrower<'_> {
    fn sums(&self, indices: &[usize]) -> (f64, f64) {
        indices
            .iter()
            .fold((0.0, 0.0), |(g, h), &i| (g + self.grad[i], h + self.hess[i]))
    }

    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        -g / (h + self.params.reg_lambda) * self.params.learning_rate
    }

    fn grow(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let (g, h) = self.sums(indices);
        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.leaf_weight(g, h),
        });
        if depth >= self.params.max_depth || indices.len() < 2 {
            return node_id;
        }
        let Some(split) = self.best_split(indices, g, h) else {
            return node_id;
        };

        self.gain_totals[split.feature] += split.gain;
        self.split_counts[split.feature] += 1;
        let rows = self.rows;
        let mid = partition(indices, |&i| rows[i][split.feature] <= split.threshold);
        let (left_idx, right_idx) = indices.split_at_mut(mid);
        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    /// Scans the sampled features in parallel; ties go to the lowest feature index
    fn best_split(&self, indices: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let lambda = self.params.reg_lambda;
        let parent_score = g * g / (h + lambda);

        let per_feature: Vec<Option<SplitCandidate>> = self
            .features
            .par_iter()
            .map(|&feature| {
                let mut sorted = indices.to_vec();
                sorted.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

                let mut best: Option<SplitCandidate> = None;
                let (mut gl, mut hl) = (0.0, 0.0);
                for pair in 0..sorted.len() - 1 {
                    let i = sorted[pair];
                    gl += self.grad[i];
                    hl += self.hess[i];
                    let here = self.rows[i][feature];
                    let next = self.rows[sorted[pair + 1]][feature];
                    if next <= here {
                        continue;
                    }
                    let (gr, hr) = (g - gl, h - hl);
                    if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                        continue;
                    }
                    let gain = 0.5 * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent_score);
                    if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                        let mut threshold = here + (next - here) / 2.0;
                        if threshold >= next {
                            threshold = here;
                        }
                        best = Some(SplitCandidate {
                            feature,
                            threshold,
                            gain,
                        });
                    }
                }
                best
            })
            .collect();

        per_feature
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<SplitCandidate>, cand| match acc {
                Some(best) if best.gain >= cand.gain => Some(best),
                _ => Some(cand),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            rows.push(vec![(i % 5) as f64, i as f64]);
            labels.push(u8::from(i >= 20));
        }
        (rows, labels)
    }

    fn small() -> BoostingParams {
        BoostingParams {
            n_estimators: 60,
            max_depth: 3,
            learning_rate: 0.3,
            subsample: 1.0,
            colsample_bytree: 1.0,
            reg_lambda: 1.0,
            min_child_weight: 0.1,
        }
    }

    #[test]
    fn fits_separable_data() {
        let (rows, labels) = separable();
        let model = GradientBoosting::fit(&small(), &rows, &labels, 42).unwrap();
        assert_eq!(model.trees.len(), 60);
        assert!(model.predict_proba_row(&[0.0, 2.0]) < 0.2);
        assert!(model.predict_proba_row(&[0.0, 35.0]) > 0.8);
        assert!(model.importances[1] > model.importances[0]);
    }

    #[test]
    fn base_margin_is_prior_log_odds() {
        let rows = vec![vec![1.0]; 4];
        let params = BoostingParams {
            n_estimators: 0,
            ..small()
        };
        let model = GradientBoosting::fit(&params, &rows, &[0, 0, 0, 1], 1).unwrap();
        assert!((model.predict_proba_row(&[1.0]) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn subsampling_is_reproducible_per_seed() {
        let (rows, labels) = separable();
        let params = BoostingParams {
            n_estimators: 10,
            ..BoostingParams::default()
        };
        let a = GradientBoosting::fit(&params, &rows, &labels, 3).unwrap();
        let b = GradientBoosting::fit(&params, &rows, &labels, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn sampled_count_keeps_at_least_one() {
        assert_eq!(sampled_count(10, 0.8), 8);
        assert_eq!(sampled_count(1, 0.8), 1);
        assert_eq!(sampled_count(0, 0.8), 0);
    }
}
