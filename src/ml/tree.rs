//! Binary decision trees.
//!
//! `Tree` is the fitted form shared by both ensembles: leaves hold a positive
//! class probability for forest trees and an additive margin for boosted
//! trees. `ClassificationTree` grows a CART tree on weighted Gini impurity.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Rows with `row[feature] <= threshold` go left
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

/// Settings for growing one CART classification tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub max_features: usize,
    pub min_samples_split: usize,
}

/// A fitted classification tree and the weighted Gini decrease per feature
#[derive(Debug, Clone)]
pub struct ClassificationTree {
    pub tree: Tree,
    pub importances: Vec<f64>,
}

struct Grower<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [u8],
    weights: &'a [f64],
    params: TreeParams,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

impl ClassificationTree {
    /// Grows a tree over the samples in `indices`. `weights` holds one
    /// weight per row of `rows`; repeated indices act as extra weight.
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[u8],
        weights: &[f64],
        indices: &mut [usize],
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        let mut grower = Grower {
            rows,
            labels,
            weights,
            params,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        grower.grow(indices, 0, rng);

        let total: f64 = grower.importances.iter().sum();
        if total > 0.0 {
            for v in &mut grower.importances {
                *v /= total;
            }
        }
        Self {
            tree: Tree { nodes: grower.nodes },
            importances: grower.importances,
        }
    }
}

impl Grower<'_> {
    fn class_weights(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(neg, pos), &i| {
            if self.labels[i] == 1 {
                (neg, pos + self.weights[i])
            } else {
                (neg + self.weights[i], pos)
            }
        })
    }

    fn grow(&mut self, indices: &mut [usize], depth: usize, rng: &mut StdRng) -> usize {
        let (neg, pos) = self.class_weights(indices);
        let total = neg + pos;
        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: if total > 0.0 { pos / total } else { 0.0 },
        });

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || indices.len() < self.params.min_samples_split || neg == 0.0 || pos == 0.0 {
            return node_id;
        }
        let Some(split) = self.best_split(indices, neg, pos, rng) else {
            return node_id;
        };

        self.importances[split.feature] += split.decrease;
        let mid = partition(indices, |&i| self.rows[i][split.feature] <= split.threshold);
        let (left_idx, right_idx) = indices.split_at_mut(mid);
        let left = self.grow(left_idx, depth + 1, rng);
        let right = self.grow(right_idx, depth + 1, rng);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    /// Examines features in random order. Stops once `max_features` have been
    /// examined and a valid split exists; keeps looking past that otherwise.
    fn best_split(&self, indices: &[usize], neg: f64, pos: f64, rng: &mut StdRng) -> Option<SplitChoice> {
        let n_features = self.importances.len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);

        let parent = gini(neg, pos) * (neg + pos);
        let mut best: Option<SplitChoice> = None;
        let mut sorted = indices.to_vec();

        for (examined, &feature) in features.iter().enumerate() {
            if examined >= self.params.max_features && best.is_some() {
                break;
            }
            sorted.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let (mut left_neg, mut left_pos) = (0.0, 0.0);
            for pair in 0..sorted.len() - 1 {
                let i = sorted[pair];
                if self.labels[i] == 1 {
                    left_pos += self.weights[i];
                } else {
                    left_neg += self.weights[i];
                }
                let here = self.rows[i][feature];
                let next = self.rows[sorted[pair + 1]][feature];
                if next <= here {
                    continue;
                }
                let (right_neg, right_pos) = (neg - left_neg, pos - left_pos);
                let children =
                    gini(left_neg, left_pos) * (left_neg + left_pos) + gini(right_neg, right_pos) * (right_neg + right_pos);
                let decrease = parent - children;
                if decrease > 1e-12 && best.as_ref().map_or(true, |b| decrease > b.decrease) {
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(SplitChoice {
                        feature,
                        threshold,
                        decrease,
                    });
                }
            }
        }
        best
    }
}

fn gini(neg: f64, pos: f64) -> f64 {
    let total = neg + pos;
    if total <= 0.0 {
        return 0.0;
    }
    let (p0, p1) = (neg / total, pos / total);
    1.0 - p0 * p0 - p1 * p1
}

/// Moves elements satisfying `pred` to the front; returns how many did
pub(crate) fn partition<F>(items: &mut [usize], pred: F) -> usize
where
    F: Fn(&usize) -> bool,
{
    let mut mid = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn fit(rows: &[Vec<f64>], labels: &[u8], max_depth: Option<usize>) -> ClassificationTree {
        let weights = vec![1.0; rows.len()];
        let mut indices: Vec<usize> = (0..rows.len()).collect();
        let params = TreeParams {
            max_depth,
            max_features: rows[0].len(),
            min_samples_split: 2,
        };
        let mut rng = StdRng::seed_from_u64(42);
        ClassificationTree::fit(rows, labels, &weights, &mut indices, params, &mut rng)
    }

    #[test]
    fn separates_on_the_informative_feature() {
        let rows = vec![
            vec![1.0, 7.0],
            vec![2.0, 3.0],
            vec![3.0, 9.0],
            vec![10.0, 4.0],
            vec![11.0, 8.0],
            vec![12.0, 2.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let fitted = fit(&rows, &labels, None);

        assert_eq!(fitted.tree.depth(), 1);
        assert_eq!(fitted.importances, vec![1.0, 0.0]);
        assert_eq!(fitted.tree.predict_row(&[2.5, 100.0]), 0.0);
        assert_eq!(fitted.tree.predict_row(&[9.0, -3.0]), 1.0);
        match &fitted.tree.nodes[0] {
            Node::Split { feature, threshold, .. } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 6.5);
            }
            Node::Leaf { .. } => panic!("root should split"),
        }
    }

    #[test]
    fn depth_limit_yields_class_fractions() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let fitted = fit(&rows, &[0, 1, 0, 1], Some(0));
        assert_eq!(fitted.tree.nodes.len(), 1);
        assert_eq!(fitted.tree.predict_row(&[2.0]), 0.5);
    }

    #[test]
    fn constant_features_produce_a_leaf() {
        let rows = vec![vec![1.0], vec![1.0], vec![1.0]];
        let fitted = fit(&rows, &[0, 1, 1], None);
        assert_eq!(fitted.tree.nodes.len(), 1);
        assert!((fitted.tree.predict_row(&[1.0]) - 2.0 / 3.0).abs() < 1e-12);
        assert!(fitted.importances.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn partition_moves_matches_to_front() {
        let mut items = vec![5, 1, 4, 2, 3];
        let mid = partition(&mut items, |&v| v <= 2);
        assert_eq!(mid, 2);
        let mut front = items[..mid].to_vec();
        front.sort();
        assert_eq!(front, vec![1, 2]);
    }
}
