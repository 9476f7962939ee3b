//! Synthetic minority oversampling.
//!
//! Each synthetic row lies on the segment between a random minority row and
//! one of its k nearest minority neighbours. Originals are kept in place and
//! synthetic rows are appended until both classes have the same count.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Smote {
    pub k_neighbors: usize,
}

impl Default for Smote {
    fn default() -> Self {
        Self { k_neighbors: 5 }
    }
}

impl Smote {
    pub fn resample(&self, rows: &[Vec<f64>], labels: &[u8], rng: &mut StdRng) -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut out_rows = rows.to_vec();
        let mut out_labels = labels.to_vec();

        let positives = labels.iter().filter(|&&l| l == 1).count();
        let negatives = labels.len() - positives;
        if positives == negatives {
            return (out_rows, out_labels);
        }
        let minority_label = u8::from(positives < negatives);
        let minority: Vec<&Vec<f64>> = rows
            .iter()
            .zip(labels)
            .filter(|(_, &l)| l == minority_label)
            .map(|(r, _)| r)
            .collect();
        if minority.len() < 2 {
            log::debug!("skipping oversampling: {} minority rows", minority.len());
            return (out_rows, out_labels);
        }

        let k = self.k_neighbors.min(minority.len() - 1).max(1);
        let neighbors: Vec<Vec<usize>> = (0..minority.len()).map(|i| nearest(&minority, i, k)).collect();
        let needed = positives.abs_diff(negatives);

        for _ in 0..needed {
            let i = rng.random_range(0..minority.len());
            let j = neighbors[i][rng.random_range(0..k)];
            let gap: f64 = rng.random();
            let synthetic = minority[i]
                .iter()
                .zip(minority[j])
                .map(|(a, b)| a + gap * (b - a))
                .collect();
            out_rows.push(synthetic);
            out_labels.push(minority_label);
        }
        (out_rows, out_labels)
    }
}

/// Indices of the `k` nearest rows to `rows[i]`, excluding itself
fn nearest(rows: &[&Vec<f64>], i: usize, k: usize) -> Vec<usize> {
    let mut distances: Vec<(f64, usize)> = rows
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != i)
        .map(|(j, r)| (squared_distance(rows[i], r), j))
        .collect();
    distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    distances.into_iter().take(k).map(|(_, j)| j).collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
