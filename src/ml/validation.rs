use crate::error::{Error, Result};
use crate::ml::metrics::{mean, nanmean, precision_recall_f1, roc_auc};
use crate::ml::pipeline::{ModelSpec, Pipeline};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Folds that keep each class's share roughly constant
#[derive(Debug, Clone, Copy)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub seed: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// `(train, validation)` index pairs. Each class is shuffled with the
    /// seed and dealt round-robin, so every row validates exactly once.
    pub fn split(&self, labels: &[u8]) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 {
            return Err(Error::Training(format!("need at least 2 folds, got {}", self.n_splits)));
        }
        if self.n_splits > labels.len() {
            return Err(Error::Training(format!(
                "cannot split {} rows into {} folds",
                labels.len(),
                self.n_splits
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut assignment = vec![0usize; labels.len()];
        for class in [0u8, 1u8] {
            let mut members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
            members.shuffle(&mut rng);
            for (position, &row) in members.iter().enumerate() {
                assignment[row] = position % self.n_splits;
            }
        }

        Ok((0..self.n_splits)
            .map(|fold| {
                let (validation, train): (Vec<usize>, Vec<usize>) =
                    (0..labels.len()).partition(|&i| assignment[i] == fold);
                (train, validation)
            })
            .collect())
    }
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldScore {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// NaN when the validation fold holds a single class
    #[serde(with = "nan_as_null")]
    pub auc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvSummary {
    pub folds: Vec<FoldScore>,
    pub mean_precision: f64,
    pub mean_recall: f64,
    pub mean_f1: f64,
    #[serde(with = "nan_as_null")]
    pub mean_auc: f64,
}

impl CvSummary {
    /// Unweighted means over folds; the AUC mean skips undefined folds
    pub fn from_folds(folds: Vec<FoldScore>) -> Self {
        let column = |f: fn(&FoldScore) -> f64| folds.iter().map(f).collect::<Vec<f64>>();
        let mean_precision = mean(&column(|s| s.precision));
        let mean_recall = mean(&column(|s| s.recall));
        let mean_f1 = mean(&column(|s| s.f1));
        let mean_auc = nanmean(&column(|s| s.auc));
        Self {
            folds,
            mean_precision,
            mean_recall,
            mean_f1,
            mean_auc,
        }
    }
}

/// Fits a fresh pipeline per fold on the training part and scores the
/// validation part. Every fold is logged.
pub fn cross_validate(spec: &ModelSpec, rows: &[Vec<f64>], labels: &[u8], folds: usize, seed: u64) -> Result<CvSummary> {
    let splits = StratifiedKFold::new(folds, seed).split(labels)?;
    let mut scores = Vec::with_capacity(splits.len());

    for (fold, (train, validation)) in splits.iter().enumerate() {
        let train_rows: Vec<Vec<f64>> = train.iter().map(|&i| rows[i].clone()).collect();
        let train_labels: Vec<u8> = train.iter().map(|&i| labels[i]).collect();
        let val_rows: Vec<Vec<f64>> = validation.iter().map(|&i| rows[i].clone()).collect();
        let val_labels: Vec<u8> = validation.iter().map(|&i| labels[i]).collect();

        let pipeline = Pipeline::fit(spec, &train_rows, &train_labels, seed)?;
        let probabilities = pipeline.predict_proba(&val_rows);
        let predicted: Vec<u8> = probabilities.iter().map(|&p| u8::from(p > 0.5)).collect();

        let binary = precision_recall_f1(&val_labels, &predicted);
        let auc = roc_auc(&val_labels, &probabilities);
        log::info!(
            "Fold {}: P={:.3} R={:.3} F1={:.3} AUC={:.3}",
            fold + 1,
            binary.precision,
            binary.recall,
            binary.f1,
            auc
        );
        scores.push(FoldScore {
            precision: binary.precision,
            recall: binary.recall,
            f1: binary.f1,
            auc,
        });
    }

    Ok(CvSummary::from_folds(scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::forest::ForestParams;

    #[test]
    fn folds_partition_rows_and_keep_class_ratio() {
        let labels: Vec<u8> = (0..50).map(|i| u8::from(i % 5 == 0)).collect();
        let splits = StratifiedKFold::new(5, 42).split(&labels).unwrap();
        assert_eq!(splits.len(), 5);

        let mut seen: Vec<usize> = splits.iter().flat_map(|(_, v)| v.clone()).collect();
        seen.sort();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());

        for (train, validation) in &splits {
            assert_eq!(train.len() + validation.len(), 50);
            assert_eq!(validation.len(), 10);
            assert_eq!(validation.iter().filter(|&&i| labels[i] == 1).count(), 2);
            assert!(train.iter().all(|i| !validation.contains(i)));
        }
    }

    #[test]
    fn more_folds_than_rows_is_an_error() {
        let err = StratifiedKFold::new(5, 1).split(&[0, 1, 0]).unwrap_err();
        assert!(matches!(err, Error::Training(_)));
    }

    #[test]
    fn summary_means_are_unweighted_and_skip_undefined_auc() {
        let fold = |f1: f64, auc: f64| FoldScore {
            precision: f1,
            recall: f1,
            f1,
            auc,
        };
        let summary = CvSummary::from_folds(vec![
            fold(0.2, 0.5),
            fold(0.4, f64::NAN),
            fold(0.6, 0.7),
            fold(0.8, f64::NAN),
            fold(1.0, 0.9),
        ]);
        assert!((summary.mean_f1 - 0.6).abs() < 1e-12);
        assert!((summary.mean_auc - 0.7).abs() < 1e-12);
    }

    #[test]
    fn undefined_auc_survives_json() {
        let summary = CvSummary::from_folds(vec![FoldScore {
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
            auc: f64::NAN,
        }]);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"mean_auc\":null"));
        let back: CvSummary = serde_json::from_str(&json).unwrap();
        assert!(back.mean_auc.is_nan());
    }

    #[test]
    fn cross_validation_scores_every_fold() {
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let labels: Vec<u8> = (0..40).map(|i| u8::from(i >= 30)).collect();
        let spec = ModelSpec::RandomForest(ForestParams {
            n_estimators: 15,
            ..ForestParams::default()
        });
        let summary = cross_validate(&spec, &rows, &labels, 5, 42).unwrap();
        assert_eq!(summary.folds.len(), 5);
        assert!(summary.mean_f1 > 0.5);
        assert!(summary.mean_auc > 0.5);
    }
}
