use crate::error::{Error, Result};
use crate::ml::boosting::{BoostingParams, GradientBoosting};
use crate::ml::forest::{ForestParams, RandomForest};
use crate::ml::preprocess::{MedianImputer, VarianceScaler};
use crate::ml::smote::Smote;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Model type tags accepted in persisted pipelines
pub const KNOWN_MODEL_TYPES: [&str; 2] = ["random_forest", "gradient_boosting"];

/// A candidate classifier and its fixed hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum ModelSpec {
    RandomForest(ForestParams),
    GradientBoosting(BoostingParams),
}

impl ModelSpec {
    pub fn name(&self) -> &'static str {
        match self {
            ModelSpec::RandomForest(_) => "RandomForest",
            ModelSpec::GradientBoosting(_) => "GradientBoosting",
        }
    }

    /// The default candidates, in evaluation order
    pub fn candidates() -> Vec<ModelSpec> {
        vec![
            ModelSpec::RandomForest(ForestParams::default()),
            ModelSpec::GradientBoosting(BoostingParams::default()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "fitted", rename_all = "snake_case")]
pub enum FittedModel {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl FittedModel {
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        match self {
            FittedModel::RandomForest(m) => m.predict_proba_row(row),
            FittedModel::GradientBoosting(m) => m.predict_proba_row(row),
        }
    }

    pub fn importances(&self) -> Option<&[f64]> {
        let values = match self {
            FittedModel::RandomForest(m) => &m.importances,
            FittedModel::GradientBoosting(m) => &m.importances,
        };
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }
}

/// Imputation, scaling, oversampling and a classifier, fitted together.
/// Oversampling only shapes the training rows and is not replayed at predict time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub spec: ModelSpec,
    pub seed: u64,
    pub smote: Smote,
    pub imputer: MedianImputer,
    pub scaler: VarianceScaler,
    pub model: FittedModel,
}

impl Pipeline {
    pub fn fit(spec: &ModelSpec, rows: &[Vec<f64>], labels: &[u8], seed: u64) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(Error::Training(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let Some(first) = rows.first() else {
            return Err(Error::Training("no training rows".to_string()));
        };
        let n_features = first.len();

        let imputer = MedianImputer::fit(rows, n_features);
        let mut prepared = rows.to_vec();
        imputer.transform(&mut prepared);
        let scaler = VarianceScaler::fit(&prepared, n_features);
        scaler.transform(&mut prepared);

        let smote = Smote::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let (train_rows, train_labels) = smote.resample(&prepared, labels, &mut rng);

        let model = match spec {
            ModelSpec::RandomForest(params) => {
                FittedModel::RandomForest(RandomForest::fit(params, &train_rows, &train_labels, seed)?)
            }
            ModelSpec::GradientBoosting(params) => {
                FittedModel::GradientBoosting(GradientBoosting::fit(params, &train_rows, &train_labels, seed)?)
            }
        };

        Ok(Self {
            spec: spec.clone(),
            seed,
            smote,
            imputer,
            scaler,
            model,
        })
    }

    /// Positive-class probability per row
    pub fn predict_proba(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        let mut prepared = rows.to_vec();
        self.imputer.transform(&mut prepared);
        self.scaler.transform(&mut prepared);
        prepared.iter().map(|row| self.model.predict_proba_row(row)).collect()
    }

    /// Hard labels with a strict `p > 0.5`
    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<u8> {
        self.predict_proba(rows).into_iter().map(|p| u8::from(p > 0.5)).collect()
    }

    pub fn feature_importances(&self) -> Option<&[f64]> {
        self.model.importances()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            let buggy = i % 4 == 0;
            let churn = if buggy { 200.0 + i as f64 } else { 10.0 + i as f64 };
            let cc = if i == 3 { f64::NAN } else { (i % 7) as f64 };
            rows.push(vec![churn, cc]);
            labels.push(u8::from(buggy));
        }
        (rows, labels)
    }

    fn quick_forest() -> ModelSpec {
        ModelSpec::RandomForest(ForestParams {
            n_estimators: 20,
            ..ForestParams::default()
        })
    }

    #[test]
    fn fits_through_nan_and_class_imbalance() {
        let (rows, labels) = data();
        let pipeline = Pipeline::fit(&quick_forest(), &rows, &labels, 42).unwrap();

        let probs = pipeline.predict_proba(&[vec![230.0, 1.0], vec![15.0, f64::NAN]]);
        assert!(probs[0] > 0.5);
        assert!(probs[1] < 0.5);
        assert_eq!(pipeline.predict(&[vec![230.0, 1.0]]), vec![1]);
        assert_eq!(pipeline.feature_importances().map(<[f64]>::len), Some(2));
    }

    #[test]
    fn boosting_candidate_fits_the_same_data() {
        let (rows, labels) = data();
        let spec = ModelSpec::GradientBoosting(BoostingParams {
            n_estimators: 40,
            max_depth: 3,
            ..BoostingParams::default()
        });
        let pipeline = Pipeline::fit(&spec, &rows, &labels, 42).unwrap();
        let probs = pipeline.predict_proba(&[vec![230.0, 1.0], vec![15.0, 1.0]]);
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn serializes_with_model_type_tag() {
        let (rows, labels) = data();
        let pipeline = Pipeline::fit(&quick_forest(), &rows, &labels, 42).unwrap();
        let json = serde_json::to_value(&pipeline).unwrap();
        assert_eq!(json["model"]["type"], "random_forest");
        assert_eq!(json["spec"]["type"], "random_forest");
        assert!(KNOWN_MODEL_TYPES.contains(&"gradient_boosting"));
    }

    #[test]
    fn default_candidates_match_fixed_hyperparameters() {
        let candidates = ModelSpec::candidates();
        assert_eq!(candidates.len(), 2);
        match &candidates[1] {
            ModelSpec::GradientBoosting(p) => {
                assert_eq!(p.n_estimators, 400);
                assert_eq!(p.max_depth, 8);
                assert_eq!(p.learning_rate, 0.05);
            }
            other => panic!("unexpected candidate {}", other.name()),
        }
    }

    #[test]
    fn mismatched_lengths_are_training_errors() {
        let err = Pipeline::fit(&quick_forest(), &[vec![1.0]], &[0, 1], 1).unwrap_err();
        assert!(matches!(err, Error::Training(_)));
    }
}
