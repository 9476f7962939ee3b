use crate::error::{Error, Result};
use crate::ml::pipeline::{Pipeline, KNOWN_MODEL_TYPES};
use crate::ml::validation::CvSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

/// The persisted winner of training: a fitted pipeline plus the feature
/// names it expects, in fit order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModelArtifact {
    pub schema_version: u32,
    pub artifact_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub model_name: String,
    pub feature_names: Vec<String>,
    pub cv: CvSummary,
    pub pipeline: Pipeline,
}

impl TrainedModelArtifact {
    pub fn new(feature_names: Vec<String>, cv: CvSummary, pipeline: Pipeline) -> Self {
        Self {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            artifact_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            model_name: pipeline.spec.name().to_string(),
            feature_names,
            cv,
            pipeline,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses an artifact, rejecting schema versions and model types this
    /// build does not know before decoding the model itself
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;

        let version = value.get("schema_version").and_then(Value::as_u64);
        if version != Some(u64::from(ARTIFACT_SCHEMA_VERSION)) {
            return Err(Error::UnsupportedModel(match version {
                Some(v) => format!("schema version {v}"),
                None => "missing schema version".to_string(),
            }));
        }

        let model_type = value
            .pointer("/pipeline/model/type")
            .and_then(Value::as_str)
            .unwrap_or("");
        if !KNOWN_MODEL_TYPES.contains(&model_type) {
            return Err(Error::UnsupportedModel(format!("model type '{model_type}'")));
        }

        let artifact: Self = serde_json::from_value(value)?;
        if artifact.feature_names.is_empty() {
            return Err(Error::UnsupportedModel("artifact lists no features".to_string()));
        }
        Ok(artifact)
    }

    /// Feature importances paired with names, largest first
    pub fn ranked_importances(&self) -> Option<Vec<(String, f64)>> {
        let values = self.pipeline.feature_importances()?;
        if values.len() != self.feature_names.len() {
            return None;
        }
        let mut ranked: Vec<(String, f64)> = self.feature_names.iter().cloned().zip(values.iter().copied()).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        Some(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::forest::ForestParams;
    use crate::ml::pipeline::ModelSpec;
    use crate::ml::validation::FoldScore;

    fn artifact() -> TrainedModelArtifact {
        let rows: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64, 1.0]).collect();
        let labels: Vec<u8> = (0..12).map(|i| u8::from(i >= 6)).collect();
        let spec = ModelSpec::RandomForest(ForestParams {
            n_estimators: 5,
            ..ForestParams::default()
        });
        let pipeline = Pipeline::fit(&spec, &rows, &labels, 42).unwrap();
        let cv = CvSummary::from_folds(vec![FoldScore {
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
            auc: f64::NAN,
        }]);
        TrainedModelArtifact::new(vec!["churn".to_string(), "loc".to_string()], cv, pipeline)
    }

    #[test]
    fn json_keeps_model_and_metadata() {
        let original = artifact();
        let loaded = TrainedModelArtifact::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(loaded.artifact_id, original.artifact_id);
        assert_eq!(loaded.model_name, "RandomForest");
        assert_eq!(loaded.feature_names, original.feature_names);
        let probe = vec![vec![9.0, 1.0], vec![2.0, 1.0]];
        let before = original.pipeline.predict_proba(&probe);
        let after = loaded.pipeline.predict_proba(&probe);
        assert!(before.iter().zip(&after).all(|(a, b)| (a - b).abs() < 1e-9));
        assert!(loaded.cv.mean_auc.is_nan());
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let mut value = serde_json::to_value(artifact()).unwrap();
        value["schema_version"] = serde_json::json!(2);
        let err = TrainedModelArtifact::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedModel(_)));
    }

    #[test]
    fn rejects_unknown_model_type() {
        let mut value = serde_json::to_value(artifact()).unwrap();
        value["pipeline"]["model"]["type"] = serde_json::json!("svm");
        let err = TrainedModelArtifact::from_json(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("svm"));
    }

    #[test]
    fn importances_are_ranked_by_weight() {
        let ranked = artifact().ranked_importances().unwrap();
        assert_eq!(ranked[0].0, "churn");
        assert!(ranked[0].1 >= ranked[1].1);
    }
}
