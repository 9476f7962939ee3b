use crate::commands::dataset::assemble_dataset;
use crate::commands::settings::Settings;
use crate::error::{Error, Result};
use crate::ml::table::{AlignmentReport, FeatureTable};
use crate::models::artifact::TrainedModelArtifact;
use crate::models::records::{DatasetRow, ScoredFile};
use std::path::Path;

/// Probability at or above which a file is labelled risky
pub const RISK_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct ScoringReport {
    pub model_name: String,
    /// Scored files, highest risk first
    pub files: Vec<ScoredFile>,
    pub alignment: AlignmentReport,
    pub importances: Option<Vec<(String, f64)>>,
    pub unreadable: Vec<String>,
}

/// Scores dataset rows with the artifact's pipeline. Columns are matched to
/// the artifact's features by name; absent ones are imputed unless
/// `strict_features` is set.
pub fn score_dataset(
    artifact: &TrainedModelArtifact,
    rows: &[DatasetRow],
    strict_features: bool,
) -> Result<(Vec<ScoredFile>, AlignmentReport)> {
    let table = FeatureTable::from_dataset(rows);
    let (aligned, report) = table.align(&artifact.feature_names);

    if !report.missing.is_empty() {
        if strict_features {
            return Err(Error::MissingFeatures(report.missing.clone()));
        }
        log::debug!("imputing absent features: {}", report.missing.join(", "));
    }
    if !report.dropped.is_empty() {
        log::debug!("ignoring columns the model does not use: {}", report.dropped.join(", "));
    }

    let probabilities = artifact.pipeline.predict_proba(aligned.rows());
    let mut scored: Vec<ScoredFile> = rows
        .iter()
        .zip(probabilities)
        .map(|(row, risk)| ScoredFile {
            row: row.clone(),
            risk,
            pred_label: u8::from(risk >= RISK_THRESHOLD),
        })
        .collect();
    scored.sort_by(|a, b| b.risk.total_cmp(&a.risk).then_with(|| a.row.file.cmp(&b.row.file)));
    Ok((scored, report))
}

/// Recomputes features for a live repository and scores them
pub fn score_repository(
    repo_path: &Path,
    artifact: &TrainedModelArtifact,
    since_months: u32,
    settings: &Settings,
) -> Result<ScoringReport> {
    let build = assemble_dataset(repo_path, since_months, settings)?;
    let (files, alignment) = score_dataset(artifact, &build.rows, settings.strict_features)?;
    log::info!(
        "scored {} files with {} ({} at or above {RISK_THRESHOLD})",
        files.len(),
        artifact.model_name,
        files.iter().filter(|f| f.pred_label == 1).count()
    );

    Ok(ScoringReport {
        model_name: artifact.model_name.clone(),
        files,
        alignment,
        importances: artifact.ranked_importances(),
        unreadable: build.unreadable,
    })
}
