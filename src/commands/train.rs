use crate::commands::store::{load_training_table, save_artifact};
use crate::error::{Error, Result};
use crate::ml::pipeline::{ModelSpec, Pipeline};
use crate::ml::table::FeatureTable;
use crate::ml::validation::{cross_validate, CvSummary};
use crate::models::artifact::TrainedModelArtifact;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub folds: usize,
    pub seed: u64,
    pub candidates: Vec<ModelSpec>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            folds: 5,
            seed: 42,
            candidates: ModelSpec::candidates(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandidateReport {
    pub name: String,
    pub summary: CvSummary,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: TrainedModelArtifact,
    pub reports: Vec<CandidateReport>,
}

/// Cross-validates every candidate, keeps the first with the highest mean
/// F1 and refits it on all rows
pub fn train_and_eval(table: &FeatureTable, labels: &[u8], options: &TrainOptions) -> Result<TrainingOutcome> {
    if options.candidates.is_empty() {
        return Err(Error::Training("no candidate models".to_string()));
    }
    if table.n_rows() != labels.len() {
        return Err(Error::Training(format!(
            "{} rows but {} labels",
            table.n_rows(),
            labels.len()
        )));
    }

    let mut reports = Vec::with_capacity(options.candidates.len());
    let mut best: Option<(usize, f64)> = None;
    let mut best_f1 = -1.0;

    for (idx, spec) in options.candidates.iter().enumerate() {
        log::info!("evaluating {} with {}-fold cross-validation", spec.name(), options.folds);
        let summary = cross_validate(spec, table.rows(), labels, options.folds, options.seed)?;
        log::info!(
            "{}: mean P={:.3} R={:.3} F1={:.3} AUC={:.3}",
            spec.name(),
            summary.mean_precision,
            summary.mean_recall,
            summary.mean_f1,
            summary.mean_auc
        );
        if summary.mean_f1 > best_f1 {
            best_f1 = summary.mean_f1;
            best = Some((idx, summary.mean_f1));
        }
        reports.push(CandidateReport {
            name: spec.name().to_string(),
            summary,
        });
    }

    let Some((winner, f1)) = best else {
        return Err(Error::Training("no candidate produced a finite F1".to_string()));
    };
    let spec = &options.candidates[winner];
    log::info!("selected {} (mean F1 {:.3}); refitting on {} rows", spec.name(), f1, table.n_rows());

    let pipeline = Pipeline::fit(spec, table.rows(), labels, options.seed)?;
    let artifact = TrainedModelArtifact::new(table.names().to_vec(), reports[winner].summary.clone(), pipeline);
    Ok(TrainingOutcome { artifact, reports })
}

pub fn train_from_csv(data: &Path, model_out: &Path, options: &TrainOptions) -> Result<TrainingOutcome> {
    let (table, labels) = load_training_table(data)?;
    let outcome = train_and_eval(&table, &labels, options)?;
    save_artifact(model_out, &outcome.artifact)?;
    log::info!(
        "saved {} artifact {} to {}",
        outcome.artifact.model_name,
        outcome.artifact.artifact_id,
        model_out.display()
    );
    Ok(outcome)
}

/// One row per candidate with its cross-validated means
pub fn summary_table(reports: &[CandidateReport], selected: &str) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Model",
        "Precision",
        "Recall",
        "F1",
        "ROC-AUC",
        "",
    ]);
    for report in reports {
        let s = &report.summary;
        table.add_row(vec![
            Cell::new(&report.name),
            Cell::new(format!("{:.3}", s.mean_precision)),
            Cell::new(format!("{:.3}", s.mean_recall)),
            Cell::new(format!("{:.3}", s.mean_f1)),
            Cell::new(format_metric(s.mean_auc)),
            Cell::new(if report.name == selected { "selected" } else { "" }),
        ]);
    }
    table
}

fn format_metric(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{value:.3}")
    }
}
