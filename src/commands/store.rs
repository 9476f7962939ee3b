use crate::error::{Error, Result};
use crate::ml::table::FeatureTable;
use crate::models::artifact::TrainedModelArtifact;
use crate::models::records::DatasetRow;
use std::fs;
use std::path::Path;

const LABEL_COLUMN: &str = "buggy_label";
const ID_COLUMN: &str = "file";

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Writes the dataset as CSV with a header row, creating parent directories
pub fn save_dataset(path: &Path, rows: &[DatasetRow]) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(crate::models::records::DATASET_COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_dataset(path: &Path) -> Result<Vec<DatasetRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<DatasetRow>, _>>()?;
    Ok(rows)
}

/// Reads a dataset CSV by header for training. Every column other than
/// `file` and `buggy_label` becomes a numeric feature; cells that do not
/// parse become NaN. The label must be 0 or 1 on every row.
pub fn load_training_table(path: &Path) -> Result<(FeatureTable, Vec<u8>)> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let label_idx = headers
        .iter()
        .position(|h| h == LABEL_COLUMN)
        .ok_or_else(|| Error::Dataset(format!("missing '{LABEL_COLUMN}' column")))?;
    let feature_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| *h != LABEL_COLUMN && *h != ID_COLUMN)
        .map(|(i, _)| i)
        .collect();
    let names: Vec<String> = feature_idx.iter().map(|&i| headers[i].to_string()).collect();

    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let label = record
            .get(label_idx)
            .and_then(parse_label)
            .ok_or_else(|| Error::Dataset(format!("row {}: invalid {LABEL_COLUMN}", line + 1)))?;
        labels.push(label);
        rows.push(
            feature_idx
                .iter()
                .map(|&i| record.get(i).and_then(|v| v.trim().parse::<f64>().ok()).unwrap_or(f64::NAN))
                .collect(),
        );
    }

    if rows.len() < 2 {
        return Err(Error::Dataset(format!("need at least 2 rows, found {}", rows.len())));
    }
    log::info!("loaded {} rows with {} features from {}", rows.len(), names.len(), path.display());
    Ok((FeatureTable::new(names, rows)?, labels))
}

/// Accepts `0`, `1` and their float spellings
fn parse_label(raw: &str) -> Option<u8> {
    let value: f64 = raw.trim().parse().ok()?;
    if value == 0.0 {
        Some(0)
    } else if value == 1.0 {
        Some(1)
    } else {
        None
    }
}

pub fn save_artifact(path: &Path, artifact: &TrainedModelArtifact) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, artifact.to_json()?)?;
    Ok(())
}

pub fn load_artifact(path: &Path) -> Result<TrainedModelArtifact> {
    let raw = fs::read_to_string(path)?;
    TrainedModelArtifact::from_json(&raw)
}
