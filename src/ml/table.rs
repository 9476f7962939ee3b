use crate::error::{Error, Result};
use crate::models::records::DatasetRow;
use std::collections::HashMap;

/// Numeric feature matrix with named columns, stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

/// How a table's columns were matched to a model's expected features
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentReport {
    /// Expected columns present in the table, in table order
    pub used: Vec<String>,
    /// Table columns the model does not know
    pub dropped: Vec<String>,
    /// Expected columns the table lacks; they reach the model as NaN
    pub missing: Vec<String>,
}

impl FeatureTable {
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(bad) = rows.iter().position(|r| r.len() != names.len()) {
            return Err(Error::Dataset(format!(
                "row {bad} has {} values, expected {}",
                rows[bad].len(),
                names.len()
            )));
        }
        Ok(Self { names, rows })
    }

    /// Every numeric dataset column except the label
    pub fn from_dataset(rows: &[DatasetRow]) -> Self {
        let names = DatasetRow::feature_names().iter().map(|n| n.to_string()).collect();
        let rows = rows.iter().map(|r| r.feature_values().to_vec()).collect();
        Self { names, rows }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Matches columns to `expected` by name. The result has exactly the
    /// expected columns in expected order, with NaN for absent ones.
    pub fn align(&self, expected: &[String]) -> (FeatureTable, AlignmentReport) {
        let position: HashMap<&str, usize> = self
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let mut report = AlignmentReport::default();
        for name in &self.names {
            if expected.contains(name) {
                report.used.push(name.clone());
            } else {
                report.dropped.push(name.clone());
            }
        }
        report.missing = expected
            .iter()
            .filter(|e| !position.contains_key(e.as_str()))
            .cloned()
            .collect();

        let sources: Vec<Option<usize>> = expected.iter().map(|e| position.get(e.as_str()).copied()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| sources.iter().map(|src| src.map_or(f64::NAN, |j| row[j])).collect())
            .collect();

        (
            FeatureTable {
                names: expected.to_vec(),
                rows,
            },
            report,
        )
    }
}
