use serde::{Deserialize, Serialize};

/// Days reported for a file whose last modification was never observed
pub const NEVER_MODIFIED_DAYS: i64 = 10_000;

/// Size, complexity and maintainability metrics for one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStaticRecord {
    pub file: String,
    pub loc: u64,
    pub sloc: u64,
    pub comments: u64,
    pub multi: u64,
    pub blank: u64,
    pub avg_cc: f64,
    pub max_cc: f64,
    pub mi: f64,
}

impl FileStaticRecord {
    /// Record for a file with no readable text
    pub fn empty(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            loc: 0,
            sloc: 0,
            comments: 0,
            multi: 0,
            blank: 0,
            avg_cc: 0.0,
            max_cc: 0.0,
            mi: 0.0,
        }
    }
}

/// Process metrics and weak bug label for one file over the mining window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHistoryRecord {
    pub file: String,
    pub commits: u64,
    pub churn_added: u64,
    pub churn_deleted: u64,
    pub distinct_authors: u64,
    pub last_modified_days: i64,
    pub buggy_label: u8,
}

/// One row of the persisted dataset. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub file: String,
    pub loc: u64,
    pub sloc: u64,
    pub comments: u64,
    pub multi: u64,
    pub blank: u64,
    pub avg_cc: f64,
    pub max_cc: f64,
    pub mi: f64,
    pub commits: u64,
    pub churn_added: u64,
    pub churn_deleted: u64,
    pub distinct_authors: u64,
    pub last_modified_days: i64,
    pub buggy_label: u8,
}

/// Dataset columns in persisted order
pub const DATASET_COLUMNS: [&str; 15] = [
    "file",
    "loc",
    "sloc",
    "comments",
    "multi",
    "blank",
    "avg_cc",
    "max_cc",
    "mi",
    "commits",
    "churn_added",
    "churn_deleted",
    "distinct_authors",
    "last_modified_days",
    "buggy_label",
];

/// Numeric feature columns in persisted order
pub const FEATURE_COLUMNS: [&str; 13] = [
    "loc",
    "sloc",
    "comments",
    "multi",
    "blank",
    "avg_cc",
    "max_cc",
    "mi",
    "commits",
    "churn_added",
    "churn_deleted",
    "distinct_authors",
    "last_modified_days",
];

impl DatasetRow {
    /// Joins a static record with a history record. `file` comes from the static side.
    pub fn join(static_rec: &FileStaticRecord, history: &FileHistoryRecord) -> Self {
        Self {
            file: static_rec.file.clone(),
            loc: static_rec.loc,
            sloc: static_rec.sloc,
            comments: static_rec.comments,
            multi: static_rec.multi,
            blank: static_rec.blank,
            avg_cc: static_rec.avg_cc,
            max_cc: static_rec.max_cc,
            mi: static_rec.mi,
            commits: history.commits,
            churn_added: history.churn_added,
            churn_deleted: history.churn_deleted,
            distinct_authors: history.distinct_authors,
            last_modified_days: history.last_modified_days,
            buggy_label: history.buggy_label,
        }
    }

    /// Model inputs: every numeric column except the label
    pub fn feature_names() -> &'static [&'static str] {
        &FEATURE_COLUMNS
    }

    pub fn feature_values(&self) -> [f64; 13] {
        [
            self.loc as f64,
            self.sloc as f64,
            self.comments as f64,
            self.multi as f64,
            self.blank as f64,
            self.avg_cc,
            self.max_cc,
            self.mi,
            self.commits as f64,
            self.churn_added as f64,
            self.churn_deleted as f64,
            self.distinct_authors as f64,
            self.last_modified_days as f64,
        ]
    }
}

/// A dataset row scored by a trained pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredFile {
    pub row: DatasetRow,
    pub risk: f64,
    pub pred_label: u8,
}
