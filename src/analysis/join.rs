use crate::error::{Error, Result};
use crate::models::records::{DatasetRow, FileHistoryRecord, FileStaticRecord};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    /// Exact match on the normalized relative path
    Path,
    /// Match on the final path component only
    Basename,
}

impl JoinStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinStrategy::Path => "path",
            JoinStrategy::Basename => "basename",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinedRows {
    pub rows: Vec<DatasetRow>,
    pub strategy: JoinStrategy,
    /// Joined rows discarded because the file had no lines
    pub dropped_empty: usize,
}

pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Inner join on `file`, falling back to a basename join only when the
/// direct join matches nothing. Rows with `loc == 0` are dropped afterwards.
pub fn join_records(static_records: &[FileStaticRecord], history: &[FileHistoryRecord]) -> Result<JoinedRows> {
    let mut rows = join_on_path(static_records, history);
    let mut strategy = JoinStrategy::Path;

    if rows.is_empty() {
        rows = join_on_basename(static_records, history);
        strategy = JoinStrategy::Basename;
    }
    if rows.is_empty() {
        return Err(Error::EmptyJoin);
    }

    let before = rows.len();
    rows.retain(|row| row.loc > 0);
    Ok(JoinedRows {
        dropped_empty: before - rows.len(),
        rows,
        strategy,
    })
}

fn join_on_path(static_records: &[FileStaticRecord], history: &[FileHistoryRecord]) -> Vec<DatasetRow> {
    let by_path: HashMap<&str, &FileHistoryRecord> = history.iter().map(|h| (h.file.as_str(), h)).collect();
    static_records
        .iter()
        .filter_map(|s| by_path.get(s.file.as_str()).map(|h| DatasetRow::join(s, h)))
        .collect()
}

fn join_on_basename(static_records: &[FileStaticRecord], history: &[FileHistoryRecord]) -> Vec<DatasetRow> {
    let mut by_name: HashMap<&str, Vec<&FileHistoryRecord>> = HashMap::new();
    for h in history {
        by_name.entry(basename(&h.file)).or_default().push(h);
    }

    let mut rows = Vec::new();
    for s in static_records {
        if let Some(matches) = by_name.get(basename(&s.file)) {
            rows.extend(matches.iter().map(|h| DatasetRow::join(s, h)));
        }
    }
    rows
}
