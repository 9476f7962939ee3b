use crate::analysis::knowledge::{normalize_author, AuthorSet};
use crate::models::records::{FileHistoryRecord, NEVER_MODIFIED_DAYS};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// One file touched by a commit, as reported by the mining collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileModification {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub added: i64,
    pub removed: i64,
}

impl FileModification {
    /// Key under which the change is aggregated: the new path, else the old one
    pub fn path(&self) -> Option<&str> {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct MinedCommit {
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub author_date: DateTime<Utc>,
    pub message: String,
    pub modifications: Vec<FileModification>,
}

/// Start of the mining window; a month counts as 30 days
pub fn window_start(now: DateTime<Utc>, since_months: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(since_months) * 30)
}

#[derive(Debug, Default)]
struct FileAggregate {
    commits: u64,
    churn_added: u64,
    churn_deleted: u64,
    authors: AuthorSet,
    last_modified: Option<DateTime<Utc>>,
    buggy: bool,
}

/// Per-file aggregates built while scanning commits oldest-first
#[derive(Debug, Default)]
pub struct HistoryAccumulator {
    per_file: BTreeMap<String, FileAggregate>,
}

impl HistoryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, commit: &MinedCommit, is_bugfix: bool) {
        let author = normalize_author(commit.author_email.as_deref(), commit.author_name.as_deref());

        for modification in &commit.modifications {
            let Some(path) = modification.path() else {
                continue;
            };
            let entry = self.per_file.entry(path.to_string()).or_default();
            entry.commits += 1;
            entry.churn_added += modification.added.max(0) as u64;
            entry.churn_deleted += modification.removed.max(0) as u64;
            entry.authors.insert(author.clone());
            entry.last_modified = Some(match entry.last_modified {
                Some(previous) => previous.max(commit.author_date),
                None => commit.author_date,
            });
            // Monotonic: a later non-bugfix commit never clears the label
            entry.buggy |= is_bugfix;
        }
    }

    pub fn len(&self) -> usize {
        self.per_file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_file.is_empty()
    }

    /// Freezes the aggregates into records, sorted by path
    pub fn finish(self, now: DateTime<Utc>) -> Vec<FileHistoryRecord> {
        self.per_file
            .into_iter()
            .map(|(file, agg)| FileHistoryRecord {
                file,
                commits: agg.commits,
                churn_added: agg.churn_added,
                churn_deleted: agg.churn_deleted,
                distinct_authors: agg.authors.len() as u64,
                last_modified_days: agg
                    .last_modified
                    .map(|lm| days_between(lm, now))
                    .unwrap_or(NEVER_MODIFIED_DAYS),
                buggy_label: u8::from(agg.buggy),
            })
            .collect()
    }
}

/// Whole days from `earlier` to `later`, floored, so a commit dated in the
/// future counts as a negative day
fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_seconds().div_euclid(86_400)
}
