use crate::analysis::churn::{window_start, FileModification, HistoryAccumulator, MinedCommit};
use crate::analysis::labeling::CommitClassifier;
use crate::error::Result;
use crate::models::records::FileHistoryRecord;
use chrono::{DateTime, Utc};
use git2::{Commit, Delta, DiffFindOptions, ErrorCode, Patch, Repository, Sort};
use std::path::Path;

/// Yields commits authored at or after a cutoff, oldest first
pub trait CommitSource {
    fn commits_since(&self, since: DateTime<Utc>) -> Result<Vec<MinedCommit>>;
}

/// Read-only commit source over a local git working copy
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            repo: Repository::open(path)?,
        })
    }

    fn modifications(&self, commit: &Commit) -> Result<Vec<FileModification>> {
        // Merges add no changes of their own
        if commit.parent_count() > 1 {
            return Ok(Vec::new());
        }
        let tree = commit.tree()?;
        let parent_tree = match commit.parent_count() {
            0 => None,
            _ => Some(commit.parent(0)?.tree()?),
        };

        let mut diff = self.repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let mut out = Vec::with_capacity(diff.deltas().len());
        for (idx, delta) in diff.deltas().enumerate() {
            let old_path = match delta.status() {
                Delta::Added | Delta::Untracked => None,
                _ => delta.old_file().path().map(path_string),
            };
            let new_path = match delta.status() {
                Delta::Deleted => None,
                _ => delta.new_file().path().map(path_string),
            };
            let (added, removed) = match Patch::from_diff(&diff, idx)? {
                Some(patch) => {
                    let (_, additions, deletions) = patch.line_stats()?;
                    (additions as i64, deletions as i64)
                }
                None => (0, 0),
            };
            out.push(FileModification {
                old_path,
                new_path,
                added,
                removed,
            });
        }
        Ok(out)
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Commit metadata is raw bytes in whatever encoding the author used
fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn commit_time(commit: &Commit) -> DateTime<Utc> {
    DateTime::from_timestamp(commit.author().when().seconds(), 0).unwrap_or_default()
}

impl CommitSource for GitRepository {
    fn commits_since(&self, since: DateTime<Utc>) -> Result<Vec<MinedCommit>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME | Sort::REVERSE)?;
        match revwalk.push_head() {
            Ok(()) => {}
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                log::warn!("repository has no commits yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        }

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            let author_date = commit_time(&commit);
            if author_date < since {
                continue;
            }
            let author = commit.author();
            commits.push(MinedCommit {
                author_name: Some(lossy(author.name_bytes())),
                author_email: Some(lossy(author.email_bytes())),
                author_date,
                message: lossy(commit.message_bytes()),
                modifications: self.modifications(&commit)?,
            });
        }
        Ok(commits)
    }
}

/// Aggregates per-file history from any commit source. `now` anchors both
/// the window start and `last_modified_days`.
pub fn mine_from_source(
    source: &dyn CommitSource,
    since_months: u32,
    classifier: &dyn CommitClassifier,
    now: DateTime<Utc>,
) -> Result<Vec<FileHistoryRecord>> {
    let since = window_start(now, since_months);
    let commits = source.commits_since(since)?;

    let mut accumulator = HistoryAccumulator::new();
    let mut bugfixes = 0usize;
    for commit in &commits {
        let is_bugfix = classifier.is_bugfix(&commit.message);
        bugfixes += usize::from(is_bugfix);
        accumulator.record(commit, is_bugfix);
    }

    log::info!(
        "mined {} commits since {} ({} bugfixes) touching {} files",
        commits.len(),
        since.format("%Y-%m-%d"),
        bugfixes,
        accumulator.len()
    );
    Ok(accumulator.finish(now))
}

pub fn mine_git_history(
    repo_path: &Path,
    since_months: u32,
    classifier: &dyn CommitClassifier,
) -> Result<Vec<FileHistoryRecord>> {
    let repo = GitRepository::open(repo_path)?;
    mine_from_source(&repo, since_months, classifier, Utc::now())
}
