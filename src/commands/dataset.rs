use crate::analysis::join::{join_records, JoinStrategy};
use crate::commands::ast::crawl_repo_static_metrics;
use crate::commands::git::mine_git_history;
use crate::commands::settings::Settings;
use crate::commands::store::save_dataset;
use crate::error::{Error, Result};
use crate::models::records::DatasetRow;
use std::path::Path;

/// Joined per-file rows for a repository, plus what the join reported
#[derive(Debug, Clone)]
pub struct DatasetBuild {
    pub rows: Vec<DatasetRow>,
    pub strategy: JoinStrategy,
    pub history_files: usize,
    pub static_files: usize,
    pub unreadable: Vec<String>,
}

/// Mines history, crawls static metrics and joins them. Mining runs first
/// so an empty history fails before the crawl.
pub fn assemble_dataset(repo_path: &Path, since_months: u32, settings: &Settings) -> Result<DatasetBuild> {
    let classifier = settings.classifier()?;
    let history = mine_git_history(repo_path, since_months, &classifier)?;
    if history.is_empty() {
        return Err(Error::NoGitData);
    }

    let crawl = crawl_repo_static_metrics(repo_path, settings)?;
    let joined = join_records(&crawl.records, &history)?;

    log::info!(
        "joined {} history rows with {} static rows by {}: {} rows ({} empty files dropped)",
        history.len(),
        crawl.records.len(),
        joined.strategy.as_str(),
        joined.rows.len(),
        joined.dropped_empty
    );
    if joined.strategy == JoinStrategy::Basename {
        log::warn!("no paths matched exactly; joined on file names instead");
    }

    Ok(DatasetBuild {
        rows: joined.rows,
        strategy: joined.strategy,
        history_files: history.len(),
        static_files: crawl.records.len(),
        unreadable: crawl.unreadable,
    })
}

pub fn build_dataset(repo_path: &Path, since_months: u32, out: &Path, settings: &Settings) -> Result<DatasetBuild> {
    let build = assemble_dataset(repo_path, since_months, settings)?;
    save_dataset(out, &build.rows)?;
    log::info!("wrote {} rows to {}", build.rows.len(), out.display());
    Ok(build)
}
