use crate::analysis::language::Language;
use crate::analysis::{complexity, maintainability, raw};
use crate::commands::settings::Settings;
use crate::error::{Error, Result};
use crate::models::records::FileStaticRecord;
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};

/// Static metrics for every recognized source file under a repository
#[derive(Debug, Clone, Default)]
pub struct StaticCrawl {
    pub records: Vec<FileStaticRecord>,
    /// Files that could not be read and were scored as empty
    pub unreadable: Vec<String>,
}

pub fn crawl_repo_static_metrics(repo_root: &Path, settings: &Settings) -> Result<StaticCrawl> {
    let files = walkdir(repo_root, settings)?;
    crawl_files(repo_root, files, settings)
}

/// Measures already-enumerated files. A file may vanish or lose permissions
/// between the walk and the read.
pub(crate) fn crawl_files(repo_root: &Path, files: Vec<PathBuf>, settings: &Settings) -> Result<StaticCrawl> {
    let mut crawl = StaticCrawl::default();

    for path in files {
        let relative = to_relative_path(repo_root, &path);
        let source = match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(source) if settings.strict_reads => {
                return Err(Error::UnreadableFile { path: relative, source });
            }
            Err(e) => {
                log::warn!("could not read {relative}: {e}; recording zero metrics");
                crawl.unreadable.push(relative.clone());
                String::new()
            }
        };
        crawl.records.push(analyze_source(relative, &source, Language::from_path(&path)));
    }

    log::info!(
        "crawled {} source files under {} ({} unreadable)",
        crawl.records.len(),
        repo_root.display(),
        crawl.unreadable.len()
    );
    Ok(crawl)
}

/// Size, complexity and maintainability for one file's text
pub fn analyze_source(file: String, source: &str, language: Language) -> FileStaticRecord {
    if source.is_empty() {
        return FileStaticRecord::empty(file);
    }

    let scan = raw::scan(source, language);
    let file_complexity = complexity::analyze(source, language);
    let mi_scores = maintainability::maintainability_scores(&scan.raw, &scan.code, file_complexity.total());
    let mi = if mi_scores.is_empty() {
        0.0
    } else {
        mi_scores.iter().sum::<f64>() / mi_scores.len() as f64
    };

    FileStaticRecord {
        file,
        loc: scan.raw.loc,
        sloc: scan.raw.sloc,
        comments: scan.raw.comments,
        multi: scan.raw.multi,
        blank: scan.raw.blank,
        avg_cc: file_complexity.average,
        max_cc: file_complexity.max,
        mi,
    }
}

/// Source files under `root` allowed by the settings, sorted by path
pub(crate) fn walkdir(root: &Path, settings: &Settings) -> Result<Vec<PathBuf>> {
    let skip_dirs = settings.skip_dir_patterns()?;
    let excludes = settings.exclude_patterns()?;
    let mut files = Vec::new();

    fn walk_recursive(
        root: &Path,
        dir: &Path,
        settings: &Settings,
        skip_dirs: &[Pattern],
        excludes: &[Pattern],
        files: &mut Vec<PathBuf>,
    ) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("skipping {}: {e}", dir.display());
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                if !skip_dirs.iter().any(|p| p.matches(&name)) {
                    walk_recursive(root, &path, settings, skip_dirs, excludes, files);
                }
            } else if file_type.is_file() && is_source_file(&path, settings) {
                let relative = to_relative_path(root, &path);
                if !excludes.iter().any(|p| p.matches(&relative)) {
                    files.push(path);
                }
            }
        }
    }

    walk_recursive(root, root, settings, &skip_dirs, &excludes, &mut files);
    files.sort();
    Ok(files)
}

fn is_source_file(path: &Path, settings: &Settings) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| settings.allows_extension(ext))
}

/// Path relative to the repository root with `/` separators
pub fn to_relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
