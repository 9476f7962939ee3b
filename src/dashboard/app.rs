//! Dashboard state and key handling.

use crate::commands::scoring::ScoringReport;
use crate::models::records::ScoredFile;
use crossterm::event::{KeyCode, KeyEvent};
use std::cmp::Ordering;

pub const DEFAULT_TOP_K: usize = 20;
pub const MIN_TOP_K: usize = 5;
pub const MAX_TOP_K: usize = 100;
const TOP_K_STEP: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    AllFiles,
    TopRisk,
    Importance,
}

impl Tab {
    pub fn all() -> [Tab; 3] {
        [Tab::AllFiles, Tab::TopRisk, Tab::Importance]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tab::AllFiles => "1 All files",
            Tab::TopRisk => "2 Top risk",
            Tab::Importance => "3 Feature importance",
        }
    }

    fn next(self) -> Tab {
        match self {
            Tab::AllFiles => Tab::TopRisk,
            Tab::TopRisk => Tab::Importance,
            Tab::Importance => Tab::AllFiles,
        }
    }
}

/// Columns the full table can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Risk,
    File,
    Loc,
    AvgCc,
    MaxCc,
    Mi,
    Commits,
    ChurnAdded,
    ChurnDeleted,
    Authors,
    LastModified,
}

impl SortColumn {
    pub fn all() -> &'static [SortColumn] {
        &[
            SortColumn::Risk,
            SortColumn::File,
            SortColumn::Loc,
            SortColumn::AvgCc,
            SortColumn::MaxCc,
            SortColumn::Mi,
            SortColumn::Commits,
            SortColumn::ChurnAdded,
            SortColumn::ChurnDeleted,
            SortColumn::Authors,
            SortColumn::LastModified,
        ]
    }

    pub fn header(&self) -> &'static str {
        match self {
            SortColumn::Risk => "risk",
            SortColumn::File => "file",
            SortColumn::Loc => "loc",
            SortColumn::AvgCc => "avg_cc",
            SortColumn::MaxCc => "max_cc",
            SortColumn::Mi => "mi",
            SortColumn::Commits => "commits",
            SortColumn::ChurnAdded => "churn+",
            SortColumn::ChurnDeleted => "churn-",
            SortColumn::Authors => "authors",
            SortColumn::LastModified => "days",
        }
    }

    fn next(self) -> SortColumn {
        let all = Self::all();
        let idx = all.iter().position(|c| *c == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }

    fn value(&self, file: &ScoredFile) -> f64 {
        let row = &file.row;
        match self {
            SortColumn::Risk => file.risk,
            SortColumn::File => 0.0,
            SortColumn::Loc => row.loc as f64,
            SortColumn::AvgCc => row.avg_cc,
            SortColumn::MaxCc => row.max_cc,
            SortColumn::Mi => row.mi,
            SortColumn::Commits => row.commits as f64,
            SortColumn::ChurnAdded => row.churn_added as f64,
            SortColumn::ChurnDeleted => row.churn_deleted as f64,
            SortColumn::Authors => row.distinct_authors as f64,
            SortColumn::LastModified => row.last_modified_days as f64,
        }
    }

    /// Ascending comparison on this column
    pub fn compare(&self, a: &ScoredFile, b: &ScoredFile) -> Ordering {
        match self {
            SortColumn::File => a.row.file.cmp(&b.row.file),
            _ => self.value(a).total_cmp(&self.value(b)),
        }
    }
}

pub struct DashboardApp {
    pub repo_label: String,
    /// Scoring result, or the message of the failure that prevented it
    pub outcome: Result<ScoringReport, String>,
    pub tab: Tab,
    pub sort_column: SortColumn,
    pub descending: bool,
    pub top_k: usize,
    pub selected: usize,
    order: Vec<usize>,
}

impl DashboardApp {
    pub fn new(repo_label: String, outcome: Result<ScoringReport, String>, top_k: usize) -> Self {
        let mut app = Self {
            repo_label,
            outcome,
            tab: Tab::AllFiles,
            sort_column: SortColumn::Risk,
            descending: true,
            top_k: clamp_top_k(top_k),
            selected: 0,
            order: Vec::new(),
        };
        app.apply_sort();
        app
    }

    pub fn report(&self) -> Option<&ScoringReport> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }

    /// All files in the current sort order
    pub fn sorted_files(&self) -> Vec<&ScoredFile> {
        match self.report() {
            Some(report) => self.order.iter().map(|&i| &report.files[i]).collect(),
            None => Vec::new(),
        }
    }

    /// The `top_k` riskiest files, highest first
    pub fn top_files(&self) -> &[ScoredFile] {
        match self.report() {
            Some(report) => &report.files[..report.files.len().min(self.top_k)],
            None => &[],
        }
    }

    fn visible_len(&self) -> usize {
        match self.tab {
            Tab::AllFiles => self.report().map_or(0, |r| r.files.len()),
            Tab::TopRisk => self.top_files().len(),
            Tab::Importance => 0,
        }
    }

    fn apply_sort(&mut self) {
        let Some(report) = self.outcome.as_ref().ok() else {
            return;
        };
        let mut order: Vec<usize> = (0..report.files.len()).collect();
        let column = self.sort_column;
        order.sort_by(|&a, &b| {
            let ord = column.compare(&report.files[a], &report.files[b]);
            if self.descending {
                ord.reverse()
            } else {
                ord
            }
        });
        self.order = order;
    }

    fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.selected = 0;
    }

    fn move_selection(&mut self, down: bool) {
        let len = self.visible_len();
        if len == 0 {
            self.selected = 0;
        } else if down {
            self.selected = (self.selected + 1).min(len - 1);
        } else {
            self.selected = self.selected.saturating_sub(1);
        }
    }

    /// Applies a key press. Returns true when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
            return true;
        }
        // A failed scoring run only shows the error until the user quits
        if self.outcome.is_err() {
            return false;
        }

        match key.code {
            KeyCode::Tab => self.set_tab(self.tab.next()),
            KeyCode::Char('1') => self.set_tab(Tab::AllFiles),
            KeyCode::Char('2') => self.set_tab(Tab::TopRisk),
            KeyCode::Char('3') => self.set_tab(Tab::Importance),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(true),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(false),
            KeyCode::Char('s') => {
                self.sort_column = self.sort_column.next();
                self.apply_sort();
            }
            KeyCode::Char('r') => {
                self.descending = !self.descending;
                self.apply_sort();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.set_top_k(self.top_k + TOP_K_STEP),
            KeyCode::Char('-') => self.set_top_k(self.top_k.saturating_sub(TOP_K_STEP)),
            _ => {}
        }
        false
    }

    fn set_top_k(&mut self, k: usize) {
        self.top_k = clamp_top_k(k);
        if self.tab == Tab::TopRisk {
            self.selected = self.selected.min(self.visible_len().saturating_sub(1));
        }
    }
}

pub fn clamp_top_k(k: usize) -> usize {
    k.clamp(MIN_TOP_K, MAX_TOP_K)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::table::AlignmentReport;
    use crate::models::records::{DatasetRow, FileHistoryRecord, FileStaticRecord};
    use crossterm::event::KeyModifiers;

    fn scored(file: &str, risk: f64, loc: u64) -> ScoredFile {
        let row = DatasetRow::join(
            &FileStaticRecord {
                loc,
                ..FileStaticRecord::empty(file)
            },
            &FileHistoryRecord {
                file: file.to_string(),
                commits: 1,
                churn_added: 0,
                churn_deleted: 0,
                distinct_authors: 1,
                last_modified_days: 0,
                buggy_label: 0,
            },
        );
        ScoredFile {
            row,
            risk,
            pred_label: u8::from(risk >= 0.5),
        }
    }

    fn app_with(n: usize) -> DashboardApp {
        let files: Vec<ScoredFile> = (0..n)
            .map(|i| scored(&format!("f{i:03}.py"), 1.0 - i as f64 / n as f64, (n - i) as u64 * 3 % 17 + 1))
            .collect();
        let report = ScoringReport {
            model_name: "RandomForest".to_string(),
            files,
            alignment: AlignmentReport::default(),
            importances: None,
            unreadable: Vec::new(),
        };
        DashboardApp::new("repo".to_string(), Ok(report), DEFAULT_TOP_K)
    }

    fn press(app: &mut DashboardApp, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn top_k_steps_by_five_within_bounds() {
        let mut app = app_with(200);
        assert_eq!(app.top_files().len(), 20);

        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.top_k, 25);
        for _ in 0..30 {
            press(&mut app, KeyCode::Char('+'));
        }
        assert_eq!(app.top_k, MAX_TOP_K);
        for _ in 0..30 {
            press(&mut app, KeyCode::Char('-'));
        }
        assert_eq!(app.top_k, MIN_TOP_K);
        assert_eq!(app.top_files().len(), 5);
        assert_eq!(clamp_top_k(0), 5);
        assert_eq!(clamp_top_k(1000), 100);
    }

    #[test]
    fn sorting_cycles_columns_and_reverses() {
        let mut app = app_with(10);
        assert_eq!(app.sorted_files()[0].row.file, "f000.py");

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.sort_column, SortColumn::File);
        assert_eq!(app.sorted_files()[0].row.file, "f009.py");
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.sorted_files()[0].row.file, "f000.py");

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.sort_column, SortColumn::Loc);
        let locs: Vec<u64> = app.sorted_files().iter().map(|f| f.row.loc).collect();
        assert!(locs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn navigation_switches_tabs_and_clamps_selection() {
        let mut app = app_with(3);
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.selected, 2);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.tab, Tab::TopRisk);
        assert_eq!(app.selected, 0);
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.tab, Tab::Importance);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.tab, Tab::AllFiles);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn error_state_only_accepts_quit() {
        let mut app = DashboardApp::new("repo".to_string(), Err("unsupported model: svm".to_string()), 20);
        assert!(!press(&mut app, KeyCode::Char('2')));
        assert_eq!(app.tab, Tab::AllFiles);
        assert_eq!(app.error(), Some("unsupported model: svm"));
        assert!(app.top_files().is_empty());
        assert!(press(&mut app, KeyCode::Esc));
    }
}
