//! Terminal dashboard over scored files.
//!
//! `run_dashboard` takes the outcome of scoring rather than a report so a
//! failed run (bad artifact, empty history) is shown inside the dashboard
//! instead of tearing it down.

pub mod app;
pub mod view;

use crate::commands::scoring::ScoringReport;
use anyhow::Result;
use app::DashboardApp;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;

pub struct DashboardExplorer {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    app: DashboardApp,
}

impl DashboardExplorer {
    pub fn new(app: DashboardApp) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self { terminal, app })
    }

    pub fn run(&mut self) -> Result<()> {
        loop {
            self.terminal.draw(|f| view::render(f, &self.app))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        break;
                    }
                    if self.app.handle_key(key) {
                        break;
                    }
                }
            }
        }

        self.cleanup()
    }

    fn cleanup(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for DashboardExplorer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Opens the interactive dashboard
pub fn run_dashboard(repo_label: String, outcome: std::result::Result<ScoringReport, String>, top_k: usize) -> Result<()> {
    let app = DashboardApp::new(repo_label, outcome, top_k);
    let mut explorer = DashboardExplorer::new(app)?;
    explorer.run()
}

/// Non-interactive rendering of the top-K files and importances
pub fn render_plain(report: &ScoringReport, top_k: usize) -> String {
    let top_k = app::clamp_top_k(top_k);
    let mut out = String::new();

    out.push_str(&format!(
        "Model: {} · {} files scored\n",
        report.model_name,
        report.files.len()
    ));
    if !report.alignment.missing.is_empty() {
        out.push_str(&format!(
            "Imputed features absent from this repository: {}\n",
            report.alignment.missing.join(", ")
        ));
    }
    if !report.unreadable.is_empty() {
        out.push_str(&format!("{} files could not be read\n", report.unreadable.len()));
    }

    let mut files = Table::new();
    files
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "File", "Risk", "Risky", "LOC", "Max CC", "Commits", "Authors"]);
    for (rank, scored) in report.files.iter().take(top_k).enumerate() {
        files.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&scored.row.file),
            Cell::new(format!("{:.3}", scored.risk)),
            Cell::new(if scored.pred_label == 1 { "yes" } else { "no" }),
            Cell::new(scored.row.loc),
            Cell::new(format!("{:.0}", scored.row.max_cc)),
            Cell::new(scored.row.commits),
            Cell::new(scored.row.distinct_authors),
        ]);
    }
    out.push_str(&format!("\nTop {top_k} riskiest files\n{files}\n"));

    if let Some(importances) = &report.importances {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Feature", "Importance"]);
        for (name, value) in importances.iter().take(20) {
            table.add_row(vec![Cell::new(name), Cell::new(format!("{value:.4}"))]);
        }
        out.push_str(&format!("\nFeature importance\n{table}\n"));
    }

    out.push_str("\nLabels come from commit-message heuristics, not an issue tracker.\n");
    out
}
