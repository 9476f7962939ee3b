//! Dashboard rendering.

use super::app::{DashboardApp, SortColumn, Tab};
use crate::models::records::ScoredFile;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame,
};

const CAPTION: &str = "Labels come from commit-message heuristics, not an issue tracker.";
const MAX_IMPORTANCE_BARS: usize = 20;

pub fn render(frame: &mut Frame, app: &DashboardApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Body
            Constraint::Length(2), // Footer
        ])
        .split(frame.area());

    render_tabs(frame, app, chunks[0]);

    if let Some(message) = app.error() {
        render_error(frame, message, chunks[1]);
    } else {
        match app.tab {
            Tab::AllFiles => {
                let files = app.sorted_files();
                let title = format!(
                    "All files ({}) sorted by {} {}",
                    files.len(),
                    app.sort_column.header(),
                    if app.descending { "desc" } else { "asc" }
                );
                render_files(frame, app, &files, &title, chunks[1]);
            }
            Tab::TopRisk => {
                let files: Vec<&ScoredFile> = app.top_files().iter().collect();
                let title = format!("Top {} riskiest files", app.top_k);
                render_files(frame, app, &files, &title, chunks[1]);
            }
            Tab::Importance => render_importance(frame, app, chunks[1]),
        }
    }

    render_footer(frame, app, chunks[2]);
}

fn render_tabs(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let titles: Vec<Line> = Tab::all().iter().map(|t| Line::from(t.title())).collect();
    let selected = Tab::all().iter().position(|t| *t == app.tab).unwrap_or(0);
    let model = app.report().map_or("no model", |r| r.model_name.as_str());

    let tabs = Tabs::new(titles)
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("bugrisk · {} · {}", app.repo_label, model)),
        );
    frame.render_widget(tabs, area);
}

fn risk_style(risk: f64) -> Style {
    if risk >= 0.75 {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else if risk >= 0.5 {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Green)
    }
}

fn file_row(file: &ScoredFile) -> Row<'static> {
    let r = &file.row;
    Row::new(vec![
        Cell::from(format!("{:.3}", file.risk)).style(risk_style(file.risk)),
        Cell::from(r.file.clone()),
        Cell::from(r.loc.to_string()),
        Cell::from(format!("{:.2}", r.avg_cc)),
        Cell::from(format!("{:.0}", r.max_cc)),
        Cell::from(format!("{:.1}", r.mi)),
        Cell::from(r.commits.to_string()),
        Cell::from(r.churn_added.to_string()),
        Cell::from(r.churn_deleted.to_string()),
        Cell::from(r.distinct_authors.to_string()),
        Cell::from(r.last_modified_days.to_string()),
    ])
}

fn render_files(frame: &mut Frame, app: &DashboardApp, files: &[&ScoredFile], title: &str, area: Rect) {
    let header = Row::new(SortColumn::all().iter().map(|c| {
        let style = if *c == app.sort_column && app.tab == Tab::AllFiles {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        Cell::from(c.header()).style(style)
    }));

    let widths = [
        Constraint::Length(6),
        Constraint::Min(24),
        Constraint::Length(6),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(6),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(8),
        Constraint::Length(6),
    ];

    let table = Table::new(files.iter().map(|f| file_row(f)), widths)
        .header(header)
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▸ ")
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));

    let mut state = TableState::default();
    if !files.is_empty() {
        state.select(Some(app.selected.min(files.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_importance(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Feature importance");
    let Some(importances) = app.report().and_then(|r| r.importances.as_ref()) else {
        let empty = Paragraph::new("This model does not expose feature importances.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let bars: Vec<Bar> = importances
        .iter()
        .take(MAX_IMPORTANCE_BARS)
        .map(|(name, value)| {
            Bar::default()
                .label(Line::from(name.clone()))
                .value((value * 1000.0).round().max(0.0) as u64)
                .text_value(format!("{value:.3}"))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .bar_style(Style::default().fg(Color::Cyan))
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

fn render_error(frame: &mut Frame, message: &str, area: Rect) {
    let text = vec![
        Line::from(Span::styled(
            "Scoring failed",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(message.to_string()),
    ];
    let panel = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Error"));
    frame.render_widget(panel, area);
}

fn render_footer(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let keys = if app.error().is_some() {
        "q/Esc quit".to_string()
    } else {
        format!(
            "Tab/1-3 view · j/k move · s sort · r reverse · +/- top-k ({}) · q quit",
            app.top_k
        )
    };
    let footer = Paragraph::new(vec![
        Line::from(Span::styled(keys, Style::default().fg(Color::Gray))),
        Line::from(Span::styled(CAPTION, Style::default().fg(Color::DarkGray))),
    ]);
    frame.render_widget(footer, area);
}
