pub mod state;

use std::io::stdout;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEventKind},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use vizdash_ai::TextGenerator;
use vizdash_engine::{CacheStats, ServerApi};
use vizdash_io::text::{pad_left, pad_right, truncate_display};

use crate::context::{load_config, open_dashboard, open_dispatcher};
use crate::CliError;
use state::{AnalysisPane, DashboardApp, Level};

/// `vizdash dashboard`
pub fn cmd_dashboard() -> Result<(), CliError> {
    let config = load_config()?;
    let dash = open_dashboard(&config)?;
    let dispatcher = open_dispatcher(&config).map_err(|e| match e.hint {
        Some(hint) => format!("{} ({})", e.message, hint),
        None => e.message,
    });

    tracing::info!(analysis = dispatcher.is_ok(), "starting dashboard");
    let mut app = DashboardApp::new(dash, dispatcher);
    app.load_workbooks();
    run_app(app).map_err(CliError::error)
}

fn run_app<S: ServerApi, G: TextGenerator>(mut app: DashboardApp<S, G>) -> Result<(), String> {
    terminal::enable_raw_mode()
        .map_err(|e| format!("failed to enable raw mode: {}", e))?;
    stdout()
        .execute(EnterAlternateScreen)
        .map_err(|e| format!("failed to enter alternate screen: {}", e))?;

    struct Cleanup;
    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = stdout().execute(LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
        }
    }
    let _cleanup = Cleanup;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| format!("failed to create terminal: {}", e))?;

    loop {
        terminal
            .draw(|frame| draw(&app, frame))
            .map_err(|e| format!("draw error: {}", e))?;

        if event::poll(Duration::from_millis(100))
            .map_err(|e| format!("event poll error: {}", e))?
        {
            if let Event::Key(key) =
                event::read().map_err(|e| format!("event read error: {}", e))?
            {
                // Windows reports releases too
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

// ── Drawing ─────────────────────────────────────────────────────────

fn draw<S: ServerApi, G: TextGenerator>(app: &DashboardApp<S, G>, frame: &mut Frame) {
    let area = frame.area();
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .split(area);

    draw_title(app, frame, chunks[0]);
    match app.level {
        Level::Workbooks => draw_workbooks(app, frame, chunks[1]),
        Level::Views => draw_views(app, frame, chunks[1]),
        Level::Table => draw_table_level(app, frame, chunks[1]),
    }
    draw_message(app, frame, chunks[2]);
    draw_status(app, frame, chunks[3]);

    if app.show_help {
        draw_help(frame, area);
    }
}

fn draw_title<S: ServerApi, G: TextGenerator>(app: &DashboardApp<S, G>, frame: &mut Frame, area: Rect) {
    let mut crumbs = vec!["workbooks".to_string()];
    if let Some(wb) = &app.workbook {
        crumbs.push(wb.clone());
    }
    if let Some(export) = &app.export {
        crumbs.push(export.view.label.clone());
    }

    let title = format!(" vizdash | {} ", crumbs.join(" > "));
    let para = Paragraph::new(Line::from(vec![Span::styled(
        title,
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )]))
    .style(Style::default().bg(Color::Cyan));
    frame.render_widget(para, area);
}

/// Cursor list, scrolled so the cursor stays visible.
fn draw_list(frame: &mut Frame, area: Rect, items: &[String], cursor: usize) {
    let height = area.height as usize;
    let start = if height == 0 || cursor < height { 0 } else { cursor + 1 - height };
    let width = area.width as usize;

    let lines: Vec<Line> = items
        .iter()
        .enumerate()
        .skip(start)
        .take(height)
        .map(|(i, item)| {
            let text = pad_right(&truncate_display(&format!(" {}", item), width), width);
            if i == cursor {
                Line::from(Span::styled(
                    text,
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::styled(text, Style::default().fg(Color::Gray)))
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_workbooks<S: ServerApi, G: TextGenerator>(app: &DashboardApp<S, G>, frame: &mut Frame, area: Rect) {
    if app.workbooks.is_empty() {
        let msg = Paragraph::new(" (no workbooks)").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(msg, area);
        return;
    }
    let items: Vec<String> = app
        .workbooks
        .iter()
        .map(|w| {
            if w.project_name.is_empty() || w.label.contains('/') {
                w.label.clone()
            } else {
                format!("{}  ({})", w.label, w.project_name)
            }
        })
        .collect();
    draw_list(frame, area, &items, app.workbook_cursor);
}

fn draw_views<S: ServerApi, G: TextGenerator>(app: &DashboardApp<S, G>, frame: &mut Frame, area: Rect) {
    let items: Vec<String> = app.views.iter().map(|v| v.label.clone()).collect();
    draw_list(frame, area, &items, app.view_cursor);
}

fn draw_table_level<S: ServerApi, G: TextGenerator>(app: &DashboardApp<S, G>, frame: &mut Frame, area: Rect) {
    let show_analysis = app.analysis.is_some() || app.editing_instructions || !app.instructions.is_empty();
    let chunks = if show_analysis {
        Layout::vertical([Constraint::Percentage(55), Constraint::Percentage(45)]).split(area)
    } else {
        Layout::vertical([Constraint::Min(3), Constraint::Length(0)]).split(area)
    };

    draw_grid(app, frame, chunks[0]);
    if show_analysis {
        draw_analysis(app, frame, chunks[1]);
    }
}

fn draw_grid<S: ServerApi, G: TextGenerator>(app: &DashboardApp<S, G>, frame: &mut Frame, area: Rect) {
    let Some(export) = &app.export else {
        return;
    };
    let table = &export.table;

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        format!(" image: {}", export.image.summary()),
        Style::default().fg(Color::DarkGray),
    )));

    if table.is_empty() && table.num_cols() == 0 {
        frame.render_widget(Paragraph::new(lines), area);
        return;
    }

    let widths = table.col_widths(0);
    let numeric: Vec<bool> = table.column_types().iter().map(|t| t.is_numeric()).collect();
    let available = area.width as usize;

    // Columns from scroll_col that fit the width
    let mut cols = Vec::new();
    let mut used = 1;
    for c in app.scroll_col..table.num_cols() {
        if used + widths[c] + 1 > available && !cols.is_empty() {
            break;
        }
        used += widths[c] + 1;
        cols.push(c);
    }

    let mut header = vec![Span::raw(" ")];
    for &c in &cols {
        let name = pad_right(&truncate_display(&table.columns[c], widths[c]), widths[c]);
        header.push(Span::styled(
            format!("{} ", name),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    }
    lines.push(Line::from(header));

    let body_height = (area.height as usize).saturating_sub(2);
    for row in table.rows.iter().skip(app.scroll_row).take(body_height) {
        let mut spans = vec![Span::raw(" ")];
        for &c in &cols {
            let value = row.get(c).map(String::as_str).unwrap_or("");
            let cell = truncate_display(value, widths[c]);
            let cell = if numeric[c] { pad_left(&cell, widths[c]) } else { pad_right(&cell, widths[c]) };
            spans.push(Span::styled(format!("{} ", cell), Style::default().fg(Color::Gray)));
        }
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_analysis<S: ServerApi, G: TextGenerator>(app: &DashboardApp<S, G>, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    let cursor = if app.editing_instructions { "_" } else { "" };
    lines.push(Line::from(vec![
        Span::styled("Instructions: ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{}{}", app.instructions, cursor), Style::default().fg(Color::White)),
    ]));
    lines.push(Line::from(""));

    match &app.analysis {
        None => lines.push(Line::from(Span::styled(
            "Press 'a' to analyze",
            Style::default().fg(Color::DarkGray),
        ))),
        Some(AnalysisPane::Failed(msg)) => lines.push(Line::from(Span::styled(
            format!("Analysis failed: {}", msg),
            Style::default().fg(Color::Red),
        ))),
        Some(AnalysisPane::Done(analysis)) => {
            if analysis.truncated {
                lines.push(Line::from(Span::styled(
                    format!("(sent {} of {} rows)", analysis.rows_sent, analysis.total_rows),
                    Style::default().fg(Color::Yellow),
                )));
            }
            for w in &analysis.warnings {
                lines.push(Line::from(Span::styled(
                    format!("warning: {}", w),
                    Style::default().fg(Color::Yellow),
                )));
            }
            if let Some(suggestion) = &analysis.suggestion {
                for l in suggestion.summary_lines() {
                    lines.push(Line::from(Span::styled(l, Style::default().fg(Color::Cyan))));
                }
                lines.push(Line::from(""));
            }
            for l in analysis.text.lines() {
                lines.push(Line::from(l.to_string()));
            }
        }
    }

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Analysis: {} ", app.template.title()));
    let para = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.analysis_scroll, 0));
    frame.render_widget(para, area);
}

fn draw_message<S: ServerApi, G: TextGenerator>(app: &DashboardApp<S, G>, frame: &mut Frame, area: Rect) {
    let line = if let Some(warning) = &app.warning {
        Line::from(Span::styled(format!(" ! {}", warning), Style::default().fg(Color::Yellow)))
    } else if let Some(info) = &app.info {
        Line::from(Span::styled(format!(" {}", info), Style::default().fg(Color::White)))
    } else {
        Line::from("")
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_status<S: ServerApi, G: TextGenerator>(app: &DashboardApp<S, G>, frame: &mut Frame, area: Rect) {
    let stats = app.dashboard().stats();
    let cache = CacheStats {
        hits: stats.workbooks.hits + stats.views.hits + stats.exports.hits,
        misses: stats.workbooks.misses + stats.views.misses + stats.exports.misses,
        entries: stats.workbooks.entries + stats.views.entries + stats.exports.entries,
    };

    let analysis = if app.analysis_available() { app.template.id() } else { "off" };
    let left = format!(
        " prompt: {}  cache: {} entries, {:.0}% hits",
        analysis,
        cache.entries,
        cache.hit_rate() * 100.0
    );
    let right = "p prompt  i instr  a analyze  r refresh  ?: help ";

    let padding = (area.width as usize).saturating_sub(left.chars().count() + right.chars().count());
    let status = format!("{}{:pad$}{}", left, "", right, pad = padding);

    let para = Paragraph::new(Line::from(vec![Span::styled(
        status,
        Style::default().fg(Color::Black).bg(Color::DarkGray),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(para, area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help_lines = [
        "",
        "  Navigation",
        "  ----------",
        "  arrows / jk       Move",
        "  Enter             Open workbook / view",
        "  Esc / Backspace   Back",
        "  h / l             Scroll columns",
        "",
        "  Analysis",
        "  --------",
        "  p                 Next prompt template",
        "  i                 Edit instructions",
        "  a                 Analyze current view",
        "  PgUp / PgDn       Scroll analysis",
        "",
        "  General",
        "  -------",
        "  r                 Refresh (clear caches)",
        "  ?                 Toggle this help",
        "  q                 Quit",
        "",
    ];
    let help_width: u16 = 46;
    let help_height: u16 = help_lines.len() as u16 + 2;

    let x = area.width.saturating_sub(help_width) / 2;
    let y = area.height.saturating_sub(help_height) / 2;
    let popup = Rect::new(
        area.x + x,
        area.y + y,
        help_width.min(area.width),
        help_height.min(area.height),
    );

    let lines: Vec<Line> = help_lines
        .iter()
        .map(|s| Line::from(Span::styled(*s, Style::default().fg(Color::White))))
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Keybindings ")
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .style(Style::default().bg(Color::Black));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}
