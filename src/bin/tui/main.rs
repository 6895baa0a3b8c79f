mod app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use app::{format_latency, truncate, ApiEvent, AppState, ConnectionStatus, Focus};
use race_grades::client::console::SUGGESTIONS;
use race_grades::client::{http_client, EntryOutput};
use race_grades::config::TUI_REFRESH_INTERVAL_SECS;
use race_grades::query::SortKey;
use race_grades::render::table::{fmt_margin, fmt_pct, heat_bar};
use race_grades::types::{Chamber, Grade};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let client = http_client().map_err(io::Error::other)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = AppState::new(base_url, client, tx);

    // Initial fetch before rendering
    app.refresh();

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();

    let result = run_loop(&mut terminal, &mut app, &mut rx, &mut table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    rx: &mut mpsc::UnboundedReceiver<ApiEvent>,
    table_state: &mut TableState,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(TUI_REFRESH_INTERVAL_SECS);
    let poll_interval = Duration::from_millis(100);

    loop {
        while let Ok(ev) = rx.try_recv() {
            app.apply(ev);
        }

        terminal.draw(|f| render(f, app, table_state))?;

        if event::poll(poll_interval)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(app, table_state, key) {
                    return Ok(());
                }
            }
        }

        if app.last_refresh.elapsed() >= refresh_interval {
            app.refresh();
        }
    }
}

/// Returns true when the user asked to quit.
fn handle_key(app: &mut AppState, table_state: &mut TableState, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => return true,
        KeyCode::Char('k') if ctrl => {
            app.focus = Focus::Table;
            app.table.toggle_search();
            return false;
        }
        KeyCode::F(n) => {
            let issued = app.console.submit_suggestion(usize::from(n));
            app.dispatch_console(issued);
            app.focus = Focus::Console;
            return false;
        }
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::Table => Focus::Console,
                Focus::Console => Focus::Table,
            };
            return false;
        }
        _ => {}
    }

    match app.focus {
        Focus::Console => handle_console_key(app, key, ctrl),
        Focus::Table if app.table.search_open => {
            match key.code {
                KeyCode::Esc => app.table.clear_search(),
                KeyCode::Enter => app.table.search_open = false,
                KeyCode::Backspace => app.table.pop_search(),
                KeyCode::Char(c) => app.table.push_search(c),
                _ => {}
            }
            table_state.select(None);
        }
        Focus::Table => return handle_table_key(app, table_state, key),
    }
    false
}

fn handle_table_key(app: &mut AppState, table_state: &mut TableState, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return true,
        KeyCode::Char('r') | KeyCode::Char('R') => app.refresh(),
        KeyCode::Char('/') => app.table.open_search(),
        KeyCode::Esc => app.table.clear_search(),
        KeyCode::Char('t') => {
            app.table.next_tab();
            table_state.select(None);
        }
        KeyCode::Char(c @ '1'..='6') => {
            let idx = c as usize - '1' as usize;
            app.table.select_sort(SortKey::ALL[idx]);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let max = app.visible_races().len().saturating_sub(1);
            let next = table_state.selected().map_or(0, |i| (i + 1).min(max));
            table_state.select(Some(next));
        }
        KeyCode::Up | KeyCode::Char('k') => {
            let prev = table_state.selected().map_or(0, |i| i.saturating_sub(1));
            table_state.select(Some(prev));
        }
        _ => {}
    }
    false
}

fn handle_console_key(app: &mut AppState, key: KeyEvent, ctrl: bool) {
    match key.code {
        KeyCode::Char('l') if ctrl => app.console.clear(),
        KeyCode::Enter => {
            let issued = app.console.submit_input();
            app.dispatch_console(issued);
        }
        KeyCode::Up => app.console.history_prev(),
        KeyCode::Down => app.console.history_next(),
        KeyCode::Backspace => {
            app.console.input.pop();
        }
        KeyCode::Esc => app.focus = Focus::Table,
        KeyCode::Char(c) => app.console.input.push(c),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let area = f.area();

    // Outer vertical split: header | table | console | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // header
            Constraint::Percentage(60), // grades table
            Constraint::Min(8),         // console
            Constraint::Length(1),      // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_grades_table(f, app, table_state, chunks[1]);
    render_console(f, app, chunks[2]);
    render_footer(f, app, chunks[3]);
}

fn grade_color(grade: Grade) -> Color {
    match grade {
        Grade::A => Color::Green,
        Grade::B => Color::LightGreen,
        Grade::C => Color::Yellow,
        Grade::D => Color::LightRed,
        Grade::F => Color::Red,
    }
}

fn score_color(score: f64) -> Color {
    if score >= 0.7 {
        Color::Green
    } else if score >= 0.4 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let date = app.date.clone().unwrap_or_else(|| "—".to_string());

    let title_spans = vec![
        Span::styled(
            " Race Grades  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(format!("as of {date}"), Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} races", app.races.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!(
                "p50 {} · p95 {} · p99 {} ({} req)",
                format_latency(app.latency.p50_ms),
                format_latency(app.latency.p95_ms),
                format_latency(app.latency.p99_ms),
                app.latency.sample_count.unwrap_or(0)
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans))
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn tab_line(app: &AppState) -> Line<'static> {
    let active = app.table.active_chamber();
    let mut spans = vec![Span::raw(" ")];
    for chamber in Chamber::ALL {
        let style = if chamber == active {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(chamber.as_str().to_string(), style));
        spans.push(Span::raw("  "));
    }
    if app.table.search_open || !app.table.search.is_empty() {
        let cursor = if app.table.search_open { "_" } else { "" };
        spans.push(Span::styled(
            format!("search: {}{cursor}", app.table.search),
            Style::default().fg(Color::Yellow),
        ));
    }
    Line::from(spans)
}

fn render_grades_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);
    f.render_widget(Paragraph::new(tab_line(app)), sections[0]);

    let header_cells = SortKey::ALL
        .iter()
        .map(|key| {
            let title = match app.table.sort_indicator(*key) {
                Some(arrow) => format!("{} {arrow}", key.title()),
                None => key.title().to_string(),
            };
            Cell::from(title).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        })
        .chain(["Rating", "Margin"].iter().map(|h| {
            Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        }));
    let header = Row::new(header_cells).height(1);

    let visible = app.visible_races();
    let rows: Vec<Row> = visible
        .iter()
        .map(|r| {
            let score = format!("{} {:>3}", heat_bar(r.liquidity_score), fmt_pct(Some(r.liquidity_score)));
            Row::new(vec![
                Cell::from(truncate(&r.label, 22)),
                Cell::from(r.grade.as_str()).style(
                    Style::default().fg(grade_color(r.grade)).add_modifier(Modifier::BOLD),
                ),
                Cell::from(score).style(Style::default().fg(score_color(r.liquidity_score))),
                Cell::from(fmt_pct(r.volume_pct)),
                Cell::from(fmt_pct(r.spread_pct)),
                Cell::from(fmt_pct(r.oi_pct)),
                Cell::from(r.rating.clone().unwrap_or_else(|| "—".to_string()))
                    .style(Style::default().fg(Color::DarkGray)),
                Cell::from(fmt_margin(r.margin)).style(Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    let title = format!(
        " {} · {} races ",
        app.table.active_chamber().as_str().to_uppercase(),
        visible.len()
    );

    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(7),
            Constraint::Length(16),
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(app.focus == Focus::Table))
            .title(Span::styled(
                title,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, sections[1], state);
}

fn render_console(f: &mut Frame, app: &AppState, area: Rect) {
    let prompt = Style::default().fg(Color::Green);
    let mut lines: Vec<Line> = Vec::new();

    for entry in &app.console.entries {
        if !entry.command.is_empty() {
            lines.push(Line::from(vec![
                Span::styled("~ $ ", prompt),
                Span::raw(entry.command.clone()),
            ]));
        }
        let (text, style) = match &entry.output {
            EntryOutput::Text(t) => (t.clone(), Style::default().fg(Color::Gray)),
            EntryOutput::Error(t) => (t.clone(), Style::default().fg(Color::Red)),
            EntryOutput::Pending(_) => ("fetching...".to_string(), Style::default().fg(Color::DarkGray)),
            EntryOutput::Superseded => ("(superseded)".to_string(), Style::default().fg(Color::DarkGray)),
        };
        for l in text.lines() {
            lines.push(Line::from(Span::styled(l.to_string(), style)));
        }
    }

    let cursor = if app.focus == Focus::Console { "_" } else { "" };
    lines.push(Line::from(vec![
        Span::styled("~ $ ", prompt),
        Span::raw(format!("{}{cursor}", app.console.input)),
    ]));

    // Keep the input line in view
    let inner_height = area.height.saturating_sub(2) as usize;
    let offset = lines.len().saturating_sub(inner_height) as u16;

    let suggestions: Vec<String> = SUGGESTIONS
        .iter()
        .enumerate()
        .map(|(i, (label, _))| format!("F{} {label}", i + 1))
        .collect();

    let paragraph = Paragraph::new(lines)
        .scroll((offset, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(app.focus == Focus::Console))
                .title(Span::styled(
                    " CONSOLE ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
                .title_bottom(Line::from(Span::styled(
                    format!(" {} ", suggestions.join(" · ")),
                    Style::default().fg(Color::DarkGray),
                ))),
        );

    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let spans = match app.focus {
        Focus::Table => vec![
            Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
            Span::raw("quit  "),
            Span::styled("[r] ", Style::default().fg(Color::Yellow)),
            Span::raw("refresh  "),
            Span::styled("[t] ", Style::default().fg(Color::Yellow)),
            Span::raw("chamber  "),
            Span::styled("[1-6] ", Style::default().fg(Color::Yellow)),
            Span::raw("sort  "),
            Span::styled("[/ ctrl-k] ", Style::default().fg(Color::Yellow)),
            Span::raw("search  "),
            Span::styled("[tab] ", Style::default().fg(Color::Yellow)),
            Span::raw("console  "),
            Span::styled(
                format!("auto-refresh: {TUI_REFRESH_INTERVAL_SECS}s"),
                Style::default().fg(Color::DarkGray),
            ),
        ],
        Focus::Console => vec![
            Span::styled(" [enter] ", Style::default().fg(Color::Yellow)),
            Span::raw("run  "),
            Span::styled("[↑↓] ", Style::default().fg(Color::Yellow)),
            Span::raw("history  "),
            Span::styled("[ctrl-l] ", Style::default().fg(Color::Yellow)),
            Span::raw("clear  "),
            Span::styled("[F1-F6] ", Style::default().fg(Color::Yellow)),
            Span::raw("suggestions  "),
            Span::styled("[tab/esc] ", Style::default().fg(Color::Yellow)),
            Span::raw("table"),
        ],
    };
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
