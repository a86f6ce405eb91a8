mod app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
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
use app::{format_price, format_time_ms, truncate, AppState, ConnectionStatus, MatchEntry};

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    app.refresh(&client).await;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut match_table_state = TableState::default();
    match_table_state.select(if app.matches.is_empty() { None } else { Some(0) });

    let result = run_loop(&mut terminal, &mut app, &client, &mut match_table_state).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    match_state: &mut TableState,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(5);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app, match_state))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            clamp_selection(app, match_state);
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.matches.len().saturating_sub(1);
                            let next = match_state.selected().map_or(0, |i| (i + 1).min(max));
                            match_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = match_state
                                .selected()
                                .map_or(0, |i| i.saturating_sub(1));
                            match_state.select(Some(prev));
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            clamp_selection(app, match_state);
            last_tick = std::time::Instant::now();
        }
    }
}

/// Keep the cursor on a real row when the match list shrinks or first fills.
fn clamp_selection(app: &AppState, state: &mut TableState) {
    if app.matches.is_empty() {
        state.select(None);
    } else {
        let max = app.matches.len() - 1;
        state.select(Some(state.selected().map_or(0, |i| i.min(max))));
    }
}

fn render(f: &mut Frame, app: &AppState, match_state: &mut TableState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    render_header(f, app, chunks[0]);
    render_body(f, app, match_state, chunks[1]);
    render_footer(f, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let (cycle_text, cycle_color) = if app.health.cycle.paused {
        (format!("cycle {} paused", app.health.cycle.cycle), Color::Yellow)
    } else {
        (format!("cycle {}", app.health.cycle.cycle), Color::White)
    };

    let last_ingest = app
        .health
        .last_ingest_ts
        .map_or("—".to_string(), format_time_ms);

    let title_spans = vec![
        Span::styled(
            " Ticket Tracker  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!(
                "{} with tickets / {} matches",
                app.matches.len(),
                app.health.total_matches.unwrap_or(0)
            ),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("{} batches", app.health.batches_ingested.unwrap_or(0)),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(format!("last ingest {last_ingest}"), Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(cycle_text, Style::default().fg(cycle_color)),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans))
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, match_state: &mut TableState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_matches_table(f, app, match_state, halves[0]);
    let selected = app.selected(match_state.selected());
    render_tickets_table(f, selected, halves[1]);
}

fn render_matches_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["#", "Match", "Date", "From", "To", "Qty", "Updated"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&m.info.title, 30)),
                Cell::from(truncate(&m.info.date, 10)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(format_price(m.info.price_min)).style(Style::default().fg(Color::Green)),
                Cell::from(format_price(m.info.price_max)).style(Style::default().fg(Color::Red)),
                Cell::from(m.total_quantity().to_string()).style(Style::default().fg(Color::Cyan)),
                Cell::from(format_time_ms(m.info.last_timestamp))
                    .style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(5),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " MATCHES ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn render_tickets_table(f: &mut Frame, selected: Option<&MatchEntry>, area: Rect) {
    let header_cells = ["Category", "Min", "Max", "Qty"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let (title, rows): (String, Vec<Row>) = match selected {
        Some(m) => {
            let venue = if m.info.venue.is_empty() {
                String::new()
            } else {
                format!(" @ {}", truncate(&m.info.venue, 20))
            };
            let rows = m
                .tickets
                .iter()
                .map(|t| {
                    Row::new(vec![
                        Cell::from(truncate(&t.category, 24)),
                        Cell::from(format_price(t.price_min)),
                        Cell::from(format_price(t.price_max)),
                        Cell::from(t.quantity.to_string()).style(Style::default().fg(Color::Cyan)),
                    ])
                })
                .collect();
            (format!(" {}{venue} ", truncate(&m.info.title, 28)), rows)
        }
        None => (" NO MATCH SELECTED ".to_string(), Vec::new()),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Min(10),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(5),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                title,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );

    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("select match  "),
        Span::styled("auto-refresh: 5s", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
