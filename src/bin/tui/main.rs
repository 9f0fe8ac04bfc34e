mod app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Sparkline, Table,
        TableState, Tabs, Wrap,
    },
    Frame, Terminal,
};
use app::{
    axis_labels, format_score, history_glyph, lowess, truncate, AppState, ConnectionStatus,
    MoodSummaryEntry, RankedEntity, TREND_FRAC,
};

const INTRO: &str = "How are fans feeling? Each window labels the share of positive vs \
                     negative tweets; the chart tracks the rolling ratio, the table ranks \
                     players by net sentiment.";

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut player_table_state = TableState::default();
    player_table_state.select(None);

    let result = run_loop(&mut terminal, &mut app, &client, &mut player_table_state).await;

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
    client: &reqwest::Client,
    player_state: &mut TableState,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(30);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app, player_state))?;

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
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => {
                            switch_period(app, client, player_state, false).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Tab => {
                            switch_period(app, client, player_state, true).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::BackTab => {
                            switch_period(app, client, player_state, false).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.ranked().len().saturating_sub(1);
                            let next = player_state.selected().map_or(0, |i| (i + 1).min(max));
                            player_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = player_state
                                .selected()
                                .map_or(0, |i| i.saturating_sub(1));
                            player_state.select(Some(prev));
                        }
                        KeyCode::Enter => {
                            let name = player_state
                                .selected()
                                .and_then(|i| app.ranked().get(i))
                                .map(|r| r.entity_name.clone());
                            if let Some(name) = name {
                                app.fetch_history(client, &name).await;
                            }
                        }
                        KeyCode::Esc => app.clear_history(),
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

async fn switch_period(
    app: &mut AppState,
    client: &reqwest::Client,
    player_state: &mut TableState,
    forward: bool,
) {
    if forward {
        app.next_period();
    } else {
        app.prev_period();
    }
    player_state.select(None);
    app.clear_history();
    app.refresh(client).await;
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, player_state: &mut TableState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(2), // intro
            Constraint::Length(4), // mood metrics
            Constraint::Length(3), // period tabs
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    let intro = Paragraph::new(INTRO)
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true });
    f.render_widget(intro, chunks[1]);
    render_moods(f, app, chunks[2]);
    render_tabs(f, app, chunks[3]);
    render_body(f, app, player_state, chunks[4]);
    render_footer(f, chunks[5]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let title_spans = vec![
        Span::styled(
            " Fan Moodboard  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} players ranked", app.ranked().len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("refreshed {}s ago", app.last_refresh.elapsed().as_secs()),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans))
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn mood_color(mood: &str) -> Color {
    match mood {
        "positive" => Color::Green,
        "negative" => Color::Red,
        _ => Color::Yellow,
    }
}

fn render_moods(f: &mut Frame, app: &AppState, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    for (i, col) in cols.iter().enumerate() {
        let entry: Option<&MoodSummaryEntry> = app.summary.get(i);
        let title = entry.map_or(" — ".to_string(), |e| format!(" {} ", e.label));

        let body = match entry {
            Some(MoodSummaryEntry { mood: Some(m), .. }) => Line::from(vec![
                Span::raw(format!("{} ", m.symbol)),
                Span::styled(
                    m.mood.to_uppercase(),
                    Style::default().fg(mood_color(&m.mood)).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(
                        "  {:.0}% pos  ({}+ / {}-)",
                        m.ratio * 100.0,
                        m.positive_count,
                        m.negative_count
                    ),
                    Style::default().fg(Color::White),
                ),
            ]),
            Some(MoodSummaryEntry { error: Some(e), .. }) => Line::from(Span::styled(
                truncate(e, 40),
                Style::default().fg(Color::DarkGray),
            )),
            _ => Line::from(Span::styled("no data", Style::default().fg(Color::DarkGray))),
        };

        let widget = Paragraph::new(body).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(title, Style::default().fg(Color::Cyan))),
        );
        f.render_widget(widget, *col);
    }
}

fn render_tabs(f: &mut Frame, app: &AppState, area: Rect) {
    let tabs = Tabs::new(app.periods.clone())
        .select(app.period_idx)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" PERIOD "),
        )
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, area);
}

fn render_body(f: &mut Frame, app: &AppState, player_state: &mut TableState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(5)])
        .split(halves[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(5), Constraint::Length(4)])
        .split(halves[1]);

    render_trend(f, app, left[0]);
    render_volume(f, app, left[1]);
    render_players_table(f, app, player_state, right[0]);
    render_callouts(f, app, right[1]);
    render_history(f, app, right[2]);
}

fn titled(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn unavailable(f: &mut Frame, block: Block<'_>, msg: &str, area: Rect) {
    let p = Paragraph::new(Span::styled(msg.to_string(), Style::default().fg(Color::DarkGray)))
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn render_trend(f: &mut Frame, app: &AppState, area: Rect) {
    let block = titled(" ROLLING POSITIVE RATIO ");
    let series = match &app.series {
        Some(Ok(s)) if !s.points.is_empty() => s,
        Some(Err(e)) => return unavailable(f, block, e, area),
        _ => return unavailable(f, block, "no data", area),
    };

    let raw: Vec<f64> = series.points.iter().map(|p| p.rolling_ratio).collect();
    let smooth = lowess(&raw, TREND_FRAC);

    let (above, below): (Vec<(f64, f64)>, Vec<(f64, f64)>) = smooth
        .iter()
        .enumerate()
        .map(|(i, y)| (i as f64, y.clamp(0.0, 1.0)))
        .partition(|(_, y)| *y >= 0.5);

    let x_max = (smooth.len().saturating_sub(1)).max(1) as f64;
    let midline = [(0.0, 0.5), (x_max, 0.5)];

    let stamps: Vec<_> = series.points.iter().map(|p| p.timestamp).collect();
    let x_labels = axis_labels(&stamps, &series.period.tick_granularity);

    let datasets = vec![
        Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&midline),
        Dataset::default()
            .name("positive")
            .marker(Marker::Braille)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Green))
            .data(&above),
        Dataset::default()
            .name("negative")
            .marker(Marker::Braille)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Red))
            .data(&below),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, 1.0])
                .labels(vec!["0.0".to_string(), "0.5".to_string(), "1.0".to_string()]),
        );

    f.render_widget(chart, area);
}

fn render_volume(f: &mut Frame, app: &AppState, area: Rect) {
    let block = titled(" TWEET VOLUME ");
    let totals: Vec<u64> = match &app.series {
        Some(Ok(s)) => s
            .points
            .iter()
            .map(|p| p.positive_count + p.negative_count)
            .collect(),
        _ => Vec::new(),
    };
    let sparkline = Sparkline::default()
        .block(block)
        .style(Style::default().fg(Color::Cyan))
        .data(&totals);
    f.render_widget(sparkline, area);
}

fn score_color(score: i64) -> Color {
    match score {
        s if s > 0 => Color::Green,
        s if s < 0 => Color::Red,
        _ => Color::White,
    }
}

fn render_players_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let block = titled(" PLAYERS ");
    if let Some(Err(e)) = &app.rankings {
        return unavailable(f, block, e, area);
    }

    let header_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let header_cells = ["#", "Player", "+", "-", "Net"]
        .iter()
        .map(|h| Cell::from(*h).style(header_style));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .ranked()
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.rank.to_string()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&r.entity_name, 22)),
                Cell::from(r.positive_count.to_string()).style(Style::default().fg(Color::Green)),
                Cell::from(r.negative_count.to_string()).style(Style::default().fg(Color::Red)),
                Cell::from(format_score(r.overall_score))
                    .style(Style::default().fg(score_color(r.overall_score))),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn callout_line(label: &str, color: Color, entries: &[RankedEntity]) -> Line<'static> {
    let mut spans = vec![Span::styled(
        format!("{label:<7}"),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )];
    for r in entries {
        spans.push(Span::raw(format!(
            "{} ({})  ",
            truncate(&r.entity_name, 16),
            format_score(r.overall_score)
        )));
    }
    Line::from(spans)
}

fn render_callouts(f: &mut Frame, app: &AppState, area: Rect) {
    let lines = match &app.rankings {
        Some(Ok(r)) => vec![
            callout_line("Loved", Color::Green, &r.top),
            callout_line("Booed", Color::Red, &r.bottom),
        ],
        _ => vec![Line::from("—")],
    };
    let p = Paragraph::new(lines).block(titled(" CALL-OUTS "));
    f.render_widget(p, area);
}

fn render_history(f: &mut Frame, app: &AppState, area: Rect) {
    let history = match &app.history {
        Some(Ok(h)) => h,
        Some(Err(e)) => return unavailable(f, titled(" HISTORY "), e, area),
        None => {
            let hint = "[enter] on a player for daily history";
            return unavailable(f, titled(" HISTORY "), hint, area);
        }
    };
    let title = format!(" {} · DAILY ", truncate(&history.entity, 24));

    // Most recent days that fit the inner width.
    let width = area.width.saturating_sub(2) as usize;
    let skip = history.points.len().saturating_sub(width);
    let spans: Vec<Span> = history
        .points
        .iter()
        .skip(skip)
        .map(|p| {
            let color = if p.score > 0.0 {
                Color::Green
            } else if p.score < 0.0 {
                Color::Red
            } else {
                Color::DarkGray
            };
            Span::styled(history_glyph(p.score).to_string(), Style::default().fg(color))
        })
        .collect();

    let p = Paragraph::new(Line::from(spans)).block(titled(&title));
    f.render_widget(p, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[tab] ", Style::default().fg(Color::Yellow)),
        Span::raw("period  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("players  "),
        Span::styled("[enter/esc] ", Style::default().fg(Color::Yellow)),
        Span::raw("history  "),
        Span::styled("auto-refresh: 30s", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
