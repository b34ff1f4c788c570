use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};

use crate::app::{App, AxisBounds};
use crate::constants::TICK_RATE_MS;
use crate::util::{format_axis_time, format_latency};

pub fn run(app: App, shutdown: Arc<AtomicBool>) -> Result<()> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_loop(&mut terminal, app, shutdown);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(TICK_RATE_MS);
    let mut last_tick = Instant::now();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            return Ok(());
        }

        terminal.draw(|f| draw(f, &app))?;

        // Handle input
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(())
                    }
                    _ => {}
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            app.on_tick()?;
            last_tick = Instant::now();
        }
    }
}

fn draw(f: &mut Frame, app: &App) {
    // ============= whole screen layout ============
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints(
            [
                Constraint::Min(10),   // Chart + Side Panel
                Constraint::Length(1), // Bottom Status Bar
            ]
            .as_ref(),
        )
        .split(f.size());

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(78), Constraint::Percentage(22)].as_ref())
        .split(main_chunks[0]);

    draw_chart(f, app, body_chunks[0]);
    draw_stats(f, app, body_chunks[1]);
    draw_status_bar(f, app, main_chunks[1]);
}

fn draw_chart(f: &mut Frame, app: &App, area: Rect) {
    let points: Vec<(f64, f64)> = app
        .window
        .iter()
        .map(|s| (s.timestamp.timestamp_millis() as f64, s.latency_ms))
        .collect();

    let datasets = vec![Dataset::default()
        .name(app.host.as_str())
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points)];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(format!(" Ping Time [{}] ", app.host))
                .borders(Borders::ALL)
                .border_type(ratatui::widgets::BorderType::Rounded)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .x_axis(
            Axis::default()
                .title("Time")
                .style(Style::default().fg(Color::DarkGray))
                .bounds(app.bounds.x)
                .labels(x_labels(&app.bounds)),
        )
        .y_axis(
            Axis::default()
                .title("Ping (ms)")
                .style(Style::default().fg(Color::DarkGray))
                .bounds(app.bounds.y)
                .labels(y_labels(&app.bounds)),
        );
    f.render_widget(chart, area);
}

fn x_labels(bounds: &AxisBounds) -> Vec<Span<'static>> {
    let [lo, hi] = bounds.x;
    [lo, (lo + hi) / 2.0, hi]
        .iter()
        .map(|&ms| Span::styled(format_axis_time(ms), Style::default().fg(Color::DarkGray)))
        .collect()
}

fn y_labels(bounds: &AxisBounds) -> Vec<Span<'static>> {
    let [lo, hi] = bounds.y;
    [lo, (lo + hi) / 2.0, hi]
        .iter()
        .map(|&ms| Span::styled(format!("{ms:.0}"), Style::default().fg(Color::DarkGray)))
        .collect()
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);

    let now_span = match app.last_latency() {
        Some(ms) => Span::styled(
            format_latency(ms),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        None => Span::styled("waiting...", label),
    };
    let stat = |value: Option<f64>| match value {
        Some(ms) => format_latency(ms),
        None => "-".to_string(),
    };

    let text = vec![
        Line::from(vec![Span::raw("⟳ "), now_span]),
        Line::from(vec![
            Span::styled("  Min:  ", label),
            Span::raw(stat(app.window.min_latency())),
        ]),
        Line::from(vec![
            Span::styled("  Avg:  ", label),
            Span::raw(stat(app.window.avg_latency())),
        ]),
        Line::from(vec![
            Span::styled("  Max:  ", label),
            Span::raw(stat(app.window.max_latency())),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Sent: ", label),
            Span::raw(app.probes_sent.to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Lost: ", label),
            Span::raw(app.probes_failed.to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Since:", label),
            Span::raw(format!(" {}", app.started_at.format("%H:%M:%S"))),
        ]),
    ];

    let panel = Paragraph::new(text).block(
        Block::default()
            .title(" Session ")
            .borders(Borders::ALL)
            .border_type(ratatui::widgets::BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(panel, area);
}

// ============ Bottom Status Bar ============
fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let status_content = Line::from(vec![
        Span::styled(
            format!(" {} ", app.host),
            Style::default()
                .bg(Color::White)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(
            "FILE: ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(app.data_file.display().to_string()),
        Span::raw(" | "),
        Span::styled(
            "WINDOW: ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("{}/{}", app.window.len(), app.window.max_records())),
        Span::raw(" | Press 'q' to quit"),
    ]);

    let status_bar = Paragraph::new(status_content).style(Style::default().bg(Color::Rgb(20, 20, 20)));
    f.render_widget(status_bar, area);
}
