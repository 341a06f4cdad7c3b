use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, info, trace};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::App;
use crate::logs::{LogKind, LogLine};
use crate::view::{self, Tone};

const TICK_RATE: Duration = Duration::from_millis(120);
const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];
const CODE_PAGE: usize = 10;

pub fn run(app: &mut App) -> Result<()> {
    info!("Initializing TUI");
    enable_raw_mode().context("Failed to enable raw mode")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
    info!("Terminal initialized successfully");

    let res = run_loop(&mut terminal, app);

    trace!("Cleaning up TUI");
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    info!("TUI cleanup completed");

    res
}

fn run_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    info!("Event loop started");
    let mut last_tick = Instant::now();
    let mut tick = 0usize;

    loop {
        if app.poll() {
            debug!("Session updated: {:?}", app.session().status());
        }
        app.follow_logs();

        let mut max_log_scroll = 0;
        terminal
            .draw(|frame| max_log_scroll = draw(frame, app, tick))
            .context("Failed to draw frame")?;
        app.set_max_log_scroll(max_log_scroll);

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_secs(0));

        if event::poll(timeout).context("Failed to poll for events")? {
            match event::read().context("Failed to read event")? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key(app, key) == KeyOutcome::Quit {
                        info!("Quit requested, exiting event loop");
                        return Ok(());
                    }
                }
                Event::Resize(width, height) => {
                    debug!("Terminal resized: {}x{}", width, height);
                }
                other => {
                    trace!("Other event: {:?}", other);
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            last_tick = Instant::now();
            tick = tick.wrapping_add(1);
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

fn handle_key(app: &mut App, key: KeyEvent) -> KeyOutcome {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => return KeyOutcome::Quit,
        KeyCode::Char('c') if ctrl => return KeyOutcome::Quit,
        KeyCode::Char('s') if ctrl => {
            info!("Saving generated code");
            app.save_code();
        }
        KeyCode::Enter => {
            info!("Submitting task");
            app.submit();
        }
        KeyCode::Backspace => app.backspace(),
        KeyCode::Up => app.scroll_logs_up(1),
        KeyCode::Down => app.scroll_logs_down(1),
        KeyCode::PageUp => app.scroll_code_up(CODE_PAGE),
        KeyCode::PageDown => app.scroll_code_down(CODE_PAGE),
        KeyCode::Char(c) if !ctrl => app.push_char(c),
        other => trace!("Unhandled key: {:?}", other),
    }
    KeyOutcome::Continue
}

/// Render one frame. Returns how many rows the log panel can scroll up.
fn draw(frame: &mut Frame, app: &App, tick: usize) -> usize {
    let footer_height = if view::footer_text(app.session()).is_some() || app.notice.is_some() {
        3
    } else {
        0
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(footer_height),
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], app, tick);
    draw_input(frame, chunks[1], app, tick);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);
    let max_log_scroll = draw_logs(frame, body[0], app);
    draw_code(frame, body[1], app);

    if footer_height > 0 {
        draw_footer(frame, chunks[3], app);
    }
    max_log_scroll
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App, tick: usize) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(32)])
        .split(area);

    let title = Paragraph::new(Line::from(vec![
        Span::styled("CodeOps ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            "ULTRA",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "  AUTONOMOUS ENGINEERING AGENT v1.0",
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    let badge = view::status_badge(app.session().status());
    let label = if badge.tone == Tone::Active {
        format!("{} {}", SPINNER[tick % SPINNER.len()], badge.label)
    } else {
        badge.label.to_string()
    };
    let widget = Paragraph::new(label)
        .alignment(Alignment::Center)
        .style(tone_style(badge.tone))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(tone_style(badge.tone)),
        );
    frame.render_widget(widget, chunks[1]);
}

fn draw_input(frame: &mut Frame, area: Rect, app: &App, tick: usize) {
    let (title, style) = if app.is_working() {
        (
            format!("Task {} agent working...", SPINNER[tick % SPINNER.len()]),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            "Task (Enter=deploy, Ctrl+S=save code, Up/Down=logs, PgUp/PgDn=code, Esc=quit)"
                .to_string(),
            Style::default().fg(Color::Cyan),
        )
    };

    let line = if app.input.is_empty() {
        Line::from(Span::styled(
            view::INPUT_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(Span::styled(app.input.clone(), style))
    };
    let input = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(input, area);
}

fn draw_logs(frame: &mut Frame, area: Rect, app: &App) -> usize {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("AGENT_LIVE_EXECUTION_LOGS");
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    let logs = app.session().logs();
    if logs.is_empty() {
        let placeholder = Paragraph::new(view::LOGS_PLACEHOLDER)
            .alignment(Alignment::Center)
            .style(
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )
            .block(block);
        frame.render_widget(placeholder, area);
        return 0;
    }

    let rows = logs
        .iter()
        .flat_map(|line| log_rows(line, inner_width))
        .collect::<Vec<_>>();
    let max_scroll = rows.len().saturating_sub(inner_height);
    let offset = max_scroll.saturating_sub(app.log_scroll.min(max_scroll));

    let widget = Paragraph::new(rows)
        .block(block)
        .scroll((offset.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(widget, area);
    max_scroll
}

/// Lay out one log entry as pre-wrapped rows: icon on the first row,
/// continuation rows indented under the text.
fn log_rows(line: &LogLine, width: usize) -> Vec<Line<'static>> {
    let style = kind_style(line.kind);
    let icon = view::log_icon(line.kind);
    let lead_width = icon.width() + 1;
    let text_width = width.saturating_sub(lead_width).max(1);

    let mut rows = Vec::new();
    for (idx, chunk) in wrap_text(&line.text, text_width).into_iter().enumerate() {
        let lead = if idx == 0 {
            Span::styled(format!("{icon} "), style.add_modifier(Modifier::BOLD))
        } else {
            Span::raw(" ".repeat(lead_width))
        };
        rows.push(Line::from(vec![lead, Span::styled(chunk, style)]));
    }
    rows
}

/// Splits on newlines, then on display width (wide glyphs count as two
/// columns).
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut rows = Vec::new();
    for raw in text.lines() {
        let mut row = String::new();
        let mut row_width = 0;
        for ch in raw.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if row_width + ch_width > width && !row.is_empty() {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            row.push(ch);
            row_width += ch_width;
        }
        rows.push(row);
    }
    if rows.is_empty() {
        rows.push(String::new());
    }
    rows
}

fn draw_code(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(view::CODE_TITLE)
        .title_style(Style::default().fg(Color::Magenta));

    let session = app.session();
    if session.code().is_empty() {
        let placeholder = Paragraph::new(view::code_text(session))
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let total = session.code().lines().count();
    let gutter = total.to_string().len();
    let lines = session
        .code()
        .lines()
        .enumerate()
        .map(|(idx, text)| {
            Line::from(vec![
                Span::styled(
                    format!("{:>gutter$} │ ", idx + 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(text.to_string()),
            ])
        })
        .collect::<Vec<_>>();

    let widget = Paragraph::new(lines)
        .block(block)
        .scroll((app.code_scroll.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(widget, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    if let Some(cycles) = app.session().retry_cycles() {
        spans.push(Span::raw("SELF_CORRECTION_CYCLES: "));
        spans.push(Span::styled(
            cycles.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw("  |  SANDBOX_INTEGRITY: "));
        spans.push(Span::styled("VERIFIED", Style::default().fg(Color::Green)));
    }
    if let Some(notice) = &app.notice {
        if !spans.is_empty() {
            spans.push(Span::raw("  |  "));
        }
        spans.push(Span::styled(notice.clone(), Style::default().fg(Color::Yellow)));
    }

    let widget = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Active => Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::BOLD),
        Tone::Success => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        Tone::Neutral => Style::default().fg(Color::Gray),
    }
}

fn kind_style(kind: LogKind) -> Style {
    match kind {
        LogKind::Error => Style::default().fg(Color::Red),
        LogKind::Success => Style::default().fg(Color::Green),
        LogKind::Progress => Style::default().fg(Color::Cyan),
        LogKind::Plain => Style::default().fg(Color::Gray),
    }
}
