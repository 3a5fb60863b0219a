use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, Gauge, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::engine::CharState;
use crate::session::Phase;
use crate::{App, Screen};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Typing => render_typing(self, area, buf),
            Screen::Results => render_results(self, area, buf),
        }
    }
}

fn format_clock(seconds: f64) -> String {
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// What the timer slot shows: remaining time for a countdown, elapsed
/// otherwise.
fn timer_text(app: &App) -> String {
    match app.session.timer().remaining_secs() {
        Some(remaining) => format_clock(remaining),
        None => format_clock(app.session.timer().elapsed_secs()),
    }
}

fn display_char(c: char) -> String {
    match c {
        '\n' => "⏎".to_string(),
        c => c.to_string(),
    }
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let green_bold = bold.fg(Color::Green);
    let red_bold = bold.fg(Color::Red);
    let dim_bold = bold.add_modifier(Modifier::DIM);
    let cursor_style = dim_bold.add_modifier(Modifier::UNDERLINED);

    let session = &app.session;
    let engine = session.engine();
    let prompt = engine.text();

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_lines = ((prompt.content().width() as f64 / max_chars_per_line as f64).ceil()
        as u16)
        .max(1);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // stats
            Constraint::Length(1), // timer
            Constraint::Min(prompt_lines),
            Constraint::Length(1), // progress
        ])
        .split(area);

    let snapshot = session.snapshot();
    let stats = Paragraph::new(Span::styled(
        format!(
            "{} wpm   {} cpm   {}% acc   {} err",
            snapshot.wpm, snapshot.cpm, snapshot.accuracy, snapshot.total_errors
        ),
        bold,
    ))
    .alignment(Alignment::Center);
    stats.render(chunks[0], buf);

    let timer_style = match session.timer().remaining_secs() {
        Some(r) if r <= 5.0 && session.phase() == Phase::Running => bold.fg(Color::Red),
        Some(r) if r <= 10.0 && session.phase() == Phase::Running => bold.fg(Color::Yellow),
        _ => dim_bold,
    };
    Paragraph::new(Span::styled(timer_text(app), timer_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let cursor = engine.cursor();
    let mut spans: Vec<Span> = (0..cursor)
        .map(|idx| {
            let expected = prompt.char_at(idx);
            match engine.char_state(idx) {
                Some(CharState::Correct) => Span::styled(display_char(expected), green_bold),
                Some(CharState::Incorrect) => Span::styled(
                    match expected {
                        ' ' => "·".to_string(),
                        c => display_char(c),
                    },
                    red_bold,
                ),
                None => Span::styled(display_char(expected), dim_bold),
            }
        })
        .collect();

    if cursor < prompt.len() {
        spans.push(Span::styled(
            display_char(prompt.char_at(cursor)),
            cursor_style,
        ));
        let rest: String = prompt.chars()[cursor + 1..].iter().collect();
        spans.push(Span::styled(rest.replace('\n', "⏎"), dim_bold));
    }

    Paragraph::new(Line::from(spans))
        .alignment(if prompt_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: false })
        .render(chunks[2], buf);

    let progress = session.progress();
    Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio((progress / 100.0).clamp(0.0, 1.0))
        .label(format!("{progress:.0}%"))
        .render(chunks[3], buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let italic = Style::default().add_modifier(Modifier::ITALIC);
    let magenta = Style::default().fg(Color::Magenta);

    let Some(result) = app.session.result() else {
        Paragraph::new("no result")
            .alignment(Alignment::Center)
            .render(area, buf);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // wpm chart
            Constraint::Length(1), // headline stats
            Constraint::Length(1), // detail stats
            Constraint::Length(1), // heatmap
            Constraint::Length(1), // rank / achievements
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let points: Vec<(f64, f64)> = result
        .history
        .iter()
        .map(|s| (s.second as f64, s.wpm as f64))
        .collect();
    let max_second = points.last().map(|p| p.0).unwrap_or(1.0).max(1.0);
    let max_wpm = points
        .iter()
        .map(|p| p.1)
        .fold(0.0_f64, f64::max)
        .max(10.0);

    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(magenta)
        .graph_type(GraphType::Line)
        .data(&points)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([1.0, max_second])
                .labels(vec![
                    Span::styled("1", bold),
                    Span::styled(format!("{max_second:.0}"), bold),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, max_wpm])
                .labels(vec![
                    Span::styled("0", bold),
                    Span::styled(format!("{max_wpm:.0}"), bold),
                ]),
        )
        .render(chunks[0], buf);

    let metrics = &result.metrics;
    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {} cpm   {:.2} sd",
            metrics.wpm, metrics.accuracy, metrics.cpm, result.consistency
        ),
        bold,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        format!(
            "raw {} wpm   net {} wpm   {}/{} chars   {} errors   {}s",
            metrics.raw_wpm,
            metrics.net_wpm,
            metrics.correct_chars,
            metrics.total_chars,
            metrics.total_errors,
            metrics.elapsed_secs
        ),
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    Paragraph::new(Span::styled(heatmap_line(result), italic.fg(Color::Red)))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        outcome_line(app),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[4], buf);

    Paragraph::new(Span::styled("(tab) new test / (esc)ape", italic)).render(chunks[6], buf);
}

/// Top missed characters of this run, worst first.
fn heatmap_line(result: &crate::session::TestResult) -> String {
    let mut misses: Vec<(char, u32)> = result
        .error_frequency
        .iter()
        .map(|(&c, &n)| (c, n))
        .collect();
    if misses.is_empty() {
        return "no missed characters".to_string();
    }
    misses.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    misses
        .iter()
        .take(5)
        .map(|(c, n)| {
            let shown = if *c == ' ' { '␣' } else { *c };
            format!("'{shown}' ×{n}")
        })
        .collect::<Vec<_>>()
        .join("   ")
}

fn outcome_line(app: &App) -> String {
    let Some(outcome) = &app.outcome else {
        return String::new();
    };
    if !outcome.accepted {
        return "result not saved".to_string();
    }

    let mut parts = Vec::new();
    if outcome.is_personal_best {
        parts.push("personal best!".to_string());
    }
    if let Some(rank) = outcome.rank {
        parts.push(format!("rank #{rank}"));
    }
    for achievement in &outcome.new_achievements {
        parts.push(format!("🏆 {}", achievement.name));
    }
    parts.join("   ")
}
