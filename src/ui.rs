use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget},
};

use redlight::session::Track;
use redlight::{EliminationReason, Phase, Signal, Snapshot};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 2;

const PLAYER: &str = "@";

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snap = self.game.snapshot();
        let track = self.game.rules().track;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(1), // status
                Constraint::Length(5), // light banner
                Constraint::Min(5),    // track
                Constraint::Length(3), // progress
                Constraint::Length(1), // help
            ])
            .split(area);

        render_status(&snap, chunks[0], buf);
        render_banner(&snap, chunks[1], buf);
        render_track(&snap, &track, chunks[2], buf);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(signal_color(&snap)))
            .ratio(snap.progress.clamp(0.0, 1.0))
            .label(format!("{:.0}%", snap.progress * 100.0));
        gauge.render(chunks[3], buf);

        Paragraph::new(Span::styled(
            help_text(snap.phase),
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }
}

fn render_status(snap: &Snapshot, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let time_style = if snap.phase == Phase::Playing && snap.time_remaining <= 10 {
        bold.fg(Color::Red)
    } else {
        bold
    };
    let line = Line::from(vec![
        Span::styled(format!("{}", snap.phase), bold.fg(Color::Cyan)),
        Span::raw("   "),
        Span::styled(format!("{}s left", snap.time_remaining), time_style),
    ]);
    Paragraph::new(line)
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn signal_color(snap: &Snapshot) -> Color {
    match (snap.phase, snap.signal) {
        (Phase::Playing, Signal::Green) => Color::Green,
        (Phase::Playing, Signal::Red) => Color::Red,
        (Phase::Won, _) => Color::Green,
        (Phase::Eliminated, _) => Color::Red,
        _ => Color::Yellow,
    }
}

/// Headline text for the light banner
pub fn banner_text(snap: &Snapshot) -> String {
    match snap.phase {
        Phase::Waiting => "PRESS SPACE TO START".to_string(),
        Phase::Countdown => format!("GET READY... {}", snap.countdown),
        Phase::Playing => match snap.signal {
            Signal::Green => "GREEN LIGHT".to_string(),
            Signal::Red => "RED LIGHT".to_string(),
        },
        Phase::Won => "YOU MADE IT!".to_string(),
        Phase::Eliminated => match snap.elimination_reason {
            Some(EliminationReason::RedLight) => "ELIMINATED: you moved on a red light".to_string(),
            Some(EliminationReason::TimeUp) => "ELIMINATED: time's up".to_string(),
            None => "ELIMINATED".to_string(),
        },
    }
}

fn help_text(phase: Phase) -> &'static str {
    match phase {
        Phase::Waiting => "(space) start | (esc) quit",
        Phase::Countdown | Phase::Playing => "(w/a/s/d or arrows) move | (r) reset | (esc) quit",
        Phase::Won | Phase::Eliminated => "(space) play again | (r) reset | (esc) quit",
    }
}

fn render_banner(snap: &Snapshot, area: Rect, buf: &mut Buffer) {
    let color = signal_color(snap);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    let inner = block.inner(area);
    block.render(area, buf);

    let pad = inner.height.saturating_sub(1) / 2;
    let mut lines = vec![Line::raw(""); pad as usize];
    lines.push(Line::from(Span::styled(
        banner_text(snap),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(inner, buf);
}

/// Map a track position onto a cell of `area`. The finish end of the track is
/// drawn at the top.
pub fn track_cell(track: &Track, area: Rect, x: f64, z: f64) -> Option<(u16, u16)> {
    if area.width == 0 || area.height == 0 {
        return None;
    }
    let lateral_span = track.lateral_max - track.lateral_min;
    let longitudinal_span = track.longitudinal_max - track.longitudinal_min;
    if lateral_span <= 0.0 || longitudinal_span <= 0.0 {
        return None;
    }
    let fx = ((x - track.lateral_min) / lateral_span).clamp(0.0, 1.0);
    let fz = ((track.longitudinal_max - z) / longitudinal_span).clamp(0.0, 1.0);
    let col = (fx * (area.width - 1) as f64).round() as u16;
    let row = (fz * (area.height - 1) as f64).round() as u16;
    Some((area.x + col, area.y + row))
}

fn render_track(snap: &Snapshot, track: &Track, area: Rect, buf: &mut Buffer) {
    let block = Block::default().borders(Borders::ALL).title("Track");
    let inner = block.inner(area);
    block.render(area, buf);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let dim = Style::default().add_modifier(Modifier::DIM);
    let finish_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    if let Some((_, row)) = track_cell(track, inner, track.lateral_min, track.spawn_z) {
        buf.set_string(inner.x, row, "-".repeat(inner.width as usize), dim);
    }
    if let Some((_, row)) = track_cell(track, inner, track.lateral_min, track.finish_z) {
        buf.set_string(inner.x, row, "=".repeat(inner.width as usize), finish_style);
    }

    let player_style = Style::default()
        .fg(signal_color(snap))
        .add_modifier(Modifier::BOLD);
    if let Some((col, row)) = track_cell(
        track,
        inner,
        snap.lateral_position,
        snap.longitudinal_position,
    ) {
        buf.set_string(col, row, PLAYER, player_style);
    }
}
