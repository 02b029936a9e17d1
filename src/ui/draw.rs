//! Screen layout and styling. Pure rendering; no state lives here.

use std::time::Instant;

use chrono::{Local, Utc};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::proto::{Command, Message, LOCAL_GROUP};
use crate::session::Session;

const STATION_PANEL_WIDTH: u16 = 20;

/// Render the whole screen: clock bar, scrollback, stations heard, input.
pub fn draw(f: &mut Frame, session: &Session, input: &str, scroll: usize) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(f.area());

    draw_top_bar(f, rows[0], session);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(STATION_PANEL_WIDTH)])
        .split(rows[1]);

    draw_scrollback(f, middle[0], session, scroll);
    draw_stations(f, middle[1], session);
    draw_input(f, rows[2], session, input);
}

/// UTC on the left, joined group in the middle, local time on the right.
fn draw_top_bar(f: &mut Frame, area: Rect, session: &Session) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(10),
            Constraint::Min(1),
            Constraint::Length(12),
        ])
        .split(area);

    let utc = Paragraph::new(format!("{} UTC", Utc::now().format("%H:%M")));
    f.render_widget(utc, cols[0]);

    let group = Paragraph::new(session.group().to_string())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(group, cols[1]);

    let local = Paragraph::new(format!("{} local", Local::now().format("%H:%M")))
        .alignment(Alignment::Right);
    f.render_widget(local, cols[2]);
}

fn draw_scrollback(f: &mut Frame, area: Rect, session: &Session, scroll: usize) {
    let lines: Vec<Line> = session
        .visible()
        .map(|m| style_line(m, session.callsign()))
        .collect();

    // Newest at the bottom; `scroll` counts lines back up from there.
    let height = area.height as usize;
    let max_scroll = lines.len().saturating_sub(height);
    let offset = scroll.min(max_scroll);
    let end = lines.len() - offset;
    let start = end.saturating_sub(height);

    f.render_widget(Paragraph::new(lines[start..end].to_vec()), area);
}

fn style_line(msg: &Message, own_callsign: &str) -> Line<'static> {
    let text = match msg.cmd {
        Command::FingerReq => format!("{} -> finger {}", msg.from, msg.body),
        Command::FingerRes => format!("{} [finger] {}", msg.from, msg.body),
        _ => format!("{}: {}", msg.from, msg.body),
    };

    let style = if msg.group == LOCAL_GROUP {
        Style::default().fg(Color::Yellow)
    } else if msg.body.trim_end().ends_with('?') {
        Style::default().fg(Color::Red)
    } else if msg.from == own_callsign {
        Style::default().fg(Color::Blue)
    } else {
        Style::default()
    };

    Line::styled(text, style)
}

/// Stations heard recently. A star marks calls with a cached identity.
fn draw_stations(f: &mut Frame, area: Rect, session: &Session) {
    let mut lines = vec![Line::styled(
        "Heard",
        Style::default().add_modifier(Modifier::BOLD),
    )];

    for call in session.presence(Instant::now()) {
        let marker = if session.finger_known(&call) { "*" } else { " " };
        lines.push(Line::from(format!("{} {}", marker, call)));
    }

    let block = Block::default().borders(Borders::LEFT);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_input(f: &mut Frame, area: Rect, session: &Session, input: &str) {
    let lamp = if session.tx_active() {
        Span::styled("[TX]", Style::default().fg(Color::Red))
    } else if session.rx_active() {
        Span::styled("[RX]", Style::default().fg(Color::Green))
    } else {
        Span::styled("[--]", Style::default().fg(Color::DarkGray))
    };

    let line = Line::from(vec![lamp, Span::raw(" > "), Span::raw(input.to_string())]);
    let block = Block::default().borders(Borders::TOP);
    f.render_widget(Paragraph::new(line).block(block), area);

    // Lamp and prompt take seven columns; the border takes the first row.
    let cursor_x = area.x + 7 + input.chars().count() as u16;
    let cursor_y = area.y + 1;
    if cursor_x < area.right() {
        f.set_cursor_position((cursor_x, cursor_y));
    }
}
