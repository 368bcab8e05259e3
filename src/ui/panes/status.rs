//! Status bar rendering with keybindings and state indicators

use crate::snapshot::Status;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Data needed to render the status bar
pub struct StatusRenderData<'a> {
    pub message: &'a str,
    pub status: &'a Status,
    /// Steps executed in the snapshot on screen
    pub step: usize,
    /// Steps executed by the live run
    pub total_steps: usize,
    /// Looking at an older snapshot instead of the live state
    pub in_history: bool,
    pub is_playing: bool,
}

/// Render the status bar at the bottom
pub fn render_status_bar(frame: &mut Frame, area: Rect, data: StatusRenderData<'_>) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let is_error = matches!(data.status, Status::Error { .. });

    let step_text = if data.in_history {
        format!(" Step {}/{} ", data.step, data.total_steps)
    } else {
        format!(" Step {} ", data.step)
    };

    let message = match data.status {
        Status::Error { kind, line, .. } if !data.in_history => format!("{} at line {}", kind, line),
        _ => data.message.to_string(),
    };

    let left_spans = vec![
        Span::styled(
            step_text,
            Style::default()
                .bg(if is_error && !data.in_history {
                    DEFAULT_THEME.error
                } else if data.in_history {
                    DEFAULT_THEME.history
                } else {
                    DEFAULT_THEME.stepping
                })
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            " | ",
            Style::default()
                .bg(DEFAULT_THEME.highlight_bg)
                .fg(DEFAULT_THEME.dim),
        ),
        Span::styled(
            format!(" {} ", message),
            Style::default()
                .bg(DEFAULT_THEME.highlight_bg)
                .fg(if is_error {
                    DEFAULT_THEME.error
                } else {
                    DEFAULT_THEME.text
                }),
        ),
    ];

    let left_paragraph = Paragraph::new(Line::from(left_spans))
        .style(Style::default().bg(DEFAULT_THEME.highlight_bg))
        .alignment(Alignment::Left);

    frame.render_widget(left_paragraph, layout[0]);

    let key_style = Style::default().bg(DEFAULT_THEME.dim).fg(Color::Black);
    let desc_style = Style::default()
        .bg(DEFAULT_THEME.highlight_bg)
        .fg(DEFAULT_THEME.text);
    let sep_style = Style::default()
        .bg(DEFAULT_THEME.highlight_bg)
        .fg(DEFAULT_THEME.dim);

    let mut right_spans = Vec::new();
    for (i, (key, desc)) in [
        ("←/→", " step "),
        ("⎵", " play "),
        ("↵", " run "),
        ("r", " reset "),
        ("q", " quit "),
    ]
    .into_iter()
    .enumerate()
    {
        if i > 0 {
            right_spans.push(Span::styled("│", sep_style));
            right_spans.push(Span::styled(" ", desc_style));
        }
        right_spans.push(Span::styled(format!(" {} ", key), key_style));
        right_spans.push(Span::styled(desc, desc_style));
    }

    let indicator = if data.is_playing {
        Some((" ▶ PLAYING ", DEFAULT_THEME.marker))
    } else if data.in_history {
        Some((" ◀ HISTORY ", DEFAULT_THEME.history))
    } else {
        match data.status {
            Status::Finished => Some((" END ", DEFAULT_THEME.finished)),
            Status::Error { .. } => Some((" ERROR ", DEFAULT_THEME.error)),
            Status::Ready if data.step == 0 => Some((" START ", DEFAULT_THEME.finished)),
            Status::Ready => None,
        }
    };

    if let Some((label, bg)) = indicator {
        right_spans.push(Span::styled("│", sep_style));
        right_spans.push(Span::styled(
            label,
            Style::default()
                .bg(bg)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let right_paragraph = Paragraph::new(Line::from(right_spans))
        .style(Style::default().bg(DEFAULT_THEME.highlight_bg))
        .alignment(Alignment::Right);

    frame.render_widget(right_paragraph, layout[1]);
}
