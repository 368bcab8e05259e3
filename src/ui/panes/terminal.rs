//! Terminal output pane rendering
//!
//! Shows what the program printed with `print!`/`println!` so far.

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

/// Scroll state for the terminal pane
#[derive(Debug)]
pub struct TerminalScrollState {
    pub offset: usize,
    /// Keep the last line in view as output arrives
    pub follow: bool,
}

impl Default for TerminalScrollState {
    fn default() -> Self {
        Self {
            offset: 0,
            follow: true,
        }
    }
}

/// Render the terminal output pane
pub fn render_terminal_pane(
    frame: &mut Frame,
    area: Rect,
    lines: &[String],
    is_focused: bool,
    scroll_state: &mut TerminalScrollState,
) {
    let TerminalScrollState { offset: scroll_offset, follow } = scroll_state;

    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_idle)
    };

    let block = Block::default()
        .title(" Output ")
        .borders(Borders::ALL)
        .border_style(border_style);

    if lines.is_empty() {
        let paragraph = Paragraph::new("(no output)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.dim));
        frame.render_widget(paragraph, area);
    } else {
        let block = block.padding(Padding::new(1, 0, 0, 0));
        // Build all items
        let all_items: Vec<ListItem> = lines
            .iter()
            .map(|line| ListItem::new(line.as_str()).style(Style::default().fg(DEFAULT_THEME.text)))
            .collect();

        // Calculate visible range for scrolling
        let total_items = all_items.len();
        let visible_height = area.height.saturating_sub(2).max(1) as usize; // Account for borders, min 1

        // Stick to the newest output unless the user scrolled up
        if total_items > visible_height {
            let max_scroll = total_items - visible_height;
            if *follow {
                *scroll_offset = max_scroll;
            }
            *scroll_offset = (*scroll_offset).min(max_scroll);
            *follow = *scroll_offset == max_scroll;
        } else {
            *scroll_offset = 0;
        }

        // Take only visible items
        let visible_items: Vec<ListItem> = all_items
            .into_iter()
            .skip(*scroll_offset)
            .take(visible_height)
            .collect();

        let list = List::new(visible_items).block(block);
        frame.render_widget(list, area);
    }
}
