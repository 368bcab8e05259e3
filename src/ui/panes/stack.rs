//! Stack pane rendering with local variables and call frames
//!
//! This module renders the stack pane, displaying the call stack with
//! function frames and their local variables.
//!
//! # Features
//!
//! - One header per frame, `main` at the top and the running function last
//! - Variables in declaration order with their values and types
//! - By-reference parameters marked as aliases of the caller's storage
//! - References shown as `→ function::variable`, heap handles as addresses
//! - Scroll support for deep stacks

use super::format::{format_value_styled, spans_width};
use crate::snapshot::{FrameView, VarView};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Scroll state for the stack pane
#[derive(Debug, Default)]
pub struct StackScrollState {
    pub offset: usize,
    pub prev_item_count: usize,
}

/// Data needed to render the stack pane
pub struct StackRenderData<'a> {
    /// Bottom (`main`) first
    pub frames: &'a [FrameView],
    /// A run that halted on an error draws the running frame in the error colour
    pub halted_on_error: bool,
}

/// Render the stack pane
pub fn render_stack_pane(
    frame: &mut Frame,
    area: Rect,
    data: StackRenderData<'_>,
    is_focused: bool,
    scroll_state: &mut StackScrollState,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_idle)
    };

    let block = Block::default()
        .title(" Call Stack ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let content_width = area.width.saturating_sub(2) as usize;
    let mut all_items = Vec::new();

    if data.frames.is_empty() {
        all_items.push(ListItem::new("(empty)").style(Style::default().fg(DEFAULT_THEME.dim)));
    }

    let top = data.frames.len().saturating_sub(1);
    for (depth, stack_frame) in data.frames.iter().enumerate() {
        let name_style = if depth == top && data.halted_on_error {
            Style::default()
                .fg(DEFAULT_THEME.error)
                .add_modifier(Modifier::BOLD)
        } else if depth == top {
            Style::default()
                .fg(DEFAULT_THEME.active_frame)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DEFAULT_THEME.caller_frame)
        };

        all_items.push(ListItem::new(Line::from(vec![
            Span::styled("▸ ", Style::default().fg(DEFAULT_THEME.marker)),
            Span::styled(
                format!("Frame {} ", depth),
                Style::default().fg(DEFAULT_THEME.dim),
            ),
            Span::styled("│ ", Style::default().fg(DEFAULT_THEME.dim)),
            Span::styled(format!("{}()", stack_frame.function), name_style),
        ])));

        if stack_frame.vars.is_empty() {
            all_items.push(ListItem::new(Span::styled(
                "  (no variables)",
                Style::default().fg(DEFAULT_THEME.dim),
            )));
        }

        for var in &stack_frame.vars {
            all_items.push(ListItem::new(variable_line(var, content_width)));
        }

        if depth < top {
            all_items.push(ListItem::new(""));
        }
    }

    let total_items = all_items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    // Follow the top of the stack when it grows, otherwise keep the user's position
    if total_items > scroll_state.prev_item_count {
        scroll_state.offset = total_items.saturating_sub(visible_height);
    } else if total_items > visible_height {
        scroll_state.offset = scroll_state.offset.min(total_items - visible_height);
    } else {
        scroll_state.offset = 0;
    }
    scroll_state.prev_item_count = total_items;

    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(scroll_state.offset)
        .take(visible_height)
        .collect();

    let list = List::new(visible_items).block(block);
    frame.render_widget(list, area);
}

/// `  name : value          type`, type aligned right
fn variable_line(var: &VarView, content_width: usize) -> Line<'static> {
    let name_style = if !var.live {
        Style::default()
            .fg(DEFAULT_THEME.dim)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(DEFAULT_THEME.text)
    };

    let mut spans = vec![Span::styled(format!("  {} ", var.name), name_style)];
    if var.aliased {
        spans.push(Span::styled(
            "(alias) ",
            Style::default()
                .fg(DEFAULT_THEME.alias)
                .add_modifier(Modifier::ITALIC),
        ));
    }
    spans.push(Span::styled(": ", Style::default().fg(DEFAULT_THEME.text)));
    spans.extend(format_value_styled(&var.value));

    let padding = content_width.saturating_sub(spans_width(&spans) + var.ty.chars().count());
    spans.push(Span::raw(" ".repeat(padding.max(1))));
    spans.push(Span::styled(
        var.ty.clone(),
        Style::default().fg(DEFAULT_THEME.type_name),
    ));

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ValueView;

    #[test]
    fn test_type_is_right_aligned() {
        let var = VarView {
            name: "x".to_string(),
            ty: "i32".to_string(),
            value: ValueView::Int(5),
            aliased: false,
            live: true,
        };
        let line = variable_line(&var, 20);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text.chars().count(), 20);
        assert!(text.starts_with("  x : 5"));
        assert!(text.ends_with("i32"));
    }

    #[test]
    fn test_alias_marker() {
        let var = VarView {
            name: "n".to_string(),
            ty: "&mut i32".to_string(),
            value: ValueView::Ref {
                target: "main::x".to_string(),
                live: true,
            },
            aliased: true,
            live: true,
        };
        let line = variable_line(&var, 10);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.contains("(alias)"));
        assert!(text.contains("→ main::x"));
    }
}
