//! Heap pane rendering with memory blocks and their contents
//!
//! This module renders the heap pane, showing every block the run has
//! allocated, in address order.
//!
//! # Features
//!
//! - Block headers with address, kind, length and capacity
//! - Allocation status markers: live, freed and leaked
//! - Element listing with indices for `Vec` blocks
//! - Scroll support for large heaps
//!
//! Freed blocks stay listed because addresses are never reused, so a dangling
//! handle always has something to point at in the pane.

use super::format::{format_value_styled, spans_width};
use crate::memory::heap::BlockKind;
use crate::memory::value::Address;
use crate::snapshot::BlockView;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};
use std::collections::BTreeMap;

/// Scroll state for the heap pane
#[derive(Debug, Default)]
pub struct HeapScrollState {
    pub offset: usize,
    pub prev_item_count: usize,
}

/// Data needed to render the heap pane
pub struct HeapRenderData<'a> {
    pub blocks: &'a BTreeMap<Address, BlockView>,
}

/// Render the heap pane
pub fn render_heap_pane(
    frame: &mut Frame,
    area: Rect,
    data: HeapRenderData<'_>,
    is_focused: bool,
    scroll_state: &mut HeapScrollState,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_idle)
    };

    let block = Block::default()
        .title(" Heap Memory ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let content_width = area.width.saturating_sub(2) as usize;
    let mut all_items = Vec::new();

    if data.blocks.is_empty() {
        all_items.push(
            ListItem::new("(no allocations)").style(Style::default().fg(DEFAULT_THEME.dim)),
        );
    }

    for (i, (address, heap_block)) in data.blocks.iter().enumerate() {
        all_items.push(ListItem::new(block_header(*address, heap_block, content_width)));

        let element_style = if heap_block.live {
            Style::default()
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };

        match heap_block.kind {
            BlockKind::Boxed => {
                if let Some(value) = heap_block.elements.first() {
                    let mut spans = vec![Span::raw("    ")];
                    spans.extend(format_value_styled(value));
                    all_items.push(ListItem::new(Line::from(spans)).style(element_style));
                }
            }
            BlockKind::Vector => {
                for (index, value) in heap_block.elements.iter().enumerate() {
                    let mut spans = vec![Span::styled(
                        format!("    [{}] ", index),
                        Style::default().fg(DEFAULT_THEME.dim),
                    )];
                    spans.extend(format_value_styled(value));
                    all_items.push(ListItem::new(Line::from(spans)).style(element_style));
                }
                let spare = heap_block.capacity.saturating_sub(heap_block.length);
                if spare > 0 {
                    all_items.push(ListItem::new(Span::styled(
                        format!("    ({} unused)", spare),
                        Style::default().fg(DEFAULT_THEME.dim),
                    )));
                }
            }
        }

        if i + 1 < data.blocks.len() {
            all_items.push(ListItem::new(""));
        }
    }

    let total_items = all_items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

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

/// `0xADDR | Vec 3/4            LIVE`
fn block_header(address: Address, block: &BlockView, content_width: usize) -> Line<'static> {
    let addr_style = if block.live {
        Style::default().fg(DEFAULT_THEME.dim)
    } else {
        Style::default()
            .fg(DEFAULT_THEME.dim)
            .add_modifier(Modifier::CROSSED_OUT)
    };

    let shape = match block.kind {
        BlockKind::Boxed => "Box".to_string(),
        BlockKind::Vector => format!("Vec {}/{}", block.length, block.capacity),
    };

    let (marker, marker_bg) = if block.is_leaked() {
        (" LEAKED ", DEFAULT_THEME.leaked)
    } else if block.live {
        (" LIVE ", DEFAULT_THEME.live_block)
    } else {
        (" FREED ", DEFAULT_THEME.freed)
    };

    let mut spans = vec![
        Span::styled(format!("0x{:08x}", address), addr_style),
        Span::raw(" | "),
        Span::styled(shape, Style::default().fg(DEFAULT_THEME.block_shape)),
    ];
    let padding = content_width.saturating_sub(spans_width(&spans) + marker.len());
    spans.push(Span::raw(" ".repeat(padding.max(1))));
    spans.push(Span::styled(
        marker,
        Style::default()
            .bg(marker_bg)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    ));

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ValueView;

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_header_markers() {
        let mut block = BlockView {
            kind: BlockKind::Vector,
            elements: vec![ValueView::Int(1), ValueView::Int(2)],
            capacity: 4,
            length: 2,
            live: true,
            reachable: true,
        };
        let live = text(&block_header(0x1000_0000, &block, 40));
        assert!(live.starts_with("0x10000000 | Vec 2/4"));
        assert!(live.ends_with(" LIVE "));

        block.reachable = false;
        assert!(text(&block_header(0x1000_0000, &block, 40)).ends_with(" LEAKED "));

        block.live = false;
        assert!(text(&block_header(0x1000_0000, &block, 40)).ends_with(" FREED "));
    }
}
