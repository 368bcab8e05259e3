use crate::snapshot::ValueView;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    style::{Modifier, Style},
    text::Span,
};

/// Format a value with styled spans
pub(crate) fn format_value_styled(value: &ValueView) -> Vec<Span<'static>> {
    match value {
        ValueView::Int(n) => vec![Span::styled(
            n.to_string(),
            Style::default().fg(DEFAULT_THEME.literal),
        )],
        ValueView::Bool(b) => vec![Span::styled(
            b.to_string(),
            Style::default().fg(DEFAULT_THEME.literal),
        )],
        ValueView::Unit => vec![Span::styled("()", Style::default().fg(DEFAULT_THEME.dim))],
        ValueView::Uninit => vec![Span::styled(
            "[uninit]",
            Style::default()
                .fg(DEFAULT_THEME.uninit)
                .add_modifier(Modifier::DIM),
        )],
        ValueView::Ref { target, live } => vec![Span::styled(
            format!("→ {}", target),
            pointer_style(*live),
        )],
        ValueView::Heap { address, live } => vec![Span::styled(
            format!("→ 0x{:08x}", address),
            pointer_style(*live),
        )],
        ValueView::HeapElement { address, index } => vec![Span::styled(
            format!("→ 0x{:08x}[{}]", address, index),
            Style::default().fg(DEFAULT_THEME.pointer),
        )],
        ValueView::Array(elements) => {
            let punct = Style::default().fg(DEFAULT_THEME.dim);
            let mut spans = vec![Span::styled("[", punct)];
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::styled(", ", punct));
                }
                spans.extend(format_value_styled(element));
            }
            spans.push(Span::styled("]", punct));
            spans
        }
    }
}

/// Dangling pointers are drawn in the error colour
fn pointer_style(live: bool) -> Style {
    if live {
        Style::default().fg(DEFAULT_THEME.pointer)
    } else {
        Style::default()
            .fg(DEFAULT_THEME.dangling)
            .add_modifier(Modifier::CROSSED_OUT)
    }
}

/// Display width of a run of spans
pub(crate) fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|s| s.content.chars().count()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(spans: &[Span<'_>]) -> String {
        spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_nested_array_text() {
        let value = ValueView::Array(vec![ValueView::Int(1), ValueView::Uninit]);
        assert_eq!(text(&format_value_styled(&value)), "[1, [uninit]]");
    }

    #[test]
    fn test_dangling_heap_handle_is_marked() {
        let spans = format_value_styled(&ValueView::Heap {
            address: 0x1000_0000,
            live: false,
        });
        assert_eq!(text(&spans), "→ 0x10000000");
        assert_eq!(spans[0].style.fg, Some(DEFAULT_THEME.dangling));
        assert_eq!(spans_width(&spans), 12);
    }
}
