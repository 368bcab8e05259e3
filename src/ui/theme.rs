//! Colour palette shared by every pane
//!
//! Entries are named for what they mark on screen. The memory panes lean on
//! three of them to tell block states apart: `live_block`, `freed` and
//! `leaked`.

use ratatui::style::Color;

pub struct Theme {
    pub text: Color,
    /// Labels, separators and hints
    pub dim: Color,
    pub border_focused: Color,
    pub border_idle: Color,
    /// Background of the current source line and the status bar
    pub highlight_bg: Color,
    /// Current-line arrow in the source pane, frame bullets in the stack pane
    pub marker: Color,

    // Source pane
    pub keyword: Color,
    pub literal: Color,
    pub format_string: Color,
    pub bracket: Color,
    /// Called functions and macros
    pub call: Color,
    pub type_name: Color,

    // Stack pane
    pub active_frame: Color,
    pub caller_frame: Color,
    /// By-reference parameter sharing a caller's slot
    pub alias: Color,
    pub uninit: Color,
    pub pointer: Color,
    /// Handle whose target slot or block is gone
    pub dangling: Color,

    // Heap pane
    pub block_shape: Color,
    pub live_block: Color,
    pub freed: Color,
    /// Still allocated but unreachable from any live slot
    pub leaked: Color,

    // Status bar
    pub stepping: Color,
    pub history: Color,
    pub finished: Color,
    pub error: Color,
}

pub const DEFAULT_THEME: Theme = Theme {
    text: Color::Rgb(205, 214, 244),
    dim: Color::Rgb(108, 112, 134),
    border_focused: Color::Rgb(249, 226, 175),
    border_idle: Color::Rgb(88, 91, 112),
    highlight_bg: Color::Rgb(49, 50, 68),
    marker: Color::Rgb(250, 179, 135),

    keyword: Color::Rgb(203, 166, 247),
    literal: Color::Rgb(250, 179, 135),
    format_string: Color::Rgb(166, 227, 161),
    bracket: Color::Rgb(137, 180, 250),
    call: Color::Rgb(249, 226, 175),
    type_name: Color::Rgb(148, 226, 213),

    active_frame: Color::Rgb(249, 226, 175),
    caller_frame: Color::Rgb(180, 165, 120),
    alias: Color::Rgb(245, 194, 231),
    uninit: Color::Rgb(235, 160, 172),
    pointer: Color::Rgb(137, 220, 235),
    dangling: Color::Rgb(243, 139, 168),

    block_shape: Color::Rgb(137, 180, 250),
    live_block: Color::Rgb(166, 227, 161),
    freed: Color::Rgb(243, 139, 168),
    leaked: Color::Rgb(250, 179, 135),

    stepping: Color::Rgb(137, 180, 250),
    history: Color::Rgb(250, 179, 135),
    finished: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_states_are_distinguishable() {
        let states = [
            DEFAULT_THEME.live_block,
            DEFAULT_THEME.freed,
            DEFAULT_THEME.leaked,
        ];
        for (i, a) in states.iter().enumerate() {
            for b in &states[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_ne!(DEFAULT_THEME.alias, DEFAULT_THEME.text);
        assert_ne!(DEFAULT_THEME.pointer, DEFAULT_THEME.dangling);
    }
}
