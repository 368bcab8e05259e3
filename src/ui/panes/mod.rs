//! TUI pane rendering modules
//!
//! Every pane draws from a [`Snapshot`](crate::snapshot::Snapshot), so the
//! live state and any state from history render the same way.
//!
//! # Pane Modules
//!
//! - [`source`]: Source code display with syntax highlighting and current line indicator
//! - [`stack`]: Call stack with one section per frame and its variables
//! - [`heap`]: Heap blocks with contents and live/freed/leaked markers
//! - [`terminal`]: Output from `print!` and `println!`
//! - [`status`]: Status bar with keybindings and execution state
//! - `format`: Value formatting shared by the stack and heap panes
//!
//! # Architecture
//!
//! Each pane module exports:
//! - A primary `render_*_pane()` function
//! - Associated state types (e.g., `ScrollState`, `RenderData`)

mod format;

pub mod heap;
pub mod source;
pub mod stack;
pub mod status;
pub mod terminal;

// Re-export render functions for convenience
pub use heap::{render_heap_pane, HeapRenderData, HeapScrollState};
pub use source::{render_source_pane, SourceRenderData, SourceScrollState};
pub use stack::{render_stack_pane, StackRenderData, StackScrollState};
pub use status::{render_status_bar, StatusRenderData};
pub use terminal::{render_terminal_pane, TerminalScrollState};
