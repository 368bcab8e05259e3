//! Main TUI application state and logic

use crate::interpreter::engine::{HaltReason, Interpreter, StepOutcome};
use crate::snapshot::{Snapshot, SnapshotHistory, Status};
use crate::ui::panes::{
    self, HeapRenderData, HeapScrollState, SourceRenderData, SourceScrollState, StackRenderData,
    StackScrollState, StatusRenderData, TerminalScrollState,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};
use tracing::info;

/// Delay between steps while auto-playing
const PLAY_INTERVAL: Duration = Duration::from_millis(600);

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Stack,
    Heap,
    Terminal,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: source -> terminal -> stack -> heap)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Terminal,
            FocusedPane::Terminal => FocusedPane::Stack,
            FocusedPane::Stack => FocusedPane::Heap,
            FocusedPane::Heap => FocusedPane::Source,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Heap,
            FocusedPane::Terminal => FocusedPane::Source,
            FocusedPane::Stack => FocusedPane::Terminal,
            FocusedPane::Heap => FocusedPane::Stack,
        }
    }
}

/// The main application state
pub struct App {
    /// The interpreter instance
    pub interpreter: Interpreter,

    /// The source code being executed
    pub source_code: String,

    /// One snapshot per executed step, the live state last
    pub history: SnapshotHistory,

    /// Index into `history` while looking back; `None` shows the live state
    pub view: Option<usize>,

    /// Currently focused pane
    pub focused_pane: FocusedPane,

    /// Per-pane scroll state
    pub source_scroll: SourceScrollState,
    pub stack_scroll: StackScrollState,
    pub heap_scroll: HeapScrollState,
    pub terminal_scroll: TerminalScrollState,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Last time a step was taken in play mode
    pub last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    pub last_space_press: Instant,
}

impl App {
    /// Create a new app with the given interpreter and source code
    pub fn new(interpreter: Interpreter, source_code: String, history: SnapshotHistory) -> Self {
        let now = Instant::now();
        let mut app = App {
            interpreter,
            source_code,
            history,
            view: None,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState::default(),
            stack_scroll: StackScrollState::default(),
            heap_scroll: HeapScrollState::default(),
            terminal_scroll: TerminalScrollState::default(),
            should_quit: false,
            status_message: String::from("Ready!"),
            is_playing: false,
            last_play_time: now,
            last_space_press: now.checked_sub(Duration::from_secs(1)).unwrap_or(now),
        };
        app.history.push(app.interpreter.snapshot());
        app
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= PLAY_INTERVAL {
                if !self.step_forward() {
                    self.is_playing = false;
                }
                self.last_play_time = Instant::now();
            }

            // Use poll with timeout to allow auto-play to work
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    /// The snapshot on screen
    pub fn displayed(&self) -> Option<&Snapshot> {
        match self.view {
            Some(index) => self.history.get(index),
            None => self.history.latest(),
        }
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // 4 panes in 2 columns, plus status bar at bottom
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_chunks[0]);

        // Left column: Source (top) | Output (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        // Right column: Stack (top) | Heap (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(columns[1]);

        let Some(snapshot) = (match self.view {
            Some(index) => self.history.get(index),
            None => self.history.latest(),
        }) else {
            return;
        };

        let error_line = match &snapshot.status {
            Status::Error { line, .. } => Some(*line),
            _ => None,
        };

        panes::render_source_pane(
            frame,
            left_rows[0],
            SourceRenderData {
                source_code: &self.source_code,
                current_line: snapshot.current.as_ref().map_or(0, |c| c.line),
                error_line,
            },
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        panes::render_terminal_pane(
            frame,
            left_rows[1],
            &snapshot.output,
            self.focused_pane == FocusedPane::Terminal,
            &mut self.terminal_scroll,
        );

        panes::render_stack_pane(
            frame,
            right_rows[0],
            StackRenderData {
                frames: &snapshot.stack,
                halted_on_error: error_line.is_some(),
            },
            self.focused_pane == FocusedPane::Stack,
            &mut self.stack_scroll,
        );

        panes::render_heap_pane(
            frame,
            right_rows[1],
            HeapRenderData {
                blocks: &snapshot.heap,
            },
            self.focused_pane == FocusedPane::Heap,
            &mut self.heap_scroll,
        );

        panes::render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: &self.status_message,
                status: &snapshot.status,
                step: snapshot.steps,
                total_steps: self.interpreter.steps_taken(),
                in_history: self.view.is_some(),
                is_playing: self.is_playing,
            },
        );
    }

    /// Handle keyboard events
    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            // Number keys step forward N times directly
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1);
                let stepped = (0..n).take_while(|_| self.step_forward()).count();
                if stepped > 0 {
                    self.status_message = format!("Stepped forward {} step(s)", stepped);
                }
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.is_playing = false;
                self.step_backward();
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.is_playing = false;
                if self.step_forward() {
                    self.status_message = "Stepped forward".to_string();
                }
            }
            KeyCode::Up => self.scroll_up(),
            KeyCode::Down => self.scroll_down(),
            KeyCode::Char(' ') => {
                // Toggle auto-play mode (with 200ms debounce to prevent key repeat spam)
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    if self.is_playing {
                        self.last_play_time = Instant::now()
                            .checked_sub(PLAY_INTERVAL)
                            .unwrap_or_else(Instant::now);
                        self.status_message = "Playing...".to_string();
                    } else {
                        self.status_message = "Paused".to_string();
                    }
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                self.run_to_end();
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.is_playing = false;
                self.reset();
            }
            _ => {}
        }
    }

    /// Advance one step: forward through history first, then the live run.
    ///
    /// Returns `false` when there is nothing left to execute.
    pub fn step_forward(&mut self) -> bool {
        if let Some(index) = self.view {
            let next = index + 1;
            self.view = (next + 1 < self.history.len()).then_some(next);
            return true;
        }

        if self.interpreter.is_finished() {
            self.status_message = "Execution has ended (r to reset)".to_string();
            return false;
        }

        let outcome = self.interpreter.step();
        self.history.push(self.interpreter.snapshot());

        match outcome {
            StepOutcome::Continued => true,
            StepOutcome::Halted(HaltReason::Finished) => {
                self.status_message = "Program finished".to_string();
                true
            }
            StepOutcome::Halted(HaltReason::Error(err)) => {
                self.status_message = err.to_string();
                true
            }
        }
    }

    /// Show the snapshot before the one on screen
    pub fn step_backward(&mut self) {
        let current = self
            .view
            .unwrap_or_else(|| self.history.len().saturating_sub(1));
        if current == 0 {
            self.status_message = if self.history.evicted() > 0 {
                "Older snapshots were dropped to save memory".to_string()
            } else {
                "Already at the start".to_string()
            };
            return;
        }
        self.view = Some(current - 1);
        self.status_message = "Stepped backward".to_string();
    }

    /// Execute until the run halts or the step budget runs out
    pub fn run_to_end(&mut self) {
        self.view = None;
        let budget = self.interpreter.config().max_steps;
        let mut taken = 0;
        while taken < budget && !self.interpreter.is_finished() {
            self.interpreter.step();
            self.history.push(self.interpreter.snapshot());
            taken += 1;
        }

        self.status_message = match self.history.latest().map(|s| &s.status) {
            Some(Status::Finished) => "Program finished".to_string(),
            Some(Status::Error { message, .. }) => message.clone(),
            _ => format!("Stopped after {} steps", taken),
        };
        info!(steps = self.interpreter.steps_taken(), "ran to end");
    }

    /// Start the program over with an empty history
    pub fn reset(&mut self) {
        self.interpreter.reset();
        self.history.clear();
        self.history.push(self.interpreter.snapshot());
        self.view = None;
        self.source_scroll = SourceScrollState::default();
        self.stack_scroll = StackScrollState::default();
        self.heap_scroll = HeapScrollState::default();
        self.terminal_scroll = TerminalScrollState::default();
        self.status_message = "Reset".to_string();
    }

    fn scroll_up(&mut self) {
        match self.focused_pane {
            FocusedPane::Source => {
                // Scrolling up makes the current line move down visually
                if let Some(row) = self.source_scroll.target_line_row {
                    self.source_scroll.target_line_row = Some(row.saturating_add(1));
                }
            }
            FocusedPane::Stack => {
                self.stack_scroll.offset = self.stack_scroll.offset.saturating_sub(1);
            }
            FocusedPane::Heap => {
                self.heap_scroll.offset = self.heap_scroll.offset.saturating_sub(1);
            }
            FocusedPane::Terminal => {
                self.terminal_scroll.offset = self.terminal_scroll.offset.saturating_sub(1);
                self.terminal_scroll.follow = false;
            }
        }
    }

    fn scroll_down(&mut self) {
        match self.focused_pane {
            FocusedPane::Source => {
                // Scrolling down makes the current line move up visually
                if let Some(row) = self.source_scroll.target_line_row {
                    self.source_scroll.target_line_row = Some(row.saturating_sub(1));
                }
            }
            FocusedPane::Stack => {
                self.stack_scroll.offset = self.stack_scroll.offset.saturating_add(1);
            }
            FocusedPane::Heap => {
                self.heap_scroll.offset = self.heap_scroll.offset.saturating_add(1);
            }
            FocusedPane::Terminal => {
                self.terminal_scroll.offset = self.terminal_scroll.offset.saturating_add(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::parser::parse;

    fn app(source: &str) -> App {
        let program = parse(source).unwrap();
        let interpreter = Interpreter::new(program, RunConfig::default());
        App::new(interpreter, source.to_string(), SnapshotHistory::new(1 << 20))
    }

    #[test]
    fn test_history_navigation() {
        let mut app = app("fn main() {\n    let a = 1;\n    let b = 2;\n}\n");
        assert!(app.step_forward());
        assert!(app.step_forward());
        assert_eq!(app.history.len(), 3);

        app.step_backward();
        assert_eq!(app.view, Some(1));
        assert_eq!(app.displayed().map(|s| s.steps), Some(1));

        // Moving forward from history replays snapshots without stepping
        assert!(app.step_forward());
        assert_eq!(app.view, None);
        assert_eq!(app.interpreter.steps_taken(), 2);
    }

    #[test]
    fn test_run_to_end_and_reset() {
        let mut app = app("fn main() {\n    println!(\"hi\");\n}\n");
        app.run_to_end();
        assert!(app.interpreter.is_finished());
        assert_eq!(app.displayed().map(|s| s.output.clone()), Some(vec!["hi".to_string()]));
        assert!(!app.step_forward());

        app.reset();
        assert_eq!(app.history.len(), 1);
        assert_eq!(app.displayed().map(|s| s.steps), Some(0));
    }
}
