//! Main TUI application state and logic

use crate::navigator::Navigator;
use crate::source::{PositionMapper, ProgramSource};
use crate::ui::panes::{self, SourceScrollState, StatusRenderData};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use serde_json::Map;
use std::io;
use std::time::{Duration, Instant};

/// Longest wait for input before the autoplay timer is checked again
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Console,
    Variables,
    Checkpoint,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: source -> console -> variables -> checkpoint)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Console,
            FocusedPane::Console => FocusedPane::Variables,
            FocusedPane::Variables => FocusedPane::Checkpoint,
            FocusedPane::Checkpoint => FocusedPane::Source,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Checkpoint,
            FocusedPane::Console => FocusedPane::Source,
            FocusedPane::Variables => FocusedPane::Console,
            FocusedPane::Checkpoint => FocusedPane::Variables,
        }
    }
}

/// The main application state
pub struct App {
    pub navigator: Navigator,

    /// The program being stepped
    pub source: ProgramSource,
    pub bindings: Map<String, serde_json::Value>,
    mapper: PositionMapper,

    /// Currently focused pane
    pub focused_pane: FocusedPane,

    /// Per-pane scroll offsets
    pub source_scroll: SourceScrollState,
    pub variables_scroll: usize,
    pub checkpoint_scroll: usize,
    pub console_scroll: usize,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,
}

impl App {
    /// Create an app over a navigator already refreshed with `source`
    pub fn new(
        navigator: Navigator,
        source: ProgramSource,
        bindings: Map<String, serde_json::Value>,
    ) -> Self {
        let mapper = source.mapper();
        let mut app = App {
            navigator,
            source,
            bindings,
            mapper,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState::default(),
            variables_scroll: 0,
            checkpoint_scroll: 0,
            console_scroll: usize::MAX,
            should_quit: false,
            status_message: String::from("Ready!"),
        };
        app.report("Ready!");
        app
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.navigator.tick(Instant::now()) {
                self.console_scroll = usize::MAX;
                let message = if self.navigator.is_running() {
                    "Playing..."
                } else {
                    "Playback complete"
                };
                self.report(message);
            }

            let timeout = self
                .navigator
                .next_tick_in(Instant::now())
                .map_or(POLL_INTERVAL, |left| left.min(POLL_INTERVAL));
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        self.navigator.teardown();
        Ok(())
    }

    /// Current line of the original source, zero-based
    pub fn current_line(&self) -> Option<usize> {
        let entry = self.navigator.current()?;
        Some(self.mapper.map_line(entry.highlight.start))
    }

    /// Console lines written up to the current step
    pub fn console_lines(&self) -> Vec<String> {
        let (Some(session), Some(entry)) = (self.navigator.session(), self.navigator.current())
        else {
            return Vec::new();
        };
        session
            .interpreter()
            .terminal()
            .lines
            .iter()
            .take(entry.console_lines)
            .flat_map(|line| line.text.split('\n').map(str::to_string))
            .collect()
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_chunks[0]);

        // Left column: Source (top) | Console (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        // Right column: Variables (top) | Checkpoint (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[1]);

        let current_line = self.current_line();
        panes::render_source_pane(
            frame,
            left_rows[0],
            &self.source.original,
            current_line,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        let console = self.console_lines();
        panes::render_console_pane(
            frame,
            left_rows[1],
            &console,
            self.focused_pane == FocusedPane::Console,
            &mut self.console_scroll,
        );

        let entry = self.navigator.current();
        panes::render_variables_pane(
            frame,
            right_rows[0],
            entry.map(|e| &e.variables),
            entry
                .map(|e| e.stack_trace.as_slice())
                .unwrap_or_default(),
            self.focused_pane == FocusedPane::Variables,
            &mut self.variables_scroll,
        );

        panes::render_checkpoint_pane(
            frame,
            right_rows[1],
            entry.and_then(|e| e.checkpoint.as_ref()),
            self.focused_pane == FocusedPane::Checkpoint,
            &mut self.checkpoint_scroll,
        );

        panes::render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: &self.status_message,
                current_step: self.navigator.history_index(),
                total_steps: self.navigator.history().len(),
                is_complete: self.navigator.is_complete(),
                is_playing: self.navigator.is_running(),
                has_error: self.navigator.error().is_some(),
                at_checkpoint: entry.is_some_and(|e| e.has_checkpoint()),
            },
        );
    }

    /// Handle one key press
    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            // Number keys step forward N times directly
            KeyCode::Char(c @ '1'..='9') => {
                self.navigator.stop_autoplay();
                let n = (c as u8 - b'0') as usize;
                let stepped = self.navigator.step_forward_by(n);
                self.report(&format!("Stepped forward {stepped} step(s)"));
            }
            KeyCode::Tab => self.focused_pane = self.focused_pane.next(),
            KeyCode::BackTab => self.focused_pane = self.focused_pane.prev(),
            KeyCode::Left => {
                self.navigator.stop_autoplay();
                let moved = self.navigator.step_backward();
                self.report(if moved { "Stepped backward" } else { "At the first step" });
            }
            KeyCode::Right => {
                self.navigator.stop_autoplay();
                let moved = self.navigator.step_forward();
                self.report(if moved { "Stepped forward" } else { "At the last step" });
            }
            KeyCode::Char('[') => {
                let found = self.navigator.step_to_prev_block();
                self.report(if found { "Previous block" } else { "No earlier block" });
            }
            KeyCode::Char(']') => {
                let found = self.navigator.step_to_next_block();
                self.report(if found { "Next block" } else { "No later block" });
            }
            KeyCode::Char('p') => {
                let found = self.navigator.step_to_prev_checkpoint();
                self.report(if found {
                    "Previous checkpoint"
                } else {
                    "No earlier checkpoint"
                });
            }
            KeyCode::Char('n') => {
                let found = self.navigator.step_to_next_checkpoint();
                self.report(if found {
                    "Next checkpoint"
                } else {
                    "No later checkpoint"
                });
            }
            KeyCode::Char(' ') => {
                self.navigator.toggle_autoplay();
                self.report(if self.navigator.is_running() {
                    "Playing..."
                } else {
                    "Paused"
                });
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                let message = match self.navigator.refresh_source(&self.source, &self.bindings) {
                    Ok(()) => "Reloaded",
                    Err(_) => "Reload failed",
                };
                self.source_scroll = SourceScrollState::default();
                self.report(message);
            }
            KeyCode::Enter | KeyCode::End => {
                self.navigator.stop_autoplay();
                self.navigator.go_to_end();
                self.report("Jumped to end");
            }
            KeyCode::Backspace | KeyCode::Home => {
                self.navigator.stop_autoplay();
                self.navigator.go_to_start();
                self.report("Jumped to start");
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Source => {
                    // Scrolling up makes the current line move down visually
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_add(1));
                    }
                }
                FocusedPane::Variables => {
                    self.variables_scroll = self.variables_scroll.saturating_sub(1);
                }
                FocusedPane::Checkpoint => {
                    self.checkpoint_scroll = self.checkpoint_scroll.saturating_sub(1);
                }
                FocusedPane::Console => {
                    self.console_scroll = self.console_scroll.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Source => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_sub(1));
                    }
                }
                FocusedPane::Variables => {
                    self.variables_scroll = self.variables_scroll.saturating_add(1);
                }
                FocusedPane::Checkpoint => {
                    self.checkpoint_scroll = self.checkpoint_scroll.saturating_add(1);
                }
                FocusedPane::Console => {
                    self.console_scroll = self.console_scroll.saturating_add(1);
                }
            },
            _ => return,
        }
        self.console_scroll = match code {
            KeyCode::Up | KeyCode::Down | KeyCode::Tab | KeyCode::BackTab => self.console_scroll,
            _ => usize::MAX,
        };
    }

    /// Set the status message, preferring a pending engine error
    fn report(&mut self, message: &str) {
        self.status_message = match self.navigator.error() {
            Some(error) => format!("Error: {error}"),
            None => message.to_string(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use ratatui::backend::TestBackend;

    fn app(body: &str) -> App {
        let source = ProgramSource::from_body(body, "bindings");
        let mut bindings = Map::new();
        bindings.insert("n".to_string(), 3.into());
        let mut navigator = Navigator::new(EngineConfig::default());
        navigator.refresh_source(&source, &bindings).unwrap();
        App::new(navigator, source, bindings)
    }

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_renders_all_panes() {
        let mut app = app("var x = bindings.n;\nconsole.log(x);\nreturn x;");
        app.handle_key(KeyCode::Right);
        let text = screen(&mut app);
        for title in ["Source Code", "Console", "Variables", "Checkpoint", "Step 2/"] {
            assert!(text.contains(title), "missing {title}");
        }
        assert!(text.contains("x = 3"));
        assert!(text.contains("var x = bindings.n;"));
    }

    #[test]
    fn test_current_line_tracks_original() {
        let mut app = app("var a = 1;\nvar b = 2;\nvar c = 3;");
        assert_eq!(app.current_line(), Some(0));
        app.handle_key(KeyCode::Right);
        assert_eq!(app.current_line(), Some(1));
        app.handle_key(KeyCode::Left);
        assert_eq!(app.current_line(), Some(0));
    }

    #[test]
    fn test_console_follows_cursor() {
        let mut app = app("console.log('a');\nconsole.log('b');\nvar done = true;");
        app.handle_key(KeyCode::Right);
        assert_eq!(app.console_lines(), vec!["a", "b"]);
        app.handle_key(KeyCode::Home);
        assert_eq!(app.console_lines(), vec!["a"]);
    }

    #[test]
    fn test_number_keys_and_quit() {
        let mut app = app("var a = 1;\nvar b = 2;\nvar c = 3;\nvar d = 4;");
        app.handle_key(KeyCode::Char('2'));
        assert_eq!(app.navigator.history_index(), 2);
        assert_eq!(app.status_message, "Stepped forward 2 step(s)");
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_focus_cycles() {
        let mut app = app("var a = 1;");
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.focused_pane, FocusedPane::Console);
        app.handle_key(KeyCode::BackTab);
        assert_eq!(app.focused_pane, FocusedPane::Source);
    }
}
