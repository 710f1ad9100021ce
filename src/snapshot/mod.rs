//! Execution history for time-travel navigation
//!
//! Every advance of a session is captured as an immutable [`HistoryEntry`].
//! Entries are only ever appended; stepping backward moves a cursor over
//! them and never touches interpreter state.

pub mod extract;

pub use extract::{extract, ExecutionView, Snapshot};

use crate::errors::ExecutionError;
use crate::parser::ast::{SourceLocation, Span};
use crate::session::checkpoint::CheckpointPayload;
use serde::Serialize;
use std::time::SystemTime;

/// Mock terminal for capturing `console.log` output
#[derive(Debug, Clone, Default)]
pub struct MockTerminal {
    pub lines: Vec<TerminalLine>,
}

impl MockTerminal {
    pub fn new() -> Self {
        MockTerminal { lines: Vec::new() }
    }

    /// Append one line of output
    pub fn println(&mut self, text: String, location: SourceLocation) {
        self.lines.push(TerminalLine { text, location });
    }

    /// Get all lines as a vector of strings
    pub fn get_output(&self) -> Vec<String> {
        self.lines
            .iter()
            // Logged values may themselves contain newlines
            .flat_map(|tl| tl.text.split('\n').map(str::to_string))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A line of terminal output with source location tracking
#[derive(Debug, Clone)]
pub struct TerminalLine {
    pub text: String,
    pub location: SourceLocation,
}

/// Everything a session reports about one advance
#[derive(Debug, Clone)]
pub struct StepCapture {
    pub highlight: Span,
    pub variables: Snapshot,
    pub stack_trace: Vec<String>,
    pub checkpoint: Option<CheckpointPayload>,
    pub console_lines: usize,
}

/// Program state after one advance
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub index: usize,
    /// Node active at this step, as a range of the wrapped source
    pub highlight: Span,
    pub variables: Snapshot,
    /// Function calls, innermost last
    pub stack_trace: Vec<String>,
    pub checkpoint: Option<CheckpointPayload>,
    /// Captured `console.log` lines at this step
    pub console_lines: usize,
    pub timestamp: SystemTime,
}

impl HistoryEntry {
    pub fn has_checkpoint(&self) -> bool {
        self.checkpoint
            .as_ref()
            .is_some_and(|c| !c.targets.is_empty())
    }

    /// Type of the innermost node being evaluated
    pub fn node_type(&self) -> Option<&str> {
        self.variables.node_type.as_deref()
    }
}

/// Append-only list of history entries
#[derive(Debug)]
pub struct History {
    entries: Vec<HistoryEntry>,
    max_entries: usize,
}

impl History {
    pub fn new(max_entries: usize) -> Self {
        History {
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Add an entry; its index is the current length
    pub fn push(&mut self, capture: StepCapture) -> Result<usize, ExecutionError> {
        if self.entries.len() >= self.max_entries {
            return Err(ExecutionError::HistoryLimit {
                limit: self.max_entries,
            });
        }

        let index = self.entries.len();
        self.entries.push(HistoryEntry {
            index,
            highlight: capture.highlight,
            variables: capture.variables,
            stack_trace: capture.stack_trace,
            checkpoint: capture.checkpoint,
            console_lines: capture.console_lines,
            timestamp: SystemTime::now(),
        });
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(console_lines: usize) -> StepCapture {
        StepCapture {
            highlight: Span::new(0, 4),
            variables: Snapshot::default(),
            stack_trace: vec!["<program>".to_string()],
            checkpoint: None,
            console_lines,
        }
    }

    #[test]
    fn test_indices_follow_positions() {
        let mut history = History::new(10);
        for i in 0..3 {
            assert_eq!(history.push(capture(i)).unwrap(), i);
        }
        for (i, entry) in history.entries().iter().enumerate() {
            assert_eq!(entry.index, i);
            assert_eq!(entry.console_lines, i);
        }
    }

    #[test]
    fn test_limit() {
        let mut history = History::new(1);
        history.push(capture(0)).unwrap();
        assert_eq!(
            history.push(capture(1)),
            Err(ExecutionError::HistoryLimit { limit: 1 })
        );
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_terminal_splits_multiline_output() {
        let mut terminal = MockTerminal::new();
        terminal.println("a\nb".to_string(), SourceLocation::new(1, 1, 0));
        terminal.println("c".to_string(), SourceLocation::new(2, 1, 10));
        assert_eq!(terminal.len(), 2);
        assert_eq!(terminal.get_output(), vec!["a", "b", "c"]);
    }
}
