//! Publishing history updates to collaborators

use crate::errors::EngineError;
use crate::snapshot::HistoryEntry;
use serde::Serialize;
use tracing::{debug, warn};

/// State published after every advance or cursor move
#[derive(Debug, Clone, Serialize)]
pub struct StepUpdate<'a> {
    pub entry: &'a HistoryEntry,
    pub history_index: usize,
    pub history_len: usize,
    pub is_complete: bool,
    pub is_running: bool,
}

/// Receives navigator updates.
///
/// Observers only get shared data and cannot reach the navigator, so they
/// cannot re-enter it while it publishes.
pub trait HistoryObserver {
    fn on_update(&mut self, update: &StepUpdate<'_>);

    fn on_error(&mut self, _error: &EngineError) {}
}

/// Logs every update as a structured debug event
#[derive(Debug, Default)]
pub struct TracingObserver;

impl HistoryObserver for TracingObserver {
    fn on_update(&mut self, update: &StepUpdate<'_>) {
        debug!(
            index = update.history_index,
            len = update.history_len,
            complete = update.is_complete,
            running = update.is_running,
            node = update.entry.node_type().unwrap_or("-"),
            variables = update.entry.variables.values.len(),
            checkpoint = update.entry.has_checkpoint(),
            "history update"
        );
    }

    fn on_error(&mut self, error: &EngineError) {
        warn!(%error, "engine error");
    }
}
