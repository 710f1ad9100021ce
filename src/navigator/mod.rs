//! Execution history and time-travel navigation
//!
//! The [`Navigator`] is the only caller of [`Session::step`]. Every advance
//! appends one [`HistoryEntry`]; moving backward, or forward over entries
//! that already exist, only moves a cursor. Searches that run ahead of the
//! history drive the session until they match, the program completes, an
//! error stops it, or the [`AbortSignal`] is raised.
//!
//! Autoplay is a [`CancellableTimer`] polled through [`Navigator::tick`]:
//! nothing runs unless the host's event loop asks for it.

pub mod observer;
pub mod timer;

pub use observer::{HistoryObserver, StepUpdate, TracingObserver};
pub use timer::{AbortSignal, CancellableTimer};

use crate::config::EngineConfig;
use crate::errors::{EngineError, SessionError};
use crate::parser::declared::declared_names;
use crate::session::Session;
use crate::snapshot::{extract, History, HistoryEntry, StepCapture};
use crate::source::ProgramSource;
use serde_json::Map;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

type Analyzer = Box<dyn Fn(&str) -> Vec<String>>;

/// Steps a session and navigates its history
pub struct Navigator {
    config: EngineConfig,
    session: Option<Session>,
    history: History,
    history_index: usize,
    is_complete: bool,
    error: Option<EngineError>,
    declared: Vec<String>,
    analyzer: Analyzer,
    timer: CancellableTimer,
    abort: AbortSignal,
    observers: Vec<Box<dyn HistoryObserver>>,
}

impl Navigator {
    pub fn new(config: EngineConfig) -> Self {
        let history = History::new(config.max_history);
        Navigator {
            config,
            session: None,
            history,
            history_index: 0,
            is_complete: false,
            error: None,
            declared: Vec::new(),
            analyzer: Box::new(declared_names),
            timer: CancellableTimer::new(),
            abort: AbortSignal::new(),
            observers: Vec::new(),
        }
    }

    /// Replace the declared-name analysis
    pub fn with_analyzer(mut self, analyzer: impl Fn(&str) -> Vec<String> + 'static) -> Self {
        self.analyzer = Box::new(analyzer);
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn HistoryObserver>) {
        self.observers.push(observer);
    }

    /// Start over with a new program
    pub fn refresh(
        &mut self,
        wrapped: &str,
        bindings: &Map<String, serde_json::Value>,
    ) -> Result<(), SessionError> {
        self.reload(wrapped, wrapped, bindings)
    }

    /// Start over with a wrapped program; declared names come from its original text
    pub fn refresh_source(
        &mut self,
        source: &ProgramSource,
        bindings: &Map<String, serde_json::Value>,
    ) -> Result<(), SessionError> {
        self.reload(&source.wrapped, &source.original, bindings)
    }

    fn reload(
        &mut self,
        wrapped: &str,
        analysed: &str,
        bindings: &Map<String, serde_json::Value>,
    ) -> Result<(), SessionError> {
        self.timer.cancel();
        self.abort.raise();
        self.abort = AbortSignal::new();

        self.session = None;
        self.history = History::new(self.config.max_history);
        self.history_index = 0;
        self.is_complete = false;
        self.error = None;
        self.declared = (self.analyzer)(analysed);

        match Session::create(wrapped, bindings, &self.config) {
            Ok(session) => self.session = Some(session),
            Err(err) => {
                self.fail(EngineError::Session(err.clone()));
                return Err(err);
            }
        }

        debug!(declared = self.declared.len(), "navigator refreshed");
        self.advance();
        self.publish();
        Ok(())
    }

    /// Stop autoplay and any search in progress; history stays readable
    pub fn teardown(&mut self) {
        self.timer.cancel();
        self.abort.raise();
        self.session = None;
    }

    /// Step the session once and record the result
    fn advance(&mut self) -> bool {
        if self.is_complete || self.error.is_some() {
            return false;
        }

        let step = {
            let Some(session) = self.session.as_mut() else {
                return false;
            };
            session
                .step()
                .map(|more| (more, Self::capture(session, &self.declared)))
        };

        let (more, capture) = match step {
            Ok(step) => step,
            Err(err) => {
                self.fail(err.into());
                return false;
            }
        };

        let index = match self.history.push(capture) {
            Ok(index) => index,
            Err(err) => {
                self.fail(err.into());
                return false;
            }
        };

        self.history_index = index;
        if !more {
            self.is_complete = true;
            self.timer.cancel();
        }
        debug!(index, complete = self.is_complete, "advanced");
        true
    }

    fn capture(session: &mut Session, declared: &[String]) -> StepCapture {
        StepCapture {
            highlight: session.highlight(),
            variables: extract(&*session, declared),
            stack_trace: session.stack_trace(),
            checkpoint: session.take_checkpoint(),
            console_lines: session.console_lines(),
        }
    }

    fn fail(&mut self, error: EngineError) {
        warn!(%error, index = self.history_index, "execution stopped");
        self.timer.cancel();
        for observer in self.observers.iter_mut() {
            observer.on_error(&error);
        }
        self.error = Some(error);
    }

    fn publish(&mut self) {
        let Some(entry) = self.history.get(self.history_index) else {
            return;
        };
        let update = StepUpdate {
            entry,
            history_index: self.history_index,
            history_len: self.history.len(),
            is_complete: self.is_complete,
            is_running: self.timer.is_active(),
        };
        for observer in self.observers.iter_mut() {
            observer.on_update(&update);
        }
    }

    /// Move to the next entry, creating it if the cursor is on the newest one
    fn forward(&mut self) -> bool {
        if self.history_index + 1 < self.history.len() {
            self.history_index += 1;
            return true;
        }
        self.advance()
    }

    pub fn step_forward(&mut self) -> bool {
        if self.timer.is_active() {
            return false;
        }
        let moved = self.forward();
        if moved {
            self.publish();
        }
        moved
    }

    /// Step forward up to `count` times, stopping early on completion or abort
    pub fn step_forward_by(&mut self, count: usize) -> usize {
        if self.timer.is_active() {
            return 0;
        }
        let abort = self.abort.clone();
        let mut moved = 0;
        while moved < count && !abort.is_raised() && self.forward() {
            moved += 1;
        }
        if moved > 0 {
            self.publish();
        }
        moved
    }

    pub fn step_backward(&mut self) -> bool {
        if self.history_index == 0 {
            return false;
        }
        self.history_index -= 1;
        self.publish();
        true
    }

    /// Move to entry `index`, executing as far as needed to reach it
    pub fn jump_to_index(&mut self, index: usize) {
        let abort = self.abort.clone();
        while self.history.len() <= index && !abort.is_raised() && self.advance() {}

        if let Some(last) = self.history.len().checked_sub(1) {
            self.history_index = index.min(last);
            self.publish();
        }
    }

    pub fn go_to_start(&mut self) {
        self.jump_to_index(0);
    }

    pub fn go_to_end(&mut self) {
        self.jump_to_index(usize::MAX);
    }

    pub fn step_to_next_block(&mut self) -> bool {
        self.seek_forward(is_block_boundary)
    }

    pub fn step_to_prev_block(&mut self) -> bool {
        self.seek_backward(is_block_boundary)
    }

    pub fn step_to_next_checkpoint(&mut self) -> bool {
        self.seek_forward(|_, entries, i| entries[i].has_checkpoint())
    }

    pub fn step_to_prev_checkpoint(&mut self) -> bool {
        self.seek_backward(|_, entries, i| entries[i].has_checkpoint())
    }

    /// First matching entry after the cursor; without one, the cursor ends
    /// on the last entry reached
    fn seek_forward(
        &mut self,
        matches: impl Fn(&EngineConfig, &[HistoryEntry], usize) -> bool,
    ) -> bool {
        if self.history.is_empty() {
            return false;
        }
        let abort = self.abort.clone();
        let mut i = self.history_index + 1;
        loop {
            if i < self.history.len() {
                if matches(&self.config, self.history.entries(), i) {
                    self.history_index = i;
                    self.publish();
                    return true;
                }
                i += 1;
                continue;
            }
            if abort.is_raised() || !self.advance() {
                break;
            }
        }

        self.history_index = self.history.len() - 1;
        self.publish();
        false
    }

    fn seek_backward(
        &mut self,
        matches: impl Fn(&EngineConfig, &[HistoryEntry], usize) -> bool,
    ) -> bool {
        let found = (0..self.history_index)
            .rev()
            .find(|&i| matches(&self.config, self.history.entries(), i));
        match found {
            Some(i) => {
                self.history_index = i;
                self.publish();
                true
            }
            None => false,
        }
    }

    pub fn toggle_autoplay(&mut self) {
        if self.timer.is_active() {
            self.stop_autoplay();
        } else {
            self.start_autoplay(self.config.autoplay_interval());
        }
    }

    pub fn start_autoplay(&mut self, interval: Duration) {
        self.start_autoplay_at(interval, Instant::now());
    }

    /// Start autoplay with the first firing one interval after `now`
    pub fn start_autoplay_at(&mut self, interval: Duration, now: Instant) {
        if self.error.is_some() || self.session.is_none() {
            return;
        }
        if self.is_complete && self.history_index + 1 >= self.history.len() {
            return;
        }
        self.timer.start(interval, now);
        self.publish();
    }

    pub fn stop_autoplay(&mut self) {
        if self.timer.is_active() {
            self.timer.cancel();
            self.publish();
        }
    }

    /// Let the autoplay timer fire; returns whether the cursor moved
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.timer.poll(now) {
            return false;
        }
        let moved = self.forward();
        let at_end = self.history_index + 1 >= self.history.len();
        if !moved || (self.is_complete && at_end) {
            self.timer.cancel();
        }
        self.publish();
        moved
    }

    /// Handle for stopping long searches from elsewhere
    pub fn abort_handle(&self) -> AbortSignal {
        self.abort.clone()
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.history.get(self.history_index)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_index(&self) -> usize {
        self.history_index
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_active()
    }

    /// Most recent fatal error, cleared by a successful refresh
    pub fn error(&self) -> Option<&EngineError> {
        self.error.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Time until autoplay next fires
    pub fn next_tick_in(&self, now: Instant) -> Option<Duration> {
        self.timer.remaining(now)
    }
}

/// Entering a block-like node from a step that was not one
fn is_block_boundary(config: &EngineConfig, entries: &[HistoryEntry], i: usize) -> bool {
    let is_block = |entry: &HistoryEntry| {
        entry
            .node_type()
            .is_some_and(|t| config.is_block_type(t))
    };
    i > 0 && is_block(&entries[i]) && !is_block(&entries[i - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExecutionError;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn navigator(source: &str) -> Navigator {
        let mut nav = Navigator::new(EngineConfig::default());
        nav.refresh(source, &Map::new()).unwrap();
        nav
    }

    #[derive(Default)]
    struct Recorder {
        updates: Rc<RefCell<Vec<(usize, bool)>>>,
        errors: Rc<RefCell<usize>>,
    }

    impl HistoryObserver for Recorder {
        fn on_update(&mut self, update: &StepUpdate<'_>) {
            self.updates
                .borrow_mut()
                .push((update.history_index, update.is_complete));
        }

        fn on_error(&mut self, _error: &EngineError) {
            *self.errors.borrow_mut() += 1;
        }
    }

    #[test]
    fn test_refresh_seeds_first_entry() {
        let nav = navigator("var a = 1;\nvar b = 2;");
        assert_eq!(nav.history().len(), 1);
        assert_eq!(nav.history_index(), 0);
        assert_eq!(nav.current().unwrap().variables.get("a"), Some(&1.into()));
        assert!(!nav.is_complete());
    }

    #[test]
    fn test_backward_then_forward_reuses_history() {
        let mut nav = navigator("var a = 1;\nvar b = 2;\nvar c = 3;");
        nav.step_forward();
        nav.step_forward();
        let len = nav.history().len();
        assert!(nav.step_backward());
        assert!(nav.step_forward());
        assert_eq!(nav.history().len(), len);
        assert_eq!(nav.history_index(), len - 1);
    }

    #[test]
    fn test_step_forward_is_ignored_while_running() {
        let mut nav = navigator("var a = 1;\nvar b = 2;");
        nav.start_autoplay(Duration::from_secs(60));
        assert!(!nav.step_forward());
        nav.stop_autoplay();
        assert!(nav.step_forward());
    }

    #[test]
    fn test_tick_stops_on_completion() {
        let mut nav = navigator("var a = 1;\nvar b = 2;");
        let start = Instant::now();
        nav.start_autoplay_at(Duration::from_millis(10), start);
        assert!(!nav.tick(start));
        assert!(nav.tick(start + Duration::from_millis(10)));
        assert!(nav.is_complete());
        assert!(!nav.is_running());
        assert!(!nav.tick(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_runtime_error_is_kept_and_published() {
        let recorder = Recorder::default();
        let errors = recorder.errors.clone();
        let mut nav = Navigator::new(EngineConfig::default());
        nav.add_observer(Box::new(recorder));
        nav.refresh("var a = 1;\nthrow 'boom';", &Map::new()).unwrap();

        assert!(!nav.step_forward());
        assert_eq!(*errors.borrow(), 1);
        assert!(matches!(
            nav.error(),
            Some(EngineError::Execution(ExecutionError::Runtime(_)))
        ));
        assert_eq!(nav.history().len(), 1);
    }

    #[test]
    fn test_observers_see_every_move() {
        let recorder = Recorder::default();
        let updates = recorder.updates.clone();
        let mut nav = Navigator::new(EngineConfig::default());
        nav.add_observer(Box::new(recorder));
        nav.refresh("var a = 1;\nvar b = 2;", &Map::new()).unwrap();
        nav.step_forward();
        nav.step_backward();
        assert_eq!(*updates.borrow(), vec![(0, false), (1, true), (0, true)]);
    }

    #[test]
    fn test_refresh_clears_error() {
        let mut nav = Navigator::new(EngineConfig::default());
        assert!(nav.refresh("var = ;", &Map::new()).is_err());
        assert!(matches!(nav.error(), Some(EngineError::Session(_))));
        assert!(nav.history().is_empty());

        nav.refresh("var a = 1;", &Map::new()).unwrap();
        assert!(nav.error().is_none());
        assert_eq!(nav.history().len(), 1);
    }

    #[test]
    fn test_custom_analyzer() {
        let mut nav = Navigator::new(EngineConfig::default()).with_analyzer(|_| vec!["b".into()]);
        nav.refresh("var a = 1;\nvar b = 2;", &Map::new()).unwrap();
        nav.step_forward();
        let snapshot = &nav.current().unwrap().variables;
        assert_eq!(snapshot.get("b"), Some(&2.into()));
        assert_eq!(snapshot.get("a"), None);
    }
}
