//! Interpreter session
//!
//! A [`Session`] owns one interpreter for one wrapped program, together with
//! the host bridge installed into it. Sessions are never reset: a refresh
//! builds a new one.
//!
//! [`Session::step`] advances by one syntactic unit. With the default
//! [`Granularity::Statement`] a unit ends when
//!
//! 1. a leaf statement completes (expression statement, declaration, `;`)
//! 2. a `return` has evaluated its argument
//! 3. a control statement has evaluated its test
//! 4. a `break`/`continue` reached its target
//! 5. the program finishes
//!
//! `step` reports `false` as soon as no code remains to run, so the last
//! unit is observed while its scopes are still live.

pub mod bridge;
pub mod checkpoint;

use crate::config::{EngineConfig, Granularity};
use crate::errors::{ConversionError, ExecutionError, SessionError, SnapshotError};
use crate::interpreter::Interpreter;
use crate::memory::scope::ScopeLookup;
use crate::memory::value::Value;
use crate::parser::ast::Span;
use crate::snapshot::ExecutionView;
use bridge::PendingCheckpoint;
use checkpoint::CheckpointPayload;
use serde_json::Map;
use tracing::debug;

/// One running program plus its host bridge
pub struct Session {
    interpreter: Interpreter,
    wrapped: String,
    bindings: Map<String, serde_json::Value>,
    pending: PendingCheckpoint,
    granularity: Granularity,
    max_micro_steps: usize,
}

impl Session {
    /// Parse `wrapped`, install the bridge and position before the first statement
    pub fn create(
        wrapped: &str,
        bindings: &Map<String, serde_json::Value>,
        config: &EngineConfig,
    ) -> Result<Self, SessionError> {
        let ast = crate::parser::parse(wrapped)?;
        let mut interpreter = Interpreter::new(ast, config.max_call_depth);

        let pending = PendingCheckpoint::default();
        bridge::install(&mut interpreter, bindings, &config.bridge, pending.clone())?;

        debug!(
            source_len = wrapped.len(),
            bindings = bindings.len(),
            granularity = ?config.granularity,
            "session created"
        );

        Ok(Session {
            interpreter,
            wrapped: wrapped.to_string(),
            bindings: bindings.clone(),
            pending,
            granularity: config.granularity,
            max_micro_steps: config.max_micro_steps,
        })
    }

    /// Advance by one unit; returns whether further steps remain
    pub fn step(&mut self) -> Result<bool, ExecutionError> {
        if self.interpreter.is_done() {
            return Ok(false);
        }

        match self.granularity {
            Granularity::Node => {
                self.interpreter.step()?;
                Ok(!self.interpreter.is_done())
            }
            Granularity::Statement => {
                if !self.interpreter.has_pending_work() {
                    // Only frame bookkeeping is left
                    self.finish()?;
                    return Ok(false);
                }
                for _ in 0..self.max_micro_steps {
                    let micro = self.interpreter.step()?;
                    if micro.finished {
                        return Ok(false);
                    }
                    if micro.boundary {
                        return Ok(self.interpreter.has_pending_work());
                    }
                }
                Err(ExecutionError::StepBudget {
                    limit: self.max_micro_steps,
                })
            }
        }
    }

    /// Execute to completion
    pub fn run(&mut self) -> Result<(), ExecutionError> {
        while self.step()? {}
        self.finish()
    }

    /// Run the remaining micro-steps without stopping at boundaries
    fn finish(&mut self) -> Result<(), ExecutionError> {
        for _ in 0..self.max_micro_steps {
            if self.interpreter.step()?.finished {
                return Ok(());
            }
        }
        Err(ExecutionError::StepBudget {
            limit: self.max_micro_steps,
        })
    }

    /// Checkpoint captured since the last call, if any
    pub fn take_checkpoint(&mut self) -> Option<CheckpointPayload> {
        self.pending.borrow_mut().take()
    }

    /// Range of the wrapped source handled by the most recent micro-step
    pub fn highlight(&self) -> Span {
        let ast = self.interpreter.ast();
        if ast.is_empty() {
            return Span::DUMMY;
        }
        ast.span(self.interpreter.acting_node())
    }

    /// Active calls, innermost last
    pub fn stack_trace(&self) -> Vec<String> {
        self.interpreter.stack_trace()
    }

    pub fn console_lines(&self) -> usize {
        self.interpreter.terminal().len()
    }

    pub fn console_output(&self) -> Vec<String> {
        self.interpreter.terminal().get_output()
    }

    pub fn is_done(&self) -> bool {
        self.interpreter.is_done()
    }

    pub fn wrapped(&self) -> &str {
        &self.wrapped
    }

    pub fn bindings(&self) -> &Map<String, serde_json::Value> {
        &self.bindings
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn to_native(&self, value: &Value) -> Result<serde_json::Value, ConversionError> {
        self.interpreter.to_native(value)
    }

    pub fn from_native(&mut self, json: &serde_json::Value) -> Value {
        self.interpreter.from_native(json)
    }
}

impl ExecutionView for Session {
    fn frame_scopes(&self) -> Result<Vec<Box<dyn ScopeLookup + '_>>, SnapshotError> {
        let scopes = self.interpreter.scopes();
        self.interpreter
            .frame_scopes()
            .into_iter()
            .map(|id| {
                scopes
                    .get(id)
                    .map(|_| Box::new(scopes.handle(id)) as Box<dyn ScopeLookup + '_>)
                    .ok_or_else(|| SnapshotError::Unavailable(format!("scope #{id} is missing")))
            })
            .collect()
    }

    fn to_native(&self, value: &Value) -> Result<serde_json::Value, ConversionError> {
        self.interpreter.to_native(value)
    }

    fn current_value(&self) -> Option<Value> {
        self.interpreter.current_value().cloned()
    }

    fn node_type(&self) -> Option<String> {
        let node = self.interpreter.active_node()?;
        Some(self.interpreter.ast().kind(node).type_name().to_string())
    }

    fn stack_depth(&self) -> usize {
        self.interpreter.stack_depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::RuntimeError;

    fn session(source: &str) -> Session {
        Session::create(source, &Map::new(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_statement_units() {
        let mut s = session("var a = 1;\nvar b = 2;\nvar c = 3;");
        assert!(s.step().unwrap());
        assert!(s.step().unwrap());
        assert!(!s.step().unwrap());
    }

    #[test]
    fn test_branch_decision_is_a_unit() {
        let mut s = session("var a = 1;\nif (a > 0) {\n  a = 2;\n}\nvar done = a;");
        s.step().unwrap();
        s.step().unwrap();
        assert_eq!(s.node_type().as_deref(), Some("IfStatement"));
        s.step().unwrap();
        assert_eq!(s.node_type().as_deref(), Some("BlockStatement"));
    }

    #[test]
    fn test_highlight_covers_statement() {
        let source = "var a = 1;\nvar b = 2;";
        let mut s = session(source);
        s.step().unwrap();
        let span = s.highlight();
        let text: String = source.chars().skip(span.start).take(span.len()).collect();
        assert_eq!(text, "var a = 1;");
    }

    #[test]
    fn test_parse_failure_is_code_error() {
        let err = Session::create("var = ;", &Map::new(), &EngineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::Code(_)));
    }

    #[test]
    fn test_runtime_error_surfaces() {
        let mut s = session("var a = 1;\nnope();");
        assert!(s.step().unwrap());
        let err = s.step().unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Runtime(RuntimeError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn test_step_budget() {
        let config = EngineConfig {
            max_micro_steps: 50,
            ..EngineConfig::default()
        };
        let mut s = Session::create(
            "function f(n) { return n > 0 ? f(n - 1) + 1 : 0; }\nvar r = f(100);",
            &Map::new(),
            &config,
        )
        .unwrap();
        assert_eq!(s.step(), Err(ExecutionError::StepBudget { limit: 50 }));
    }

    #[test]
    fn test_node_granularity_takes_more_steps() {
        let config = EngineConfig {
            granularity: Granularity::Node,
            ..EngineConfig::default()
        };
        let mut s = Session::create("var a = 1 + 2;", &Map::new(), &config).unwrap();
        let mut steps = 1;
        while s.step().unwrap() {
            steps += 1;
        }
        assert!(steps > 3);
        assert!(s.is_done());
    }

    #[test]
    fn test_run_to_completion() {
        let mut s = session(
            "var total = 0;\nfor (let i = 1; i <= 4; i++) { total += i; }\nconsole.log(total);",
        );
        s.run().unwrap();
        assert!(s.is_done());
        assert_eq!(s.console_output(), vec!["10"]);
        assert_eq!(s.console_lines(), 1);
    }
}
