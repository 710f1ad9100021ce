//! Execution engine
//!
//! The interpreter keeps an explicit stack of [`Frame`]s instead of recursing
//! over the AST. [`Interpreter::step`] performs one micro-step: it hands the
//! innermost frame to the handler for its node kind, and the handler answers
//! with a [`Flow`] telling the engine to push a child, deliver a value to the
//! parent, keep the frame, or unwind for `break`/`continue`/`return`.
//!
//! Because every piece of in-flight work lives on the frame stack, execution
//! can be paused between any two micro-steps and the full program state
//! (scopes, heap, console output) inspected.
//!
//! # Syntactic units
//!
//! Each micro-step reports whether it ended a syntactic unit:
//! - a leaf statement (expression statement, declaration, `;`) completed
//! - a `return` evaluated its argument and is about to unwind
//! - a control statement evaluated its test (`if`, loops, `switch` match)
//! - a `break`/`continue` unwound to its target
//! - the program finished
//!
//! Stepping drivers run micro-steps until one of these is reported.

use crate::interpreter::builtins::{self, Builtin};
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::{Callable, Heap, HeapObject, ObjectId};
use crate::memory::scope::{Binding, ScopeError, ScopeId, ScopeKind, Scopes};
use crate::memory::value::Value;
use crate::parser::ast::*;
use crate::parser::ParseError;
use crate::snapshot::MockTerminal;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Function installed by the embedding host.
///
/// Host functions receive the interpreter mutably so they can inspect and
/// convert their arguments; they must not drive execution.
pub type HostFn = Rc<dyn Fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>>;

/// Default bound on nested script calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Marks the frame that runs a function body
#[derive(Debug, Clone)]
pub(crate) struct CallInfo {
    pub name: String,
}

/// Activation record of one node being evaluated
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub node: NodeId,
    pub scope: ScopeId,
    /// Handler-defined progress marker
    pub phase: u8,
    /// Position in child lists (statements, arguments, cases)
    pub index: usize,
    /// Secondary position (statement within a case, member resolution)
    pub sub: usize,
    /// Intermediate results (operands, callee, receiver, arguments)
    pub values: Vec<Value>,
    /// Result delivered by the most recently completed child
    pub value: Option<Value>,
    pub call: Option<CallInfo>,
    /// Only set on the `Program` frame once all statements ran
    pub done: bool,
}

impl Frame {
    pub(crate) fn new(node: NodeId, scope: ScopeId) -> Self {
        Frame {
            node,
            scope,
            phase: 0,
            index: 0,
            sub: 0,
            values: Vec::new(),
            value: None,
            call: None,
            done: false,
        }
    }

    pub(crate) fn take_value(&mut self) -> Value {
        self.value.take().unwrap_or_default()
    }
}

/// Abrupt completion travelling down the frame stack
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Completion {
    Break,
    Continue,
    Return(Value),
}

/// Handler verdict for one micro-step
#[derive(Debug)]
pub(crate) enum Flow {
    /// Keep the frame and evaluate a child on top of it
    Push(Frame),
    /// Pop the frame and deliver its value to the parent
    Done(Value),
    /// Keep the frame as is
    Continue,
    /// Pop the frame and unwind to the completion's target
    Unwind(Completion),
}

/// Outcome of one micro-step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MicroStep {
    /// A syntactic unit ended with this micro-step
    pub boundary: bool,
    /// The program has run to completion
    pub finished: bool,
}

/// Steppable interpreter for one program
pub struct Interpreter {
    /// Parsed program, shared so handlers can borrow nodes while mutating state
    pub(crate) ast: Rc<Ast>,

    pub(crate) heap: Heap,

    pub(crate) scopes: Scopes,

    /// Innermost frame last
    pub(crate) frames: Vec<Frame>,

    /// Host functions by registration index
    host_functions: Vec<HostFn>,

    /// Lazily allocated function objects for built-in methods
    pub(crate) method_cache: FxHashMap<Builtin, ObjectId>,

    /// Captured `console.log` output
    pub(crate) terminal: MockTerminal,

    /// Most recent expression result
    last_value: Option<Value>,

    /// Node handled by the most recent micro-step
    acting_node: NodeId,

    /// Set by handlers that end a syntactic unit without completing
    boundary_hint: bool,

    call_depth: usize,

    max_call_depth: usize,

    /// xorshift state for `Math.random`
    pub(crate) rng_state: u64,
}

impl Interpreter {
    /// Create an interpreter positioned before the first statement
    pub fn new(ast: Ast, max_call_depth: usize) -> Self {
        let root = ast.root;
        let mut interpreter = Interpreter {
            ast: Rc::new(ast),
            heap: Heap::new(),
            scopes: Scopes::new(),
            frames: vec![Frame::new(root, Scopes::GLOBAL)],
            host_functions: Vec::new(),
            method_cache: FxHashMap::default(),
            terminal: MockTerminal::new(),
            last_value: None,
            acting_node: root,
            boundary_hint: false,
            call_depth: 0,
            max_call_depth,
            rng_state: 0x2545_F491_4F6C_DD1D,
        };
        builtins::install_globals(&mut interpreter);
        interpreter
    }

    /// Parse `source` and create an interpreter for it
    pub fn from_source(source: &str) -> Result<Self, ParseError> {
        let ast = crate::parser::parse(source)?;
        Ok(Self::new(ast, DEFAULT_MAX_CALL_DEPTH))
    }

    /// Perform one micro-step on the innermost frame
    pub fn step(&mut self) -> Result<MicroStep, RuntimeError> {
        let finished = MicroStep {
            boundary: false,
            finished: true,
        };
        let Some(mut frame) = self.frames.pop() else {
            return Ok(finished);
        };
        if frame.done {
            self.frames.push(frame);
            return Ok(finished);
        }

        self.boundary_hint = false;
        self.acting_node = frame.node;
        let ast = Rc::clone(&self.ast);

        let flow = match self.dispatch(&ast, &mut frame) {
            Ok(flow) => flow,
            Err(err) => {
                // Keep the faulting frame so the stack still shows where it happened
                self.frames.push(frame);
                return Err(err);
            }
        };

        let mut boundary = self.boundary_hint;
        match flow {
            Flow::Continue => self.frames.push(frame),
            Flow::Push(child) => {
                self.frames.push(frame);
                self.frames.push(child);
            }
            Flow::Done(value) => {
                let kind = ast.kind(frame.node);
                boundary |= kind.is_leaf_statement();
                if !kind.is_statement() {
                    self.last_value = Some(value.clone());
                }
                self.finish_frame(&frame);
                self.deliver(value);
            }
            Flow::Unwind(completion) => {
                boundary |= self.unwind(&ast, completion, frame)?;
            }
        }

        let finished = self.is_done();
        Ok(MicroStep {
            boundary: boundary || finished,
            finished,
        })
    }

    fn dispatch(&mut self, ast: &Ast, frame: &mut Frame) -> Result<Flow, RuntimeError> {
        if ast.kind(frame.node).is_statement() {
            self.step_statement(ast, frame)
        } else {
            self.step_expression(ast, frame)
        }
    }

    /// End the current syntactic unit without completing the frame
    pub(crate) fn signal_boundary(&mut self) {
        self.boundary_hint = true;
    }

    /// Hand a completed child's value to the frame below it
    fn deliver(&mut self, value: Value) {
        if let Some(parent) = self.frames.last_mut() {
            parent.value = Some(value);
        }
    }

    fn finish_frame(&mut self, frame: &Frame) {
        if frame.call.is_some() {
            self.call_depth = self.call_depth.saturating_sub(1);
        }
    }

    /// Unwind for `break`/`continue`/`return`. Returns whether a unit ended.
    fn unwind(
        &mut self,
        ast: &Ast,
        completion: Completion,
        origin: Frame,
    ) -> Result<bool, RuntimeError> {
        let location = ast.node(origin.node).location;

        // The nearest function boundary stops every search
        let target = self.frames.iter().rposition(|f| {
            f.call.is_some()
                || match completion {
                    Completion::Break => {
                        let kind = ast.kind(f.node);
                        kind.is_loop() || matches!(kind, NodeKind::Switch { .. })
                    }
                    Completion::Continue => ast.kind(f.node).is_loop(),
                    Completion::Return(_) => false,
                }
        });
        let valid = target.is_some_and(|i| match completion {
            Completion::Return(_) => self.frames[i].call.is_some(),
            _ => self.frames[i].call.is_none(),
        });
        let Some(target) = target.filter(|_| valid) else {
            self.frames.push(origin);
            return Err(match completion {
                Completion::Break => RuntimeError::IllegalJump {
                    keyword: "break",
                    location,
                },
                Completion::Continue => RuntimeError::IllegalJump {
                    keyword: "continue",
                    location,
                },
                Completion::Return(_) => RuntimeError::IllegalReturn { location },
            });
        };

        while self.frames.len() > target + 1 {
            if let Some(popped) = self.frames.pop() {
                self.finish_frame(&popped);
            }
        }

        match completion {
            Completion::Continue => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.value = None;
                    frame.phase = match ast.kind(frame.node) {
                        NodeKind::While { .. } => WHILE_TEST,
                        NodeKind::DoWhile { .. } => DO_WHILE_TEST,
                        _ => FOR_UPDATE,
                    };
                }
                Ok(true)
            }
            Completion::Break => {
                if let Some(frame) = self.frames.pop() {
                    self.finish_frame(&frame);
                }
                self.deliver(Value::Undefined);
                Ok(true)
            }
            Completion::Return(value) => {
                if let Some(frame) = self.frames.pop() {
                    self.finish_frame(&frame);
                }
                self.last_value = Some(value.clone());
                self.deliver(value);
                Ok(false)
            }
        }
    }

    // ===== Frames for calls =====

    /// Build the body frame for a call of a script function
    pub(crate) fn enter_closure(
        &mut self,
        ast: &Ast,
        node: NodeId,
        scope: ScopeId,
        name: &str,
        args: &[Value],
        location: SourceLocation,
    ) -> Result<Frame, RuntimeError> {
        if self.call_depth >= self.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.max_call_depth,
                location,
            });
        }
        let def = match ast.kind(node) {
            NodeKind::FunctionDeclaration(def) | NodeKind::Function(def) => def,
            other => {
                return Err(RuntimeError::type_error(
                    format!("{} is not callable", other.type_name()),
                    location,
                ))
            }
        };

        let function_scope = self.scopes.push(scope, ScopeKind::Function);
        for (i, param) in def.params.iter().enumerate() {
            let value = args.get(i).cloned().unwrap_or_default();
            self.scopes.initialize(function_scope, param, value);
        }

        self.call_depth += 1;
        let mut body = Frame::new(def.body, function_scope);
        body.call = Some(CallInfo {
            name: if name.is_empty() {
                "<anonymous>".to_string()
            } else {
                name.to_string()
            },
        });
        Ok(body)
    }

    /// Call a host function by registration index
    pub(crate) fn call_host(
        &mut self,
        index: usize,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let function = self
            .host_functions
            .get(index)
            .cloned()
            .ok_or_else(|| RuntimeError::Host {
                function: format!("host#{index}"),
                message: "unknown host function".to_string(),
            })?;
        function(self, args)
    }

    // ===== Hoisting =====

    /// Declare every `var` reachable from `statements` without entering nested functions
    pub(crate) fn hoist_vars(&mut self, ast: &Ast, statements: &[NodeId], scope: ScopeId) {
        let mut names = Vec::new();
        for &stmt in statements {
            collect_var_names(ast, stmt, &mut names);
        }
        for name in names {
            self.scopes.declare_var(scope, &name);
        }
    }

    /// Bind `let`/`const` (uninitialized) and function declarations of one block level
    pub(crate) fn hoist_lexical(&mut self, ast: &Ast, statements: &[NodeId], scope: ScopeId) {
        for &stmt in statements {
            match ast.kind(stmt) {
                NodeKind::VariableDeclaration { kind, declarations } if *kind != DeclKind::Var => {
                    for decl in declarations {
                        self.scopes.declare(
                            scope,
                            &decl.name,
                            Binding::uninitialized(*kind == DeclKind::Let),
                        );
                    }
                }
                NodeKind::FunctionDeclaration(def) => {
                    let name = def.name.clone().unwrap_or_default();
                    let closure = self.make_closure(stmt, scope, &name);
                    self.scopes.initialize(scope, &name, closure);
                }
                _ => {}
            }
        }
    }

    pub(crate) fn make_closure(&mut self, node: NodeId, scope: ScopeId, name: &str) -> Value {
        let id = self.heap.alloc(HeapObject::function(Callable::Closure {
            node,
            scope,
            name: name.to_string(),
        }));
        Value::Object(id)
    }

    // ===== Variables =====

    pub(crate) fn read_variable(
        &self,
        scope: ScopeId,
        name: &str,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        self.scopes
            .lookup(scope, name)
            .map_err(|err| scope_error(err, name, location))
    }

    pub(crate) fn write_variable(
        &mut self,
        scope: ScopeId,
        name: &str,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        self.scopes
            .assign(scope, name, value)
            .map_err(|err| scope_error(err, name, location))
    }

    // ===== Host interface =====

    /// Bind a global variable before execution starts
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.scopes.initialize(Scopes::GLOBAL, name, value);
    }

    /// Install a host function as a global
    pub fn define_host_function(&mut self, name: &str, function: HostFn) -> ObjectId {
        self.host_functions.push(function);
        let id = self.heap.alloc(HeapObject::function(Callable::Host {
            index: self.host_functions.len() - 1,
            name: name.to_string(),
        }));
        self.define_global(name, Value::Object(id));
        id
    }

    /// Allocate a heap object
    pub fn alloc(&mut self, object: HeapObject) -> Value {
        Value::Object(self.heap.alloc(object))
    }

    /// Freeze an object and everything reachable from it
    pub fn deep_freeze(&mut self, value: &Value) {
        let mut pending = vec![value.clone()];
        while let Some(Value::Object(id)) = pending.pop() {
            let Some(object) = self.heap.get_mut(id) else {
                continue;
            };
            if object.frozen {
                continue;
            }
            object.frozen = true;
            pending.extend(object.entries().map(|(_, v)| v.clone()));
            if let Some(elements) = object.as_array() {
                pending.extend(elements.iter().cloned());
            }
        }
    }

    // ===== Inspection =====

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    pub fn terminal(&self) -> &MockTerminal {
        &self.terminal
    }

    /// Result of the most recently evaluated expression
    pub fn current_value(&self) -> Option<&Value> {
        self.last_value.as_ref()
    }

    /// Node of the innermost frame
    pub fn active_node(&self) -> Option<NodeId> {
        self.frames.last().map(|f| f.node)
    }

    /// Node handled by the most recent micro-step
    pub fn acting_node(&self) -> NodeId {
        self.acting_node
    }

    pub fn stack_depth(&self) -> usize {
        self.frames.len()
    }

    /// Scopes of all live frames, innermost first, without repeats
    pub fn frame_scopes(&self) -> Vec<ScopeId> {
        let mut scopes: Vec<ScopeId> = Vec::new();
        for frame in self.frames.iter().rev() {
            if !scopes.contains(&frame.scope) {
                scopes.push(frame.scope);
            }
        }
        if !scopes.contains(&Scopes::GLOBAL) {
            scopes.push(Scopes::GLOBAL);
        }
        scopes
    }

    /// Active function calls, outermost first and innermost last
    pub fn stack_trace(&self) -> Vec<String> {
        let mut trace = vec!["<program>".to_string()];
        trace.extend(
            self.frames
                .iter()
                .filter_map(|f| f.call.as_ref().map(|c| c.name.clone())),
        );
        trace
    }

    /// The program ran to completion
    pub fn is_done(&self) -> bool {
        self.frames.last().map_or(true, |f| f.done)
    }

    /// Whether any code remains to be run.
    ///
    /// False once every live frame only has to hand back values it already
    /// holds: the remaining micro-steps then neither evaluate expressions nor
    /// start statements, so no further state change is observable.
    pub fn has_pending_work(&self) -> bool {
        !self.frames.iter().all(|f| self.is_finishing(f))
    }

    fn is_finishing(&self, frame: &Frame) -> bool {
        if frame.done {
            return true;
        }
        match self.ast.kind(frame.node) {
            NodeKind::Program { body } | NodeKind::Block { body } => frame.index >= body.len(),
            NodeKind::ExpressionStatement { .. } => frame.phase > 0,
            NodeKind::Return { .. } => frame.phase >= RETURN_UNWIND,
            NodeKind::If { .. } => frame.phase >= IF_BRANCH_DONE,
            NodeKind::Call { .. } => frame.phase == CALL_AWAIT,
            _ => false,
        }
    }
}

// Handler phases referenced outside their handlers
pub(crate) const WHILE_TEST: u8 = 0;
pub(crate) const DO_WHILE_TEST: u8 = 1;
pub(crate) const FOR_UPDATE: u8 = 4;
pub(crate) const RETURN_UNWIND: u8 = 2;
pub(crate) const IF_BRANCH_DONE: u8 = 3;
pub(crate) const CALL_AWAIT: u8 = 3;

fn scope_error(err: ScopeError, name: &str, location: SourceLocation) -> RuntimeError {
    match err {
        ScopeError::NotDefined => RuntimeError::UndefinedVariable {
            name: name.to_string(),
            location,
        },
        ScopeError::Uninitialized => RuntimeError::UninitializedBinding {
            name: name.to_string(),
            location,
        },
        ScopeError::Immutable => RuntimeError::ConstAssignment {
            name: name.to_string(),
            location,
        },
    }
}

/// `var` names declared by a statement, not descending into functions
fn collect_var_names(ast: &Ast, id: NodeId, out: &mut Vec<String>) {
    match ast.kind(id) {
        NodeKind::VariableDeclaration {
            kind: DeclKind::Var,
            declarations,
        } => out.extend(declarations.iter().map(|d| d.name.clone())),
        NodeKind::Block { body } => {
            for &stmt in body {
                collect_var_names(ast, stmt, out);
            }
        }
        NodeKind::If {
            consequent,
            alternate,
            ..
        } => {
            collect_var_names(ast, *consequent, out);
            if let Some(alt) = alternate {
                collect_var_names(ast, *alt, out);
            }
        }
        NodeKind::While { body, .. } | NodeKind::DoWhile { body, .. } => {
            collect_var_names(ast, *body, out)
        }
        NodeKind::For { init, body, .. } => {
            if let Some(init) = init {
                collect_var_names(ast, *init, out);
            }
            collect_var_names(ast, *body, out);
        }
        NodeKind::Switch { cases, .. } => {
            for case in cases {
                for &stmt in &case.consequent {
                    collect_var_names(ast, stmt, out);
                }
            }
        }
        _ => {}
    }
}
