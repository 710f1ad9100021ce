//! Statement execution implementation
//!
//! This module handles the execution of all statement types, including:
//!
//! - Variable declarations and initializations
//! - Control flow (if/else, while, for, do-while, switch/case)
//! - Returns, throws, blocks and the program itself
//! - Continue and break statements
//!
//! # Implementation
//!
//! Each statement kind is a small state machine over [`Frame::phase`]. A
//! handler runs until it needs a child evaluated (it returns [`Flow::Push`]
//! and resumes in the next phase once the child's value arrives in
//! [`Frame::value`]) or until it completes.
//!
//! # Control Flow
//!
//! - Loops and `if` pause right after evaluating their test so a stepping
//!   driver can show which branch was chosen
//! - `break`/`continue`/`return` unwind through [`Flow::Unwind`]
//! - Switch statements support fallthrough from the matched case

use crate::interpreter::engine::{
    Completion, Flow, Frame, Interpreter, FOR_UPDATE, IF_BRANCH_DONE, RETURN_UNWIND,
};
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::{Callable, ObjectKind};
use crate::memory::scope::{ScopeId, ScopeKind};
use crate::memory::value::Value;
use crate::parser::ast::*;

impl Interpreter {
    pub(crate) fn step_statement(
        &mut self,
        ast: &Ast,
        frame: &mut Frame,
    ) -> Result<Flow, RuntimeError> {
        let node = ast.node(frame.node);
        match &node.kind {
            NodeKind::Program { body } => {
                if frame.phase == 0 {
                    self.hoist_vars(ast, body, frame.scope);
                    self.hoist_lexical(ast, body, frame.scope);
                    frame.phase = 1;
                }
                if let Some(&stmt) = body.get(frame.index) {
                    frame.index += 1;
                    Ok(Flow::Push(Frame::new(stmt, frame.scope)))
                } else {
                    frame.done = true;
                    self.signal_boundary();
                    Ok(Flow::Continue)
                }
            }

            NodeKind::Block { body } => {
                if frame.phase == 0 {
                    if frame.call.is_some() {
                        // Function body: the call already created the function scope
                        self.hoist_vars(ast, body, frame.scope);
                    } else {
                        frame.scope = self.scopes.push(frame.scope, ScopeKind::Block);
                    }
                    self.hoist_lexical(ast, body, frame.scope);
                    frame.phase = 1;
                }
                match body.get(frame.index) {
                    Some(&stmt) => {
                        frame.index += 1;
                        Ok(Flow::Push(Frame::new(stmt, frame.scope)))
                    }
                    None => Ok(Flow::Done(Value::Undefined)),
                }
            }

            NodeKind::ExpressionStatement { expression } => {
                if frame.phase == 0 {
                    frame.phase = 1;
                    return Ok(Flow::Push(Frame::new(*expression, frame.scope)));
                }
                Ok(Flow::Done(frame.take_value()))
            }

            NodeKind::VariableDeclaration { kind, declarations } => {
                if frame.phase == 1 {
                    let value = frame.take_value();
                    if let Some(decl) = declarations.get(frame.index) {
                        self.bind_declarator(ast, *kind, decl, value, frame.scope);
                    }
                    frame.index += 1;
                    frame.phase = 0;
                }
                while let Some(decl) = declarations.get(frame.index) {
                    match decl.init {
                        Some(init) => {
                            frame.phase = 1;
                            return Ok(Flow::Push(Frame::new(init, frame.scope)));
                        }
                        None => {
                            // `var x;` keeps any earlier value; `let x;` starts as undefined
                            if *kind != DeclKind::Var {
                                self.scopes.initialize(frame.scope, &decl.name, Value::Undefined);
                            }
                            frame.index += 1;
                        }
                    }
                }
                Ok(Flow::Done(Value::Undefined))
            }

            // Bound while hoisting
            NodeKind::FunctionDeclaration(_) => Ok(Flow::Done(Value::Undefined)),

            NodeKind::Return { argument } => {
                if frame.phase == 0 {
                    frame.phase = 1;
                    if let Some(arg) = argument {
                        return Ok(Flow::Push(Frame::new(*arg, frame.scope)));
                    }
                }
                if frame.phase == 1 {
                    let value = frame.take_value();
                    frame.values.push(value);
                    frame.phase = RETURN_UNWIND;
                    self.signal_boundary();
                    return Ok(Flow::Continue);
                }
                let value = frame.values.pop().unwrap_or_default();
                Ok(Flow::Unwind(Completion::Return(value)))
            }

            NodeKind::If {
                test,
                consequent,
                alternate,
            } => match frame.phase {
                0 => {
                    frame.phase = 1;
                    Ok(Flow::Push(Frame::new(*test, frame.scope)))
                }
                1 => {
                    frame.index = usize::from(frame.take_value().is_truthy());
                    frame.phase = 2;
                    self.signal_boundary();
                    Ok(Flow::Continue)
                }
                2 => {
                    frame.phase = IF_BRANCH_DONE;
                    let branch = if frame.index == 1 {
                        Some(*consequent)
                    } else {
                        *alternate
                    };
                    match branch {
                        Some(branch) => Ok(Flow::Push(Frame::new(branch, frame.scope))),
                        None => Ok(Flow::Done(Value::Undefined)),
                    }
                }
                _ => Ok(Flow::Done(Value::Undefined)),
            },

            NodeKind::While { test, body } => loop {
                match frame.phase {
                    0 => {
                        frame.phase = 1;
                        return Ok(Flow::Push(Frame::new(*test, frame.scope)));
                    }
                    1 => {
                        frame.phase = if frame.take_value().is_truthy() { 2 } else { 4 };
                        self.signal_boundary();
                        return Ok(Flow::Continue);
                    }
                    2 => {
                        frame.phase = 3;
                        return Ok(Flow::Push(Frame::new(*body, frame.scope)));
                    }
                    // Body finished: evaluate the test again
                    3 => {
                        frame.value = None;
                        frame.phase = 0;
                    }
                    _ => return Ok(Flow::Done(Value::Undefined)),
                }
            },

            NodeKind::DoWhile { body, test } => match frame.phase {
                0 => {
                    frame.phase = 1;
                    Ok(Flow::Push(Frame::new(*body, frame.scope)))
                }
                1 => {
                    frame.value = None;
                    frame.phase = 2;
                    Ok(Flow::Push(Frame::new(*test, frame.scope)))
                }
                2 => {
                    frame.phase = if frame.take_value().is_truthy() { 0 } else { 3 };
                    self.signal_boundary();
                    Ok(Flow::Continue)
                }
                _ => Ok(Flow::Done(Value::Undefined)),
            },

            NodeKind::For {
                init,
                test,
                update,
                body,
            } => loop {
                match frame.phase {
                    0 => {
                        if let Some(init) = init {
                            if matches!(
                                ast.kind(*init),
                                NodeKind::VariableDeclaration { kind, .. } if *kind != DeclKind::Var
                            ) {
                                frame.scope = self.scopes.push(frame.scope, ScopeKind::Block);
                                self.hoist_lexical(ast, &[*init], frame.scope);
                            }
                            frame.phase = 1;
                            return Ok(Flow::Push(Frame::new(*init, frame.scope)));
                        }
                        frame.phase = 1;
                    }
                    1 => {
                        frame.value = None;
                        match test {
                            Some(test) => {
                                frame.phase = 2;
                                return Ok(Flow::Push(Frame::new(*test, frame.scope)));
                            }
                            None => frame.phase = 3,
                        }
                    }
                    2 => {
                        frame.phase = if frame.take_value().is_truthy() { 3 } else { 6 };
                        self.signal_boundary();
                        return Ok(Flow::Continue);
                    }
                    3 => {
                        frame.phase = FOR_UPDATE;
                        return Ok(Flow::Push(Frame::new(*body, frame.scope)));
                    }
                    FOR_UPDATE => {
                        frame.value = None;
                        match update {
                            Some(update) => {
                                frame.phase = 5;
                                return Ok(Flow::Push(Frame::new(*update, frame.scope)));
                            }
                            None => frame.phase = 1,
                        }
                    }
                    5 => frame.phase = 1,
                    _ => return Ok(Flow::Done(Value::Undefined)),
                }
            },

            NodeKind::Switch {
                discriminant,
                cases,
            } => self.step_switch(ast, frame, *discriminant, cases),

            NodeKind::Break => Ok(Flow::Unwind(Completion::Break)),

            NodeKind::Continue => Ok(Flow::Unwind(Completion::Continue)),

            NodeKind::Throw { argument } => {
                if frame.phase == 0 {
                    frame.phase = 1;
                    return Ok(Flow::Push(Frame::new(*argument, frame.scope)));
                }
                let thrown = frame.take_value();
                Err(RuntimeError::Uncaught {
                    message: self.describe_thrown(&thrown),
                    location: node.location,
                })
            }

            NodeKind::Empty => Ok(Flow::Done(Value::Undefined)),

            other => Err(RuntimeError::type_error(
                format!("{} is not a statement", other.type_name()),
                node.location,
            )),
        }
    }

    fn step_switch(
        &mut self,
        ast: &Ast,
        frame: &mut Frame,
        discriminant: NodeId,
        cases: &[SwitchCase],
    ) -> Result<Flow, RuntimeError> {
        loop {
            match frame.phase {
                0 => {
                    frame.phase = 1;
                    return Ok(Flow::Push(Frame::new(discriminant, frame.scope)));
                }
                1 => {
                    let value = frame.take_value();
                    frame.values.push(value);
                    frame.scope = self.scopes.push(frame.scope, ScopeKind::Block);
                    let statements: Vec<NodeId> = cases
                        .iter()
                        .flat_map(|c| c.consequent.iter().copied())
                        .collect();
                    self.hoist_lexical(ast, &statements, frame.scope);
                    frame.index = 0;
                    frame.phase = 2;
                }
                // Find the next case whose test is still to be compared
                2 => {
                    while let Some(case) = cases.get(frame.index) {
                        if let Some(test) = case.test {
                            frame.phase = 3;
                            return Ok(Flow::Push(Frame::new(test, frame.scope)));
                        }
                        frame.index += 1;
                    }
                    match cases.iter().position(|c| c.test.is_none()) {
                        Some(default) => {
                            frame.index = default;
                            frame.sub = 0;
                            frame.phase = 4;
                            self.signal_boundary();
                            return Ok(Flow::Continue);
                        }
                        None => return Ok(Flow::Done(Value::Undefined)),
                    }
                }
                3 => {
                    let candidate = frame.take_value();
                    let matched = frame
                        .values
                        .first()
                        .is_some_and(|d| self.strict_equals(d, &candidate));
                    if matched {
                        frame.sub = 0;
                        frame.phase = 4;
                        self.signal_boundary();
                        return Ok(Flow::Continue);
                    }
                    frame.index += 1;
                    frame.phase = 2;
                }
                // Run statements from the matched case on, falling through
                _ => {
                    frame.value = None;
                    while let Some(case) = cases.get(frame.index) {
                        if let Some(&stmt) = case.consequent.get(frame.sub) {
                            frame.sub += 1;
                            return Ok(Flow::Push(Frame::new(stmt, frame.scope)));
                        }
                        frame.index += 1;
                        frame.sub = 0;
                    }
                    return Ok(Flow::Done(Value::Undefined));
                }
            }
        }
    }

    fn bind_declarator(
        &mut self,
        ast: &Ast,
        kind: DeclKind,
        decl: &Declarator,
        value: Value,
        scope: ScopeId,
    ) {
        // Anonymous functions take the name of the variable they initialize
        if let (Some(init), Value::Object(id)) = (decl.init, &value) {
            if matches!(ast.kind(init), NodeKind::Function(def) if def.name.is_none()) {
                if let Some(object) = self.heap.get_mut(*id) {
                    if let ObjectKind::Function(Callable::Closure {
                        name, ..
                    }) = &mut object.kind
                    {
                        if name.is_empty() {
                            *name = decl.name.clone();
                        }
                    }
                }
            }
        }

        let target = match kind {
            DeclKind::Var => self.scopes.function_scope(scope),
            DeclKind::Let | DeclKind::Const => scope,
        };
        self.scopes.initialize(target, &decl.name, value);
    }
}
