//! Expression evaluation implementation
//!
//! This module handles evaluation of all expression types, including:
//!
//! - Literals (numbers, strings, booleans, `null`, arrays, objects)
//! - Variables and identifiers
//! - Binary, logical and conditional operators
//! - Unary operators and `++`/`--`
//! - Member access and assignment
//! - Function calls (script closures, built-ins and host functions)
//!
//! Like statements, every expression is a state machine over [`Frame::phase`]:
//! operands are pushed as child frames and their values collected in
//! [`Frame::values`] before the operator is applied.

use crate::interpreter::engine::{Flow, Frame, Interpreter, CALL_AWAIT};
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::{Callable, HeapObject};
use crate::memory::value::Value;
use crate::parser::ast::*;

impl Interpreter {
    pub(crate) fn step_expression(
        &mut self,
        ast: &Ast,
        frame: &mut Frame,
    ) -> Result<Flow, RuntimeError> {
        let node = ast.node(frame.node);
        let location = node.location;

        match &node.kind {
            NodeKind::Number(n) => Ok(Flow::Done(Value::Number(*n))),

            NodeKind::Str(s) => Ok(Flow::Done(Value::String(s.clone()))),

            NodeKind::Bool(b) => Ok(Flow::Done(Value::Bool(*b))),

            NodeKind::Null => Ok(Flow::Done(Value::Null)),

            NodeKind::Identifier(name) => Ok(Flow::Done(self.read_variable(
                frame.scope,
                name,
                location,
            )?)),

            NodeKind::Array { elements } => {
                if let Some(value) = frame.value.take() {
                    frame.values.push(value);
                }
                if let Some(&element) = elements.get(frame.index) {
                    frame.index += 1;
                    return Ok(Flow::Push(Frame::new(element, frame.scope)));
                }
                let items = std::mem::take(&mut frame.values);
                Ok(Flow::Done(self.alloc(HeapObject::array(items))))
            }

            NodeKind::Object { properties } => {
                if let Some(value) = frame.value.take() {
                    frame.values.push(value);
                }
                if let Some(prop) = properties.get(frame.index) {
                    frame.index += 1;
                    return Ok(Flow::Push(Frame::new(prop.value, frame.scope)));
                }
                let mut object = HeapObject::plain();
                for (prop, value) in properties.iter().zip(frame.values.drain(..)) {
                    object.set(&prop.key, value);
                }
                Ok(Flow::Done(self.alloc(object)))
            }

            NodeKind::Function(def) => {
                let name = def.name.as_deref().unwrap_or("");
                Ok(Flow::Done(self.make_closure(frame.node, frame.scope, name)))
            }

            NodeKind::Unary { op, argument } => {
                if frame.phase == 0 {
                    // `typeof undeclared` is not an error
                    if *op == UnOp::Typeof {
                        if let NodeKind::Identifier(name) = ast.kind(*argument) {
                            if self.scopes.resolve(frame.scope, name).is_none() {
                                return Ok(Flow::Done(Value::from("undefined")));
                            }
                        }
                    }
                    frame.phase = 1;
                    return Ok(Flow::Push(Frame::new(*argument, frame.scope)));
                }
                let value = frame.take_value();
                Ok(Flow::Done(self.unary_op(*op, &value)))
            }

            NodeKind::Update {
                increment,
                prefix,
                argument,
            } => self.step_update(ast, frame, *increment, *prefix, *argument, location),

            NodeKind::Binary { op, left, right } => match frame.phase {
                0 => {
                    frame.phase = 1;
                    Ok(Flow::Push(Frame::new(*left, frame.scope)))
                }
                1 => {
                    let lhs = frame.take_value();
                    frame.values.push(lhs);
                    frame.phase = 2;
                    Ok(Flow::Push(Frame::new(*right, frame.scope)))
                }
                _ => {
                    let rhs = frame.take_value();
                    let lhs = frame.values.pop().unwrap_or_default();
                    Ok(Flow::Done(self.binary_op(*op, &lhs, &rhs)))
                }
            },

            NodeKind::Logical { op, left, right } => match frame.phase {
                0 => {
                    frame.phase = 1;
                    Ok(Flow::Push(Frame::new(*left, frame.scope)))
                }
                1 => {
                    let lhs = frame.take_value();
                    let short_circuit = match op {
                        LogicalOp::And => !lhs.is_truthy(),
                        LogicalOp::Or => lhs.is_truthy(),
                    };
                    if short_circuit {
                        return Ok(Flow::Done(lhs));
                    }
                    frame.phase = 2;
                    Ok(Flow::Push(Frame::new(*right, frame.scope)))
                }
                _ => Ok(Flow::Done(frame.take_value())),
            },

            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => match frame.phase {
                0 => {
                    frame.phase = 1;
                    Ok(Flow::Push(Frame::new(*test, frame.scope)))
                }
                1 => {
                    let branch = if frame.take_value().is_truthy() {
                        *consequent
                    } else {
                        *alternate
                    };
                    frame.phase = 2;
                    Ok(Flow::Push(Frame::new(branch, frame.scope)))
                }
                _ => Ok(Flow::Done(frame.take_value())),
            },

            NodeKind::Assign { op, target, value } => {
                self.step_assign(ast, frame, *op, *target, *value, location)
            }

            NodeKind::Member { object, property } => {
                if let Some(flow) = resolve_member(frame, *object, property) {
                    return Ok(flow);
                }
                let (object, key) = member_parts(frame);
                Ok(Flow::Done(self.get_property(&object, &key, location)?))
            }

            NodeKind::Call { callee, arguments } => {
                self.step_call(ast, frame, *callee, arguments, location)
            }

            other => Err(RuntimeError::type_error(
                format!("{} is not an expression", other.type_name()),
                location,
            )),
        }
    }

    fn step_assign(
        &mut self,
        ast: &Ast,
        frame: &mut Frame,
        op: AssignOp,
        target: NodeId,
        value: NodeId,
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        match ast.kind(target) {
            NodeKind::Identifier(name) => {
                if frame.phase == 0 {
                    if let AssignOp::Compound(_) = op {
                        let current = self.read_variable(frame.scope, name, location)?;
                        frame.values.push(current);
                    }
                    frame.phase = 1;
                    return Ok(Flow::Push(Frame::new(value, frame.scope)));
                }
                let mut result = frame.take_value();
                if let AssignOp::Compound(bin) = op {
                    let current = frame.values.pop().unwrap_or_default();
                    result = self.binary_op(bin, &current, &result);
                }
                self.write_variable(frame.scope, name, result.clone(), location)?;
                Ok(Flow::Done(result))
            }

            NodeKind::Member { object, property } => {
                if frame.phase == 0 {
                    if let Some(flow) = resolve_member(frame, *object, property) {
                        return Ok(flow);
                    }
                    if let AssignOp::Compound(_) = op {
                        let (object, key) = member_parts(frame);
                        let current = self.get_property(&object, &key, location)?;
                        frame.values.push(current);
                    }
                    frame.phase = 1;
                    return Ok(Flow::Push(Frame::new(value, frame.scope)));
                }
                let mut result = frame.take_value();
                if let AssignOp::Compound(bin) = op {
                    let current = frame.values.get(2).cloned().unwrap_or_default();
                    result = self.binary_op(bin, &current, &result);
                }
                let (object, key) = member_parts(frame);
                self.set_property(&object, &key, result.clone(), location)?;
                Ok(Flow::Done(result))
            }

            _ => Err(RuntimeError::type_error(
                "Invalid left-hand side in assignment",
                location,
            )),
        }
    }

    fn step_call(
        &mut self,
        ast: &Ast,
        frame: &mut Frame,
        callee: NodeId,
        arguments: &[NodeId],
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        if frame.phase == 0 {
            match ast.kind(callee) {
                // Method call: keep the object as receiver
                NodeKind::Member { object, property } => {
                    if let Some(flow) = resolve_member(frame, *object, property) {
                        return Ok(flow);
                    }
                    let (receiver, key) = member_parts(frame);
                    let function = self.get_property(&receiver, &key, location)?;
                    frame.values = vec![function, receiver];
                }
                _ => {
                    if frame.sub == 0 {
                        frame.sub = 1;
                        return Ok(Flow::Push(Frame::new(callee, frame.scope)));
                    }
                    let function = frame.take_value();
                    frame.values = vec![function, Value::Undefined];
                }
            }
            frame.index = 0;
            frame.phase = 2;
        }

        if frame.phase == 2 {
            if let Some(arg) = frame.value.take() {
                frame.values.push(arg);
            }
            if let Some(&arg) = arguments.get(frame.index) {
                frame.index += 1;
                return Ok(Flow::Push(Frame::new(arg, frame.scope)));
            }
            let args = frame.values.split_off(2.min(frame.values.len()));
            let function = frame.values.first().cloned().unwrap_or_default();
            let receiver = frame.values.get(1).cloned().unwrap_or_default();
            return self.invoke(ast, frame, &function, &receiver, &args, callee, location);
        }

        // Function body finished
        Ok(Flow::Done(frame.take_value()))
    }

    #[allow(clippy::too_many_arguments)]
    fn invoke(
        &mut self,
        ast: &Ast,
        frame: &mut Frame,
        function: &Value,
        receiver: &Value,
        args: &[Value],
        callee: NodeId,
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        let callable = function
            .as_object()
            .and_then(|id| self.heap.get(id))
            .and_then(|object| object.as_callable())
            .cloned();

        match callable {
            Some(Callable::Closure { node, scope, name }) => {
                let body = self.enter_closure(ast, node, scope, &name, args, location)?;
                frame.phase = CALL_AWAIT;
                Ok(Flow::Push(body))
            }
            Some(Callable::Native(builtin)) => Ok(Flow::Done(
                self.call_builtin(builtin, receiver, args, location)?,
            )),
            Some(Callable::Host { index, .. }) => Ok(Flow::Done(self.call_host(index, args)?)),
            None => Err(RuntimeError::NotCallable {
                callee: describe_node(ast, callee),
                location,
            }),
        }
    }
}

/// Evaluate a member expression's object and key into `frame.values[0..2]`.
///
/// Returns the flow to hand back to the engine while a child is still
/// running, and `None` once both parts are available. Progress is kept in
/// [`Frame::sub`] so callers can use `phase` for their own bookkeeping.
pub(crate) fn resolve_member(
    frame: &mut Frame,
    object: NodeId,
    property: &MemberProperty,
) -> Option<Flow> {
    loop {
        match frame.sub {
            0 => {
                frame.sub = 1;
                return Some(Flow::Push(Frame::new(object, frame.scope)));
            }
            1 => {
                let target = frame.take_value();
                frame.values.push(target);
                match property {
                    MemberProperty::Computed(key) => {
                        frame.sub = 2;
                        return Some(Flow::Push(Frame::new(*key, frame.scope)));
                    }
                    MemberProperty::Named(name) => {
                        frame.values.push(Value::String(name.clone()));
                        frame.sub = 3;
                    }
                }
            }
            2 => {
                let key = frame.take_value();
                frame.values.push(key);
                frame.sub = 3;
            }
            _ => return None,
        }
    }
}

/// Object and key collected by [`resolve_member`]
pub(crate) fn member_parts(frame: &Frame) -> (Value, Value) {
    (
        frame.values.first().cloned().unwrap_or_default(),
        frame.values.get(1).cloned().unwrap_or_default(),
    )
}

/// Short source-like description of an expression for error messages
pub(crate) fn describe_node(ast: &Ast, id: NodeId) -> String {
    match ast.kind(id) {
        NodeKind::Identifier(name) => name.clone(),
        NodeKind::Member {
            object,
            property: MemberProperty::Named(name),
        } => format!("{}.{}", describe_node(ast, *object), name),
        NodeKind::Member { object, .. } => format!("{}[...]", describe_node(ast, *object)),
        NodeKind::Call { callee, .. } => format!("{}(...)", describe_node(ast, *callee)),
        NodeKind::Str(s) => format!("\"{s}\""),
        NodeKind::Number(n) => crate::memory::value::number_to_string(*n),
        other => other.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::RuntimeError;
    use crate::memory::scope::Scopes;
    use crate::memory::value::Value;

    fn eval_global(source: &str, name: &str) -> Value {
        let mut interp = Interpreter::from_source(source).unwrap();
        while !interp.step().unwrap().finished {}
        interp.scopes().lookup(Scopes::GLOBAL, name).unwrap()
    }

    fn run_err(source: &str) -> RuntimeError {
        let mut interp = Interpreter::from_source(source).unwrap();
        loop {
            match interp.step() {
                Ok(micro) if micro.finished => panic!("expected an error"),
                Ok(_) => {}
                Err(err) => return err,
            }
        }
    }

    #[test]
    fn test_short_circuit_skips_right_side() {
        let value = eval_global(
            "var hits = 0;\n\
             function hit() { hits++; return true; }\n\
             var r = false && hit();\n\
             r = true || hit();",
            "hits",
        );
        assert_eq!(value, Value::Number(0.0));
    }

    #[test]
    fn test_compound_member_assignment() {
        let value = eval_global("var o = { n: 2 };\no.n *= 5;\nvar r = o.n;", "r");
        assert_eq!(value, Value::Number(10.0));
    }

    #[test]
    fn test_closures_capture_scope() {
        let value = eval_global(
            "function counter() { let c = 0; return () => { c += 1; return c; }; }\n\
             const next = counter();\n\
             next();\n\
             var r = next();",
            "r",
        );
        assert_eq!(value, Value::Number(2.0));
    }

    #[test]
    fn test_typeof_undeclared() {
        assert_eq!(eval_global("var t = typeof nothing;", "t"), Value::from("undefined"));
    }

    #[test]
    fn test_calling_non_function() {
        let err = run_err("var o = {};\no.missing();");
        match err {
            RuntimeError::NotCallable { callee, .. } => assert_eq!(callee, "o.missing"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_reading_property_of_undefined() {
        let err = run_err("var u;\nvar x = u.field;");
        assert!(err.to_string().contains("Cannot read properties of undefined"));
    }
}
