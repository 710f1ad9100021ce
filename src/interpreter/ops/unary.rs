//! Unary operator evaluation

use crate::interpreter::engine::{Flow, Frame, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::expressions::{member_parts, resolve_member};
use crate::memory::heap::ObjectKind;
use crate::memory::value::Value;
use crate::parser::ast::*;

impl Interpreter {
    pub(crate) fn unary_op(&self, op: UnOp, operand: &Value) -> Value {
        match op {
            UnOp::Neg => Value::Number(-self.to_number_value(operand)),
            UnOp::Plus => Value::Number(self.to_number_value(operand)),
            UnOp::Not => Value::Bool(!operand.is_truthy()),
            UnOp::Typeof => Value::from(self.type_of(operand)),
        }
    }

    pub(crate) fn type_of(&self, value: &Value) -> &'static str {
        match value {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(id) => match self.heap.get(*id).map(|o| &o.kind) {
                Some(ObjectKind::Function(_)) => "function",
                _ => "object",
            },
        }
    }

    /// Numeric conversion including objects (`[5]` is 5, `{}` is NaN)
    pub(crate) fn to_number_value(&self, value: &Value) -> f64 {
        self.to_primitive(value).to_number()
    }

    /// `++`/`--` on a variable or property
    pub(crate) fn step_update(
        &mut self,
        ast: &Ast,
        frame: &mut Frame,
        increment: bool,
        prefix: bool,
        argument: NodeId,
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        let delta = if increment { 1.0 } else { -1.0 };

        match ast.kind(argument) {
            NodeKind::Identifier(name) => {
                let old = self.to_number_value(&self.read_variable(frame.scope, name, location)?);
                let new = old + delta;
                self.write_variable(frame.scope, name, Value::Number(new), location)?;
                Ok(Flow::Done(Value::Number(if prefix { new } else { old })))
            }

            NodeKind::Member { object, property } => {
                if let Some(flow) = resolve_member(frame, *object, property) {
                    return Ok(flow);
                }
                let (object, key) = member_parts(frame);
                let current = self.get_property(&object, &key, location)?;
                let old = self.to_number_value(&current);
                let new = old + delta;
                self.set_property(&object, &key, Value::Number(new), location)?;
                Ok(Flow::Done(Value::Number(if prefix { new } else { old })))
            }

            _ => Err(RuntimeError::type_error(
                "Invalid left-hand side expression in update operation",
                location,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::scope::Scopes;

    fn run(source: &str) -> Interpreter {
        let mut interp = Interpreter::from_source(source).unwrap();
        while !interp.step().unwrap().finished {}
        interp
    }

    #[test]
    fn test_typeof_values() {
        let interp = run(
            "var f = function () {};\nvar a = typeof f;\nvar b = typeof null;\nvar c = typeof [];",
        );
        let get = |n: &str| interp.scopes().lookup(Scopes::GLOBAL, n).unwrap();
        assert_eq!(get("a"), Value::from("function"));
        assert_eq!(get("b"), Value::from("object"));
        assert_eq!(get("c"), Value::from("object"));
    }

    #[test]
    fn test_prefix_and_postfix() {
        let interp = run("var i = 5;\nvar a = i++;\nvar b = ++i;\nvar arr = [1];\narr[0]--;");
        let get = |n: &str| interp.scopes().lookup(Scopes::GLOBAL, n).unwrap();
        assert_eq!(get("a"), Value::Number(5.0));
        assert_eq!(get("b"), Value::Number(7.0));
        assert_eq!(get("i"), Value::Number(7.0));
        let arr = get("arr").as_object().unwrap();
        assert_eq!(
            interp.heap().get(arr).unwrap().as_array().unwrap()[0],
            Value::Number(0.0)
        );
    }

    #[test]
    fn test_negation_of_string() {
        let interp = Interpreter::from_source("").unwrap();
        assert_eq!(interp.unary_op(UnOp::Neg, &Value::from("4")), Value::Number(-4.0));
        assert_eq!(interp.unary_op(UnOp::Not, &Value::from("")), Value::Bool(true));
    }
}
