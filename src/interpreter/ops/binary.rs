//! Binary operator evaluation

use crate::interpreter::engine::Interpreter;
use crate::memory::value::Value;
use crate::parser::ast::BinOp;
use std::cmp::Ordering;

impl Interpreter {
    pub(crate) fn binary_op(&self, op: BinOp, left: &Value, right: &Value) -> Value {
        use BinOp::*;

        match op {
            Add => self.add_values(left, right),
            Sub => Value::Number(self.to_number_value(left) - self.to_number_value(right)),
            Mul => Value::Number(self.to_number_value(left) * self.to_number_value(right)),
            Div => Value::Number(self.to_number_value(left) / self.to_number_value(right)),
            // f64 `%` truncates like the script operator does
            Mod => Value::Number(self.to_number_value(left) % self.to_number_value(right)),
            Pow => {
                let base = self.to_number_value(left);
                let exponent = self.to_number_value(right);
                if exponent.is_nan() {
                    Value::Number(f64::NAN)
                } else {
                    Value::Number(base.powf(exponent))
                }
            }
            Eq => Value::Bool(self.loose_equals(left, right)),
            Ne => Value::Bool(!self.loose_equals(left, right)),
            StrictEq => Value::Bool(self.strict_equals(left, right)),
            StrictNe => Value::Bool(!self.strict_equals(left, right)),
            Lt | Le | Gt | Ge => Value::Bool(self.compare(op, left, right)),
        }
    }

    fn add_values(&self, left: &Value, right: &Value) -> Value {
        let left = self.to_primitive(left);
        let right = self.to_primitive(right);
        match (&left, &right) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                let mut text = self.to_display(&left);
                text.push_str(&self.to_display(&right));
                Value::String(text)
            }
            _ => Value::Number(left.to_number() + right.to_number()),
        }
    }

    /// `===`: same type and value, objects by identity
    pub(crate) fn strict_equals(&self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }

    /// `==`: `null` equals `undefined`, mixed primitives compare as numbers
    pub(crate) fn loose_equals(&self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Object(_), _) => self.loose_equals(&self.to_primitive(left), right),
            (_, Value::Object(_)) => self.loose_equals(left, &self.to_primitive(right)),
            (Value::String(a), Value::String(b)) => a == b,
            _ => left.to_number() == right.to_number(),
        }
    }

    fn compare(&self, op: BinOp, left: &Value, right: &Value) -> bool {
        let left = self.to_primitive(left);
        let right = self.to_primitive(right);

        let ordering = match (&left, &right) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => left.to_number().partial_cmp(&right.to_number()),
        };
        // NaN compares false both ways
        let Some(ordering) = ordering else {
            return false;
        };

        match op {
            BinOp::Lt => ordering == Ordering::Less,
            BinOp::Le => ordering != Ordering::Greater,
            BinOp::Gt => ordering == Ordering::Greater,
            BinOp::Ge => ordering != Ordering::Less,
            _ => false,
        }
    }

    /// Objects become their string form; primitives are returned as is
    pub(crate) fn to_primitive(&self, value: &Value) -> Value {
        match value {
            Value::Object(_) => Value::String(self.to_display(value)),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp() -> Interpreter {
        Interpreter::from_source("").unwrap()
    }

    #[test]
    fn test_string_concatenation() {
        let i = interp();
        let v = i.binary_op(BinOp::Add, &Value::from("n="), &Value::Number(3.0));
        assert_eq!(v, Value::from("n=3"));
        let v = i.binary_op(BinOp::Add, &Value::Number(1.0), &Value::Bool(true));
        assert_eq!(v, Value::Number(2.0));
    }

    #[test]
    fn test_equality_flavours() {
        let i = interp();
        assert!(i.loose_equals(&Value::Null, &Value::Undefined));
        assert!(!i.strict_equals(&Value::Null, &Value::Undefined));
        assert!(i.loose_equals(&Value::from("1"), &Value::Number(1.0)));
        assert!(!i.strict_equals(&Value::from("1"), &Value::Number(1.0)));
        assert!(!i.strict_equals(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
    }

    #[test]
    fn test_comparisons() {
        let i = interp();
        assert_eq!(
            i.binary_op(BinOp::Lt, &Value::from("apple"), &Value::from("banana")),
            Value::Bool(true)
        );
        assert_eq!(
            i.binary_op(BinOp::Ge, &Value::Number(f64::NAN), &Value::Number(1.0)),
            Value::Bool(false)
        );
        assert_eq!(
            i.binary_op(BinOp::Le, &Value::from("2"), &Value::Number(2.0)),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_arithmetic_edge_cases() {
        let i = interp();
        assert_eq!(
            i.binary_op(BinOp::Mod, &Value::Number(-7.0), &Value::Number(3.0)),
            Value::Number(-1.0)
        );
        assert_eq!(
            i.binary_op(BinOp::Pow, &Value::Number(2.0), &Value::Number(10.0)),
            Value::Number(1024.0)
        );
        let v = i.binary_op(BinOp::Pow, &Value::Number(1.0), &Value::Number(f64::NAN));
        assert!(v.as_number().is_some_and(f64::is_nan));
    }
}
