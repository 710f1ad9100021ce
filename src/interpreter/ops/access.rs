//! Property access on objects, arrays and primitives

use crate::interpreter::builtins::Builtin;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::{Callable, HeapObject};
use crate::memory::value::{number_to_string, Value};
use crate::parser::ast::SourceLocation;
use std::fmt;

/// Largest index an assignment may write past the end of an array
const MAX_ARRAY_GAP: usize = 1 << 20;

/// Normalized property key
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PropertyKey {
    Index(usize),
    Name(String),
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Index(i) => write!(f, "{i}"),
            PropertyKey::Name(name) => write!(f, "{name}"),
        }
    }
}

/// What a read from an array or string resolved to, before touching the method cache
enum Lookup {
    Found(Value),
    Method(Builtin),
}

impl Interpreter {
    pub(crate) fn property_key(&self, key: &Value) -> PropertyKey {
        match key {
            Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n < u32::MAX as f64 => {
                PropertyKey::Index(*n as usize)
            }
            Value::String(s) => match s.parse::<usize>() {
                // "01" is a name, "1" is an index
                Ok(i) if number_to_string(i as f64) == *s => PropertyKey::Index(i),
                _ => PropertyKey::Name(s.clone()),
            },
            other => PropertyKey::Name(self.to_display(other)),
        }
    }

    pub(crate) fn get_property(
        &mut self,
        object: &Value,
        key: &Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let key = self.property_key(key);

        let lookup = match object {
            Value::Undefined | Value::Null => {
                return Err(RuntimeError::type_error(
                    format!(
                        "Cannot read properties of {} (reading '{}')",
                        self.to_display(object),
                        key
                    ),
                    location,
                ))
            }
            Value::Bool(_) => Lookup::Found(Value::Undefined),
            Value::Number(_) => match &key {
                PropertyKey::Name(name) => match Builtin::number_method(name) {
                    Some(method) => Lookup::Method(method),
                    None => Lookup::Found(Value::Undefined),
                },
                PropertyKey::Index(_) => Lookup::Found(Value::Undefined),
            },
            Value::String(s) => match &key {
                PropertyKey::Index(i) => Lookup::Found(
                    s.chars()
                        .nth(*i)
                        .map(|c| Value::String(c.to_string()))
                        .unwrap_or_default(),
                ),
                PropertyKey::Name(name) if name == "length" => {
                    Lookup::Found(Value::Number(s.chars().count() as f64))
                }
                PropertyKey::Name(name) => match Builtin::string_method(name) {
                    Some(method) => Lookup::Method(method),
                    None => Lookup::Found(Value::Undefined),
                },
            },
            Value::Object(id) => {
                let Some(target) = self.heap.get(*id) else {
                    return Ok(Value::Undefined);
                };
                match (target.as_array(), &key) {
                    (Some(elements), PropertyKey::Index(i)) => {
                        Lookup::Found(elements.get(*i).cloned().unwrap_or_default())
                    }
                    (Some(elements), PropertyKey::Name(name)) if name == "length" => {
                        Lookup::Found(Value::Number(elements.len() as f64))
                    }
                    (Some(_), PropertyKey::Name(name)) if target.get(name).is_none() => {
                        match Builtin::array_method(name) {
                            Some(method) => Lookup::Method(method),
                            None => Lookup::Found(Value::Undefined),
                        }
                    }
                    _ => Lookup::Found(
                        target.get(&key.to_string()).cloned().unwrap_or_default(),
                    ),
                }
            }
        };

        Ok(match lookup {
            Lookup::Found(value) => value,
            Lookup::Method(method) => self.method_object(method),
        })
    }

    pub(crate) fn set_property(
        &mut self,
        object: &Value,
        key: &Value,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let key = self.property_key(key);

        let id = match object {
            Value::Undefined | Value::Null => {
                return Err(RuntimeError::type_error(
                    format!(
                        "Cannot set properties of {} (setting '{}')",
                        self.to_display(object),
                        key
                    ),
                    location,
                ))
            }
            Value::Object(id) => *id,
            // Writes to primitives are silently ignored
            _ => return Ok(()),
        };

        let length = match &key {
            PropertyKey::Name(name) if name == "length" => Some(self.to_number_value(&value)),
            _ => None,
        };

        let Some(target) = self.heap.get_mut(id) else {
            return Ok(());
        };
        if target.frozen {
            return Err(RuntimeError::ReadOnlyProperty {
                property: key.to_string(),
                location,
            });
        }

        if let Some(elements) = target.as_array_mut() {
            match (&key, length) {
                (PropertyKey::Index(i), _) => {
                    if *i > elements.len() + MAX_ARRAY_GAP {
                        return Err(RuntimeError::InvalidArgument {
                            function: "RangeError".to_string(),
                            message: format!("Array index {i} is too far past the end"),
                            location,
                        });
                    }
                    if *i >= elements.len() {
                        elements.resize(*i + 1, Value::Undefined);
                    }
                    elements[*i] = value;
                    return Ok(());
                }
                (_, Some(length)) => {
                    if length.fract() != 0.0 || length < 0.0 || length > u32::MAX as f64 {
                        return Err(RuntimeError::InvalidArgument {
                            function: "RangeError".to_string(),
                            message: "Invalid array length".to_string(),
                            location,
                        });
                    }
                    elements.resize(length as usize, Value::Undefined);
                    return Ok(());
                }
                _ => {}
            }
        }

        target.set(&key.to_string(), value);
        Ok(())
    }

    /// Shared function object for a built-in method
    pub(crate) fn method_object(&mut self, method: Builtin) -> Value {
        if let Some(&id) = self.method_cache.get(&method) {
            return Value::Object(id);
        }
        let id = self
            .heap
            .alloc(HeapObject::function(Callable::Native(method)));
        self.method_cache.insert(method, id);
        Value::Object(id)
    }
}
