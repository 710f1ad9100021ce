//! Conversion between interpreter values and the outside world
//!
//! - [`Interpreter::to_native`]: snapshot form (`serde_json::Value`), used by
//!   the variable extractor and the checkpoint bridge
//! - [`Interpreter::to_json`]: the `JSON.stringify` flavour of the same walk
//! - [`Interpreter::from_native`]: build interpreter values from JSON
//! - [`Interpreter::to_display`]: string conversion (`String(v)`, `+`)
//! - [`Interpreter::inspect`]: `console.log` rendering

use crate::errors::ConversionError;
use crate::interpreter::engine::Interpreter;
use crate::memory::heap::{Callable, HeapObject, ObjectId, ObjectKind};
use crate::memory::value::{number_to_string, Value};
use serde_json::{Map, Number};

/// Nesting limit for native conversion
pub const MAX_CONVERSION_DEPTH: usize = 64;

/// Integers beyond this magnitude lose precision as `f64`
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Nesting beyond which `console.log` abbreviates
const INSPECT_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    /// Every value is representable; functions and non-finite numbers become strings
    Snapshot,
    /// `JSON.stringify` rules: functions and `undefined` are skipped
    Json,
}

impl Interpreter {
    /// Convert a value for snapshots and checkpoints
    pub fn to_native(&self, value: &Value) -> Result<serde_json::Value, ConversionError> {
        let mut path = Vec::new();
        self.native(value, Flavor::Snapshot, &mut path)
            .map(|v| v.unwrap_or(serde_json::Value::Null))
    }

    /// Convert a value the way `JSON.stringify` sees it; `None` when nothing is produced
    pub(crate) fn to_json(
        &self,
        value: &Value,
    ) -> Result<Option<serde_json::Value>, ConversionError> {
        let mut path = Vec::new();
        self.native(value, Flavor::Json, &mut path)
    }

    fn native(
        &self,
        value: &Value,
        flavor: Flavor,
        path: &mut Vec<ObjectId>,
    ) -> Result<Option<serde_json::Value>, ConversionError> {
        Ok(Some(match value {
            Value::Undefined => match flavor {
                Flavor::Snapshot => serde_json::Value::Null,
                Flavor::Json => return Ok(None),
            },
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Number(n) => number_to_native(*n, flavor),
            Value::Object(id) => {
                let object = self.heap.get(*id).ok_or(ConversionError::Dangling(*id))?;

                if let ObjectKind::Function(callable) = &object.kind {
                    return Ok(match flavor {
                        Flavor::Snapshot => {
                            Some(serde_json::Value::String(function_label(callable)))
                        }
                        Flavor::Json => None,
                    });
                }
                if path.contains(id) {
                    return Err(ConversionError::Cycle);
                }
                if path.len() >= MAX_CONVERSION_DEPTH {
                    return Err(ConversionError::TooDeep(MAX_CONVERSION_DEPTH));
                }

                path.push(*id);
                let converted = self.native_object(object, flavor, path);
                path.pop();
                converted?
            }
        }))
    }

    fn native_object(
        &self,
        object: &HeapObject,
        flavor: Flavor,
        path: &mut Vec<ObjectId>,
    ) -> Result<serde_json::Value, ConversionError> {
        if let Some(elements) = object.as_array() {
            let mut items = Vec::with_capacity(elements.len());
            for element in elements {
                // Skipped values stay as null so indices line up
                items.push(
                    self.native(element, flavor, path)?
                        .unwrap_or(serde_json::Value::Null),
                );
            }
            return Ok(serde_json::Value::Array(items));
        }

        let mut map = Map::new();
        for (key, value) in object.entries() {
            if let Some(converted) = self.native(value, flavor, path)? {
                map.insert(key.to_string(), converted);
            }
        }
        Ok(serde_json::Value::Object(map))
    }

    /// Build an interpreter value from JSON, allocating arrays and objects
    pub fn from_native(&mut self, json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                let elements = items.iter().map(|item| self.from_native(item)).collect();
                self.alloc(HeapObject::array(elements))
            }
            serde_json::Value::Object(map) => {
                let mut object = HeapObject::plain();
                for (key, value) in map {
                    let value = self.from_native(value);
                    object.set(key, value);
                }
                self.alloc(object)
            }
        }
    }

    /// String conversion
    pub fn to_display(&self, value: &Value) -> String {
        let mut seen = Vec::new();
        self.display_inner(value, &mut seen)
    }

    fn display_inner(&self, value: &Value, seen: &mut Vec<ObjectId>) -> String {
        match value {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Object(id) => {
                let Some(object) = self.heap.get(*id) else {
                    return String::new();
                };
                match &object.kind {
                    ObjectKind::Array(elements) => {
                        // Cyclic arrays join as empty
                        if seen.contains(id) {
                            return String::new();
                        }
                        seen.push(*id);
                        let joined = elements
                            .iter()
                            .map(|v| {
                                if v.is_nullish() {
                                    String::new()
                                } else {
                                    self.display_inner(v, seen)
                                }
                            })
                            .collect::<Vec<_>>()
                            .join(",");
                        seen.pop();
                        joined
                    }
                    ObjectKind::Function(Callable::Closure { name, .. }) => {
                        format!("function {name}() {{ ... }}")
                    }
                    ObjectKind::Function(callable) => {
                        format!("function {}() {{ [native code] }}", callable.name())
                    }
                    ObjectKind::Plain => "[object Object]".to_string(),
                }
            }
        }
    }

    /// `console.log` rendering of a single value
    pub fn inspect(&self, value: &Value) -> String {
        let mut path = Vec::new();
        self.inspect_inner(value, 0, &mut path)
    }

    fn inspect_inner(&self, value: &Value, depth: usize, path: &mut Vec<ObjectId>) -> String {
        match value {
            Value::String(s) if depth > 0 => format!("'{s}'"),
            Value::Object(id) => {
                let Some(object) = self.heap.get(*id) else {
                    return "[Dangling]".to_string();
                };
                if let ObjectKind::Function(callable) = &object.kind {
                    return match callable.name() {
                        "" => "[Function (anonymous)]".to_string(),
                        name => format!("[Function: {name}]"),
                    };
                }
                if path.contains(id) {
                    return "[Circular]".to_string();
                }
                let is_array = object.as_array().is_some();
                if depth > INSPECT_DEPTH {
                    return if is_array { "[Array]" } else { "[Object]" }.to_string();
                }

                path.push(*id);
                let mut parts: Vec<String> = Vec::new();
                if let Some(elements) = object.as_array() {
                    parts.extend(elements.iter().map(|v| self.inspect_inner(v, depth + 1, path)));
                }
                parts.extend(object.entries().map(|(key, v)| {
                    format!("{}: {}", inspect_key(key), self.inspect_inner(v, depth + 1, path))
                }));
                path.pop();

                match (is_array, parts.is_empty()) {
                    (true, true) => "[]".to_string(),
                    (true, false) => format!("[ {} ]", parts.join(", ")),
                    (false, true) => "{}".to_string(),
                    (false, false) => format!("{{ {} }}", parts.join(", ")),
                }
            }
            other => self.display_inner(other, &mut Vec::new()),
        }
    }

    /// Message for an uncaught `throw`
    pub(crate) fn describe_thrown(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Object(id) => {
                let message = self
                    .heap
                    .get(*id)
                    .and_then(|o| o.get("message"))
                    .filter(|m| !m.is_undefined());
                match message {
                    Some(message) => self.to_display(message),
                    None => self.inspect(value),
                }
            }
            other => self.to_display(other),
        }
    }
}

fn number_to_native(n: f64, flavor: Flavor) -> serde_json::Value {
    if n.is_finite() {
        if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
            return serde_json::Value::Number(Number::from(n as i64));
        }
        return Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number);
    }
    match flavor {
        Flavor::Json => serde_json::Value::Null,
        Flavor::Snapshot => serde_json::Value::String(number_to_string(n)),
    }
}

fn function_label(callable: &Callable) -> String {
    match callable.name() {
        "" => "[Function anonymous]".to_string(),
        name => format!("[Function {name}]"),
    }
}

/// Object keys print bare when they are identifiers
fn inspect_key(key: &str) -> String {
    let mut chars = key.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if identifier {
        key.to_string()
    } else {
        format!("'{key}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::scope::Scopes;
    use serde_json::json;

    fn run(source: &str) -> Interpreter {
        let mut interp = Interpreter::from_source(source).unwrap();
        while !interp.step().unwrap().finished {}
        interp
    }

    fn native_of(interp: &Interpreter, name: &str) -> Result<serde_json::Value, ConversionError> {
        let value = interp.scopes().lookup(Scopes::GLOBAL, name).unwrap();
        interp.to_native(&value)
    }

    #[test]
    fn test_numbers_to_native() {
        let interp = Interpreter::from_source("").unwrap();
        assert_eq!(interp.to_native(&Value::Number(3.0)).unwrap(), json!(3));
        assert_eq!(interp.to_native(&Value::Number(0.5)).unwrap(), json!(0.5));
        assert_eq!(interp.to_native(&Value::Number(f64::NAN)).unwrap(), json!("NaN"));
        assert_eq!(
            interp.to_native(&Value::Number(f64::NEG_INFINITY)).unwrap(),
            json!("-Infinity")
        );
        assert_eq!(interp.to_native(&Value::Number(1e300)).unwrap(), json!(1e300));
    }

    #[test]
    fn test_nested_structures_keep_order() {
        let interp = run("var o = { z: 1, a: [true, null, undefined], f: function named() {} };");
        assert_eq!(
            native_of(&interp, "o").unwrap(),
            json!({ "z": 1, "a": [true, null, null], "f": "[Function named]" })
        );
    }

    #[test]
    fn test_cycles_are_errors() {
        let interp = run("var a = [];\na.push(a);");
        assert_eq!(native_of(&interp, "a"), Err(ConversionError::Cycle));
    }

    #[test]
    fn test_shared_references_are_not_cycles() {
        let interp = run("var inner = [1];\nvar outer = [inner, inner];");
        assert_eq!(native_of(&interp, "outer").unwrap(), json!([[1], [1]]));
    }

    #[test]
    fn test_depth_limit() {
        let interp = run(
            "var deep = [];\n\
             var cur = deep;\n\
             for (var i = 0; i < 70; i++) { var next = []; cur.push(next); cur = next; }",
        );
        assert_eq!(
            native_of(&interp, "deep"),
            Err(ConversionError::TooDeep(MAX_CONVERSION_DEPTH))
        );
    }

    #[test]
    fn test_json_flavour_skips_functions() {
        let interp = run("var o = { keep: 1, drop: function () {}, gone: undefined };");
        let value = interp.scopes().lookup(Scopes::GLOBAL, "o").unwrap();
        assert_eq!(interp.to_json(&value).unwrap(), Some(json!({ "keep": 1 })));
        assert_eq!(interp.to_json(&Value::Undefined).unwrap(), None);
    }

    #[test]
    fn test_from_native_builds_objects() {
        let mut interp = Interpreter::from_source("").unwrap();
        let value = interp.from_native(&json!({ "xs": [1, 2], "name": "n" }));
        assert_eq!(interp.to_native(&value).unwrap(), json!({ "xs": [1, 2], "name": "n" }));
    }

    #[test]
    fn test_display_and_inspect() {
        let interp = run("var a = [1, [2, 3], null];\nvar o = { 'two words': 'x', n: [] };");
        let a = interp.scopes().lookup(Scopes::GLOBAL, "a").unwrap();
        let o = interp.scopes().lookup(Scopes::GLOBAL, "o").unwrap();
        assert_eq!(interp.to_display(&a), "1,2,3,");
        assert_eq!(interp.inspect(&a), "[ 1, [ 2, 3 ], null ]");
        assert_eq!(interp.inspect(&o), "{ 'two words': 'x', n: [] }");
        assert_eq!(interp.to_display(&o), "[object Object]");
    }

    #[test]
    fn test_thrown_messages() {
        let interp = run("var e = { message: \"boom\" };");
        let e = interp.scopes().lookup(Scopes::GLOBAL, "e").unwrap();
        assert_eq!(interp.describe_thrown(&e), "boom");
        assert_eq!(interp.describe_thrown(&Value::Number(4.0)), "4");
    }
}
