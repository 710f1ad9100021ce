//! Checkpoint capture protocol
//!
//! Programs mark interesting moments with
//!
//! ```text
//! checkpoint({ description: "half way", values: [["mid", mid]] });
//! checkpoint({ left: { description: "..." }, right: { ... } }, "split");
//! ```
//!
//! A single record applies to every target (the empty key). An object whose
//! own properties are records maps target keys to records. The optional
//! second argument becomes the checkpoint id.
//!
//! Record fields are converted one at a time, so a value that cannot be
//! converted only affects its own field or `values` pair.

use crate::errors::{CheckpointShapeError, ConversionError};
use crate::interpreter::Interpreter;
use crate::memory::heap::HeapObject;
use crate::memory::value::{number_to_string, Value};
use crate::snapshot::extract::unconvertible;
use serde::Serialize;
use serde_json::Map;
use std::collections::BTreeMap;

const RECORD_FIELDS: [&str; 3] = ["description", "values", "expression"];

/// What one target shows for a checkpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckpointTarget {
    pub description: String,
    /// `[name, value]` pairs in call order
    pub values: Option<Vec<(String, serde_json::Value)>>,
    pub expression: Option<String>,
}

/// A captured `checkpoint(...)` call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckpointPayload {
    pub id: Option<String>,
    /// Target key to record; `""` applies to every target
    pub targets: BTreeMap<String, CheckpointTarget>,
}

impl CheckpointPayload {
    /// Record for `key`, falling back to the record for every target
    pub fn target(&self, key: &str) -> Option<&CheckpointTarget> {
        self.targets.get(key).or_else(|| self.targets.get(""))
    }
}

/// Build a payload from the arguments of a `checkpoint` call
pub fn parse_call(
    interp: &Interpreter,
    args: &[Value],
) -> Result<CheckpointPayload, CheckpointShapeError> {
    let first = args.first().cloned().unwrap_or_default();
    let Value::Object(object_id) = &first else {
        return Err(CheckpointShapeError::NotAnObject(
            interp.type_of(&first).to_string(),
        ));
    };
    let object = interp
        .heap()
        .get(*object_id)
        .ok_or(ConversionError::Dangling(*object_id))?;

    let arg = match plain(object) {
        Some(object) if has_record_fields(object) => native_record(interp, object),
        Some(object) => {
            let mut map = Map::new();
            for (key, value) in object.entries() {
                let inner = plain_object(interp, value).filter(|o| has_record_fields(o));
                if let Some(inner) = inner {
                    map.insert(key.to_string(), native_record(interp, inner));
                }
            }
            serde_json::Value::Object(map)
        }
        // Arrays and functions are rejected by shape below
        None => interp.to_native(&first)?,
    };
    let id = args.get(1).and_then(checkpoint_id);
    payload_from_json(&arg, id)
}

fn plain(object: &HeapObject) -> Option<&HeapObject> {
    (object.as_array().is_none() && !object.is_function()).then_some(object)
}

fn plain_object<'a>(interp: &'a Interpreter, value: &Value) -> Option<&'a HeapObject> {
    match value {
        Value::Object(id) => interp.heap().get(*id).and_then(plain),
        _ => None,
    }
}

fn has_record_fields(object: &HeapObject) -> bool {
    object.keys().iter().any(|key| RECORD_FIELDS.contains(&key.as_str()))
}

/// Convert the record fields of `object` one by one
fn native_record(interp: &Interpreter, object: &HeapObject) -> serde_json::Value {
    let mut map = Map::new();
    for (key, value) in object.entries() {
        let converted = match key {
            "values" => native_values(interp, value),
            "description" | "expression" => convert_or_placeholder(interp, value),
            _ => continue,
        };
        map.insert(key.to_string(), converted);
    }
    serde_json::Value::Object(map)
}

/// Convert `values` pair by pair; an unconvertible value gets a placeholder
fn native_values(interp: &Interpreter, value: &Value) -> serde_json::Value {
    let elements = match value {
        Value::Object(id) => interp.heap().get(*id).and_then(|o| o.as_array()),
        _ => None,
    };
    let Some(elements) = elements else {
        return serde_json::Value::Null;
    };

    let mut pairs = Vec::with_capacity(elements.len());
    for element in elements {
        match interp.to_native(element) {
            Ok(converted) => pairs.push(converted),
            Err(_) => {
                if let Some(pair) = native_pair(interp, element) {
                    pairs.push(pair);
                }
            }
        }
    }
    serde_json::Value::Array(pairs)
}

fn native_pair(interp: &Interpreter, element: &Value) -> Option<serde_json::Value> {
    let Value::Object(id) = element else {
        return None;
    };
    match interp.heap().get(*id)?.as_array()?.as_slice() {
        [Value::String(name), value] => Some(serde_json::Value::Array(vec![
            serde_json::Value::String(name.clone()),
            convert_or_placeholder(interp, value),
        ])),
        _ => None,
    }
}

fn convert_or_placeholder(interp: &Interpreter, value: &Value) -> serde_json::Value {
    interp.to_native(value).unwrap_or_else(|err| unconvertible(&err))
}

/// Build a payload from an already converted argument
pub fn payload_from_json(
    arg: &serde_json::Value,
    id: Option<String>,
) -> Result<CheckpointPayload, CheckpointShapeError> {
    let map = match arg {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Array(_) => {
            return Err(CheckpointShapeError::NotAnObject("array".to_string()))
        }
        other => return Err(CheckpointShapeError::NotAnObject(json_type(other).to_string())),
    };

    let mut targets = BTreeMap::new();
    if is_record(map) {
        targets.insert(String::new(), record(map));
    } else {
        for (key, value) in map {
            if let serde_json::Value::Object(inner) = value {
                if is_record(inner) {
                    targets.insert(key.clone(), record(inner));
                }
            }
        }
    }

    if targets.is_empty() {
        return Err(CheckpointShapeError::NoTargets);
    }
    Ok(CheckpointPayload { id, targets })
}

fn is_record(map: &Map<String, serde_json::Value>) -> bool {
    RECORD_FIELDS.iter().any(|field| map.contains_key(*field))
}

fn record(map: &Map<String, serde_json::Value>) -> CheckpointTarget {
    let description = match map.get("description") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    // Malformed pairs are dropped one by one
    let values = match map.get("values") {
        Some(serde_json::Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|item| match item.as_array()?.as_slice() {
                    [serde_json::Value::String(name), value] => {
                        Some((name.clone(), value.clone()))
                    }
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    };

    let expression = map
        .get("expression")
        .and_then(|e| e.as_str())
        .map(str::to_string);

    CheckpointTarget {
        description,
        values,
        expression,
    }
}

fn checkpoint_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_to_string(*n)),
        _ => None,
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_record_targets_everything() {
        let payload =
            payload_from_json(&json!({ "description": "half", "values": [["m", 5]] }), None)
                .unwrap();
        let target = payload.target("anything").unwrap();
        assert_eq!(target.description, "half");
        assert_eq!(target.values, Some(vec![("m".to_string(), json!(5))]));
        assert_eq!(target.expression, None);
        assert!(payload.targets.contains_key(""));
    }

    #[test]
    fn test_target_map() {
        let payload = payload_from_json(
            &json!({
                "left": { "description": "l" },
                "right": { "expression": "a + b" },
                "ignored": 3
            }),
            Some("split".to_string()),
        )
        .unwrap();
        assert_eq!(payload.id.as_deref(), Some("split"));
        assert_eq!(payload.targets.len(), 2);
        assert_eq!(payload.targets["right"].expression.as_deref(), Some("a + b"));
        assert!(payload.target("middle").is_none());
    }

    #[test]
    fn test_malformed_pairs_are_dropped() {
        let payload = payload_from_json(
            &json!({ "values": [["ok", 1], ["short"], [2, 3], "flat", ["x", [1, 2]]] }),
            None,
        )
        .unwrap();
        assert_eq!(
            payload.targets[""].values,
            Some(vec![
                ("ok".to_string(), json!(1)),
                ("x".to_string(), json!([1, 2]))
            ])
        );
    }

    #[test]
    fn test_rejected_shapes() {
        assert_eq!(
            payload_from_json(&json!("text"), None),
            Err(CheckpointShapeError::NotAnObject("string".to_string()))
        );
        assert_eq!(
            payload_from_json(&json!({ "a": 1 }), None),
            Err(CheckpointShapeError::NoTargets)
        );
    }

    #[test]
    fn test_parse_call_converts_arguments() {
        let mut interp = Interpreter::from_source("").unwrap();
        let arg = interp.from_native(&json!({ "description": "d" }));
        let payload = parse_call(&interp, &[arg, Value::Number(3.0)]).unwrap();
        assert_eq!(payload.id.as_deref(), Some("3"));
        assert_eq!(payload.targets[""].description, "d");

        let err = parse_call(&interp, &[Value::Number(1.0)]).unwrap_err();
        assert_eq!(err, CheckpointShapeError::NotAnObject("number".to_string()));
    }

    #[test]
    fn test_circular_value_only_spoils_its_pair() {
        let mut interp = Interpreter::from_source("").unwrap();
        let looped = interp.alloc(HeapObject::plain());
        let Value::Object(looped_id) = looped.clone() else {
            panic!("expected an object");
        };
        interp
            .heap
            .get_mut(looped_id)
            .unwrap()
            .set("self", looped.clone());

        let bad = interp.alloc(HeapObject::array(vec![Value::String("o".to_string()), looped]));
        let good = interp.alloc(HeapObject::array(vec![
            Value::String("k".to_string()),
            Value::Number(1.0),
        ]));
        let values = interp.alloc(HeapObject::array(vec![bad, good]));
        let mut record = HeapObject::plain();
        record.set("description", Value::String("d".to_string()));
        record.set("values", values);
        let arg = interp.alloc(record);

        let payload = parse_call(&interp, &[arg]).unwrap();
        let target = payload.target("").unwrap();
        assert_eq!(target.description, "d");
        assert_eq!(
            target.values,
            Some(vec![
                ("o".to_string(), json!("[Unconvertible: circular reference]")),
                ("k".to_string(), json!(1)),
            ])
        );
    }

    #[test]
    fn test_target_map_converts_each_record() {
        let mut interp = Interpreter::from_source("").unwrap();
        let arg = interp.from_native(&json!({
            "left": { "description": "l", "values": [["n", 2]] },
            "note": "skipped",
            "right": { "expression": "a" }
        }));
        let payload = parse_call(&interp, &[arg]).unwrap();
        assert_eq!(payload.targets.len(), 2);
        assert_eq!(
            payload.targets["left"].values,
            Some(vec![("n".to_string(), json!(2))])
        );
        assert_eq!(payload.targets["right"].expression.as_deref(), Some("a"));
    }
}
