//! Variable snapshot extraction
//!
//! Builds the name→value view shown for one history entry. Only names the
//! program declares are looked up; each is resolved against the call stack
//! innermost scope first, so inner bindings shadow outer ones.

use crate::errors::{ConversionError, SnapshotError};
use crate::memory::scope::ScopeLookup;
use crate::memory::value::Value;
use serde::Serialize;
use serde_json::Map;
use tracing::debug;

/// Key of the single entry reported when extraction fails as a whole
pub const ERROR_KEY: &str = "[Error]";

/// What the extractor needs from a running program
pub trait ExecutionView {
    /// Scopes visible from the current position, innermost first
    fn frame_scopes(&self) -> Result<Vec<Box<dyn ScopeLookup + '_>>, SnapshotError>;

    fn to_native(&self, value: &Value) -> Result<serde_json::Value, ConversionError>;

    /// Result of the last completed expression
    fn current_value(&self) -> Option<Value>;

    /// Type of the innermost node being evaluated
    fn node_type(&self) -> Option<String>;

    fn stack_depth(&self) -> usize;
}

/// Name→value view of program state at one step
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Declared names that are bound, in declaration order
    pub values: Map<String, serde_json::Value>,
    pub current_value: Option<serde_json::Value>,
    pub node_type: Option<String>,
    pub stack_depth: usize,
    /// Every declared name, bound or not
    pub declared: Vec<String>,
}

impl Snapshot {
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    pub fn is_error(&self) -> bool {
        self.values.len() == 1 && self.values.contains_key(ERROR_KEY)
    }
}

/// Capture the values of `declared` names from `view`
pub fn extract(view: &dyn ExecutionView, declared: &[String]) -> Snapshot {
    let mut snapshot = Snapshot {
        values: Map::new(),
        current_value: view
            .current_value()
            .filter(|v| !v.is_undefined())
            .map(|v| convert_or_placeholder(view, &v)),
        node_type: view.node_type(),
        stack_depth: view.stack_depth(),
        declared: declared.to_vec(),
    };

    let scopes = match view.frame_scopes() {
        Ok(scopes) => scopes,
        Err(err) => {
            debug!(%err, "snapshot extraction failed");
            snapshot
                .values
                .insert(ERROR_KEY.to_string(), serde_json::Value::String(err.to_string()));
            return snapshot;
        }
    };

    for name in declared {
        if let Some(value) = scopes.iter().find_map(|scope| scope.lookup(name)) {
            let converted = convert_or_placeholder(view, &value);
            snapshot.values.insert(name.clone(), converted);
        }
    }
    snapshot
}

fn convert_or_placeholder(view: &dyn ExecutionView, value: &Value) -> serde_json::Value {
    view.to_native(value).unwrap_or_else(|err| unconvertible(&err))
}

/// Stand-in for a value that could not be converted
pub(crate) fn unconvertible(err: &ConversionError) -> serde_json::Value {
    serde_json::Value::String(format!("[Unconvertible: {err}]"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;
    use serde_json::json;

    struct MockScope(FxHashMap<String, Value>);

    impl ScopeLookup for MockScope {
        fn lookup(&self, name: &str) -> Option<Value> {
            self.0.get(name).cloned()
        }
    }

    struct MockView {
        scopes: Vec<Vec<(&'static str, Value)>>,
        broken: bool,
    }

    impl ExecutionView for MockView {
        fn frame_scopes(&self) -> Result<Vec<Box<dyn ScopeLookup + '_>>, SnapshotError> {
            if self.broken {
                return Err(SnapshotError::Unavailable("no frames".to_string()));
            }
            Ok(self
                .scopes
                .iter()
                .map(|vars| {
                    let map = vars
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.clone()))
                        .collect();
                    Box::new(MockScope(map)) as Box<dyn ScopeLookup>
                })
                .collect())
        }

        fn to_native(&self, value: &Value) -> Result<serde_json::Value, ConversionError> {
            match value {
                Value::Number(n) => Ok(json!(n)),
                Value::String(s) => Ok(json!(s)),
                Value::Object(_) => Err(ConversionError::Cycle),
                _ => Ok(serde_json::Value::Null),
            }
        }

        fn current_value(&self) -> Option<Value> {
            Some(Value::Number(7.0))
        }

        fn node_type(&self) -> Option<String> {
            Some("ExpressionStatement".to_string())
        }

        fn stack_depth(&self) -> usize {
            self.scopes.len()
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let view = MockView {
            scopes: vec![
                vec![("x", Value::Number(1.0))],
                vec![("x", Value::Number(2.0)), ("y", Value::from("outer"))],
            ],
            broken: false,
        };
        let snapshot = extract(&view, &names(&["x", "y", "missing"]));
        assert_eq!(snapshot.get("x"), Some(&json!(1.0)));
        assert_eq!(snapshot.get("y"), Some(&json!("outer")));
        assert!(snapshot.get("missing").is_none());
        assert_eq!(snapshot.declared.len(), 3);
        assert_eq!(snapshot.stack_depth, 2);
        assert_eq!(snapshot.current_value, Some(json!(7.0)));
        assert_eq!(snapshot.node_type.as_deref(), Some("ExpressionStatement"));
    }

    #[test]
    fn test_unconvertible_value_gets_placeholder() {
        let view = MockView {
            scopes: vec![vec![("o", Value::Object(0)), ("n", Value::Number(3.0))]],
            broken: false,
        };
        let snapshot = extract(&view, &names(&["o", "n"]));
        assert_eq!(
            snapshot.get("o"),
            Some(&json!("[Unconvertible: circular reference]"))
        );
        assert_eq!(snapshot.get("n"), Some(&json!(3.0)));
    }

    #[test]
    fn test_whole_failure_is_single_error_entry() {
        let view = MockView {
            scopes: Vec::new(),
            broken: true,
        };
        let snapshot = extract(&view, &names(&["x"]));
        assert!(snapshot.is_error());
        assert_eq!(snapshot.values.len(), 1);
    }

    #[test]
    fn test_order_follows_declarations() {
        let view = MockView {
            scopes: vec![vec![("b", Value::Number(2.0)), ("a", Value::Number(1.0))]],
            broken: false,
        };
        let snapshot = extract(&view, &names(&["a", "b"]));
        let keys: Vec<&String> = snapshot.values.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
