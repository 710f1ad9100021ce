//! Heap implementation for the interpreter
//!
//! Arrays, plain objects and functions are allocated into an arena and
//! referenced by [`ObjectId`]. Objects are never freed: a session lives only
//! as long as one stepping run, and dropping the session drops the arena.
//!
//! Property order is insertion order, which is also the order used when
//! objects are converted to JSON or listed with `Object.keys`.

use super::scope::ScopeId;
use super::value::Value;
use crate::interpreter::builtins::Builtin;
use crate::parser::ast::NodeId;
use rustc_hash::FxHashMap;

/// Index of an object in the [`Heap`]
pub type ObjectId = usize;

/// Something that can be called
#[derive(Debug, Clone, PartialEq)]
pub enum Callable {
    /// Script function: the `Function`/`FunctionDeclaration` node and its defining scope
    Closure {
        node: NodeId,
        scope: ScopeId,
        name: String,
    },
    /// Built-in implemented by the interpreter
    Native(Builtin),
    /// Function installed by the embedding host, by registration index
    Host { index: usize, name: String },
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Closure { name, .. } | Callable::Host { name, .. } => name,
            Callable::Native(builtin) => builtin.name(),
        }
    }
}

/// Payload distinguishing the kinds of heap objects
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Plain,
    Array(Vec<Value>),
    Function(Callable),
}

/// A heap object: kind-specific payload plus named properties
#[derive(Debug, Clone)]
pub struct HeapObject {
    pub kind: ObjectKind,
    properties: FxHashMap<String, Value>,
    keys: Vec<String>,
    /// Frozen objects reject every property write
    pub frozen: bool,
}

impl HeapObject {
    pub fn new(kind: ObjectKind) -> Self {
        HeapObject {
            kind,
            properties: FxHashMap::default(),
            keys: Vec::new(),
            frozen: false,
        }
    }

    pub fn plain() -> Self {
        Self::new(ObjectKind::Plain)
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Self::new(ObjectKind::Array(elements))
    }

    pub fn function(callable: Callable) -> Self {
        Self::new(ObjectKind::Function(callable))
    }

    /// Own named property
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Insert or overwrite a named property. Returns `false` if the object is frozen.
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        if self.frozen {
            return false;
        }
        match self.properties.get_mut(key) {
            Some(slot) => *slot = value,
            None => {
                self.keys.push(key.to_string());
                self.properties.insert(key.to_string(), value);
            }
        }
        true
    }

    /// Named property keys in insertion order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Named properties in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keys
            .iter()
            .filter_map(|k| self.properties.get(k).map(|v| (k.as_str(), v)))
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match &self.kind {
            ObjectKind::Array(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.kind {
            ObjectKind::Array(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match &self.kind {
            ObjectKind::Function(callable) => Some(callable),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }
}

/// Arena of heap objects
#[derive(Debug, Clone, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    pub fn alloc(&mut self, object: HeapObject) -> ObjectId {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn get(&self, id: ObjectId) -> Option<&HeapObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut HeapObject> {
        self.objects.get_mut(id)
    }

    /// Number of allocated objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
