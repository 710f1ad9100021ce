//! Lexical scopes
//!
//! This module provides the environment records of running programs:
//! - [`Scopes`]: arena of every scope created during a run
//! - [`Scope`]: one environment with its bindings in declaration order
//! - [`Binding`]: a variable slot; `let`/`const` slots start uninitialized
//! - [`ScopeLookup`]: own-binding read access used by snapshot extraction
//!
//! # Declaration kinds
//!
//! `var` and function declarations bind in the nearest function (or global)
//! scope; `let`/`const` bind in the innermost block scope. Reading a
//! `let`/`const` binding before its declaration runs is a reference error.

use super::value::Value;
use rustc_hash::FxHashMap;

/// Index of a scope in the [`Scopes`] arena
pub type ScopeId = usize;

/// Where a scope was introduced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

/// A variable slot
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// `None` until a `let`/`const` declaration has executed
    pub value: Option<Value>,
    pub mutable: bool,
}

impl Binding {
    pub fn initialized(value: Value, mutable: bool) -> Self {
        Binding {
            value: Some(value),
            mutable,
        }
    }

    pub fn uninitialized(mutable: bool) -> Self {
        Binding {
            value: None,
            mutable,
        }
    }
}

/// One environment record
#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    vars: FxHashMap<String, Binding>,
    order: Vec<String>, // Track order of declarations
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.vars.get(name)
    }

    /// Names declared in this scope, in declaration order
    pub fn names(&self) -> &[String] {
        &self.order
    }
}

/// Errors raised by binding operations, converted to runtime errors by the interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    NotDefined,
    Uninitialized,
    Immutable,
}

/// Arena of scopes
#[derive(Debug, Clone)]
pub struct Scopes {
    scopes: Vec<Scope>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    /// Create the arena with the global scope at id 0
    pub fn new() -> Self {
        Scopes {
            scopes: vec![Scope {
                parent: None,
                kind: ScopeKind::Global,
                vars: FxHashMap::default(),
                order: Vec::new(),
            }],
        }
    }

    pub const GLOBAL: ScopeId = 0;

    pub fn push(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(parent),
            kind,
            vars: FxHashMap::default(),
            order: Vec::new(),
        });
        self.scopes.len() - 1
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id)
    }

    /// Nearest enclosing scope that hosts `var` declarations
    pub fn function_scope(&self, mut id: ScopeId) -> ScopeId {
        while let Some(scope) = self.scopes.get(id) {
            match (scope.kind, scope.parent) {
                (ScopeKind::Block, Some(parent)) => id = parent,
                _ => break,
            }
        }
        id
    }

    /// Create or replace a binding in exactly this scope
    pub fn declare(&mut self, id: ScopeId, name: &str, binding: Binding) {
        if let Some(scope) = self.scopes.get_mut(id) {
            if scope.vars.insert(name.to_string(), binding).is_none() {
                scope.order.push(name.to_string());
            }
        }
    }

    /// Declare a `var` unless it already exists in this scope
    pub fn declare_var(&mut self, id: ScopeId, name: &str) {
        let exists = self
            .scopes
            .get(id)
            .is_some_and(|scope| scope.vars.contains_key(name));
        if !exists {
            self.declare(id, name, Binding::initialized(Value::Undefined, true));
        }
    }

    /// Initialize a binding created earlier (hoisting or temporal dead zone)
    pub fn initialize(&mut self, id: ScopeId, name: &str, value: Value) {
        match self.scopes.get_mut(id).and_then(|s| s.vars.get_mut(name)) {
            Some(binding) => binding.value = Some(value),
            None => self.declare(id, name, Binding::initialized(value, true)),
        }
    }

    /// Scope that defines `name`, searching outward from `id`
    pub fn resolve(&self, mut id: ScopeId, name: &str) -> Option<ScopeId> {
        loop {
            let scope = self.scopes.get(id)?;
            if scope.vars.contains_key(name) {
                return Some(id);
            }
            id = scope.parent?;
        }
    }

    /// Read a variable visible from `id`
    pub fn lookup(&self, id: ScopeId, name: &str) -> Result<Value, ScopeError> {
        let owner = self.resolve(id, name).ok_or(ScopeError::NotDefined)?;
        self.scopes[owner]
            .vars
            .get(name)
            .and_then(|b| b.value.clone())
            .ok_or(ScopeError::Uninitialized)
    }

    /// Write a variable visible from `id`
    pub fn assign(&mut self, id: ScopeId, name: &str, value: Value) -> Result<(), ScopeError> {
        let owner = self.resolve(id, name).ok_or(ScopeError::NotDefined)?;
        let binding = self.scopes[owner]
            .vars
            .get_mut(name)
            .ok_or(ScopeError::NotDefined)?;
        if binding.value.is_none() {
            return Err(ScopeError::Uninitialized);
        }
        if !binding.mutable {
            return Err(ScopeError::Immutable);
        }
        binding.value = Some(value);
        Ok(())
    }

    /// Read-only view of one scope
    pub fn handle(&self, id: ScopeId) -> ScopeHandle<'_> {
        ScopeHandle { scopes: self, id }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

/// Own-binding lookup on a single scope.
///
/// Implementations must not consult parent scopes: callers walk the scope
/// chain themselves so they can report which scope supplied a name.
pub trait ScopeLookup {
    /// Value of an initialized binding declared directly in this scope
    fn lookup(&self, name: &str) -> Option<Value>;
}

/// Borrowed view of one scope in a [`Scopes`] arena
#[derive(Debug, Clone, Copy)]
pub struct ScopeHandle<'a> {
    scopes: &'a Scopes,
    id: ScopeId,
}

impl ScopeHandle<'_> {
    pub fn id(&self) -> ScopeId {
        self.id
    }
}

impl ScopeLookup for ScopeHandle<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.scopes.get(self.id)?.get(name)?.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_shadowing() {
        let mut scopes = Scopes::new();
        scopes.declare(Scopes::GLOBAL, "x", Binding::initialized(Value::Number(1.0), true));
        let block = scopes.push(Scopes::GLOBAL, ScopeKind::Block);
        scopes.declare(block, "x", Binding::initialized(Value::Number(2.0), true));

        assert_eq!(scopes.lookup(block, "x"), Ok(Value::Number(2.0)));
        assert_eq!(scopes.lookup(Scopes::GLOBAL, "x"), Ok(Value::Number(1.0)));
    }

    #[test]
    fn test_var_hoists_past_blocks() {
        let mut scopes = Scopes::new();
        let func = scopes.push(Scopes::GLOBAL, ScopeKind::Function);
        let block = scopes.push(func, ScopeKind::Block);
        let inner = scopes.push(block, ScopeKind::Block);
        assert_eq!(scopes.function_scope(inner), func);
        assert_eq!(scopes.function_scope(Scopes::GLOBAL), Scopes::GLOBAL);
    }

    #[test]
    fn test_temporal_dead_zone_and_const() {
        let mut scopes = Scopes::new();
        scopes.declare(Scopes::GLOBAL, "k", Binding::uninitialized(false));
        assert_eq!(
            scopes.lookup(Scopes::GLOBAL, "k"),
            Err(ScopeError::Uninitialized)
        );
        assert!(scopes.handle(Scopes::GLOBAL).lookup("k").is_none());

        scopes.initialize(Scopes::GLOBAL, "k", Value::Number(3.0));
        assert_eq!(
            scopes.assign(Scopes::GLOBAL, "k", Value::Number(4.0)),
            Err(ScopeError::Immutable)
        );
        assert_eq!(
            scopes.handle(Scopes::GLOBAL).lookup("k"),
            Some(Value::Number(3.0))
        );
    }

    #[test]
    fn test_handle_is_own_binding_only() {
        let mut scopes = Scopes::new();
        scopes.declare(Scopes::GLOBAL, "g", Binding::initialized(Value::Null, true));
        let func = scopes.push(Scopes::GLOBAL, ScopeKind::Function);
        assert!(scopes.handle(func).lookup("g").is_none());
        assert_eq!(scopes.lookup(func, "g"), Ok(Value::Null));
        assert_eq!(
            scopes.assign(func, "missing", Value::Null),
            Err(ScopeError::NotDefined)
        );
    }
}
