//! Memory model for the interpreter
//!
//! This module provides the core memory abstractions:
//! - [`value`]: Runtime value representation (primitives and object references)
//! - [`scope`]: Lexical scopes with `var`/`let`/`const` bindings
//! - [`heap`]: Arena of arrays, plain objects and functions
//!
//! Scopes and heap objects are arenas indexed by plain integers, so closures
//! can capture their defining scope without reference counting and snapshot
//! extraction can borrow any scope read-only.

pub mod heap;
pub mod scope;
pub mod value;
