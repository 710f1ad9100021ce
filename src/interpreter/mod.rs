//! Steppable script interpreter
//!
//! This module provides the execution logic:
//! - [`engine`]: frame-stack machine, one micro-step per [`Interpreter::step`]
//! - [`errors`]: Runtime error types
//! - [`builtins`]: natively implemented functions (`Math`, `JSON`, `console`, ...)
//! - [`convert`]: conversion to and from `serde_json` values
//!
//! # Execution Model
//!
//! The interpreter never recurses over the AST. Every node being evaluated
//! has a frame on an explicit stack, so execution can stop between any two
//! micro-steps and the scopes, heap and console output can be inspected.
//! Stepping drivers group micro-steps into syntactic units using the
//! [`MicroStep::boundary`] flag.

pub mod builtins;
pub mod convert;
pub mod engine;
pub mod errors;
mod expressions;
mod ops;
mod statements;

pub use engine::{HostFn, Interpreter, MicroStep, DEFAULT_MAX_CALL_DEPTH};
pub use errors::RuntimeError;
