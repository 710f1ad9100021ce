//! Error types of the stepping engine
//!
//! Errors split by how far they reach:
//! - [`SessionError`]: no session could be built; fatal to that refresh
//! - [`ExecutionError`]: the run stopped; history up to that point is kept
//! - [`ConversionError`], [`SnapshotError`], [`CheckpointShapeError`]: recovered
//!   where they occur
//! - [`ConfigError`]: bad configuration file or values

use crate::interpreter::RuntimeError;
use crate::memory::heap::ObjectId;
use crate::parser::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Building a session failed
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    /// The wrapped source does not parse
    #[error("code error: {0}")]
    Code(#[from] ParseError),

    /// The host bridge could not be installed
    #[error("bridge error: {0}")]
    Bridge(String),
}

/// Executing the program failed
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    /// A single step ran more micro-steps than allowed
    #[error("step exceeded {limit} micro-steps without reaching a statement boundary")]
    StepBudget { limit: usize },

    /// History reached its configured size
    #[error("history limit of {limit} entries reached")]
    HistoryLimit { limit: usize },
}

/// Fatal error kept on the navigator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// An interpreter value could not be converted to JSON
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("circular reference")]
    Cycle,

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("dangling object reference #{0}")]
    Dangling(ObjectId),
}

/// The execution state could not be inspected at all
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("execution state unavailable: {0}")]
    Unavailable(String),
}

/// A `checkpoint(...)` call whose argument cannot be read as targets
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckpointShapeError {
    #[error("checkpoint expects an object, got {0}")]
    NotAnObject(String),

    #[error("checkpoint has no usable target")]
    NoTargets,

    #[error("checkpoint argument could not be converted: {0}")]
    Unconvertible(#[from] ConversionError),
}

/// Invalid configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file as TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
