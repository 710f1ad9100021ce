//! Runtime error types for the interpreter
//!
//! This module defines [`RuntimeError`], which represents all errors that can occur
//! during program execution (as opposed to parse errors or host-side errors).
//!
//! All runtime errors are fatal - the program has no `try`, so an error halts
//! execution and the interpreter keeps the faulting frame on its stack for
//! diagnostics.

use crate::parser::ast::SourceLocation;
use std::fmt;

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Reference to a name that is not declared anywhere in scope
    UndefinedVariable {
        name: String,
        location: SourceLocation,
    },

    /// Read or write of a `let`/`const` binding before its declaration ran
    UninitializedBinding {
        name: String,
        location: SourceLocation,
    },

    /// Assignment to a `const` binding
    ConstAssignment {
        name: String,
        location: SourceLocation,
    },

    /// Write to a property of a frozen object
    ReadOnlyProperty {
        property: String,
        location: SourceLocation,
    },

    /// Operation applied to a value of the wrong kind
    TypeError {
        message: String,
        location: SourceLocation,
    },

    /// Call of a value that is not a function
    NotCallable {
        callee: String,
        location: SourceLocation,
    },

    /// Invalid argument to a built-in (bad radix, malformed JSON, ...)
    InvalidArgument {
        function: String,
        message: String,
        location: SourceLocation,
    },

    /// `throw` reached the top of the stack
    Uncaught {
        message: String,
        location: SourceLocation,
    },

    /// `break`/`continue` with no enclosing loop or switch
    IllegalJump {
        keyword: &'static str,
        location: SourceLocation,
    },

    /// `return` outside a function body
    IllegalReturn { location: SourceLocation },

    /// Nested calls exceeded the configured depth
    CallDepthExceeded {
        limit: usize,
        location: SourceLocation,
    },

    /// Error raised by a host-installed function
    Host { function: String, message: String },
}

impl RuntimeError {
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            RuntimeError::UndefinedVariable { location, .. } => Some(location),
            RuntimeError::UninitializedBinding { location, .. } => Some(location),
            RuntimeError::ConstAssignment { location, .. } => Some(location),
            RuntimeError::ReadOnlyProperty { location, .. } => Some(location),
            RuntimeError::TypeError { location, .. } => Some(location),
            RuntimeError::NotCallable { location, .. } => Some(location),
            RuntimeError::InvalidArgument { location, .. } => Some(location),
            RuntimeError::Uncaught { location, .. } => Some(location),
            RuntimeError::IllegalJump { location, .. } => Some(location),
            RuntimeError::IllegalReturn { location } => Some(location),
            RuntimeError::CallDepthExceeded { location, .. } => Some(location),
            RuntimeError::Host { .. } => None,
        }
    }

    pub(crate) fn type_error(message: impl Into<String>, location: SourceLocation) -> Self {
        RuntimeError::TypeError {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UndefinedVariable { name, location } => {
                write!(f, "ReferenceError: {} is not defined at line {}", name, location.line)
            }
            RuntimeError::UninitializedBinding { name, location } => {
                write!(
                    f,
                    "ReferenceError: Cannot access '{}' before initialization at line {}",
                    name, location.line
                )
            }
            RuntimeError::ConstAssignment { name, location } => {
                write!(
                    f,
                    "TypeError: Assignment to constant variable '{}' at line {}",
                    name, location.line
                )
            }
            RuntimeError::ReadOnlyProperty { property, location } => {
                write!(
                    f,
                    "TypeError: Cannot assign to read only property '{}' at line {}",
                    property, location.line
                )
            }
            RuntimeError::TypeError { message, location } => {
                write!(f, "TypeError: {} at line {}", message, location.line)
            }
            RuntimeError::NotCallable { callee, location } => {
                write!(
                    f,
                    "TypeError: {} is not a function at line {}",
                    callee, location.line
                )
            }
            RuntimeError::InvalidArgument {
                function,
                message,
                location,
            } => {
                write!(f, "{}: {} at line {}", function, message, location.line)
            }
            RuntimeError::Uncaught { message, location } => {
                write!(f, "Uncaught {} at line {}", message, location.line)
            }
            RuntimeError::IllegalJump { keyword, location } => {
                write!(
                    f,
                    "SyntaxError: Illegal {} statement at line {}",
                    keyword, location.line
                )
            }
            RuntimeError::IllegalReturn { location } => {
                write!(f, "SyntaxError: Illegal return statement at line {}", location.line)
            }
            RuntimeError::CallDepthExceeded { limit, location } => {
                write!(
                    f,
                    "RangeError: Maximum call stack size ({}) exceeded at line {}",
                    limit, location.line
                )
            }
            RuntimeError::Host { function, message } => {
                write!(f, "{}: {}", function, message)
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_line() {
        let err = RuntimeError::UndefinedVariable {
            name: "total".to_string(),
            location: SourceLocation::new(3, 5, 20),
        };
        assert_eq!(err.to_string(), "ReferenceError: total is not defined at line 3");
        assert_eq!(err.location().map(|l| l.column), Some(5));
    }

    #[test]
    fn test_host_errors_have_no_location() {
        let err = RuntimeError::Host {
            function: "checkpoint".to_string(),
            message: "bad".to_string(),
        };
        assert!(err.location().is_none());
    }
}
