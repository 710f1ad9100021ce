pub mod access;
pub mod binary;
pub mod unary;

// Operators and property access are `impl Interpreter` blocks; only the
// property key type is shared with other modules.
