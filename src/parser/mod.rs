//! Script source code parser
//!
//! This module transforms script source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parsing (tokens → AST), split over `statements` and `expressions`
//! - [`ast`]: Arena AST node definitions
//! - [`declared`]: Static collection of declared names
//!
//! # Supported Subset
//!
//! The parser supports a small JavaScript subset:
//! - Declarations: `var`, `let`, `const`, function declarations
//! - Statements: control flow (`if`, `while`, `do-while`, `for`, `switch`),
//!   `break`, `continue`, `return`, `throw`, blocks
//! - Expressions: arithmetic, comparison, logical, ternary, assignment,
//!   member access, calls, array/object literals, function and arrow expressions
//! - Automatic semicolon insertion at line breaks, `}` and end of input
//! - No classes, `this`, `new`, `try`, regular expressions or template strings
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies.

pub mod ast;
pub mod declared;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{ParseError, Parser};

/// Parse a complete program
pub fn parse(source: &str) -> Result<ast::Ast, ParseError> {
    Parser::new(source)?.parse_program()
}
