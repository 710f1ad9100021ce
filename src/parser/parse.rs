//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `statements`: Parsing statements and declarations (if, while, for, var, function, etc.)
//! - `expressions`: Parsing expressions with precedence climbing
//!
//! Nodes are pushed into an [`Ast`] arena as they are completed, so children
//! always receive smaller ids than their parents and the `Program` node is last.
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Parse error at line {}, column {}: {message}", .location.line, .location.column)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for the script language
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) ast: Ast,
    /// Nesting depth of function bodies, used to reject stray `return`
    pub(crate) function_depth: usize,
    allow_top_level_return: bool,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            ast: Ast::new(),
            function_depth: 0,
            allow_top_level_return: false,
        })
    }

    /// Accept `return` outside any function body.
    ///
    /// Used for static analysis of bare function bodies, which are only
    /// executable once wrapped.
    pub fn allow_top_level_return(mut self) -> Self {
        self.allow_top_level_return = true;
        self
    }

    /// Parse the entire program, consuming the parser
    pub fn parse_program(mut self) -> Result<Ast, ParseError> {
        let start = self.position;
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        let span = Span::new(0, self.peek().span.end);
        let location = self.tokens[start].location;
        let root = self.ast.push(NodeKind::Program { body }, span, location);
        self.ast.root = root;
        Ok(self.ast)
    }

    // ===== Helper methods =====

    /// Push a node whose source range runs from token `start` to the previous token
    pub(crate) fn finish_node(&mut self, kind: NodeKind, start: usize) -> NodeId {
        let first = &self.tokens[start];
        let end = if self.position > start {
            self.previous().span.end
        } else {
            first.span.end
        };
        let span = Span::new(first.span.start, end);
        let location = first.location;
        self.ast.push(kind, span, location)
    }

    pub(crate) fn return_allowed(&self) -> bool {
        self.function_depth > 0 || self.allow_top_level_return
    }

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location
    }

    pub(crate) fn error<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError {
            message: message.into(),
            location: self.current_location(),
        })
    }

    pub(crate) fn expect_token(
        &mut self,
        kind: &TokenKind,
        message: &str,
    ) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            self.error(format!("{}, found {}", message, self.peek().kind))
        }
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::LParen, &format!("Expected '(' {ctx}"))
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::RParen, &format!("Expected ')' {ctx}"))
    }

    pub(crate) fn expect_lbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::LBrace, &format!("Expected '{{' {ctx}"))
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::RBrace, &format!("Expected '}}' {ctx}"))
    }

    /// Consume a `;`, or accept its automatic insertion before a line break,
    /// a closing brace or the end of input.
    pub(crate) fn consume_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        if self.match_token(&TokenKind::Semicolon) {
            return Ok(());
        }
        let next = self.peek();
        if next.newline_before || matches!(next.kind, TokenKind::RBrace | TokenKind::Eof) {
            return Ok(());
        }
        self.error(format!("Expected ';' {ctx}, found {}", next.kind))
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            self.error(format!("Expected identifier, found {}", self.peek().kind))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Ast {
        Parser::new(source).unwrap().parse_program().unwrap()
    }

    fn program_body(ast: &Ast) -> Vec<NodeId> {
        match ast.kind(ast.root) {
            NodeKind::Program { body } => body.clone(),
            _ => panic!("Expected program root"),
        }
    }

    #[test]
    fn test_parse_simple_function() {
        let ast = parse("function main(a, b) { return a + b; }");
        let body = program_body(&ast);
        assert_eq!(body.len(), 1);
        match ast.kind(body[0]) {
            NodeKind::FunctionDeclaration(def) => {
                assert_eq!(def.name.as_deref(), Some("main"));
                assert_eq!(def.params, vec!["a".to_string(), "b".to_string()]);
                assert!(!def.is_arrow);
            }
            other => panic!("Expected function declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_root_is_last_node() {
        let ast = parse("var x = 1 + 2 * 3;");
        assert_eq!(ast.root, ast.len() - 1);
    }

    #[test]
    fn test_automatic_semicolons() {
        let ast = parse("var x = 1\nvar y = 2\nx = y");
        assert_eq!(program_body(&ast).len(), 3);
    }

    #[test]
    fn test_missing_semicolon_on_same_line() {
        let err = Parser::new("var x = 1 var y = 2")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(err.message.contains("Expected ';'"));
        assert_eq!(err.location.line, 1);
    }

    #[test]
    fn test_statement_spans() {
        let source = "var x = 1;\nif (x) { x = 2; }";
        let ast = parse(source);
        let body = program_body(&ast);
        let first = ast.span(body[0]);
        assert_eq!(&source[first.start..first.end], "var x = 1;");
        let second = ast.span(body[1]);
        assert_eq!(&source[second.start..second.end], "if (x) { x = 2; }");
    }

    #[test]
    fn test_top_level_return() {
        assert!(Parser::new("return 1;").unwrap().parse_program().is_err());
        let ast = Parser::new("return 1;")
            .unwrap()
            .allow_top_level_return()
            .parse_program()
            .unwrap();
        assert_eq!(program_body(&ast).len(), 1);
    }
}
