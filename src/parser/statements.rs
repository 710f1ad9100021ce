//! Statement parsing implementation
//!
//! This module handles parsing of all statement types:
//!
//! - Variable declarations: `var x = 42;`, `let a, b = 1;`, `const k = 3;`
//! - Function declarations: `function f(a, b) { ... }`
//! - Control flow: `if`, `while`, `for`, `do-while`, `switch`
//! - Jump statements: `return`, `break`, `continue`, `throw`
//! - Compound statements: `{ ... }`
//! - Expression statements: function calls, assignments
//!
//! # Grammar
//!
//! ```text
//! statement ::= var_decl | function_decl | if_stmt | while_stmt | for_stmt
//!             | do_while_stmt | switch_stmt | return_stmt | throw_stmt
//!             | break_stmt | continue_stmt | block | ';' | expr_stmt
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;

        match self.peek().kind {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let id = self.parse_variable_declaration()?;
                self.consume_semicolon("after variable declaration")?;
                self.extend_to_previous(id);
                Ok(id)
            }
            TokenKind::Function => {
                self.advance();
                let name = self.expect_identifier()?;
                let def = self.parse_function_rest(Some(name))?;
                Ok(self.finish_node(NodeKind::FunctionDeclaration(def), start))
            }
            TokenKind::Return => {
                self.advance();
                self.parse_return_statement(start)
            }
            TokenKind::If => {
                self.advance();
                self.parse_if_statement(start)
            }
            TokenKind::While => {
                self.advance();
                self.parse_while_statement(start)
            }
            TokenKind::Do => {
                self.advance();
                self.parse_do_while_statement(start)
            }
            TokenKind::For => {
                self.advance();
                self.parse_for_statement(start)
            }
            TokenKind::Switch => {
                self.advance();
                self.parse_switch_statement(start)
            }
            TokenKind::Break => {
                self.advance();
                self.consume_semicolon("after 'break'")?;
                Ok(self.finish_node(NodeKind::Break, start))
            }
            TokenKind::Continue => {
                self.advance();
                self.consume_semicolon("after 'continue'")?;
                Ok(self.finish_node(NodeKind::Continue, start))
            }
            TokenKind::Throw => {
                self.advance();
                if self.peek().newline_before {
                    return self.error("Illegal newline after 'throw'");
                }
                let argument = self.parse_expression()?;
                self.consume_semicolon("after 'throw'")?;
                Ok(self.finish_node(NodeKind::Throw { argument }, start))
            }
            TokenKind::LBrace => {
                self.advance();
                let body = self.parse_block_statements()?;
                self.expect_rbrace("after block")?;
                Ok(self.finish_node(NodeKind::Block { body }, start))
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(self.finish_node(NodeKind::Empty, start))
            }
            _ => {
                // Otherwise, it's an expression statement
                let expression = self.parse_expression()?;
                self.consume_semicolon("after expression")?;
                Ok(self.finish_node(NodeKind::ExpressionStatement { expression }, start))
            }
        }
    }

    /// Parse block statements (inside braces, excluding the braces themselves)
    pub(crate) fn parse_block_statements(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    /// Parse `var`/`let`/`const` declarators, without the terminating semicolon
    pub(crate) fn parse_variable_declaration(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let kind = match self.advance().kind {
            TokenKind::Var => DeclKind::Var,
            TokenKind::Let => DeclKind::Let,
            _ => DeclKind::Const,
        };

        let mut declarations = Vec::new();
        loop {
            let decl_start = self.peek().span.start;
            let name = self.expect_identifier()?;
            let init = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_assignment()?)
            } else {
                if kind == DeclKind::Const {
                    return self.error(format!(
                        "Missing initializer in const declaration of '{name}'"
                    ));
                }
                None
            };
            declarations.push(Declarator {
                name,
                init,
                span: Span::new(decl_start, self.previous().span.end),
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(self.finish_node(
            NodeKind::VariableDeclaration { kind, declarations },
            start,
        ))
    }

    /// Parse parameter list and body following `function [name]`
    pub(crate) fn parse_function_rest(
        &mut self,
        name: Option<String>,
    ) -> Result<FunctionDef, ParseError> {
        self.expect_lparen("after function name")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect_rparen("after parameters")?;

        let body = self.parse_function_body()?;
        Ok(FunctionDef {
            name,
            params,
            body,
            is_arrow: false,
            expression_body: false,
        })
    }

    /// Parse a braced function body into a `BlockStatement`
    pub(crate) fn parse_function_body(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        self.expect_lbrace("before function body")?;
        self.function_depth += 1;
        let body = self.parse_block_statements();
        self.function_depth -= 1;
        let body = body?;
        self.expect_rbrace("after function body")?;
        Ok(self.finish_node(NodeKind::Block { body }, start))
    }

    /// Parse return statement
    fn parse_return_statement(&mut self, start: usize) -> Result<NodeId, ParseError> {
        if !self.return_allowed() {
            return Err(ParseError {
                message: "Illegal return statement outside of a function".to_string(),
                location: self.tokens[start].location,
            });
        }

        let next = self.peek();
        let argument = if next.newline_before
            || matches!(
                next.kind,
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
            ) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.consume_semicolon("after return")?;
        Ok(self.finish_node(NodeKind::Return { argument }, start))
    }

    /// Parse if statement
    fn parse_if_statement(&mut self, start: usize) -> Result<NodeId, ParseError> {
        self.expect_lparen("after 'if'")?;
        let test = self.parse_expression()?;
        self.expect_rparen("after if condition")?;

        let consequent = self.parse_statement()?;
        let alternate = if self.match_token(&TokenKind::Else) {
            Some(self.parse_statement()?)
        } else {
            None
        };

        Ok(self.finish_node(
            NodeKind::If {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    /// Parse while statement
    fn parse_while_statement(&mut self, start: usize) -> Result<NodeId, ParseError> {
        self.expect_lparen("after 'while'")?;
        let test = self.parse_expression()?;
        self.expect_rparen("after while condition")?;
        let body = self.parse_statement()?;

        Ok(self.finish_node(NodeKind::While { test, body }, start))
    }

    /// Parse do-while statement
    fn parse_do_while_statement(&mut self, start: usize) -> Result<NodeId, ParseError> {
        let body = self.parse_statement()?;

        self.expect_token(&TokenKind::While, "Expected 'while' after do body")?;
        self.expect_lparen("after 'while'")?;
        let test = self.parse_expression()?;
        self.expect_rparen("after do-while condition")?;
        // A semicolon after do-while is always optional
        self.match_token(&TokenKind::Semicolon);

        Ok(self.finish_node(NodeKind::DoWhile { body, test }, start))
    }

    /// Parse for statement
    fn parse_for_statement(&mut self, start: usize) -> Result<NodeId, ParseError> {
        self.expect_lparen("after 'for'")?;

        // Init (optional)
        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else if matches!(
            self.peek().kind,
            TokenKind::Var | TokenKind::Let | TokenKind::Const
        ) {
            Some(self.parse_variable_declaration()?)
        } else {
            let init_start = self.position;
            let expression = self.parse_expression()?;
            Some(self.finish_node(NodeKind::ExpressionStatement { expression }, init_start))
        };
        self.expect_token(&TokenKind::Semicolon, "Expected ';' after for init")?;

        // Condition (optional)
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_token(&TokenKind::Semicolon, "Expected ';' after for condition")?;

        // Update (optional)
        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_rparen("after for clauses")?;

        let body = self.parse_statement()?;

        Ok(self.finish_node(
            NodeKind::For {
                init,
                test,
                update,
                body,
            },
            start,
        ))
    }

    /// Parse switch statement
    fn parse_switch_statement(&mut self, start: usize) -> Result<NodeId, ParseError> {
        self.expect_lparen("after 'switch'")?;
        let discriminant = self.parse_expression()?;
        self.expect_rparen("after switch expression")?;
        self.expect_lbrace("before switch body")?;

        let mut cases = Vec::new();
        let mut seen_default = false;

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let test = if self.match_token(&TokenKind::Case) {
                let value = self.parse_expression()?;
                self.expect_token(&TokenKind::Colon, "Expected ':' after case value")?;
                Some(value)
            } else if self.match_token(&TokenKind::Default) {
                if seen_default {
                    return self.error("More than one default clause in switch statement");
                }
                seen_default = true;
                self.expect_token(&TokenKind::Colon, "Expected ':' after 'default'")?;
                None
            } else {
                return self.error("Expected 'case' or 'default' in switch body");
            };

            let mut consequent = Vec::new();
            while !self.check(&TokenKind::Case)
                && !self.check(&TokenKind::Default)
                && !self.check(&TokenKind::RBrace)
                && !self.is_at_end()
            {
                consequent.push(self.parse_statement()?);
            }

            cases.push(SwitchCase { test, consequent });
        }

        self.expect_rbrace("after switch body")?;

        Ok(self.finish_node(
            NodeKind::Switch {
                discriminant,
                cases,
            },
            start,
        ))
    }

    /// Widen a node's span to cover a trailing semicolon consumed after it
    fn extend_to_previous(&mut self, id: NodeId) {
        let end = self.previous().span.end;
        let node = &mut self.ast.nodes[id];
        if end > node.span.end {
            node.span.end = end;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn parse(source: &str) -> Ast {
        Parser::new(source).unwrap().parse_program().unwrap()
    }

    fn first_statement(ast: &Ast) -> &NodeKind {
        match ast.kind(ast.root) {
            NodeKind::Program { body } => ast.kind(body[0]),
            _ => panic!("Expected program root"),
        }
    }

    #[test]
    fn test_parse_for_with_let() {
        let ast = parse("for (let i = 0; i < 3; i++) { }");
        match first_statement(&ast) {
            NodeKind::For {
                init: Some(init),
                test: Some(_),
                update: Some(_),
                ..
            } => {
                assert!(matches!(
                    ast.kind(*init),
                    NodeKind::VariableDeclaration {
                        kind: DeclKind::Let,
                        ..
                    }
                ));
            }
            other => panic!("Expected for statement, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_for_clauses() {
        let ast = parse("for (;;) break;");
        assert!(matches!(
            first_statement(&ast),
            NodeKind::For {
                init: None,
                test: None,
                update: None,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_switch() {
        let ast = parse("switch (x) { case 1: a(); break; case 2: default: b(); }");
        match first_statement(&ast) {
            NodeKind::Switch { cases, .. } => {
                assert_eq!(cases.len(), 3);
                assert_eq!(cases[0].consequent.len(), 2);
                assert!(cases[1].consequent.is_empty());
                assert!(cases[2].test.is_none());
            }
            other => panic!("Expected switch statement, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_multiple_declarators() {
        let ast = parse("let a = 1, b, c = a;");
        match first_statement(&ast) {
            NodeKind::VariableDeclaration { declarations, .. } => {
                let names: Vec<_> = declarations.iter().map(|d| d.name.as_str()).collect();
                assert_eq!(names, vec!["a", "b", "c"]);
                assert!(declarations[1].init.is_none());
            }
            other => panic!("Expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_const_requires_initializer() {
        assert!(Parser::new("const k;").unwrap().parse_program().is_err());
    }

    #[test]
    fn test_return_without_argument_before_newline() {
        let ast = parse("function f() {\n return\n 1;\n}");
        match first_statement(&ast) {
            NodeKind::FunctionDeclaration(def) => match ast.kind(def.body) {
                NodeKind::Block { body } => {
                    assert!(matches!(
                        ast.kind(body[0]),
                        NodeKind::Return { argument: None }
                    ));
                    assert_eq!(body.len(), 2);
                }
                other => panic!("Expected block body, got {other:?}"),
            },
            other => panic!("Expected function, got {other:?}"),
        }
    }
}
