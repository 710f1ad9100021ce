//! Expression parsing implementation
//!
//! This module handles parsing of expressions using precedence climbing
//! for binary operators and recursive descent for other expression forms.
//!
//! # Supported Expressions
//!
//! - Literals: numbers, strings, booleans, `null`, arrays, objects
//! - Identifiers and variables
//! - Binary operators: arithmetic, comparison, logical
//! - Unary operators: `-`, `+`, `!`, `typeof`, `++`, `--`
//! - Postfix: `[]`, `.`, `()`, `++`, `--`
//! - Ternary: `? :`
//! - Function expressions and arrow functions
//!
//! # Precedence
//!
//! Lowest to highest: assignment, conditional, `||`, `&&`, equality,
//! relational, additive, multiplicative, `**` (right-associative), unary,
//! postfix, call/member.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::memory::value::number_to_string;
use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<NodeId, ParseError> {
        self.parse_assignment()
    }

    /// Parse assignment, arrow function or ternary (right-associative)
    pub(crate) fn parse_assignment(&mut self) -> Result<NodeId, ParseError> {
        if self.at_arrow_function() {
            return self.parse_arrow_function();
        }

        let start = self.position;
        let target = self.parse_ternary()?;

        let op = match self.peek().kind {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::Compound(BinOp::Add),
            TokenKind::MinusEq => AssignOp::Compound(BinOp::Sub),
            TokenKind::StarEq => AssignOp::Compound(BinOp::Mul),
            TokenKind::SlashEq => AssignOp::Compound(BinOp::Div),
            TokenKind::PercentEq => AssignOp::Compound(BinOp::Mod),
            _ => return Ok(target),
        };

        if !self.is_assignable(target) {
            return self.error("Invalid left-hand side in assignment");
        }
        self.advance();

        let value = self.parse_assignment()?;
        Ok(self.finish_node(NodeKind::Assign { op, target, value }, start))
    }

    /// Parse ternary: condition ? true_expr : false_expr
    fn parse_ternary(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let test = self.parse_logical_or()?;

        if self.match_token(&TokenKind::Question) {
            let consequent = self.parse_assignment()?;
            self.expect_token(&TokenKind::Colon, "Expected ':' in ternary expression")?;
            let alternate = self.parse_assignment()?;

            return Ok(self.finish_node(
                NodeKind::Conditional {
                    test,
                    consequent,
                    alternate,
                },
                start,
            ));
        }

        Ok(test)
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let mut left = self.parse_logical_and()?;

        while self.match_token(&TokenKind::OrOr) {
            let right = self.parse_logical_and()?;
            left = self.finish_node(
                NodeKind::Logical {
                    op: LogicalOp::Or,
                    left,
                    right,
                },
                start,
            );
        }

        Ok(left)
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let mut left = self.parse_equality()?;

        while self.match_token(&TokenKind::AndAnd) {
            let right = self.parse_equality()?;
            left = self.finish_node(
                NodeKind::Logical {
                    op: LogicalOp::And,
                    left,
                    right,
                },
                start,
            );
        }

        Ok(left)
    }

    /// Parse equality (== != === !==)
    fn parse_equality(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let mut left = self.parse_relational()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Ne,
                TokenKind::EqEqEq => BinOp::StrictEq,
                TokenKind::NotEqEq => BinOp::StrictNe,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = self.finish_node(NodeKind::Binary { op, left, right }, start);
        }

        Ok(left)
    }

    /// Parse relational (< <= > >=)
    fn parse_relational(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = self.finish_node(NodeKind::Binary { op, left, right }, start);
        }

        Ok(left)
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.finish_node(NodeKind::Binary { op, left, right }, start);
        }

        Ok(left)
    }

    /// Parse multiplicative (* / %)
    fn parse_multiplicative(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_exponent()?;
            left = self.finish_node(NodeKind::Binary { op, left, right }, start);
        }

        Ok(left)
    }

    /// Parse exponentiation (**), right-associative
    fn parse_exponent(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let left = self.parse_unary()?;

        if self.match_token(&TokenKind::StarStar) {
            let right = self.parse_exponent()?;
            return Ok(self.finish_node(
                NodeKind::Binary {
                    op: BinOp::Pow,
                    left,
                    right,
                },
                start,
            ));
        }

        Ok(left)
    }

    /// Parse unary operators
    fn parse_unary(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;

        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Plus => Some(UnOp::Plus),
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::Typeof => Some(UnOp::Typeof),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(self.finish_node(NodeKind::Unary { op, argument }, start));
        }

        if matches!(self.peek().kind, TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let increment = matches!(self.advance().kind, TokenKind::PlusPlus);
            let argument = self.parse_unary()?;
            if !self.is_assignable(argument) {
                return self.error("Invalid left-hand side expression in prefix operation");
            }
            return Ok(self.finish_node(
                NodeKind::Update {
                    increment,
                    prefix: true,
                    argument,
                },
                start,
            ));
        }

        self.parse_postfix()
    }

    /// Parse postfix `++`/`--` (not across a line break)
    fn parse_postfix(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let argument = self.parse_call_member()?;

        let next = self.peek();
        if !next.newline_before
            && matches!(next.kind, TokenKind::PlusPlus | TokenKind::MinusMinus)
        {
            if !self.is_assignable(argument) {
                return self.error("Invalid left-hand side expression in postfix operation");
            }
            let increment = matches!(self.advance().kind, TokenKind::PlusPlus);
            return Ok(self.finish_node(
                NodeKind::Update {
                    increment,
                    prefix: false,
                    argument,
                },
                start,
            ));
        }

        Ok(argument)
    }

    /// Parse calls and member access: `f(x)`, `a.b`, `a[i]`
    fn parse_call_member(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let mut expr = self.parse_primary()?;

        loop {
            if self.match_token(&TokenKind::Dot) {
                let name = self.expect_property_name()?;
                expr = self.finish_node(
                    NodeKind::Member {
                        object: expr,
                        property: MemberProperty::Named(name),
                    },
                    start,
                );
            } else if self.match_token(&TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.expect_token(&TokenKind::RBracket, "Expected ']' after index")?;
                expr = self.finish_node(
                    NodeKind::Member {
                        object: expr,
                        property: MemberProperty::Computed(index),
                    },
                    start,
                );
            } else if self.match_token(&TokenKind::LParen) {
                let arguments = self.parse_comma_list(&TokenKind::RParen, "arguments")?;
                expr = self.finish_node(
                    NodeKind::Call {
                        callee: expr,
                        arguments,
                    },
                    start,
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse primary expression
    fn parse_primary(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let kind = match self.peek().kind.clone() {
            TokenKind::Number(n) => NodeKind::Number(n),
            TokenKind::Str(s) => NodeKind::Str(s),
            TokenKind::True => NodeKind::Bool(true),
            TokenKind::False => NodeKind::Bool(false),
            TokenKind::Null => NodeKind::Null,
            TokenKind::Ident(name) => NodeKind::Identifier(name),
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen("after expression")?;
                return Ok(expr);
            }
            TokenKind::LBracket => {
                self.advance();
                let elements = self.parse_comma_list(&TokenKind::RBracket, "array elements")?;
                return Ok(self.finish_node(NodeKind::Array { elements }, start));
            }
            TokenKind::LBrace => {
                self.advance();
                return self.parse_object_literal(start);
            }
            TokenKind::Function => {
                self.advance();
                let name = match &self.peek().kind {
                    TokenKind::Ident(_) => Some(self.expect_identifier()?),
                    _ => None,
                };
                let def = self.parse_function_rest(name)?;
                return Ok(self.finish_node(NodeKind::Function(def), start));
            }
            other => return self.error(format!("Unexpected token {other}")),
        };

        self.advance();
        Ok(self.finish_node(kind, start))
    }

    /// Parse `{ key: value, ... }` after the opening brace
    fn parse_object_literal(&mut self, start: usize) -> Result<NodeId, ParseError> {
        let mut properties = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            let key_start = self.position;
            let key = match self.peek().kind.clone() {
                TokenKind::Str(s) => {
                    self.advance();
                    s
                }
                TokenKind::Number(n) => {
                    self.advance();
                    number_to_string(n)
                }
                _ => self.expect_property_name()?,
            };

            let value = if self.match_token(&TokenKind::Colon) {
                self.parse_assignment()?
            } else if matches!(self.tokens[key_start].kind, TokenKind::Ident(_)) {
                // Shorthand `{ name }`
                self.finish_node(NodeKind::Identifier(key.clone()), key_start)
            } else {
                return self.error("Expected ':' after property key");
            };
            properties.push(Property { key, value });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_rbrace("after object literal")?;
        Ok(self.finish_node(NodeKind::Object { properties }, start))
    }

    /// Parse comma-separated expressions up to `close`; trailing commas allowed
    fn parse_comma_list(
        &mut self,
        close: &TokenKind,
        ctx: &str,
    ) -> Result<Vec<NodeId>, ParseError> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.parse_assignment()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(close, &format!("Expected {close} after {ctx}"))?;
        Ok(items)
    }

    /// Property names after `.` may be keywords
    fn expect_property_name(&mut self) -> Result<String, ParseError> {
        let kind = &self.peek().kind;
        let name = match kind {
            TokenKind::Ident(name) => name.clone(),
            other => match other.keyword() {
                Some(word) => word.to_string(),
                None => return self.error(format!("Expected property name, found {other}")),
            },
        };
        self.advance();
        Ok(name)
    }

    /// Look ahead for `ident =>` or `( params ) =>`
    fn at_arrow_function(&self) -> bool {
        match self.peek().kind {
            TokenKind::Ident(_) => self
                .peek_ahead(1)
                .is_some_and(|t| matches!(t.kind, TokenKind::Arrow)),
            TokenKind::LParen => {
                let mut depth = 0usize;
                let mut i = self.position;
                while let Some(token) = self.tokens.get(i) {
                    match token.kind {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return self
                                    .tokens
                                    .get(i + 1)
                                    .is_some_and(|t| matches!(t.kind, TokenKind::Arrow));
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                    i += 1;
                }
                false
            }
            _ => false,
        }
    }

    /// Parse `x => body` or `(a, b) => body`
    fn parse_arrow_function(&mut self) -> Result<NodeId, ParseError> {
        let start = self.position;
        let mut params = Vec::new();

        if self.match_token(&TokenKind::LParen) {
            if !self.check(&TokenKind::RParen) {
                loop {
                    params.push(self.expect_identifier()?);
                    if !self.match_token(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect_rparen("after arrow parameters")?;
        } else {
            params.push(self.expect_identifier()?);
        }

        if self.peek().newline_before {
            return self.error("Illegal newline before '=>'");
        }
        self.expect_token(&TokenKind::Arrow, "Expected '=>'")?;

        let (body, expression_body) = if self.check(&TokenKind::LBrace) {
            (self.parse_function_body()?, false)
        } else {
            self.function_depth += 1;
            let body = self.parse_assignment();
            self.function_depth -= 1;
            (body?, true)
        };

        Ok(self.finish_node(
            NodeKind::Function(FunctionDef {
                name: None,
                params,
                body,
                is_arrow: true,
                expression_body,
            }),
            start,
        ))
    }

    fn is_assignable(&self, id: NodeId) -> bool {
        matches!(
            self.ast.kind(id),
            NodeKind::Identifier(_) | NodeKind::Member { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn parse_expr(source: &str) -> (Ast, NodeId) {
        let ast = Parser::new(source).unwrap().parse_program().unwrap();
        let expr = match ast.kind(ast.root) {
            NodeKind::Program { body } => match ast.kind(body[0]) {
                NodeKind::ExpressionStatement { expression } => *expression,
                other => panic!("Expected expression statement, got {other:?}"),
            },
            _ => panic!("Expected program root"),
        };
        (ast, expr)
    }

    #[test]
    fn test_precedence() {
        let (ast, expr) = parse_expr("1 + 2 * 3;");
        match ast.kind(expr) {
            NodeKind::Binary {
                op: BinOp::Add,
                right,
                ..
            } => assert!(matches!(
                ast.kind(*right),
                NodeKind::Binary { op: BinOp::Mul, .. }
            )),
            other => panic!("Expected addition, got {other:?}"),
        }
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let (ast, expr) = parse_expr("2 ** 3 ** 2;");
        match ast.kind(expr) {
            NodeKind::Binary {
                op: BinOp::Pow,
                left,
                right,
            } => {
                assert!(matches!(ast.kind(*left), NodeKind::Number(n) if *n == 2.0));
                assert!(matches!(ast.kind(*right), NodeKind::Binary { op: BinOp::Pow, .. }));
            }
            other => panic!("Expected exponent, got {other:?}"),
        }
    }

    #[test]
    fn test_arrow_functions() {
        let (ast, expr) = parse_expr("(a, b) => a + b;");
        match ast.kind(expr) {
            NodeKind::Function(def) => {
                assert!(def.is_arrow);
                assert!(def.expression_body);
                assert_eq!(def.params.len(), 2);
            }
            other => panic!("Expected arrow, got {other:?}"),
        }

        let (ast, expr) = parse_expr("x => { return x; };");
        match ast.kind(expr) {
            NodeKind::Function(def) => {
                assert!(!def.expression_body);
                assert_eq!(ast.kind(def.body).type_name(), "BlockStatement");
            }
            other => panic!("Expected arrow, got {other:?}"),
        }
    }

    #[test]
    fn test_parenthesized_expression_is_not_arrow() {
        let (ast, expr) = parse_expr("(a + b) * c;");
        assert!(matches!(ast.kind(expr), NodeKind::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_member_call_chain() {
        let (ast, expr) = parse_expr("Math.max(a[0], b.length);");
        match ast.kind(expr) {
            NodeKind::Call { callee, arguments } => {
                assert_eq!(arguments.len(), 2);
                assert!(matches!(
                    ast.kind(*callee),
                    NodeKind::Member {
                        property: MemberProperty::Named(name),
                        ..
                    } if name == "max"
                ));
            }
            other => panic!("Expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_object_literal_keys() {
        let (ast, expr) = parse_expr("({ a: 1, 'b c': 2, 3: x, d });");
        match ast.kind(expr) {
            NodeKind::Object { properties } => {
                let keys: Vec<_> = properties.iter().map(|p| p.key.as_str()).collect();
                assert_eq!(keys, vec!["a", "b c", "3", "d"]);
            }
            other => panic!("Expected object literal, got {other:?}"),
        }
    }

    #[test]
    fn test_compound_assignment() {
        let (ast, expr) = parse_expr("total += x;");
        assert!(matches!(
            ast.kind(expr),
            NodeKind::Assign {
                op: AssignOp::Compound(BinOp::Add),
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(Parser::new("1 = x;").unwrap().parse_program().is_err());
        assert!(Parser::new("f()++;").unwrap().parse_program().is_err());
    }

    #[test]
    fn test_expression_span() {
        let source = "foo(1, 2);";
        let (ast, expr) = parse_expr(source);
        let span = ast.span(expr);
        assert_eq!(&source[span.start..span.end], "foo(1, 2)");
    }
}
