//! Expression parsing implementation
//!
//! This module handles parsing of all expression types using precedence climbing,
//! with one method per precedence level.
//!
//! # Grammar
//!
//! ```text
//! expression     ::= logical_or
//! logical_or     ::= logical_and ("||" logical_and)*
//! logical_and    ::= equality ("&&" equality)*
//! equality       ::= comparison (("==" | "!=") comparison)*
//! comparison     ::= additive (("<" | "<=" | ">" | ">=") additive)*
//! additive       ::= multiplicative (("+" | "-") multiplicative)*
//! multiplicative ::= unary (("*" | "/" | "%") unary)*
//! unary          ::= ("-" | "!" | "*" | "&" "mut"? | "&&") unary | postfix
//! postfix        ::= primary ("[" expression "]" | "." ("len" | "clone") "(" ")")*
//! primary        ::= integer | "true" | "false" | identifier | "(" expression ")"
//!                  | "[" (expression ("," expression)*)? "]" | "[" expression ";" integer "]"
//!                  | "vec" "!" "[" ... "]" | "Box" "::" "new" "(" expression ")"
//!                  | "Vec" "::" ("new" "(" ")" | "with_capacity" "(" expression ")")
//!                  | "rand_int" "(" expression "," expression ")"
//! ```
//!
//! Calls to user functions are not expressions: they are only accepted as the whole
//! right-hand side of a statement (see `statements`).

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse an expression
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_logical_or()
    }

    fn binary(op: BinOp, left: Expr, right: Expr, location: SourceLocation) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            location,
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;

        while self.match_token(&Token::OrOr(self.current_location())) {
            let loc = self.previous_location();
            let right = self.parse_logical_and()?;
            left = Self::binary(BinOp::Or, left, right, loc);
        }

        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;

        while self.match_token(&Token::AndAnd(self.current_location())) {
            let loc = self.previous_location();
            let right = self.parse_equality()?;
            left = Self::binary(BinOp::And, left, right, loc);
        }

        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;

        loop {
            let op = match self.peek() {
                Token::EqEq(_) => BinOp::Eq,
                Token::NotEq(_) => BinOp::Ne,
                _ => break,
            };
            let loc = self.advance().location();
            let right = self.parse_comparison()?;
            left = Self::binary(op, left, right, loc);
        }

        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.peek() {
                Token::Lt(_) => BinOp::Lt,
                Token::Le(_) => BinOp::Le,
                Token::Gt(_) => BinOp::Gt,
                Token::Ge(_) => BinOp::Ge,
                _ => break,
            };
            let loc = self.advance().location();
            let right = self.parse_additive()?;
            left = Self::binary(op, left, right, loc);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek() {
                Token::Plus(_) => BinOp::Add,
                Token::Minus(_) => BinOp::Sub,
                _ => break,
            };
            let loc = self.advance().location();
            let right = self.parse_multiplicative()?;
            left = Self::binary(op, left, right, loc);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Token::Star(_) => BinOp::Mul,
                Token::Slash(_) => BinOp::Div,
                Token::Percent(_) => BinOp::Mod,
                _ => break,
            };
            let loc = self.advance().location();
            let right = self.parse_unary()?;
            left = Self::binary(op, left, right, loc);
        }

        Ok(left)
    }

    pub(crate) fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        match self.peek() {
            Token::Minus(_) => {
                self.advance();
                // Fold negative literals so that i32::MIN is representable
                if let Token::IntLiteral(n, lit_loc) = self.peek_token() {
                    if !self.check_ahead(1, &Token::LBracket(lit_loc))
                        && !self.check_ahead(1, &Token::Dot(lit_loc))
                    {
                        self.advance();
                        let value = i32::try_from(-n).map_err(|_| {
                            ParseError::syntax(format!("Integer literal -{} out of range", n), lit_loc)
                        })?;
                        return Ok(Expr::IntLiteral(value, loc));
                    }
                }
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    operand: Box::new(operand),
                    location: loc,
                })
            }
            Token::Bang(_) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    operand: Box::new(operand),
                    location: loc,
                })
            }
            Token::Star(_) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Deref(Box::new(operand), loc))
            }
            Token::Amp(_) => {
                self.advance();
                self.parse_reference(loc)
            }
            Token::AndAnd(_) => {
                // `&&x` is a reference to a temporary reference
                self.advance();
                self.parse_reference(loc)?;
                Err(ParseError::syntax(
                    "Cannot take a reference to a temporary reference",
                    loc,
                ))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_reference(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        let mutable = self.match_token(&Token::Mut(self.current_location()));
        let operand = self.parse_unary()?;
        let target = operand.into_place().ok_or_else(|| {
            ParseError::syntax("Can only take a reference to a variable, element or dereference", loc)
        })?;
        Ok(Expr::Reference {
            mutable,
            target: Box::new(target),
            location: loc,
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();

            if self.match_token(&Token::LBracket(loc)) {
                let index = self.parse_expression()?;
                self.expect_rbracket("after index")?;
                expr = Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                    location: loc,
                };
                continue;
            }

            if self.check(&Token::Dot(loc)) {
                let method = match self.peek_ahead(1) {
                    Some(Token::Ident(name, _)) => name.clone(),
                    _ => return Err(self.error_here("Expected method name after '.'")),
                };
                // `push` is a statement; leave it for the statement parser
                if method == "push" {
                    break;
                }

                self.advance(); // '.'
                self.advance(); // method
                self.expect_lparen("after method name")?;
                self.expect_rparen("after method name")?;

                expr = match method.as_str() {
                    "len" => Expr::Len(Box::new(expr), loc),
                    "clone" => Expr::Clone(Box::new(expr), loc),
                    other => {
                        return Err(ParseError::syntax(
                            format!("Unsupported method '{}'", other),
                            loc,
                        ))
                    }
                };
                continue;
            }

            break;
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        match self.peek_token() {
            Token::IntLiteral(n, _) => {
                self.advance();
                let value = i32::try_from(n).map_err(|_| {
                    ParseError::syntax(format!("Integer literal {} out of range", n), loc)
                })?;
                Ok(Expr::IntLiteral(value, loc))
            }
            Token::True(_) => {
                self.advance();
                Ok(Expr::BoolLiteral(true, loc))
            }
            Token::False(_) => {
                self.advance();
                Ok(Expr::BoolLiteral(false, loc))
            }
            Token::LParen(_) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen("after expression")?;
                Ok(expr)
            }
            Token::LBracket(_) => {
                self.advance();
                self.parse_array_literal(loc)
            }
            Token::Ident(name, _) => {
                self.advance();
                self.parse_identifier_expression(name, loc)
            }
            other => Err(self.error_here(format!("Expected expression, found {}", other))),
        }
    }

    /// After `[`: `[a, b, c]`, `[]` or `[value; count]`
    fn parse_array_literal(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        if self.match_token(&Token::RBracket(self.current_location())) {
            return Ok(Expr::ArrayLiteral(Vec::new(), loc));
        }

        let first = self.parse_expression()?;

        if self.match_token(&Token::Semicolon(self.current_location())) {
            let count = self.parse_array_length()?;
            self.expect_rbracket("to close array literal")?;
            return Ok(Expr::ArrayRepeat {
                value: Box::new(first),
                count,
                location: loc,
            });
        }

        let mut elements = vec![first];
        while self.match_token(&Token::Comma(self.current_location())) {
            if self.check(&Token::RBracket(self.current_location())) {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        self.expect_rbracket("to close array literal")?;

        Ok(Expr::ArrayLiteral(elements, loc))
    }

    /// Identifier-led primaries: variables, `vec!`, `Box::new`, `Vec::*`, `rand_int`
    fn parse_identifier_expression(
        &mut self,
        name: String,
        loc: SourceLocation,
    ) -> Result<Expr, ParseError> {
        match name.as_str() {
            "vec" if self.check(&Token::Bang(loc)) => {
                self.advance();
                self.expect_token(
                    &Token::LBracket(self.current_location()),
                    "Expected '[' after 'vec!'",
                )?;
                let literal = self.parse_array_literal(loc)?;
                let elements = match literal {
                    Expr::ArrayRepeat { value, count, .. } => VecInit::Repeat { value, count },
                    Expr::ArrayLiteral(elements, _) => VecInit::List(elements),
                    _ => VecInit::List(Vec::new()),
                };
                Ok(Expr::VecLiteral {
                    elements,
                    capacity: None,
                    location: loc,
                })
            }
            "Box" if self.check(&Token::ColonColon(loc)) => {
                self.advance();
                self.expect_word("new", "after 'Box::'")?;
                self.expect_lparen("after 'Box::new'")?;
                let value = self.parse_expression()?;
                self.expect_rparen("after Box::new argument")?;
                Ok(Expr::BoxNew(Box::new(value), loc))
            }
            "Vec" if self.check(&Token::ColonColon(loc)) => {
                self.advance();
                let ctor = self.expect_identifier()?;
                self.expect_lparen("after Vec constructor")?;
                let capacity = match ctor.as_str() {
                    "new" => None,
                    "with_capacity" => Some(Box::new(self.parse_expression()?)),
                    other => {
                        return Err(ParseError::syntax(
                            format!("Unsupported constructor 'Vec::{}'", other),
                            loc,
                        ))
                    }
                };
                self.expect_rparen("after Vec constructor")?;
                Ok(Expr::VecLiteral {
                    elements: VecInit::List(Vec::new()),
                    capacity,
                    location: loc,
                })
            }
            "rand_int" if self.check(&Token::LParen(loc)) => {
                self.advance();
                let low = self.parse_expression()?;
                self.expect_token(
                    &Token::Comma(self.current_location()),
                    "Expected ',' between rand_int bounds",
                )?;
                let high = self.parse_expression()?;
                self.expect_rparen("after rand_int arguments")?;
                Ok(Expr::RandInt {
                    low: Box::new(low),
                    high: Box::new(high),
                    location: loc,
                })
            }
            _ if self.check(&Token::LParen(loc)) => Err(ParseError::syntax(
                format!(
                    "Call to '{}' must be a statement of its own (`let x = {}(..);`)",
                    name, name
                ),
                loc,
            )),
            _ => Ok(Expr::Variable(name, loc)),
        }
    }
}
