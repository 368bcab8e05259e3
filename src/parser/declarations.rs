//! Declaration parsing implementation
//!
//! This module handles parsing of top-level function definitions and the type
//! annotations that appear in signatures and `let` bindings.
//!
//! # Grammar
//!
//! ```text
//! function_def ::= "fn" identifier "(" params ")" ("->" type)? "{" statements "}"
//! params       ::= (param ("," param)* ","?)?
//! param        ::= "mut"? identifier ":" type
//! type         ::= "&" "mut"? type
//!                | "[" type ";" integer "]"
//!                | ("Box" | "Vec") ("<" type ">")?
//!                | "i32" | "i64" | "u32" | "usize" | "bool"
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse a function definition
    pub(crate) fn parse_function_definition(&mut self) -> Result<FunctionDef, ParseError> {
        let location = self.current_location();
        if !self.match_token(&Token::Fn(location)) {
            return Err(self.error_here(format!(
                "Expected function definition, found {}",
                self.peek()
            )));
        }

        let name = self.expect_identifier()?;
        self.expect_lparen("after function name")?;
        let params = self.parse_parameters()?;
        self.expect_rparen("after function parameters")?;

        let return_type = if self.match_token(&Token::Arrow(self.current_location())) {
            Some(self.parse_type()?)
        } else {
            None
        };

        self.expect_lbrace("to start function body")?;
        let body = self.parse_block_statements()?;
        let end_location = self.current_location();
        self.expect_rbrace("to end function body")?;

        Ok(FunctionDef {
            name,
            params,
            return_type,
            body,
            location,
            end_location,
        })
    }

    /// Parse function parameters (without the surrounding parentheses)
    pub(crate) fn parse_parameters(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params: Vec<Param> = Vec::new();

        while !self.check(&Token::RParen(self.current_location())) {
            self.match_token(&Token::Mut(self.current_location()));
            let location = self.current_location();
            let name = self.expect_identifier()?;

            if params.iter().any(|p| p.name == name) {
                return Err(ParseError::syntax(
                    format!("Duplicate parameter name '{}'", name),
                    location,
                ));
            }

            self.expect_token(
                &Token::Colon(self.current_location()),
                "Expected ':' after parameter name",
            )?;
            let ty = self.parse_type()?;
            params.push(Param::new(name, ty));

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(params)
    }

    /// Parse a type annotation
    pub(crate) fn parse_type(&mut self) -> Result<Type, ParseError> {
        let location = self.current_location();

        if self.match_token(&Token::Amp(location)) {
            let mutable = self.match_token(&Token::Mut(self.current_location()));
            let inner = self.parse_type()?;
            return Ok(Type::reference(inner, mutable));
        }

        // `&&T` arrives as a single '&&' token
        if self.match_token(&Token::AndAnd(location)) {
            let mutable = self.match_token(&Token::Mut(self.current_location()));
            let inner = self.parse_type()?;
            return Ok(Type::reference(Type::reference(inner, mutable), false));
        }

        if self.match_token(&Token::LBracket(location)) {
            let elem = self.parse_type()?;
            // `&[i32]` slices have no length; model them as a zero-length view
            if self.match_token(&Token::RBracket(self.current_location())) {
                return Ok(Type::array(elem, 0));
            }
            self.expect_token(
                &Token::Semicolon(self.current_location()),
                "Expected ';' in array type",
            )?;
            let len = self.parse_array_length()?;
            self.expect_rbracket("to close array type")?;
            return Ok(Type::array(elem, len));
        }

        let name = self.expect_identifier()?;
        match name.as_str() {
            "i32" | "i64" | "u32" | "usize" | "isize" => Ok(Type::Int),
            "bool" => Ok(Type::Bool),
            "Box" => Ok(Type::boxed(self.parse_generic_argument()?)),
            "Vec" => Ok(Type::vector(self.parse_generic_argument()?)),
            other => Err(ParseError::syntax(format!("Unknown type '{}'", other), location)),
        }
    }

    /// Parse `<T>` after `Box`/`Vec`; a bare `Vec` defaults to `Vec<i32>`.
    fn parse_generic_argument(&mut self) -> Result<Type, ParseError> {
        if !self.match_token(&Token::Lt(self.current_location())) {
            return Ok(Type::Int);
        }
        let inner = self.parse_type()?;
        self.expect_token(
            &Token::Gt(self.current_location()),
            "Expected '>' to close generic argument",
        )?;
        Ok(inner)
    }

    /// Parse the non-negative length in `[T; N]` or `[e; N]`
    pub(crate) fn parse_array_length(&mut self) -> Result<usize, ParseError> {
        match self.peek_token() {
            Token::IntLiteral(n, loc) => {
                self.advance();
                usize::try_from(n)
                    .map_err(|_| ParseError::syntax(format!("Invalid array length {}", n), loc))
            }
            other => Err(self.error_here(format!("Expected array length, found {}", other))),
        }
    }
}
