//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: function signatures and type annotations
//! - `statements`: statements, lowered into [`Instruction`]s
//! - `expressions`: expressions with one method per precedence level
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token};
use thiserror::Error;

/// Parser error type
///
/// `Syntax` is the only error that points at a position in the text; the other
/// two are whole-program checks made once every function has been read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Parse error at line {}, column {}: {message}", .location.line, .location.column)]
    Syntax {
        message: String,
        location: SourceLocation,
    },

    #[error("Program has no `main` function")]
    MissingMain,

    #[error("Function '{name}' is defined more than once (line {})", .location.line)]
    DuplicateFunction {
        name: String,
        location: SourceLocation,
    },
}

impl ParseError {
    pub(crate) fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        ParseError::Syntax {
            message: message.into(),
            location,
        }
    }

    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            ParseError::Syntax { location, .. } | ParseError::DuplicateFunction { location, .. } => {
                Some(*location)
            }
            ParseError::MissingMain => None,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::Syntax {
            message: err.message,
            location: err.location,
        }
    }
}

/// Parse source text into a [`Program`].
pub fn parse(source: &str) -> Result<Program, ParseError> {
    Parser::new(source)?.parse_program()
}

/// Recursive descent parser for the teaching language
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse the entire program (a sequence of function definitions)
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut functions = Vec::new();

        while !self.is_at_end() {
            functions.push(self.parse_function_definition()?);
        }

        Program::new(functions)
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    pub(crate) fn check_ahead(&self, n: usize, token: &Token) -> bool {
        self.peek_ahead(n)
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_token(&self) -> Token {
        self.tokens[self.position].clone()
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn previous_location(&self) -> SourceLocation {
        self.previous().location()
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    pub(crate) fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(message, self.current_location())
    }

    pub(crate) fn expect_token(&mut self, token: &Token, message: &str) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(format!("{}, found {}", message, self.peek())))
        }
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::LParen(self.current_location()),
            &format!("Expected '(' {ctx}"),
        )
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RParen(self.current_location()),
            &format!("Expected ')' {ctx}"),
        )
    }

    pub(crate) fn expect_lbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::LBrace(self.current_location()),
            &format!("Expected '{{' {ctx}"),
        )
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RBrace(self.current_location()),
            &format!("Expected '}}' {ctx}"),
        )
    }

    pub(crate) fn expect_rbracket(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RBracket(self.current_location()),
            &format!("Expected ']' {ctx}"),
        )
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::Semicolon(self.current_location()),
            &format!("Expected ';' {ctx}"),
        )
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let Token::Ident(name, _) = self.peek_token() {
            self.advance();
            Ok(name)
        } else {
            Err(self.error_here(format!("Expected identifier, found {}", self.peek())))
        }
    }

    /// Consume the given identifier (used for contextual words like `Box`, `new`, `push`).
    pub(crate) fn expect_word(&mut self, word: &str, ctx: &str) -> Result<(), ParseError> {
        match self.peek() {
            Token::Ident(name, _) if name == word => {
                self.advance();
                Ok(())
            }
            other => Err(self.error_here(format!("Expected '{word}' {ctx}, found {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_function() {
        let source = "fn main() { return; }";
        let program = parse(source).unwrap();

        assert_eq!(program.len(), 1);
        let main = program.main().unwrap();
        assert_eq!(main.name, "main");
        assert!(main.params.is_empty());
        assert_eq!(main.body.len(), 1);
        assert!(matches!(main.body[0], Instruction::Return { value: None, .. }));
    }

    #[test]
    fn test_missing_main_is_rejected() {
        let err = parse("fn helper() { return; }").unwrap_err();
        assert_eq!(err, ParseError::MissingMain);
    }

    #[test]
    fn test_duplicate_function_is_rejected() {
        let err = parse("fn main() {}\nfn main() {}").unwrap_err();
        assert!(matches!(err, ParseError::DuplicateFunction { ref name, .. } if name == "main"));
    }

    #[test]
    fn test_unbalanced_braces_report_location() {
        let err = parse("fn main() {\n    let x = 1;\n").unwrap_err();
        match err {
            ParseError::Syntax { location, .. } => assert_eq!(location.line, 3),
            other => panic!("Expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_keyword_at_top_level() {
        let err = parse("struct Point { x: i32 }").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }
}
