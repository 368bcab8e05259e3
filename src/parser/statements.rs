//! Statement parsing implementation
//!
//! Statements are lowered straight into [`Instruction`]s. A few source forms map
//! onto dedicated instructions rather than a generic `let`:
//!
//! - `let v = vec![..];` / `Vec::new()` / `Vec::with_capacity(n)` → [`Instruction::VecNew`]
//! - `let b = Box::new(e);` → [`Instruction::BoxNew`]
//! - `let r = &x;` / `&mut x` → [`Instruction::TakeRef`]
//! - `let y = f(x);`, `y = f(x);`, `return f(x);`, `f(x);` → [`Instruction::Call`]
//!
//! # Grammar
//!
//! ```text
//! statement  ::= let_stmt | if_stmt | while_stmt | return_stmt | drop_stmt
//!              | print_stmt | call_stmt | push_stmt | assign_stmt
//! let_stmt   ::= "let" "mut"? identifier (":" type)? ("=" rhs)? ";"
//! if_stmt    ::= "if" expression block ("else" (if_stmt | block))?
//! while_stmt ::= "while" expression block
//! return_stmt::= "return" rhs? ";"
//! drop_stmt  ::= "drop" "(" identifier ")" ";"
//! print_stmt ::= ("print" | "println") "!" "(" string ("," expression)* ")" ";"
//! push_stmt  ::= unary "." "push" "(" expression ")" ";"
//! assign_stmt::= unary ("=" | "+=" | "-=" | "*=" | "/=" | "%=") rhs ";"
//! rhs        ::= call | expression
//! call       ::= identifier "(" (expression ("," expression)*)? ")"
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

/// Identifiers followed by `(` that are not user function calls
const BUILTIN_CALLS: &[&str] = &["drop", "rand_int"];

impl Parser {
    /// Parse block statements (inside braces, excluding the braces themselves)
    pub(crate) fn parse_block_statements(&mut self) -> Result<Vec<Instruction>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    /// Parse a braced block
    fn parse_block(&mut self, ctx: &str) -> Result<Vec<Instruction>, ParseError> {
        self.expect_lbrace(ctx)?;
        let body = self.parse_block_statements()?;
        self.expect_rbrace(&format!("to close block {ctx}"))?;
        Ok(body)
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<Instruction, ParseError> {
        let loc = self.current_location();

        if self.match_token(&Token::Let(loc)) {
            return self.parse_let_statement(loc);
        }

        if self.match_token(&Token::If(loc)) {
            return self.parse_if_statement(loc);
        }

        if self.match_token(&Token::While(loc)) {
            let condition = self.parse_expression()?;
            let body = self.parse_block("after while condition")?;
            return Ok(Instruction::While {
                condition,
                body,
                location: loc,
            });
        }

        if self.match_token(&Token::Return(loc)) {
            return self.parse_return_statement(loc);
        }

        if let Token::Ident(name, _) = self.peek_token() {
            if name == "drop" && self.check_ahead(1, &Token::LParen(loc)) {
                return self.parse_drop_statement(loc);
            }
            if (name == "println" || name == "print") && self.check_ahead(1, &Token::Bang(loc)) {
                return self.parse_print_statement(loc, name == "println");
            }
        }

        if self.at_user_call() {
            let (function, args) = self.parse_call()?;
            self.expect_semicolon("after function call")?;
            return Ok(Instruction::Call {
                function,
                args,
                target: CallTarget::Discard,
                location: loc,
            });
        }

        self.parse_place_statement(loc)
    }

    /// `true` when the next tokens start a call to a user-defined function.
    pub(crate) fn at_user_call(&self) -> bool {
        match self.peek() {
            Token::Ident(name, loc) => {
                !BUILTIN_CALLS.contains(&name.as_str()) && self.check_ahead(1, &Token::LParen(*loc))
            }
            _ => false,
        }
    }

    /// Parse `name(args)`
    pub(crate) fn parse_call(&mut self) -> Result<(String, Vec<Expr>), ParseError> {
        let function = self.expect_identifier()?;
        self.expect_lparen("after function name")?;
        let args = self.parse_arguments()?;
        self.expect_rparen("after function arguments")?;
        Ok((function, args))
    }

    /// Parse a comma-separated expression list up to (not including) `)`
    pub(crate) fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        while !self.check(&Token::RParen(self.current_location())) {
            args.push(self.parse_expression()?);
            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }
        Ok(args)
    }

    fn parse_let_statement(&mut self, loc: SourceLocation) -> Result<Instruction, ParseError> {
        let mutable = self.match_token(&Token::Mut(self.current_location()));
        let name = self.expect_identifier()?;

        let ty = if self.match_token(&Token::Colon(self.current_location())) {
            Some(self.parse_type()?)
        } else {
            None
        };

        if self.match_token(&Token::Semicolon(self.current_location())) {
            return Ok(Instruction::Let {
                name,
                mutable,
                ty,
                value: None,
                location: loc,
            });
        }

        self.expect_token(
            &Token::Eq(self.current_location()),
            "Expected '=' or ';' in let binding",
        )?;

        if self.at_user_call() {
            let (function, args) = self.parse_call()?;
            self.expect_semicolon("after let binding")?;
            return Ok(Instruction::Call {
                function,
                args,
                target: CallTarget::Declare { name, mutable, ty },
                location: loc,
            });
        }

        let value = self.parse_expression()?;
        self.expect_semicolon("after let binding")?;

        let instruction = match value {
            Expr::VecLiteral {
                elements, capacity, ..
            } => Instruction::VecNew {
                name,
                mutable,
                ty,
                elements,
                capacity: capacity.map(|c| *c),
                location: loc,
            },
            Expr::BoxNew(value, _) => Instruction::BoxNew {
                name,
                mutable,
                ty,
                value: *value,
                location: loc,
            },
            Expr::Reference {
                mutable: ref_mut,
                target,
                ..
            } => Instruction::TakeRef {
                name,
                mutable: ref_mut,
                target: *target,
                location: loc,
            },
            value => Instruction::Let {
                name,
                mutable,
                ty,
                value: Some(value),
                location: loc,
            },
        };

        Ok(instruction)
    }

    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<Instruction, ParseError> {
        let condition = self.parse_expression()?;
        let then_body = self.parse_block("after if condition")?;

        let else_body = if self.match_token(&Token::Else(self.current_location())) {
            let else_loc = self.current_location();
            if self.match_token(&Token::If(else_loc)) {
                Some(vec![self.parse_if_statement(else_loc)?])
            } else {
                Some(self.parse_block("after 'else'")?)
            }
        } else {
            None
        };

        Ok(Instruction::If {
            condition,
            then_body,
            else_body,
            location: loc,
        })
    }

    fn parse_return_statement(&mut self, loc: SourceLocation) -> Result<Instruction, ParseError> {
        if self.match_token(&Token::Semicolon(self.current_location())) {
            return Ok(Instruction::Return {
                value: None,
                location: loc,
            });
        }

        if self.at_user_call() {
            let (function, args) = self.parse_call()?;
            self.expect_semicolon("after return")?;
            return Ok(Instruction::Call {
                function,
                args,
                target: CallTarget::Return,
                location: loc,
            });
        }

        let value = self.parse_expression()?;
        self.expect_semicolon("after return")?;
        Ok(Instruction::Return {
            value: Some(value),
            location: loc,
        })
    }

    fn parse_drop_statement(&mut self, loc: SourceLocation) -> Result<Instruction, ParseError> {
        self.advance(); // 'drop'
        self.expect_lparen("after 'drop'")?;
        let name = self.expect_identifier()?;
        self.expect_rparen("after drop argument")?;
        self.expect_semicolon("after drop")?;
        Ok(Instruction::Drop {
            name,
            location: loc,
        })
    }

    fn parse_print_statement(
        &mut self,
        loc: SourceLocation,
        newline: bool,
    ) -> Result<Instruction, ParseError> {
        self.advance(); // 'print' / 'println'
        self.advance(); // '!'
        self.expect_lparen("after print macro")?;

        let (format, format_loc) = match self.peek_token() {
            Token::StringLiteral(s, l) => {
                self.advance();
                (s, l)
            }
            Token::RParen(_) if newline => (String::new(), self.current_location()),
            other => {
                return Err(self.error_here(format!(
                    "Expected format string literal, found {}",
                    other
                )))
            }
        };

        let mut args = Vec::new();
        while self.match_token(&Token::Comma(self.current_location())) {
            if self.check(&Token::RParen(self.current_location())) {
                break;
            }
            args.push(self.parse_expression()?);
        }
        self.expect_rparen("after print arguments")?;
        self.expect_semicolon("after print")?;

        let format = parse_format_string(&format, format_loc)?;
        let positional = format
            .iter()
            .filter(|p| matches!(p, FormatPiece::Next))
            .count();
        if positional != args.len() {
            return Err(ParseError::syntax(
                format!(
                    "Format string expects {} argument(s) but {} were given",
                    positional,
                    args.len()
                ),
                format_loc,
            ));
        }

        Ok(Instruction::Print {
            format,
            args,
            newline,
            location: loc,
        })
    }

    /// Statements that start with a place: assignment, compound assignment, push.
    fn parse_place_statement(&mut self, loc: SourceLocation) -> Result<Instruction, ParseError> {
        let start = self.peek_token();
        let lhs = self.parse_unary()?;

        if self.check(&Token::Dot(loc)) {
            let method_loc = self.current_location();
            self.advance();
            self.expect_word("push", "as statement method")?;
            self.expect_lparen("after 'push'")?;
            let value = self.parse_expression()?;
            self.expect_rparen("after push argument")?;
            self.expect_semicolon("after push")?;

            let vector = lhs.into_place().ok_or_else(|| {
                ParseError::syntax("push receiver must be a variable or dereference", method_loc)
            })?;
            return Ok(Instruction::Push {
                vector,
                value,
                location: loc,
            });
        }

        let op_loc = self.current_location();
        let op = match self.peek() {
            Token::Eq(_) => None,
            Token::PlusEq(_) => Some(BinOp::Add),
            Token::MinusEq(_) => Some(BinOp::Sub),
            Token::StarEq(_) => Some(BinOp::Mul),
            Token::SlashEq(_) => Some(BinOp::Div),
            Token::PercentEq(_) => Some(BinOp::Mod),
            other => {
                return Err(ParseError::syntax(
                    format!("Expected statement, found {} after {}", other, start),
                    op_loc,
                ))
            }
        };
        self.advance();

        let target = lhs
            .into_place()
            .ok_or_else(|| ParseError::syntax("Invalid assignment target", loc))?;

        if self.at_user_call() {
            let (function, args) = self.parse_call()?;
            self.expect_semicolon("after assignment")?;
            return Ok(Instruction::Call {
                function,
                args,
                target: CallTarget::Assign { place: target, op },
                location: loc,
            });
        }

        let value = self.parse_expression()?;
        self.expect_semicolon("after assignment")?;
        Ok(Instruction::Assign {
            target,
            op,
            value,
            location: loc,
        })
    }
}

/// Split a `print!` format string into literal text and placeholders.
fn parse_format_string(format: &str, loc: SourceLocation) -> Result<Vec<FormatPiece>, ParseError> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut chars = format.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) if c.is_ascii_alphanumeric() || c == '_' => name.push(c),
                        Some(':') => {
                            // Ignore format specs such as `{:?}` or `{x:>4}`
                            for c in chars.by_ref() {
                                if c == '}' {
                                    break;
                                }
                            }
                            break;
                        }
                        _ => {
                            return Err(ParseError::syntax(
                                "Malformed placeholder in format string",
                                loc,
                            ))
                        }
                    }
                }
                if !text.is_empty() {
                    pieces.push(FormatPiece::Text(std::mem::take(&mut text)));
                }
                pieces.push(if name.is_empty() {
                    FormatPiece::Next
                } else {
                    FormatPiece::Named(name)
                });
            }
            '}' => {
                return Err(ParseError::syntax(
                    "Unmatched '}' in format string",
                    loc,
                ))
            }
            c => text.push(c),
        }
    }

    if !text.is_empty() {
        pieces.push(FormatPiece::Text(text));
    }

    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::{parse, ParseError};

    fn main_body(source: &str) -> Vec<Instruction> {
        let program = parse(source).unwrap();
        program.main().unwrap().body.clone()
    }

    #[test]
    fn test_let_lowering() {
        let body = main_body(
            "fn main() {\n let v = vec![1, 2];\n let b = Box::new(5);\n let r = &mut v;\n let x: i32 = 3;\n}",
        );

        assert!(matches!(&body[0], Instruction::VecNew { name, elements, .. } if name == "v" && elements.len() == 2));
        assert!(matches!(&body[1], Instruction::BoxNew { name, .. } if name == "b"));
        assert!(matches!(&body[2], Instruction::TakeRef { mutable: true, target: Place::Var(t), .. } if t == "v"));
        assert!(matches!(&body[3], Instruction::Let { ty: Some(Type::Int), .. }));
        assert_eq!(body[3].location().line, 5);
    }

    #[test]
    fn test_call_targets() {
        let body = main_body(
            "fn main() { f(1); let y = f(2); y = f(3); y += f(4); return f(5); }\nfn f(n: i32) -> i32 { return n; }",
        );

        assert!(matches!(&body[0], Instruction::Call { target: CallTarget::Discard, .. }));
        assert!(matches!(&body[1], Instruction::Call { target: CallTarget::Declare { name, .. }, .. } if name == "y"));
        assert!(matches!(&body[2], Instruction::Call { target: CallTarget::Assign { op: None, .. }, .. }));
        assert!(matches!(&body[3], Instruction::Call { target: CallTarget::Assign { op: Some(BinOp::Add), .. }, .. }));
        assert!(matches!(&body[4], Instruction::Call { target: CallTarget::Return, .. }));
    }

    #[test]
    fn test_nested_call_is_rejected() {
        let err = parse("fn main() { let x = 1 + f(2); }\nfn f(n: i32) -> i32 { return n; }").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_deref_assign_and_push() {
        let body = main_body("fn main() { let a = 1; let p = &a; **p = 3; (*p).push(4); p.push(5); a[6] = 7; }");

        match &body[2] {
            Instruction::Assign {
                target: Place::Deref(inner),
                ..
            } => assert!(matches!(inner.as_ref(), Expr::Deref(..))),
            other => panic!("Expected deref assignment, got {other:?}"),
        }
        assert!(matches!(&body[3], Instruction::Push { vector: Place::Deref(_), .. }));
        assert!(matches!(&body[4], Instruction::Push { vector: Place::Var(v), .. } if v == "p"));
        assert!(matches!(&body[5], Instruction::Assign { target: Place::Index { .. }, .. }));
    }

    #[test]
    fn test_else_if_chain() {
        let body = main_body("fn main() { let x = 1; if x == 0 { x = 1; } else if x == 1 { x = 2; } else { x = 3; } }");

        match &body[1] {
            Instruction::If {
                else_body: Some(else_body),
                ..
            } => {
                assert_eq!(else_body.len(), 1);
                assert!(matches!(else_body[0], Instruction::If { else_body: Some(_), .. }));
            }
            other => panic!("Expected if/else, got {other:?}"),
        }
    }

    #[test]
    fn test_print_format() {
        let body = main_body("fn main() { let n = 4; println!(\"fib({n}) = {}\", n + 1); }");

        match &body[1] {
            Instruction::Print {
                format,
                args,
                newline: true,
                ..
            } => {
                assert_eq!(
                    format,
                    &vec![
                        FormatPiece::Text("fib(".into()),
                        FormatPiece::Named("n".into()),
                        FormatPiece::Text(") = ".into()),
                        FormatPiece::Next,
                    ]
                );
                assert_eq!(args.len(), 1);
            }
            other => panic!("Expected print, got {other:?}"),
        }
    }

    #[test]
    fn test_print_argument_count_mismatch() {
        let err = parse("fn main() { println!(\"{} {}\", 1); }").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_uninitialized_let() {
        let body = main_body("fn main() { let prev: i32; }");
        assert!(matches!(&body[0], Instruction::Let { value: None, ty: Some(Type::Int), .. }));
    }
}
