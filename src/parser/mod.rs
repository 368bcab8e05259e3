//! Source parser for the teaching language
//!
//! This module turns program text into the closed instruction set the
//! interpreter executes:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parser entry point, error type and shared helpers
//! - [`ast`]: Instruction, expression and type definitions
//!
//! # Supported Subset
//!
//! The language is a small, Rust-flavoured subset aimed at memory diagrams:
//! - Types: `i32` (and the other integer spellings), `bool`, `[T; N]`, `&T`, `&mut T`,
//!   `Box<T>`, `Vec<T>`
//! - Statements: `let`, assignment and compound assignment, `if`/`else`, `while`,
//!   `return`, `drop`, `push`, `print!`/`println!`
//! - Function calls appear only as a whole statement or as the right-hand side of
//!   `let`, assignment or `return`
//! - No structs, traits, closures, slices or generics beyond `Box`/`Vec`
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies.

pub mod ast;
pub mod declarations;
pub mod expressions;
pub mod lexer;
pub mod parse;
pub mod statements;

pub use parse::{parse, ParseError, Parser};
