//! # Introduction
//!
//! memstep parses and steps through programs in a small Rust-like language,
//! one instruction at a time, so that the effect of every statement on the
//! stack and the heap can be watched. The state after each step is projected
//! into a [`snapshot::Snapshot`] that a terminal UI, a headless driver or a
//! test can inspect.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → Program → Interpreter ⇄ Memory → Snapshots → TUI
//! ```
//!
//! 1. [`parser`]: tokenises the source and builds a [`parser::ast::Program`]
//!    of flat, located instructions.
//! 2. [`interpreter`]: executes one instruction per [`Interpreter::step`],
//!    driven by a program counter that survives between steps.
//! 3. [`memory`]: frames of slots on the stack, blocks on the heap, and the
//!    references between them.
//! 4. [`snapshot`]: serializable views of a run and a memory-bounded history
//!    of them, plus the [`snapshot::MockTerminal`] that collects output.
//! 5. [`ui`]: ratatui-based TUI; not part of the stable library API.
//!
//! ## Supported language
//!
//! Types: `i32`, `bool`, `[T; N]`, `&T`, `&mut T`, `Box<T>`, `Vec<T>`.
//! Control flow: `if`/`else if`/`else`, `while`, function calls, `return`.
//! Built-ins: `print!`, `println!`, `drop`, `rand_int`, `Box::new`, `vec!`,
//! `Vec::new`, `Vec::with_capacity`, `.push`, `.len`, `.clone`.
//!
//! ## Example
//!
//! ```
//! use memstep::config::RunConfig;
//! use memstep::interpreter::Interpreter;
//! use memstep::parser::parse;
//!
//! let program = parse("fn main() {\n    let x = 40 + 2;\n    println!(\"{x}\");\n}\n").unwrap();
//! let mut interpreter = Interpreter::new(program, RunConfig::default());
//! interpreter.run_to_end(100);
//! assert_eq!(interpreter.output().get_output(), vec!["42"]);
//! ```

pub mod config;
pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod programs;
pub mod snapshot;
pub mod ui;

pub use interpreter::Interpreter;
