//! Stepping interpreter
//!
//! This module provides the core execution logic:
//! - [`engine`]: The [`Interpreter`] itself, its run states and `step()`
//! - [`pc`]: The program counter and call/block bookkeeping
//! - [`errors`]: Runtime error types
//! - [`constants`]: Heap address layout
//!
//! # Execution Model
//!
//! Each `step()` executes exactly one instruction against the memory model,
//! or the implicit return at a function's closing brace. A call takes two
//! steps: one to enter the callee, one to deliver its result once it returns.
//! Instruction semantics are split across `statements`, `expressions`,
//! `places`, `calls` and `builtins`, all as `impl Interpreter` blocks.

mod builtins;
mod calls;
pub mod constants;
pub mod engine;
pub mod errors;
mod expressions;
pub mod pc;
mod places;
mod statements;

pub use builtins::SeededRng;
pub use engine::{HaltReason, Interpreter, RunState, StepOutcome};
pub use errors::RuntimeError;
