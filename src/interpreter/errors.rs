//! Runtime error types for the interpreter
//!
//! This module defines [`RuntimeError`], which represents all errors that can occur
//! during program execution (as opposed to parse errors or system errors).
//!
//! All runtime errors are fatal: they halt execution, the memory model is rolled
//! back to its state before the failing instruction, and the error stays attached
//! to the halted interpreter for inspection. Out-of-bounds array access is
//! deliberately *not* an error.

use crate::parser::ast::SourceLocation;
use thiserror::Error;

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A name was declared twice while the first binding is still live
    #[error("Variable '{name}' is already declared at line {}", .location.line)]
    DuplicateDeclaration {
        name: String,
        location: SourceLocation,
    },

    #[error("Undeclared variable '{name}' at line {}", .location.line)]
    UndeclaredVariable {
        name: String,
        location: SourceLocation,
    },

    /// Read or write through a reference to a dead slot or a freed heap block
    #[error("Dangling pointer access: {target} at line {}", .location.line)]
    DanglingPointerAccess {
        target: String,
        location: SourceLocation,
    },

    #[error("Double free at address 0x{address:x} at line {}", .location.line)]
    DoubleFreeAttempt {
        address: u64,
        location: SourceLocation,
    },

    /// Division or remainder by zero, or an empty `rand_int` range
    #[error("{message} at line {}", .location.line)]
    ArithmeticError {
        message: String,
        location: SourceLocation,
    },

    #[error("Invalid free: address 0x{address:x} was never allocated at line {}", .location.line)]
    InvalidFree {
        address: u64,
        location: SourceLocation,
    },

    #[error("Type error at line {}: expected {expected}, got {found}", .location.line)]
    TypeMismatch {
        expected: String,
        found: String,
        location: SourceLocation,
    },

    #[error("Undefined function '{name}' at line {}", .location.line)]
    UnknownFunction {
        name: String,
        location: SourceLocation,
    },

    #[error(
        "Function '{function}' expects {expected} argument{}, got {got} at line {}",
        plural(.expected),
        .location.line
    )]
    ArgumentCountMismatch {
        function: String,
        expected: usize,
        got: usize,
        location: SourceLocation,
    },

    #[error("Stack overflow: call depth exceeded {limit} frames at line {}", .location.line)]
    StackOverflow {
        limit: usize,
        location: SourceLocation,
    },

    /// An array, `Vec` or box would need more cells than the run allows
    #[error(
        "Allocation of {requested} cells exceeds the limit of {limit} at line {}",
        .location.line
    )]
    AllocationTooLarge {
        requested: usize,
        limit: usize,
        location: SourceLocation,
    },
}

fn plural(n: &usize) -> &'static str {
    if *n == 1 {
        ""
    } else {
        "s"
    }
}

impl RuntimeError {
    pub fn location(&self) -> SourceLocation {
        match self {
            RuntimeError::DuplicateDeclaration { location, .. }
            | RuntimeError::UndeclaredVariable { location, .. }
            | RuntimeError::DanglingPointerAccess { location, .. }
            | RuntimeError::DoubleFreeAttempt { location, .. }
            | RuntimeError::ArithmeticError { location, .. }
            | RuntimeError::InvalidFree { location, .. }
            | RuntimeError::TypeMismatch { location, .. }
            | RuntimeError::UnknownFunction { location, .. }
            | RuntimeError::ArgumentCountMismatch { location, .. }
            | RuntimeError::StackOverflow { location, .. }
            | RuntimeError::AllocationTooLarge { location, .. } => *location,
        }
    }

    /// Short, stable name of the error kind (used in snapshots and JSON output)
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeError::DuplicateDeclaration { .. } => "DuplicateDeclaration",
            RuntimeError::UndeclaredVariable { .. } => "UndeclaredVariable",
            RuntimeError::DanglingPointerAccess { .. } => "DanglingPointerAccess",
            RuntimeError::DoubleFreeAttempt { .. } => "DoubleFreeAttempt",
            RuntimeError::ArithmeticError { .. } => "ArithmeticError",
            RuntimeError::InvalidFree { .. } => "InvalidFree",
            RuntimeError::TypeMismatch { .. } => "TypeMismatch",
            RuntimeError::UnknownFunction { .. } => "UnknownFunction",
            RuntimeError::ArgumentCountMismatch { .. } => "ArgumentCountMismatch",
            RuntimeError::StackOverflow { .. } => "StackOverflow",
            RuntimeError::AllocationTooLarge { .. } => "AllocationTooLarge",
        }
    }

    pub(crate) fn arithmetic(message: impl Into<String>, location: SourceLocation) -> Self {
        RuntimeError::ArithmeticError {
            message: message.into(),
            location,
        }
    }

    pub(crate) fn type_mismatch(
        expected: impl Into<String>,
        found: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        RuntimeError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
            location,
        }
    }
}
