//! Errors raised by memory model operations
//!
//! Memory operations do not know which instruction triggered them, so
//! [`MemoryError`] carries no location. The interpreter attaches one with
//! [`MemoryError::at`] when it turns the failure into a [`RuntimeError`].

use super::value::{Address, Value};
use crate::interpreter::errors::RuntimeError;
use crate::parser::ast::SourceLocation;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MemoryError {
    #[error("'{name}' is already declared in this frame")]
    DuplicateDeclaration { name: String },

    #[error("'{name}' is not declared")]
    UndeclaredVariable { name: String },

    /// The slot belonged to a frame or block scope that has ended
    #[error("'{label}' is no longer live")]
    DeadSlot { label: String },

    #[error("heap block 0x{address:x} has been freed")]
    FreedBlock { address: Address },

    #[error("heap block 0x{address:x} is already freed")]
    DoubleFree { address: Address },

    #[error("0x{address:x} was never allocated")]
    InvalidFree { address: Address },

    #[error("0x{address:x} is not a heap block")]
    UnknownBlock { address: Address },

    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("{requested} cells exceeds the allocation limit of {limit}")]
    AllocationTooLarge { requested: usize, limit: usize },
}

impl MemoryError {
    pub fn type_mismatch(expected: impl Into<String>, found: &Value) -> Self {
        MemoryError::TypeMismatch {
            expected: expected.into(),
            found: found.kind_name().to_string(),
        }
    }

    /// Attach the location of the instruction that triggered this error.
    pub fn at(self, location: SourceLocation) -> RuntimeError {
        match self {
            MemoryError::DuplicateDeclaration { name } => {
                RuntimeError::DuplicateDeclaration { name, location }
            }
            MemoryError::UndeclaredVariable { name } => {
                RuntimeError::UndeclaredVariable { name, location }
            }
            MemoryError::DeadSlot { label } => RuntimeError::DanglingPointerAccess {
                target: format!("'{}' is no longer live", label),
                location,
            },
            MemoryError::FreedBlock { address } => RuntimeError::DanglingPointerAccess {
                target: format!("heap block 0x{:x} has been freed", address),
                location,
            },
            MemoryError::UnknownBlock { address } => RuntimeError::DanglingPointerAccess {
                target: format!("0x{:x} is not a heap block", address),
                location,
            },
            MemoryError::DoubleFree { address } => {
                RuntimeError::DoubleFreeAttempt { address, location }
            }
            MemoryError::InvalidFree { address } => RuntimeError::InvalidFree { address, location },
            MemoryError::TypeMismatch { expected, found } => RuntimeError::TypeMismatch {
                expected,
                found,
                location,
            },
            MemoryError::AllocationTooLarge { requested, limit } => RuntimeError::AllocationTooLarge {
                requested,
                limit,
                location,
            },
        }
    }
}
