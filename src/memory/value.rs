//! Runtime value representation
//!
//! This module defines the [`Value`] enum, which represents everything a stack
//! cell or a heap element can hold. Values are tagged, so a pointer always knows
//! whether it points into the stack or into the heap.
//!
//! # Value Types
//!
//! - [`Value::Int`]: 32-bit signed integer
//! - [`Value::Bool`]: boolean
//! - [`Value::Pointer`]: a reference, `Box` or `Vec` handle (see [`Target`])
//! - [`Value::Array`]: a whole array in flight (array reads, by-value passing, returns)
//! - [`Value::Unit`]: result of a function without a return value
//! - [`Value::Uninit`]: a declared cell that was never written
//!
//! Stored arrays never hold a [`Value::Array`]: they occupy one cell per element.

use super::error::MemoryError;
use super::slot::SlotId;

/// Heap address type
pub type Address = u64;

/// What a pointer value designates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// A single stack cell
    Stack(SlotId),
    /// A whole stack array: its first cell and element count
    Array { first: SlotId, len: usize },
    /// A heap block (the handle held by a `Box` or `Vec`)
    Heap(Address),
    /// One element of a heap block's storage
    HeapElement { address: Address, index: usize },
}

/// Runtime values in the interpreter
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Int(i32),
    Bool(bool),
    Pointer(Target),
    Array(Vec<Value>),
    Unit,
    #[default]
    Uninit,
}

impl Value {
    /// Check if this value has been written
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Value::Uninit)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<Target> {
        match self {
            Value::Pointer(target) => Some(*target),
            _ => None,
        }
    }

    /// Heap address if this value is a `Box`/`Vec` handle
    pub fn as_heap_address(&self) -> Option<Address> {
        match self {
            Value::Pointer(Target::Heap(address)) => Some(*address),
            _ => None,
        }
    }

    pub fn expect_int(&self) -> Result<i32, MemoryError> {
        self.as_int()
            .ok_or_else(|| MemoryError::type_mismatch("i32", self))
    }

    pub fn expect_bool(&self) -> Result<bool, MemoryError> {
        self.as_bool()
            .ok_or_else(|| MemoryError::type_mismatch("bool", self))
    }

    pub fn expect_pointer(&self) -> Result<Target, MemoryError> {
        self.as_pointer()
            .ok_or_else(|| MemoryError::type_mismatch("pointer", self))
    }

    /// Short name of the value's kind, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "i32",
            Value::Bool(_) => "bool",
            Value::Pointer(Target::Heap(_)) => "heap handle",
            Value::Pointer(_) => "reference",
            Value::Array(_) => "array",
            Value::Unit => "()",
            Value::Uninit => "uninitialized value",
        }
    }

    /// Heap addresses this value refers to directly
    pub fn heap_addresses(&self) -> Vec<Address> {
        match self {
            Value::Pointer(Target::Heap(address))
            | Value::Pointer(Target::HeapElement { address, .. }) => vec![*address],
            Value::Array(values) => values.iter().flat_map(Value::heap_addresses).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(3).as_int(), Some(3));
        assert_eq!(Value::Bool(true).as_int(), None);
        assert_eq!(Value::Pointer(Target::Heap(0x10)).as_heap_address(), Some(0x10));
        assert!(!Value::default().is_initialized());
    }

    #[test]
    fn test_expect_reports_kind() {
        let err = Value::Bool(false).expect_int().unwrap_err();
        assert!(matches!(err, MemoryError::TypeMismatch { ref found, .. } if found == "bool"));
    }

    #[test]
    fn test_nested_heap_addresses() {
        let value = Value::Array(vec![
            Value::Pointer(Target::Heap(1)),
            Value::Int(0),
            Value::Pointer(Target::HeapElement { address: 2, index: 0 }),
        ]);
        assert_eq!(value.heap_addresses(), vec![1, 2]);
    }
}
