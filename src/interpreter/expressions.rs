//! Expression evaluation implementation
//!
//! This module handles evaluation of every expression form:
//!
//! - Literals (integers, booleans, arrays, `[v; n]`)
//! - Variables, dereferences and indices (through [`places`](super::places))
//! - Binary and unary operators
//! - `&place`, `.len()` and `.clone()`
//! - Heap literals (`vec![..]`, `Vec::new()`, `Vec::with_capacity(n)`, `Box::new(..)`)
//! - `rand_int(lo, hi)`
//!
//! # Arithmetic
//!
//! `i32` arithmetic wraps on overflow, as a release build would. Division and
//! remainder by zero are runtime errors.

use tracing::trace;

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::BlockKind;
use crate::memory::value::{Target, Value};
use crate::parser::ast::*;

impl Interpreter {
    /// Evaluate an expression and return its value
    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        let location = expr.location();

        match expr {
            Expr::IntLiteral(n, _) => Ok(Value::Int(*n)),

            Expr::BoolLiteral(b, _) => Ok(Value::Bool(*b)),

            Expr::Variable(name, _) => {
                let binding = self.memory.lookup(name).map_err(|e| e.at(location))?;
                if binding.aliased {
                    // A by-reference parameter evaluates to the reference itself
                    let first = binding.first_slot().ok_or_else(|| {
                        RuntimeError::UndeclaredVariable {
                            name: name.clone(),
                            location,
                        }
                    })?;
                    let target = if binding.is_array() {
                        Target::Array {
                            first,
                            len: binding.slots.len(),
                        }
                    } else {
                        Target::Stack(first)
                    };
                    return Ok(Value::Pointer(target));
                }
                let place = self.variable_location(name, location)?;
                self.read_location(&place, location)
            }

            Expr::ArrayLiteral(elements, _) => elements
                .iter()
                .map(|e| self.eval(e))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),

            Expr::ArrayRepeat { value, count, .. } => {
                self.memory.heap().check_size(*count).map_err(|e| e.at(location))?;
                let value = self.eval(value)?;
                Ok(Value::Array(vec![value; *count]))
            }

            Expr::Reference { target, .. } => Ok(self.reference_to(target, location)?.0),

            Expr::Deref(inner, _) => {
                let place = self.deref_location(inner, location)?;
                self.read_location(&place, location)
            }

            Expr::Index { base, index, .. } => {
                if let Some(place) = expr.clone().into_place() {
                    let place = self.resolve_place(&place, location)?;
                    return self.read_location(&place, location);
                }

                let base = self.eval(base)?;
                let index = self.eval(index)?.expect_int().map_err(|e| e.at(location))?;
                match base {
                    Value::Array(values) => Ok(usize::try_from(index)
                        .ok()
                        .and_then(|i| values.get(i).cloned())
                        .unwrap_or_default()),
                    other => {
                        let place = self.index_through(&other, i64::from(index), location)?;
                        self.read_location(&place, location)
                    }
                }
            }

            Expr::Binary {
                op: BinOp::And,
                left,
                right,
                ..
            } => {
                if !self.eval_bool(left, location)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval_bool(right, location)?))
            }

            Expr::Binary {
                op: BinOp::Or,
                left,
                right,
                ..
            } => {
                if self.eval_bool(left, location)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval_bool(right, location)?))
            }

            Expr::Binary {
                op, left, right, ..
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.binary_op(*op, left, right, location)
            }

            Expr::Unary { op, operand, .. } => {
                let value = self.eval(operand)?;
                match (op, value) {
                    (UnOp::Neg, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
                    (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnOp::Not, Value::Int(n)) => Ok(Value::Int(!n)),
                    (UnOp::Neg, other) => Err(RuntimeError::type_mismatch("i32", other.kind_name(), location)),
                    (UnOp::Not, other) => Err(RuntimeError::type_mismatch("bool or i32", other.kind_name(), location)),
                }
            }

            Expr::Len(inner, _) => {
                let value = self.eval(inner)?;
                self.length_of(&value, location).map(|n| Value::Int(n as i32))
            }

            Expr::Clone(inner, _) => {
                let value = self.eval(inner)?;
                self.clone_value(value, location)
            }

            Expr::VecLiteral {
                elements, capacity, ..
            } => self.allocate_vector(elements, capacity.as_deref(), location),

            Expr::BoxNew(inner, _) => {
                let value = self.eval(inner)?;
                self.allocate_box(value, location)
            }

            Expr::RandInt { low, high, .. } => {
                let low = self.eval(low)?.expect_int().map_err(|e| e.at(location))?;
                let high = self.eval(high)?.expect_int().map_err(|e| e.at(location))?;
                if low > high {
                    return Err(RuntimeError::arithmetic(
                        format!("rand_int range {}..={} is empty", low, high),
                        location,
                    ));
                }
                let n = self.rng.range_inclusive(low, high);
                trace!(low, high, n, "rand_int");
                Ok(Value::Int(n))
            }
        }
    }

    fn eval_bool(&mut self, expr: &Expr, location: SourceLocation) -> Result<bool, RuntimeError> {
        self.eval(expr)?.expect_bool().map_err(|e| e.at(location))
    }

    /// Apply a binary operator to two evaluated operands
    #[inline]
    pub(crate) fn binary_op(
        &self,
        op: BinOp,
        left: Value,
        right: Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match (left, right) {
            (Value::Int(l), Value::Int(r)) => Self::int_op(op, l, r, location),
            (Value::Bool(l), Value::Bool(r)) => match op {
                BinOp::Eq => Ok(Value::Bool(l == r)),
                BinOp::Ne => Ok(Value::Bool(l != r)),
                BinOp::And => Ok(Value::Bool(l && r)),
                BinOp::Or => Ok(Value::Bool(l || r)),
                _ => Err(RuntimeError::type_mismatch("i32", "bool", location)),
            },
            (l, r) if matches!(op, BinOp::Eq | BinOp::Ne) && l.kind_name() == r.kind_name() => {
                let equal = l == r;
                Ok(Value::Bool(if op == BinOp::Eq { equal } else { !equal }))
            }
            (Value::Int(_), other) | (other, _) => Err(RuntimeError::type_mismatch(
                format!("operands for '{}'", op.symbol()),
                other.kind_name(),
                location,
            )),
        }
    }

    #[inline]
    fn int_op(op: BinOp, l: i32, r: i32, location: SourceLocation) -> Result<Value, RuntimeError> {
        let value = match op {
            BinOp::Add => Value::Int(l.wrapping_add(r)),
            BinOp::Sub => Value::Int(l.wrapping_sub(r)),
            BinOp::Mul => Value::Int(l.wrapping_mul(r)),
            BinOp::Div => {
                if r == 0 {
                    return Err(RuntimeError::arithmetic("Division by zero", location));
                }
                Value::Int(l.wrapping_div(r))
            }
            BinOp::Mod => {
                if r == 0 {
                    return Err(RuntimeError::arithmetic("Remainder by zero", location));
                }
                Value::Int(l.wrapping_rem(r))
            }
            BinOp::Eq => Value::Bool(l == r),
            BinOp::Ne => Value::Bool(l != r),
            BinOp::Lt => Value::Bool(l < r),
            BinOp::Le => Value::Bool(l <= r),
            BinOp::Gt => Value::Bool(l > r),
            BinOp::Ge => Value::Bool(l >= r),
            BinOp::And | BinOp::Or => {
                return Err(RuntimeError::type_mismatch("bool", "i32", location));
            }
        };
        Ok(value)
    }

    /// Element count of an array, a `Vec`, or whatever a reference points at
    fn length_of(&self, value: &Value, location: SourceLocation) -> Result<usize, RuntimeError> {
        match value {
            Value::Array(values) => Ok(values.len()),
            Value::Pointer(Target::Array { len, .. }) => Ok(*len),
            Value::Pointer(Target::Heap(address)) => self
                .memory
                .heap()
                .block(*address)
                .map(|block| block.len())
                .map_err(|e| e.at(location)),
            Value::Pointer(Target::Stack(id)) => {
                let referent = self.memory.read_slot(*id).map_err(|e| e.at(location))?;
                self.length_of(&referent, location)
            }
            other => Err(RuntimeError::type_mismatch("array or Vec", other.kind_name(), location)),
        }
    }

    /// `.clone()`: heap handles get a fresh block, references clone their referent
    fn clone_value(&mut self, value: Value, location: SourceLocation) -> Result<Value, RuntimeError> {
        match value {
            Value::Pointer(Target::Heap(address)) => {
                let copy = self
                    .memory
                    .heap_mut()
                    .clone_block(address)
                    .map_err(|e| e.at(location))?;
                Ok(Value::Pointer(Target::Heap(copy)))
            }
            Value::Pointer(Target::Stack(id)) => {
                let referent = self.memory.read_slot(id).map_err(|e| e.at(location))?;
                self.clone_value(referent, location)
            }
            array @ Value::Pointer(Target::Array { .. }) => {
                let place = self.pointer_location(&array, location)?;
                self.read_location(&place, location)
            }
            other => Ok(other),
        }
    }

    /// Allocate a `Vec` block; capacity is the larger of the element count and
    /// the requested capacity. Sizes are checked against the cell limit before
    /// any storage is built.
    pub(crate) fn allocate_vector(
        &mut self,
        elements: &VecInit,
        capacity: Option<&Expr>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let requested = match capacity {
            Some(expr) => {
                let n = self.eval(expr)?.expect_int().map_err(|e| e.at(location))?;
                usize::try_from(n).map_err(|_| {
                    RuntimeError::arithmetic(format!("capacity {} is negative", n), location)
                })?
            }
            None => 0,
        };
        let capacity = requested.max(elements.len());
        self.memory.heap().check_size(capacity).map_err(|e| e.at(location))?;

        let values = match elements {
            VecInit::List(elements) => elements
                .iter()
                .map(|e| self.eval(e))
                .collect::<Result<Vec<_>, _>>()?,
            VecInit::Repeat { value, count } => vec![self.eval(value)?; *count],
        };

        let address = self
            .memory
            .heap_mut()
            .allocate(BlockKind::Vector, values, capacity)
            .map_err(|e| e.at(location))?;
        Ok(Value::Pointer(Target::Heap(address)))
    }

    /// Allocate a `Box` block; a boxed array gets one element per cell
    pub(crate) fn allocate_box(&mut self, value: Value, location: SourceLocation) -> Result<Value, RuntimeError> {
        let elements = match value {
            Value::Array(values) => values,
            value => vec![value],
        };
        let capacity = elements.len();
        let address = self
            .memory
            .heap_mut()
            .allocate(BlockKind::Boxed, elements, capacity)
            .map_err(|e| e.at(location))?;
        Ok(Value::Pointer(Target::Heap(address)))
    }
}
