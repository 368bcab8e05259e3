//! Instruction execution implementation
//!
//! This module executes one instruction of the closed instruction set per call:
//!
//! - Declarations (`let`, `vec!`/`Vec::*`, `Box::new`, `&place`)
//! - Assignment through variables, dereference chains and indices
//! - Heap operations (`push`, `drop`)
//! - Control flow (`if`/`else`, `while`, `return`)
//! - `print!`/`println!`
//!
//! Calls live in `calls`, since they span two steps.
//!
//! # Implementation
//!
//! All execution methods are implemented as `pub(crate)` methods on the
//! [`Interpreter`] struct. Each returns the [`Flow`] the engine should follow;
//! the engine settles the program counter afterwards, so an instruction only
//! needs to move within its own body.

use tracing::{debug, warn};

use crate::interpreter::engine::{Flow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::pc::Branch;
use crate::memory::value::{Target, Value};
use crate::parser::ast::*;

impl Interpreter {
    pub(crate) fn execute_instruction(
        &mut self,
        instruction: &Instruction,
    ) -> Result<Flow, RuntimeError> {
        match instruction {
            Instruction::Let {
                name,
                ty,
                value,
                location,
                ..
            } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Uninit,
                };
                let ty = self.binding_type(ty.as_ref(), &value);
                self.declare(name, ty, value, *location)?;
            }

            Instruction::Assign {
                target,
                op,
                value,
                location,
            } => {
                let value = self.eval(value)?;
                self.assign(target, *op, value, *location)?;
            }

            Instruction::VecNew {
                name,
                ty,
                elements,
                capacity,
                location,
                ..
            } => {
                let handle = self.allocate_vector(elements, capacity.as_ref(), *location)?;
                let ty = self.binding_type(ty.as_ref(), &handle);
                self.declare(name, ty, handle, *location)?;
            }

            Instruction::Push {
                vector,
                value,
                location,
            } => self.execute_push(vector, value, *location)?,

            Instruction::BoxNew {
                name,
                ty,
                value,
                location,
                ..
            } => {
                let value = self.eval(value)?;
                let handle = self.allocate_box(value, *location)?;
                let ty = self.binding_type(ty.as_ref(), &handle);
                self.declare(name, ty, handle, *location)?;
            }

            Instruction::TakeRef {
                name,
                mutable,
                target,
                location,
            } => {
                let (pointer, pointee) = self.reference_to(target, *location)?;
                self.declare(name, Type::reference(pointee, *mutable), pointer, *location)?;
            }

            Instruction::Drop { name, location } => self.execute_drop(name, *location)?,

            Instruction::Call {
                function,
                args,
                target,
                location,
            } => return self.execute_call(function, args, target, *location),

            Instruction::Return { value, location } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Unit,
                };
                return self.return_from_function(value, *location);
            }

            Instruction::If {
                condition,
                else_body,
                location,
                ..
            } => {
                let taken = self.eval_condition(condition, *location)?;
                let resume = self.pc.index + 1;
                if taken {
                    self.memory.push_scope();
                    self.pc.enter(Branch::Then, resume);
                } else if else_body.is_some() {
                    self.memory.push_scope();
                    self.pc.enter(Branch::Else, resume);
                } else {
                    self.pc.advance();
                }
                return Ok(Flow::Continue);
            }

            Instruction::While {
                condition,
                location,
                ..
            } => {
                if self.eval_condition(condition, *location)? {
                    self.memory.push_scope();
                    let resume = self.pc.index;
                    self.pc.enter(Branch::Loop, resume);
                } else {
                    self.pc.advance();
                }
                return Ok(Flow::Continue);
            }

            Instruction::Print {
                format,
                args,
                newline,
                location,
            } => {
                let text = self.format_print(format, args, *location)?;
                self.terminal.print(&text, *newline, *location);
            }
        }

        self.pc.advance();
        Ok(Flow::Continue)
    }

    fn eval_condition(&mut self, condition: &Expr, location: SourceLocation) -> Result<bool, RuntimeError> {
        self.eval(condition)?
            .expect_bool()
            .map_err(|e| e.at(location))
    }

    pub(crate) fn declare(
        &mut self,
        name: &str,
        ty: Type,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        self.memory
            .declare(name, ty, value)
            .map(|_| ())
            .map_err(|e| e.at(location))
    }

    /// Write `value` (or `current op value`) to a place
    pub(crate) fn assign(
        &mut self,
        target: &Place,
        op: Option<BinOp>,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let place = self.resolve_place(target, location)?;
        let value = match op {
            Some(op) => {
                let current = self.read_location(&place, location)?;
                self.binary_op(op, current, value, location)?
            }
            None => value,
        };
        self.write_location(&place, value, location)
    }

    fn execute_push(&mut self, vector: &Place, value: &Expr, location: SourceLocation) -> Result<(), RuntimeError> {
        let value = self.eval(value)?;
        let place = self.resolve_place(vector, location)?;
        let slot = self.handle_slot(place, location)?;
        let address = self
            .memory
            .read_slot(slot)
            .map_err(|e| e.at(location))?
            .as_heap_address()
            .ok_or_else(|| RuntimeError::type_mismatch("Vec", "reference", location))?;

        let growth = self.config.growth;
        let outcome = self
            .memory
            .heap_mut()
            .push(address, value, growth)
            .map_err(|e| e.at(location))?;

        if let Some(old) = outcome.moved_from {
            self.memory
                .write_slot(slot, Value::Pointer(Target::Heap(outcome.address)))
                .map_err(|e| e.at(location))?;

            let stale = self
                .memory
                .slots()
                .live_slots()
                .filter(|(_, s)| s.value.as_heap_address() == Some(old))
                .count();
            debug!(
                old = format_args!("0x{:x}", old),
                new = format_args!("0x{:x}", outcome.address),
                "vector reallocated"
            );
            if stale > 0 {
                warn!(
                    old = format_args!("0x{:x}", old),
                    stale, "reallocation left handles pointing at the freed block"
                );
            }
        }

        Ok(())
    }

    fn execute_drop(&mut self, name: &str, location: SourceLocation) -> Result<(), RuntimeError> {
        let binding = self.memory.lookup(name).map_err(|e| e.at(location))?;
        if binding.aliased {
            return Err(RuntimeError::type_mismatch("owned Box or Vec", "reference", location));
        }

        let place = self.variable_location(name, location)?;
        let value = self.read_location(&place, location)?;
        let address = value
            .as_heap_address()
            .ok_or_else(|| RuntimeError::type_mismatch("Box or Vec", value.kind_name(), location))?;

        self.memory
            .heap_mut()
            .free(address)
            .map_err(|e| e.at(location))?;
        debug!(name, address = format_args!("0x{:x}", address), "dropped");
        Ok(())
    }

    /// The declared type if there is one, otherwise whatever the value implies
    pub(crate) fn binding_type(&self, declared: Option<&Type>, value: &Value) -> Type {
        match declared {
            Some(ty) if *ty != Type::Unknown => ty.clone(),
            _ => self.infer_type(value),
        }
    }

    pub(crate) fn infer_type(&self, value: &Value) -> Type {
        match value {
            Value::Int(_) => Type::Int,
            Value::Bool(_) => Type::Bool,
            Value::Array(values) => {
                let elem = values.first().map_or(Type::Int, |v| self.infer_type(v));
                Type::array(elem, values.len())
            }
            Value::Pointer(Target::Stack(id)) => {
                let inner = self
                    .memory
                    .slots()
                    .get(*id)
                    .map_or(Type::Unknown, |slot| slot.ty.clone());
                Type::reference(inner, false)
            }
            Value::Pointer(Target::Array { first, len }) => {
                let elem = self
                    .memory
                    .slots()
                    .get(*first)
                    .map_or(Type::Int, |slot| slot.ty.clone());
                Type::reference(Type::array(elem, *len), false)
            }
            Value::Pointer(Target::Heap(address)) => match self.memory.heap().get(*address) {
                Some(block) if block.kind == crate::memory::heap::BlockKind::Vector => {
                    let elem = block.elements().first().map_or(Type::Int, |v| self.infer_type(v));
                    Type::vector(elem)
                }
                Some(block) => Type::boxed(self.infer_type(&block.contents())),
                None => Type::Unknown,
            },
            Value::Pointer(Target::HeapElement { .. }) => Type::reference(Type::Int, false),
            Value::Unit | Value::Uninit => Type::Unknown,
        }
    }
}
