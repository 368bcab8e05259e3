//! Place resolution
//!
//! Turns an assignable expression (`x`, `*p`, `**pp`, `arr[i]`, `v[i]`) into a
//! concrete [`Location`] in the memory model, and reads or writes it.
//!
//! # Out-of-bounds access
//!
//! Indexing a stack array is plain offset arithmetic over the stack's storage
//! order, with no bounds check: `arr[len]` is the array's padding cell and
//! `arr[len + 1]` the next variable, or the caller's frame when the array was
//! declared last. Only offsets past the top frame or past `main` resolve to
//! [`Location::Unmapped`]; reads there yield an uninitialised value and writes
//! are discarded. Heap indices address the block's raw storage, spare
//! capacity included.

use tracing::{debug, warn};

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::error::MemoryError;
use crate::memory::slot::SlotId;
use crate::memory::value::{Address, Target, Value};
use crate::parser::ast::{Expr, Place, SourceLocation, Type};

/// A resolved place
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Location {
    Cell(SlotId),
    /// Every cell of a stack array, in order
    Cells(Vec<SlotId>),
    /// The contents of a `Box`
    Heap(Address),
    HeapElement { address: Address, index: i64 },
    /// Below the top frame or above `main`
    Unmapped { offset: i64 },
}

impl Interpreter {
    pub(crate) fn resolve_place(
        &mut self,
        place: &Place,
        location: SourceLocation,
    ) -> Result<Location, RuntimeError> {
        match place {
            Place::Var(name) => self.variable_location(name, location),
            Place::Deref(inner) => self.deref_location(inner, location),
            Place::Index { base, index } => {
                let base = self.resolve_place(base, location)?;
                let index = self.eval_index(index, location)?;
                self.index_location(base, index, location)
            }
        }
    }

    /// Storage behind a name; an alias resolves to the caller's cells
    pub(crate) fn variable_location(
        &self,
        name: &str,
        location: SourceLocation,
    ) -> Result<Location, RuntimeError> {
        let binding = self.memory.lookup(name).map_err(|e| e.at(location))?;
        if binding.is_array() {
            return Ok(Location::Cells(binding.slots.clone()));
        }
        binding
            .first_slot()
            .map(Location::Cell)
            .ok_or_else(|| MemoryError::DeadSlot { label: name.to_string() }.at(location))
    }

    /// The place `*expr` designates
    pub(crate) fn deref_location(
        &mut self,
        expr: &Expr,
        location: SourceLocation,
    ) -> Result<Location, RuntimeError> {
        if let Expr::Variable(name, _) = expr {
            let aliased = self
                .memory
                .lookup(name)
                .map_err(|e| e.at(location))?
                .aliased;
            if aliased {
                return self.variable_location(name, location);
            }
        }
        let pointer = self.eval(expr)?;
        self.pointer_location(&pointer, location)
    }

    /// The place a pointer value designates
    pub(crate) fn pointer_location(&self, pointer: &Value, location: SourceLocation) -> Result<Location, RuntimeError> {
        let target = pointer.expect_pointer().map_err(|e| e.at(location))?;
        match target {
            Target::Stack(id) => Ok(Location::Cell(id)),
            Target::Array { first, len } => {
                if !self.memory.slots().is_live(first) {
                    return Err(self.dead_slot(first, location));
                }
                (0..len as i64)
                    .map(|i| self.memory.offset_cell(first, i))
                    .collect::<Option<Vec<_>>>()
                    .map(Location::Cells)
                    .ok_or_else(|| self.dead_slot(first, location))
            }
            Target::Heap(address) => Ok(Location::Heap(address)),
            Target::HeapElement { address, index } => Ok(Location::HeapElement {
                address,
                index: index as i64,
            }),
        }
    }

    fn eval_index(&mut self, index: &Expr, location: SourceLocation) -> Result<i64, RuntimeError> {
        let value = self.eval(index)?;
        value
            .expect_int()
            .map(i64::from)
            .map_err(|e| e.at(location))
    }

    pub(crate) fn index_location(
        &self,
        base: Location,
        index: i64,
        location: SourceLocation,
    ) -> Result<Location, RuntimeError> {
        match base {
            Location::Cells(cells) => Ok(match cells.first() {
                Some(&first) => self.stack_offset(first, index),
                None => Location::Unmapped { offset: index },
            }),
            Location::Cell(id) => {
                let value = self.memory.read_slot(id).map_err(|e| e.at(location))?;
                self.index_through(&value, index, location)
            }
            Location::Heap(address) => Ok(Location::HeapElement { address, index }),
            Location::HeapElement { address, index: at } => {
                let value = self
                    .memory
                    .heap()
                    .read_element(address, at)
                    .map_err(|e| e.at(location))?
                    .unwrap_or_default();
                self.index_through(&value, index, location)
            }
            Location::Unmapped { .. } => Err(RuntimeError::type_mismatch(
                "indexable value",
                "unmapped memory",
                location,
            )),
        }
    }

    /// Index into whatever a handle or reference value designates
    pub(crate) fn index_through(
        &self,
        value: &Value,
        index: i64,
        location: SourceLocation,
    ) -> Result<Location, RuntimeError> {
        match value {
            Value::Pointer(Target::Heap(address)) => Ok(Location::HeapElement {
                address: *address,
                index,
            }),
            Value::Pointer(Target::Array { first, .. }) => {
                if !self.memory.slots().is_live(*first) {
                    return Err(self.dead_slot(*first, location));
                }
                Ok(self.stack_offset(*first, index))
            }
            Value::Pointer(Target::Stack(id)) => {
                let referent = self.memory.read_slot(*id).map_err(|e| e.at(location))?;
                self.index_through(&referent, index, location)
            }
            other => Err(RuntimeError::type_mismatch("array or Vec", other.kind_name(), location)),
        }
    }

    fn stack_offset(&self, first: SlotId, index: i64) -> Location {
        match self.memory.offset_cell(first, index) {
            Some(id) => Location::Cell(id),
            None => Location::Unmapped { offset: index },
        }
    }

    pub(crate) fn dead_slot(&self, id: SlotId, location: SourceLocation) -> RuntimeError {
        let label = self
            .memory
            .slots()
            .get(id)
            .map_or_else(|| id.to_string(), |slot| slot.label.clone());
        MemoryError::DeadSlot { label }.at(location)
    }

    pub(crate) fn read_location(&self, place: &Location, location: SourceLocation) -> Result<Value, RuntimeError> {
        match place {
            Location::Cell(id) => self.memory.read_slot(*id).map_err(|e| e.at(location)),
            Location::Cells(ids) => ids
                .iter()
                .map(|&id| self.memory.read_slot(id).map_err(|e| e.at(location)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Location::Heap(address) => self
                .memory
                .heap()
                .block(*address)
                .map(|block| block.contents())
                .map_err(|e| e.at(location)),
            Location::HeapElement { address, index } => {
                let value = self
                    .memory
                    .heap()
                    .read_element(*address, *index)
                    .map_err(|e| e.at(location))?;
                Ok(value.unwrap_or_else(|| {
                    debug!(address = format_args!("0x{:x}", address), index, "read past heap block");
                    Value::Uninit
                }))
            }
            Location::Unmapped { offset } => {
                debug!(offset, line = location.line, "read from unmapped stack memory");
                Ok(Value::Uninit)
            }
        }
    }

    pub(crate) fn write_location(
        &mut self,
        place: &Location,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        match place {
            Location::Cell(id) => self.memory.write_slot(*id, value).map_err(|e| e.at(location)),
            Location::Cells(ids) => match value {
                Value::Array(values) if values.len() == ids.len() => {
                    for (&id, value) in ids.iter().zip(values) {
                        self.memory.write_slot(id, value).map_err(|e| e.at(location))?;
                    }
                    Ok(())
                }
                other => Err(RuntimeError::type_mismatch(
                    format!("array of {} elements", ids.len()),
                    other.kind_name(),
                    location,
                )),
            },
            Location::Heap(address) => self
                .memory
                .heap_mut()
                .write_contents(*address, value)
                .map_err(|e| e.at(location)),
            Location::HeapElement { address, index } => {
                let written = self
                    .memory
                    .heap_mut()
                    .write_element(*address, *index, value)
                    .map_err(|e| e.at(location))?;
                if !written {
                    warn!(
                        address = format_args!("0x{:x}", address),
                        index,
                        line = location.line,
                        "write past heap block discarded"
                    );
                }
                Ok(())
            }
            Location::Unmapped { offset } => {
                warn!(offset, line = location.line, "write to unmapped stack memory discarded");
                Ok(())
            }
        }
    }

    /// Pointer value for `&place`, and the type it points at
    pub(crate) fn reference_to(
        &mut self,
        place: &Place,
        location: SourceLocation,
    ) -> Result<(Value, Type), RuntimeError> {
        match self.resolve_place(place, location)? {
            Location::Cell(id) => {
                let slot = self
                    .memory
                    .slots()
                    .get(id)
                    .filter(|slot| slot.live)
                    .ok_or_else(|| self.dead_slot(id, location))?;
                Ok((Value::Pointer(Target::Stack(id)), slot.ty.clone()))
            }
            Location::Cells(ids) => {
                let first = *ids.first().ok_or_else(|| {
                    RuntimeError::type_mismatch("non-empty array", "empty array", location)
                })?;
                let elem = self
                    .memory
                    .slots()
                    .get(first)
                    .map_or(Type::Int, |slot| slot.ty.clone());
                let len = ids.len();
                Ok((
                    Value::Pointer(Target::Array { first, len }),
                    Type::array(elem, len),
                ))
            }
            Location::Heap(address) => {
                let contents = self
                    .memory
                    .heap()
                    .block(address)
                    .map(|block| block.contents())
                    .map_err(|e| e.at(location))?;
                Ok((Value::Pointer(Target::Heap(address)), self.infer_type(&contents)))
            }
            Location::HeapElement { address, index } => {
                let index = usize::try_from(index).map_err(|_| {
                    RuntimeError::type_mismatch("addressable element", "negative index", location)
                })?;
                let value = self
                    .memory
                    .heap()
                    .read_element(address, index as i64)
                    .map_err(|e| e.at(location))?
                    .unwrap_or_default();
                let ty = match self.infer_type(&value) {
                    Type::Unknown => Type::Int,
                    ty => ty,
                };
                Ok((Value::Pointer(Target::HeapElement { address, index }), ty))
            }
            Location::Unmapped { .. } => Err(RuntimeError::type_mismatch(
                "addressable place",
                "unmapped memory",
                location,
            )),
        }
    }

    /// The stack slot holding the `Vec` handle a place refers to, following
    /// references
    pub(crate) fn handle_slot(&self, place: Location, location: SourceLocation) -> Result<SlotId, RuntimeError> {
        let Location::Cell(id) = place else {
            return Err(RuntimeError::type_mismatch(
                "Vec held in a variable",
                "array element",
                location,
            ));
        };
        match self.memory.read_slot(id).map_err(|e| e.at(location))? {
            Value::Pointer(Target::Heap(_)) => Ok(id),
            Value::Pointer(Target::Stack(next)) => self.handle_slot(Location::Cell(next), location),
            other => Err(RuntimeError::type_mismatch("Vec", other.kind_name(), location)),
        }
    }
}
