//! Memory model for the interpreter
//!
//! This module provides the core memory abstractions:
//! - [`value`]: Runtime value representation (Int, Bool, Pointer, Array)
//! - [`slot`]: Append-only arena of stack cells addressed by [`slot::SlotId`]
//! - [`stack`]: Call stack with frames, bindings and block scopes
//! - [`heap`]: Heap blocks with explicit free and vector reallocation
//!
//! [`Memory`] ties the three together. It is owned by exactly one interpreter
//! and cloned wholesale to checkpoint a step.

pub mod error;
pub mod heap;
pub mod slot;
pub mod stack;
pub mod value;

use std::collections::BTreeSet;

use error::MemoryError;
use heap::Heap;
use slot::{FrameId, Slot, SlotArena, SlotId};
use stack::{Binding, Stack, StackFrame};
use value::{Address, Value};

use crate::parser::ast::Type;

/// Complete memory state of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Memory {
    slots: SlotArena,
    stack: Stack,
    heap: Heap,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory whose arrays and heap blocks may hold at most `max_cells` cells
    pub fn with_limit(max_cells: usize) -> Self {
        Memory {
            heap: Heap::with_limit(max_cells),
            ..Self::default()
        }
    }

    pub fn slots(&self) -> &SlotArena {
        &self.slots
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn push_frame(&mut self, function: &str) -> FrameId {
        self.stack.push_frame(function)
    }

    /// Pop the top frame and release every cell it owns
    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        let frame = self.stack.pop_frame()?;
        for &id in frame.cells() {
            self.slots.kill(id);
        }
        Some(frame)
    }

    fn current_frame(&self) -> Result<&StackFrame, MemoryError> {
        self.stack
            .current_frame()
            .ok_or_else(|| MemoryError::UndeclaredVariable {
                name: "<no frame>".to_string(),
            })
    }

    /// Allocate stack storage for a new variable in the top frame.
    ///
    /// Arrays get one cell per element plus a padding cell after the last
    /// one; `Value::Uninit` leaves every cell uninitialised. An array longer
    /// than the heap's cell limit is refused before any cell is allocated.
    pub fn declare(&mut self, name: &str, ty: Type, value: Value) -> Result<Vec<SlotId>, MemoryError> {
        if let Type::Array(_, len) = &ty {
            self.heap.check_size(*len)?;
        }
        let frame = self.current_frame()?;
        if frame.lookup(name).is_some() {
            return Err(MemoryError::DuplicateDeclaration {
                name: name.to_string(),
            });
        }
        let frame_id = frame.id;

        let slots = match (&ty, value) {
            (Type::Array(elem, len), Value::Array(values)) if values.len() == *len => {
                self.alloc_array(name, elem, values, frame_id)
            }
            (Type::Array(elem, len), Value::Uninit) => {
                self.alloc_array(name, elem, vec![Value::Uninit; *len], frame_id)
            }
            (Type::Array(..), other) | (_, other @ Value::Array(_)) => {
                return Err(MemoryError::type_mismatch(ty.to_string(), &other));
            }
            (_, value) => vec![self.slots.alloc(Slot {
                label: name.to_string(),
                ty: ty.clone(),
                value,
                live: true,
                frame: frame_id,
                span: None,
            })],
        };

        let padding = match &ty {
            Type::Array(elem, _) => Some(self.slots.alloc(Slot {
                label: format!("{}[pad]", name),
                ty: (**elem).clone(),
                value: Value::Uninit,
                live: true,
                frame: frame_id,
                span: None,
            })),
            _ => None,
        };

        self.bind(Binding {
            name: name.to_string(),
            ty,
            slots: slots.clone(),
            aliased: false,
            padding,
        });
        Ok(slots)
    }

    fn alloc_array(&mut self, name: &str, elem: &Type, values: Vec<Value>, frame: FrameId) -> Vec<SlotId> {
        let len = values.len();
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                self.slots.alloc(Slot {
                    label: format!("{}[{}]", name, i),
                    ty: elem.clone(),
                    value,
                    live: true,
                    frame,
                    span: Some((i, len)),
                })
            })
            .collect()
    }

    /// Bind `name` in the top frame to slots owned by another frame
    pub fn alias(&mut self, name: &str, ty: Type, slots: Vec<SlotId>) -> Result<(), MemoryError> {
        if self.current_frame()?.lookup(name).is_some() {
            return Err(MemoryError::DuplicateDeclaration {
                name: name.to_string(),
            });
        }
        self.bind(Binding {
            name: name.to_string(),
            ty,
            slots,
            aliased: true,
            padding: None,
        });
        Ok(())
    }

    fn bind(&mut self, binding: Binding) {
        if let Some(frame) = self.stack.current_frame_mut() {
            frame.bind(binding);
        }
    }

    /// Resolve a name in the top frame
    pub fn lookup(&self, name: &str) -> Result<&Binding, MemoryError> {
        self.stack
            .current_frame()
            .and_then(|frame| frame.lookup(name))
            .ok_or_else(|| MemoryError::UndeclaredVariable {
                name: name.to_string(),
            })
    }

    pub fn read_slot(&self, id: SlotId) -> Result<Value, MemoryError> {
        self.slots.read(id).cloned()
    }

    pub fn write_slot(&mut self, id: SlotId, value: Value) -> Result<(), MemoryError> {
        if let Value::Array(_) = value {
            return Err(MemoryError::type_mismatch("single value", &value));
        }
        self.slots.write(id, value)
    }

    pub fn push_scope(&mut self) {
        if let Some(frame) = self.stack.current_frame_mut() {
            frame.push_scope();
        }
    }

    /// Close the innermost block scope of the top frame
    pub fn pop_scope(&mut self) {
        let released = self
            .stack
            .current_frame_mut()
            .map(StackFrame::pop_scope)
            .unwrap_or_default();
        for id in released {
            self.slots.kill(id);
        }
    }

    /// See [`Stack::offset_cell`]
    pub fn offset_cell(&self, base: SlotId, offset: i64) -> Option<SlotId> {
        self.stack.offset_cell(base, offset)
    }

    /// Live heap blocks reachable from a live stack slot, directly or through
    /// other reachable blocks
    pub fn reachable_blocks(&self) -> BTreeSet<Address> {
        let mut reachable = BTreeSet::new();
        let mut pending: Vec<Address> = self
            .slots
            .live_slots()
            .flat_map(|(_, slot)| slot.value.heap_addresses())
            .collect();

        while let Some(address) = pending.pop() {
            if !reachable.insert(address) {
                continue;
            }
            if let Ok(block) = self.heap.block(address) {
                pending.extend(block.elements().iter().flat_map(Value::heap_addresses));
            }
        }

        reachable.retain(|address| self.heap.block(*address).is_ok());
        reachable
    }
}

#[cfg(test)]
mod tests {
    use super::heap::BlockKind;
    use super::value::Target;
    use super::*;

    fn memory_with_main() -> Memory {
        let mut memory = Memory::new();
        memory.push_frame("main");
        memory
    }

    #[test]
    fn test_duplicate_declaration() {
        let mut memory = memory_with_main();
        memory.declare("x", Type::Int, Value::Int(1)).unwrap();

        let err = memory.declare("x", Type::Int, Value::Int(2)).unwrap_err();
        assert_eq!(err, MemoryError::DuplicateDeclaration { name: "x".into() });
    }

    #[test]
    fn test_array_takes_one_cell_per_element() {
        let mut memory = memory_with_main();
        let values = Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let slots = memory.declare("arr", Type::array(Type::Int, 3), values).unwrap();

        assert_eq!(slots.len(), 3);
        let label = &memory.slots().get(slots[2]).unwrap().label;
        assert_eq!(label, "arr[2]");
        assert_eq!(memory.offset_cell(slots[0], 2), Some(slots[2]));

        // One padding cell sits between the array and the next variable
        let x = memory.declare("x", Type::Int, Value::Int(7)).unwrap()[0];
        let pad = memory.offset_cell(slots[0], 3).unwrap();
        assert_eq!(memory.slots().get(pad).unwrap().label, "arr[pad]");
        assert_eq!(memory.offset_cell(slots[0], 4), Some(x));
    }

    #[test]
    fn test_array_length_mismatch() {
        let mut memory = memory_with_main();
        let err = memory
            .declare("arr", Type::array(Type::Int, 3), Value::Array(vec![Value::Int(1)]))
            .unwrap_err();
        assert!(matches!(err, MemoryError::TypeMismatch { .. }));
    }

    #[test]
    fn test_pop_frame_kills_owned_cells_only() {
        let mut memory = memory_with_main();
        let y = memory.declare("y", Type::Int, Value::Int(0)).unwrap()[0];

        memory.push_frame("process");
        memory.alias("y_ref", Type::Int, vec![y]).unwrap();
        let local = memory.declare("tmp", Type::Int, Value::Int(5)).unwrap()[0];
        memory.write_slot(y, Value::Int(999)).unwrap();
        memory.pop_frame();

        assert_eq!(memory.read_slot(y), Ok(Value::Int(999)));
        assert!(matches!(memory.read_slot(local), Err(MemoryError::DeadSlot { .. })));
    }

    #[test]
    fn test_oversized_array_is_refused() {
        let mut memory = Memory::with_limit(4);
        memory.push_frame("main");

        let err = memory
            .declare("big", Type::array(Type::Int, 2_147_483_647), Value::Uninit)
            .unwrap_err();
        assert!(matches!(err, MemoryError::AllocationTooLarge { limit: 4, .. }));
        assert_eq!(memory.slots().live_slots().count(), 0);
        assert!(memory.lookup("big").is_err());
    }

    #[test]
    fn test_reachability_follows_nested_boxes() {
        let mut memory = memory_with_main();
        let heap = memory.heap_mut();
        let inner = heap.allocate(BlockKind::Boxed, vec![Value::Int(1)], 1).unwrap();
        let outer = heap
            .allocate(BlockKind::Boxed, vec![Value::Pointer(Target::Heap(inner))], 1)
            .unwrap();
        let leaked = heap.allocate(BlockKind::Boxed, vec![Value::Int(2)], 1).unwrap();
        memory
            .declare("b", Type::boxed(Type::boxed(Type::Int)), Value::Pointer(Target::Heap(outer)))
            .unwrap();

        let reachable = memory.reachable_blocks();
        assert!(reachable.contains(&outer));
        assert!(reachable.contains(&inner));
        assert!(!reachable.contains(&leaked));
    }
}
