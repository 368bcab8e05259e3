//! Slot arena
//!
//! Every stack cell ever created lives in one append-only [`SlotArena`] and is
//! addressed by a [`SlotId`]. Ids are never reused: when a frame or block scope
//! ends its slots are marked dead but stay in the arena, so a reference that
//! outlives its target still names a slot, and reading through it reports a
//! dangling access instead of silently reading someone else's variable.

use super::error::MemoryError;
use super::value::Value;
use crate::parser::ast::Type;
use std::fmt;

/// Handle to a stack cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a stack frame, unique for the lifetime of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub(crate) usize);

impl FrameId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One stack cell
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Display label: `x`, or `arr[2]` for array elements
    pub label: String,
    /// Type of the value held by this cell (element type for arrays)
    pub ty: Type,
    pub value: Value,
    pub live: bool,
    pub frame: FrameId,
    /// `(index, len)` when this cell is an element of a stack array
    pub span: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotArena {
    slots: Vec<Slot>,
}

impl SlotArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, slot: Slot) -> SlotId {
        self.slots.push(slot);
        SlotId(self.slots.len() - 1)
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(id.0)
    }

    fn live_slot(&self, id: SlotId) -> Result<&Slot, MemoryError> {
        match self.slots.get(id.0) {
            Some(slot) if slot.live => Ok(slot),
            Some(slot) => Err(MemoryError::DeadSlot {
                label: slot.label.clone(),
            }),
            None => Err(MemoryError::DeadSlot {
                label: id.to_string(),
            }),
        }
    }

    /// Read a live slot's value
    pub fn read(&self, id: SlotId) -> Result<&Value, MemoryError> {
        self.live_slot(id).map(|slot| &slot.value)
    }

    /// Overwrite a live slot's value
    pub fn write(&mut self, id: SlotId, value: Value) -> Result<(), MemoryError> {
        self.live_slot(id)?;
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.value = value;
        }
        Ok(())
    }

    /// Mark a slot dead; its value is kept for display
    pub fn kill(&mut self, id: SlotId) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.live = false;
        }
    }

    pub fn is_live(&self, id: SlotId) -> bool {
        self.slots.get(id.0).is_some_and(|slot| slot.live)
    }

    /// All live slots, in creation order
    pub fn live_slots(&self) -> impl Iterator<Item = (SlotId, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.live)
            .map(|(i, slot)| (SlotId(i), slot))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(label: &str, value: Value) -> Slot {
        Slot {
            label: label.to_string(),
            ty: Type::Int,
            value,
            live: true,
            frame: FrameId(0),
            span: None,
        }
    }

    #[test]
    fn test_dead_slot_is_dangling() {
        let mut arena = SlotArena::new();
        let id = arena.alloc(cell("x", Value::Int(5)));

        assert_eq!(arena.read(id), Ok(&Value::Int(5)));
        arena.kill(id);
        assert!(matches!(arena.read(id), Err(MemoryError::DeadSlot { ref label }) if label == "x"));
        assert!(arena.write(id, Value::Int(1)).is_err());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut arena = SlotArena::new();
        let a = arena.alloc(cell("a", Value::Int(1)));
        arena.kill(a);
        let b = arena.alloc(cell("b", Value::Int(2)));

        assert_ne!(a, b);
        assert_eq!(arena.live_slots().count(), 1);
    }
}
