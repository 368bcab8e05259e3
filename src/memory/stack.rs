//! Call stack implementation
//!
//! This module provides the call stack for function execution:
//! - [`Stack`]: The call stack containing frames
//! - [`StackFrame`]: A single function's activation record
//! - [`Binding`]: A name in a frame and the slots it denotes
//!
//! # Storage Order
//!
//! The stack grows downward: the top frame sits at the lowest addresses and
//! each caller lies just past the end of its callee. Inside a frame, cells are
//! laid out in declaration order, and every array is followed by one padding
//! cell. Walking that order gives the contiguous backing storage used by
//! [`Stack::offset_cell`]:
//!
//! ```text
//! tampering: x  arr[0] arr[1] arr[2] arr[3] pad | main: bank
//! ```
//!
//! `arr[4]` lands on the padding, `arr[5]` on whatever follows it (a later
//! variable, or the caller's frame) and `arr[-1]` on the variable declared
//! before the array.
//!
//! # Aliases
//!
//! A by-reference parameter is a binding whose slots belong to the caller. It
//! owns no cells, so it adds nothing to the storage order and releasing the
//! callee's frame leaves the caller's slots untouched.

use super::slot::{FrameId, SlotId};
use crate::parser::ast::Type;

/// A name visible in a frame
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub ty: Type,
    /// One slot for scalars, one per element for arrays
    pub slots: Vec<SlotId>,
    /// `true` for by-reference parameters sharing the caller's slots
    pub aliased: bool,
    /// Unnamed cell laid out after an array's last element
    pub padding: Option<SlotId>,
}

impl Binding {
    /// `true` when the name denotes a whole stack array (directly or, for an
    /// alias, through its reference type)
    pub fn is_array(&self) -> bool {
        match &self.ty {
            Type::Array(..) => true,
            Type::Ref { inner, .. } if self.aliased => matches!(**inner, Type::Array(..)),
            _ => false,
        }
    }

    pub fn first_slot(&self) -> Option<SlotId> {
        self.slots.first().copied()
    }
}

/// Stack frame for a function call
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    pub id: FrameId,
    pub function: String,
    bindings: Vec<Binding>,
    cells: Vec<SlotId>,
    /// Binding count at the start of each open `if`/`while` body
    scopes: Vec<usize>,
}

impl StackFrame {
    pub fn new(id: FrameId, function: impl Into<String>) -> Self {
        StackFrame {
            id,
            function: function.into(),
            bindings: Vec::new(),
            cells: Vec::new(),
            scopes: Vec::new(),
        }
    }

    /// Bindings in declaration order
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Cells owned by this frame, in declaration order
    pub fn cells(&self) -> &[SlotId] {
        &self.cells
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().rev().find(|b| b.name == name)
    }

    pub fn bind(&mut self, binding: Binding) {
        if !binding.aliased {
            self.cells.extend(binding.slots.iter().copied());
            self.cells.extend(binding.padding);
        }
        self.bindings.push(binding);
    }

    /// Enter an `if`/`while` body
    pub fn push_scope(&mut self) {
        self.scopes.push(self.bindings.len());
    }

    /// Leave the innermost body, returning the cells it owned
    pub fn pop_scope(&mut self) -> Vec<SlotId> {
        let Some(mark) = self.scopes.pop() else {
            return Vec::new();
        };

        let released: Vec<SlotId> = self
            .bindings
            .drain(mark..)
            .filter(|b| !b.aliased)
            .flat_map(|b| b.slots.into_iter().chain(b.padding))
            .collect();
        self.cells.retain(|id| !released.contains(id));
        released
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }
}

/// The call stack
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stack {
    frames: Vec<StackFrame>,
    next_frame: usize,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new stack frame
    pub fn push_frame(&mut self, function: &str) -> FrameId {
        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        self.frames.push(StackFrame::new(id, function));
        id
    }

    /// Pop the top stack frame
    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    /// Get the current (top) frame
    pub fn current_frame(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    pub fn current_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    /// Get all frames, bottom first
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Every owned cell, lowest address first: top frame to `main`
    fn storage(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.frames.iter().rev().flat_map(|f| f.cells.iter().copied())
    }

    /// The cell `offset` positions away from `base` in storage order.
    ///
    /// `None` means the offset leaves the stack entirely (or `base` is no longer
    /// on it).
    pub fn offset_cell(&self, base: SlotId, offset: i64) -> Option<SlotId> {
        let position = self.storage().position(|id| id == base)?;
        let target = i64::try_from(position).ok()?.checked_add(offset)?;
        let target = usize::try_from(target).ok()?;
        self.storage().nth(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(name: &str, slots: &[usize]) -> Binding {
        Binding {
            name: name.to_string(),
            ty: Type::Int,
            slots: slots.iter().map(|&i| SlotId(i)).collect(),
            aliased: false,
            padding: None,
        }
    }

    #[test]
    fn test_scope_releases_inner_bindings() {
        let mut stack = Stack::new();
        stack.push_frame("main");
        let frame = stack.current_frame_mut().unwrap();

        frame.bind(binding("x", &[0]));
        frame.push_scope();
        frame.bind(binding("inside", &[1]));
        assert!(frame.lookup("inside").is_some());

        let released = frame.pop_scope();
        assert_eq!(released, vec![SlotId(1)]);
        assert!(frame.lookup("inside").is_none());
        assert_eq!(frame.cells(), &[SlotId(0)]);
    }

    #[test]
    fn test_offset_skips_padding_into_next_variable() {
        let mut stack = Stack::new();
        stack.push_frame("main");
        let frame = stack.current_frame_mut().unwrap();
        frame.bind(Binding {
            padding: Some(SlotId(4)),
            ..binding("arr", &[0, 1, 2, 3])
        });
        frame.bind(binding("x", &[5]));

        assert_eq!(frame.cells().len(), 6);
        assert_eq!(stack.offset_cell(SlotId(0), 3), Some(SlotId(3)));
        assert_eq!(stack.offset_cell(SlotId(0), 4), Some(SlotId(4)));
        assert_eq!(stack.offset_cell(SlotId(0), 5), Some(SlotId(5)));
        assert_eq!(stack.offset_cell(SlotId(0), 6), None);
    }

    #[test]
    fn test_offset_past_frame_reaches_caller() {
        let mut stack = Stack::new();
        stack.push_frame("main");
        stack.current_frame_mut().unwrap().bind(binding("bank", &[0]));
        stack.push_frame("tampering");
        let frame = stack.current_frame_mut().unwrap();
        frame.bind(binding("x", &[1]));
        frame.bind(Binding {
            padding: Some(SlotId(6)),
            ..binding("arr", &[2, 3, 4, 5])
        });

        assert_eq!(stack.offset_cell(SlotId(2), 5), Some(SlotId(0)));
        assert_eq!(stack.offset_cell(SlotId(2), -1), Some(SlotId(1)));
        assert_eq!(stack.offset_cell(SlotId(2), 6), None);
        assert_eq!(stack.offset_cell(SlotId(2), -2), None);
    }

    #[test]
    fn test_scope_releases_padding() {
        let mut stack = Stack::new();
        stack.push_frame("main");
        let frame = stack.current_frame_mut().unwrap();
        frame.push_scope();
        frame.bind(Binding {
            padding: Some(SlotId(2)),
            ..binding("arr", &[0, 1])
        });

        assert_eq!(frame.pop_scope(), vec![SlotId(0), SlotId(1), SlotId(2)]);
        assert!(frame.cells().is_empty());
    }

    #[test]
    fn test_alias_owns_no_cells() {
        let mut stack = Stack::new();
        stack.push_frame("f");
        let frame = stack.current_frame_mut().unwrap();
        frame.bind(Binding {
            aliased: true,
            ..binding("y", &[7])
        });

        assert!(frame.cells().is_empty());
        assert_eq!(frame.lookup("y").unwrap().first_slot(), Some(SlotId(7)));
    }
}
