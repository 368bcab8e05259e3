//! Heap implementation for the interpreter
//!
//! This module provides heap memory management with:
//! - Explicit allocation by `Box::new`, `vec!`, `Vec::new`, `Vec::with_capacity` and `.clone()`
//! - Explicit deallocation by `drop`
//! - Freed blocks kept in place (never reused) so stale handles stay detectable
//! - Vector storage with a separate length and capacity, and reallocation on growth
//! - A per-block cell limit checked before any storage is reserved
//!
//! # Addresses
//!
//! Addresses start at [`HEAP_ADDRESS_START`] and only ever grow: each block
//! advances the counter by its footprint rounded up to [`HEAP_ALIGNMENT`]. A fresh
//! [`Heap`] therefore hands out the same address sequence every run.

use std::collections::BTreeMap;

use serde::Serialize;

use super::error::MemoryError;
use super::value::{Address, Value};
use crate::config::{GrowthPolicy, DEFAULT_MAX_ALLOC_CELLS};
use crate::interpreter::constants::{ELEMENT_SIZE, HEAP_ADDRESS_START, HEAP_ALIGNMENT};

/// What kind of owner a block was allocated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockKind {
    Boxed,
    Vector,
}

/// State of a heap block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Allocated,
    /// Freed but kept so that stale handles are reported, not reused
    Freed,
}

/// A block of heap memory
#[derive(Debug, Clone, PartialEq)]
pub struct HeapBlock {
    pub address: Address,
    pub kind: BlockKind,
    pub state: BlockState,
    /// Raw storage, `capacity` cells long; cells past `len` are spare capacity
    storage: Vec<Value>,
    len: usize,
}

impl HeapBlock {
    fn new(address: Address, kind: BlockKind, elements: Vec<Value>, capacity: usize) -> Self {
        let len = elements.len();
        let mut storage = elements;
        storage.resize(capacity.max(len), Value::Uninit);
        HeapBlock {
            address,
            kind,
            state: BlockState::Allocated,
            storage,
            len,
        }
    }

    /// Initialised elements
    pub fn elements(&self) -> &[Value] {
        &self.storage[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn is_live(&self) -> bool {
        self.state == BlockState::Allocated
    }

    /// The value a `Box` points at, or the whole element list of a `Vec`
    pub fn contents(&self) -> Value {
        match (self.kind, self.elements()) {
            (BlockKind::Boxed, [single]) => single.clone(),
            (_, elements) => Value::Array(elements.to_vec()),
        }
    }

    /// Bytes this block occupies in the address space
    fn footprint(capacity: usize) -> u64 {
        let bytes = capacity.max(1) as u64 * ELEMENT_SIZE;
        bytes.div_ceil(HEAP_ALIGNMENT) * HEAP_ALIGNMENT
    }
}

/// Result of pushing onto a vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
    /// Address of the block now holding the elements
    pub address: Address,
    /// Set when the push reallocated; the old block is freed
    pub moved_from: Option<Address>,
}

/// The heap
#[derive(Debug, Clone, PartialEq)]
pub struct Heap {
    blocks: BTreeMap<Address, HeapBlock>,
    next_address: Address,
    max_cells: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_ALLOC_CELLS)
    }

    /// A heap whose blocks may hold at most `max_cells` cells each
    pub fn with_limit(max_cells: usize) -> Self {
        Heap {
            blocks: BTreeMap::new(),
            next_address: HEAP_ADDRESS_START,
            max_cells,
        }
    }

    pub fn max_cells(&self) -> usize {
        self.max_cells
    }

    /// Fail if a block of `cells` cells would exceed the limit
    pub fn check_size(&self, cells: usize) -> Result<(), MemoryError> {
        if cells > self.max_cells {
            return Err(MemoryError::AllocationTooLarge {
                requested: cells,
                limit: self.max_cells,
            });
        }
        Ok(())
    }

    /// Allocate a block holding `elements`, with room for at least `capacity`
    pub fn allocate(
        &mut self,
        kind: BlockKind,
        elements: Vec<Value>,
        capacity: usize,
    ) -> Result<Address, MemoryError> {
        self.check_size(capacity.max(elements.len()))?;
        let address = self.next_address;
        let block = HeapBlock::new(address, kind, elements, capacity);
        self.next_address += HeapBlock::footprint(block.capacity());
        self.blocks.insert(address, block);
        Ok(address)
    }

    /// Free a block (it stays in the map, marked freed)
    pub fn free(&mut self, address: Address) -> Result<(), MemoryError> {
        match self.blocks.get_mut(&address) {
            Some(block) if block.is_live() => {
                block.state = BlockState::Freed;
                Ok(())
            }
            Some(_) => Err(MemoryError::DoubleFree { address }),
            None => Err(MemoryError::InvalidFree { address }),
        }
    }

    /// Get a live heap block
    pub fn block(&self, address: Address) -> Result<&HeapBlock, MemoryError> {
        match self.blocks.get(&address) {
            Some(block) if block.is_live() => Ok(block),
            Some(_) => Err(MemoryError::FreedBlock { address }),
            None => Err(MemoryError::UnknownBlock { address }),
        }
    }

    fn block_mut(&mut self, address: Address) -> Result<&mut HeapBlock, MemoryError> {
        match self.blocks.get_mut(&address) {
            Some(block) if block.is_live() => Ok(block),
            Some(_) => Err(MemoryError::FreedBlock { address }),
            None => Err(MemoryError::UnknownBlock { address }),
        }
    }

    /// Any block, freed or not (for display)
    pub fn get(&self, address: Address) -> Option<&HeapBlock> {
        self.blocks.get(&address)
    }

    /// All blocks in address order, freed ones included
    pub fn blocks(&self) -> impl Iterator<Item = &HeapBlock> {
        self.blocks.values()
    }

    /// Read a cell of the block's raw storage.
    ///
    /// `Ok(None)` means the index lies outside the storage entirely.
    pub fn read_element(&self, address: Address, index: i64) -> Result<Option<Value>, MemoryError> {
        let block = self.block(address)?;
        Ok(usize::try_from(index)
            .ok()
            .and_then(|i| block.storage.get(i))
            .cloned())
    }

    /// Write a cell of the block's raw storage.
    ///
    /// Returns `Ok(false)` when the index lies outside the storage and the write
    /// was discarded. Writing into spare capacity does not change the length.
    pub fn write_element(
        &mut self,
        address: Address,
        index: i64,
        value: Value,
    ) -> Result<bool, MemoryError> {
        let block = self.block_mut(address)?;
        match usize::try_from(index).ok().and_then(|i| block.storage.get_mut(i)) {
            Some(cell) => {
                *cell = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the value a `Box` points at
    pub fn write_contents(&mut self, address: Address, value: Value) -> Result<(), MemoryError> {
        let block = self.block_mut(address)?;
        match (block.kind, value) {
            (BlockKind::Boxed, Value::Array(values)) if values.len() == block.len => {
                block.storage[..values.len()].clone_from_slice(&values);
                Ok(())
            }
            (BlockKind::Boxed, value) if block.len == 1 && !matches!(value, Value::Array(_)) => {
                block.storage[0] = value;
                Ok(())
            }
            (_, value) => Err(MemoryError::type_mismatch("value matching the box contents", &value)),
        }
    }

    /// Append to a vector, reallocating when it is full.
    ///
    /// On reallocation the elements move to a new block sized by `growth` and the
    /// old block is freed. Handles to the old address are not touched. Growth is
    /// capped at the cell limit; a vector already at the limit cannot grow.
    pub fn push(
        &mut self,
        address: Address,
        value: Value,
        growth: GrowthPolicy,
    ) -> Result<PushOutcome, MemoryError> {
        let block = self.block_mut(address)?;
        if block.kind != BlockKind::Vector {
            return Err(MemoryError::TypeMismatch {
                expected: "Vec".to_string(),
                found: "Box".to_string(),
            });
        }

        if block.len < block.capacity() {
            block.storage[block.len] = value;
            block.len += 1;
            return Ok(PushOutcome {
                address,
                moved_from: None,
            });
        }

        let current = block.capacity();
        self.check_size(current + 1)?;
        let capacity = growth.next_capacity(current).min(self.max_cells);

        let block = self.block_mut(address)?;
        let mut elements = block.elements().to_vec();
        elements.push(value);
        block.state = BlockState::Freed;

        let new_address = self.allocate(BlockKind::Vector, elements, capacity)?;
        Ok(PushOutcome {
            address: new_address,
            moved_from: Some(address),
        })
    }

    /// Deep-copy a block: a `Box` keeps its shape, a `Vec` is trimmed to its length
    pub fn clone_block(&mut self, address: Address) -> Result<Address, MemoryError> {
        let block = self.block(address)?;
        let kind = block.kind;
        let elements = block.elements().to_vec();
        let capacity = match kind {
            BlockKind::Boxed => block.capacity(),
            BlockKind::Vector => elements.len(),
        };
        self.allocate(kind, elements, capacity)
    }

    /// Address the next allocation will get
    pub fn next_address(&self) -> Address {
        self.next_address
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i32]) -> Vec<Value> {
        values.iter().map(|&n| Value::Int(n)).collect()
    }

    #[test]
    fn test_addresses_are_aligned_and_monotonic() {
        let mut heap = Heap::new();
        let a = heap.allocate(BlockKind::Boxed, ints(&[1]), 1).unwrap();
        let b = heap.allocate(BlockKind::Vector, ints(&[1, 2, 3, 4, 5]), 5).unwrap();
        let c = heap.allocate(BlockKind::Boxed, ints(&[1]), 1).unwrap();

        assert_eq!(a, HEAP_ADDRESS_START);
        assert_eq!(b, a + HEAP_ALIGNMENT);
        assert_eq!(c, b + 2 * HEAP_ALIGNMENT);
    }

    #[test]
    fn test_push_within_capacity_keeps_address() {
        let mut heap = Heap::new();
        let v = heap.allocate(BlockKind::Vector, ints(&[1]), 4).unwrap();

        let outcome = heap.push(v, Value::Int(2), GrowthPolicy::Double).unwrap();
        assert_eq!(outcome.address, v);
        assert_eq!(outcome.moved_from, None);
        assert_eq!(heap.block(v).unwrap().elements(), ints(&[1, 2]).as_slice());
    }

    #[test]
    fn test_push_at_capacity_reallocates() {
        let mut heap = Heap::new();
        let v = heap.allocate(BlockKind::Vector, ints(&[1, 2]), 2).unwrap();

        let outcome = heap.push(v, Value::Int(3), GrowthPolicy::Double).unwrap();
        assert_ne!(outcome.address, v);
        assert_eq!(outcome.moved_from, Some(v));

        let block = heap.block(outcome.address).unwrap();
        assert_eq!(block.elements(), ints(&[1, 2, 3]).as_slice());
        assert_eq!(block.capacity(), 4);
        assert!(!heap.get(v).unwrap().is_live());
        assert!(matches!(heap.block(v), Err(MemoryError::FreedBlock { .. })));
    }

    #[test]
    fn test_double_and_invalid_free() {
        let mut heap = Heap::new();
        let b = heap.allocate(BlockKind::Boxed, ints(&[5]), 1).unwrap();

        assert_eq!(heap.free(b), Ok(()));
        assert_eq!(heap.free(b), Err(MemoryError::DoubleFree { address: b }));
        assert_eq!(heap.free(0x42), Err(MemoryError::InvalidFree { address: 0x42 }));
    }

    #[test]
    fn test_raw_storage_access() {
        let mut heap = Heap::new();
        let v = heap.allocate(BlockKind::Vector, ints(&[7]), 3).unwrap();

        assert_eq!(heap.write_element(v, 2, Value::Int(9)), Ok(true));
        assert_eq!(heap.block(v).unwrap().len(), 1);
        assert_eq!(heap.read_element(v, 2), Ok(Some(Value::Int(9))));
        assert_eq!(heap.read_element(v, 3), Ok(None));
        assert_eq!(heap.write_element(v, -1, Value::Int(0)), Ok(false));
    }

    #[test]
    fn test_clone_vector_trims_capacity() {
        let mut heap = Heap::new();
        let v = heap.allocate(BlockKind::Vector, ints(&[1, 2]), 8).unwrap();
        let copy = heap.clone_block(v).unwrap();

        let block = heap.block(copy).unwrap();
        assert_eq!(block.capacity(), 2);
        assert_eq!(block.contents(), Value::Array(ints(&[1, 2])));
    }

    #[test]
    fn test_oversized_block_is_refused() {
        let mut heap = Heap::with_limit(8);
        let err = heap.allocate(BlockKind::Vector, Vec::new(), 2_147_483_647).unwrap_err();

        assert_eq!(
            err,
            MemoryError::AllocationTooLarge {
                requested: 2_147_483_647,
                limit: 8
            }
        );
        assert_eq!(heap.blocks().count(), 0);
        assert_eq!(heap.next_address(), HEAP_ADDRESS_START);
    }

    #[test]
    fn test_growth_is_capped_at_the_limit() {
        let mut heap = Heap::with_limit(5);
        let v = heap.allocate(BlockKind::Vector, ints(&[1, 2, 3]), 3).unwrap();

        let grown = heap.push(v, Value::Int(4), GrowthPolicy::Double).unwrap().address;
        assert_eq!(heap.block(grown).unwrap().capacity(), 5);
        heap.push(grown, Value::Int(5), GrowthPolicy::Double).unwrap();

        let err = heap.push(grown, Value::Int(6), GrowthPolicy::Double).unwrap_err();
        assert!(matches!(err, MemoryError::AllocationTooLarge { requested: 6, limit: 5 }));
        assert!(heap.block(grown).unwrap().is_live());
    }
}
