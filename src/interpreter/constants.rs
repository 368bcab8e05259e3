// Constants for the memory model

/// Starting address for heap allocations
/// Heap addresses start at 0x10000000 so they read clearly as heap addresses
pub const HEAP_ADDRESS_START: u64 = 0x1000_0000;

/// Every heap block starts on a multiple of this many bytes
pub const HEAP_ALIGNMENT: u64 = 16;

/// Size in bytes of one heap element (an `i32`, a `bool` or a handle)
pub const ELEMENT_SIZE: u64 = 4;
