//! The process memory image: stack, data segment and heap.
//!
//! All three segments are flat byte buffers allocated at process
//! construction and freed at teardown. The stack holds call frames growing
//! upward from offset 0; the data segment is a snapshot of the module's
//! static data; the heap is bump-allocated starting at the null sentinel
//! offset.
//!
//! # Heap object layout
//!
//! ```text
//! offset 0              1              5              9
//!        ┌──────────────┬──────────────┬──────────────┬─────────────┐
//!        │ mark (1)     │ fwd addr (4) │ size (4, LE) │ payload ... │
//!        └──────────────┴──────────────┴──────────────┴─────────────┘
//! ```
//!
//! A heap pointer stored anywhere in the image names the first byte of the
//! header; payload access adds [`OBJECT_HEADER_SIZE`]. The forwarding slot
//! is dead outside a collection cycle.

use tracing::trace;

use crate::error::{Error, Result};
use crate::gc;
use crate::types::{Call, Module};

/// The reserved pointer value meaning "no object".
pub const NULL_HEAP_ADDRESS: i32 = 0;

/// Offset at which allocated objects begin; everything below it is reserved
/// so the null pointer value can never collide with a real object.
pub const NULL_HEAP_ADDRESS_OFFSET: usize = 4;

/// Width of the header mark byte.
pub const MARK_SIZE: usize = 1;

/// Width of the header forwarding-address slot (a heap pointer).
pub const FORWARDING_ADDRESS_SIZE: usize = 4;

/// Width of the header payload-size field.
pub const OBJECT_SIZE: usize = 4;

/// Total header width preceding every heap payload.
pub const OBJECT_HEADER_SIZE: usize = MARK_SIZE + FORWARDING_ADDRESS_SIZE + OBJECT_SIZE;

/// Width of a heap pointer as stored in any segment.
pub const TYPE_POINTER_SIZE: usize = 4;

/// Default heap capacity in bytes.
pub const INIT_HEAP_SIZE: usize = 1 << 20;

/// Default stack capacity in bytes.
pub const INIT_STACK_SIZE: usize = 1 << 20;

/// The bump-allocated heap segment.
#[derive(Debug)]
pub struct Heap {
    bytes: Vec<u8>,
    /// Allocation watermark. Never decreases outside a collection cycle.
    pub heap_pointer: usize,
}

impl Heap {
    pub fn with_capacity(capacity: usize) -> Self {
        debug_assert!(
            capacity >= NULL_HEAP_ADDRESS_OFFSET,
            "heap capacity below the null sentinel offset"
        );
        Self {
            bytes: vec![0; capacity],
            heap_pointer: NULL_HEAP_ADDRESS_OFFSET,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// A module under execution: the memory image plus the call stack state.
///
/// Single-threaded by construction; nothing here is shared or suspended.
/// The module description is immutable for the life of the process.
#[derive(Debug)]
pub struct Process {
    pub module: Module,
    pub stack: Vec<u8>,
    pub data: Vec<u8>,
    pub heap: Heap,
    /// Active frames, in push order.
    pub call_stack: Vec<Call>,
    /// Index of the topmost active frame.
    pub call_counter: usize,
}

impl Process {
    /// Builds a process with the default segment capacities.
    pub fn new(module: Module) -> Result<Self> {
        Self::with_capacities(module, INIT_STACK_SIZE, INIT_HEAP_SIZE)
    }

    /// Builds a process with explicit stack and heap capacities.
    ///
    /// The whole call plan is validated against the stack capacity up
    /// front; a plan that cannot fit fails here rather than as a slice
    /// panic mid-execution.
    pub fn with_capacities(module: Module, stack_capacity: usize, heap_capacity: usize) -> Result<Self> {
        let required: usize = module
            .call_plan
            .iter()
            .map(|call| module.operator(call.operator).size)
            .sum();
        if required > stack_capacity {
            return Err(Error::StackOverflow {
                required,
                capacity: stack_capacity,
            });
        }

        let data = module.data.clone();
        let call_stack = module.call_plan.clone();
        let call_counter = call_stack.len().saturating_sub(1);
        Ok(Self {
            module,
            stack: vec![0; stack_capacity],
            data,
            heap: Heap::with_capacity(heap_capacity),
            call_stack,
            call_counter,
        })
    }

    /// Number of active frames, `call_counter + 1` clamped to the stack.
    #[inline]
    pub fn active_frame_count(&self) -> usize {
        (self.call_counter + 1).min(self.call_stack.len())
    }

    /// Bump-allocates `size` bytes and returns the object's heap offset.
    ///
    /// On overflow the collector runs and the allocation retries once; a
    /// second overflow is heap exhaustion. Callers pass the payload size
    /// plus [`OBJECT_HEADER_SIZE`]. The returned offset is never the null
    /// sentinel.
    pub fn allocate(&mut self, size: usize) -> Result<usize> {
        let mut result = self.heap.heap_pointer;
        let mut new_free = result + size;

        if new_free > self.heap.capacity() {
            gc::mark_and_compact(self);
            result = self.heap.heap_pointer;
            new_free = result + size;

            if new_free > self.heap.capacity() {
                return Err(Error::HeapExhausted {
                    requested: size,
                    capacity: self.heap.capacity(),
                });
            }
        }

        self.heap.heap_pointer = new_free;
        trace!(offset = result, size, watermark = new_free, "heap allocation");
        Ok(result)
    }
}
