//! Vesper runtime core.
//!
//! This crate executes compiled Vesper modules: it owns the process memory
//! image and everything that operates on it. The front end (scanner,
//! parser, type checker) lives elsewhere in the toolchain and hands this
//! crate a fully populated [`types::Module`].
//!
//! # Architecture
//!
//! - [`types`] - the compiled module description: argument descriptors,
//!   struct layouts, operators, the call plan
//! - [`memory`] - stack, data and heap segments, layout constants, the bump
//!   allocator
//! - [`codec`] - little-endian atomic and length-prefixed byte codecs
//! - [`resolve`] - the address resolver: argument + frame pointer → byte
//!   offset
//! - [`access`] - typed reads and writes composing resolution with the
//!   codecs
//! - [`gc`] - the mark-compact collector over precise stack roots
//! - [`exec`] - straight-line dispatch of the call plan to native operator
//!   bodies
//! - [`error`] - error types for runtime failures
//!
//! # Execution model
//!
//! Execution is single-threaded and non-suspending. Each frame of the call
//! plan resolves its operands, runs its native body, and writes its
//! results before the next frame starts. Heap collection happens only
//! inside the allocator, between operations, when a bump allocation would
//! overflow the heap.

pub mod access;
pub mod codec;
pub mod error;
pub mod exec;
pub mod gc;
pub mod memory;
pub mod resolve;
pub mod types;

pub use error::{Error, Result};
pub use exec::{NativeFn, NativeRegistry, run};
pub use memory::{
    FORWARDING_ADDRESS_SIZE, Heap, INIT_HEAP_SIZE, INIT_STACK_SIZE, MARK_SIZE, NULL_HEAP_ADDRESS,
    NULL_HEAP_ADDRESS_OFFSET, OBJECT_HEADER_SIZE, OBJECT_SIZE, Process, TYPE_POINTER_SIZE,
};
pub use resolve::resolve;
pub use types::*;
