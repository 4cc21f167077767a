//! Typed reads and writes over the memory image.
//!
//! Readers compose [`resolve`](crate::resolve::resolve) with the codecs:
//! one function per primitive type, each taking `(process, fp, argument)`.
//! This is the surface native operator bodies program against.
//!
//! Writers are segment-dispatched byte copies; the heap writer additionally
//! constructs the object header in place.

use crate::codec;
use crate::memory::{FORWARDING_ADDRESS_SIZE, Heap, MARK_SIZE, OBJECT_HEADER_SIZE, Process};
use crate::resolve::resolve;
use crate::types::{ArgId, MemorySegment};

/// Returns the argument's `total_size`-wide byte slice at `offset` in its
/// owning segment.
#[inline]
pub fn read_memory(proc: &Process, offset: usize, arg_id: ArgId) -> &[u8] {
    let arg = proc.module.arg(arg_id);
    match arg.segment {
        MemorySegment::Stack => &proc.stack[offset..offset + arg.total_size],
        MemorySegment::Data => &proc.data[offset..offset + arg.total_size],
        MemorySegment::Heap => &proc.heap.bytes()[offset..offset + arg.total_size],
    }
}

/// Resolves and reads the argument's raw bytes.
pub fn read_from_stack(proc: &Process, fp: usize, arg_id: ArgId) -> &[u8] {
    let offset = resolve(proc, fp, arg_id);
    read_memory(proc, offset, arg_id)
}

pub fn read_bool(proc: &Process, fp: usize, arg_id: ArgId) -> bool {
    let offset = resolve(proc, fp, arg_id);
    codec::decode_bool(read_memory(proc, offset, arg_id))
}

pub fn read_u8(proc: &Process, fp: usize, arg_id: ArgId) -> u8 {
    let offset = resolve(proc, fp, arg_id);
    codec::decode_u8(read_memory(proc, offset, arg_id))
}

pub fn read_i32(proc: &Process, fp: usize, arg_id: ArgId) -> i32 {
    let offset = resolve(proc, fp, arg_id);
    codec::decode_i32(read_memory(proc, offset, arg_id))
}

pub fn read_i64(proc: &Process, fp: usize, arg_id: ArgId) -> i64 {
    let offset = resolve(proc, fp, arg_id);
    codec::decode_i64(read_memory(proc, offset, arg_id))
}

pub fn read_f32(proc: &Process, fp: usize, arg_id: ArgId) -> f32 {
    let offset = resolve(proc, fp, arg_id);
    codec::decode_f32(read_memory(proc, offset, arg_id))
}

pub fn read_f64(proc: &Process, fp: usize, arg_id: ArgId) -> f64 {
    let offset = resolve(proc, fp, arg_id);
    codec::decode_f64(read_memory(proc, offset, arg_id))
}

pub fn read_str(proc: &Process, fp: usize, arg_id: ArgId) -> String {
    let offset = resolve(proc, fp, arg_id);
    codec::decode_str(read_memory(proc, offset, arg_id))
}

/// Reads an `f32` array argument as a vector.
///
/// The stored image is the bare elements; the element count is recovered
/// from the argument's width and prepended before raw decoding.
pub fn read_f32_slice(proc: &Process, fp: usize, arg_id: ArgId) -> Vec<f32> {
    let offset = resolve(proc, fp, arg_id);
    let bytes = read_memory(proc, offset, arg_id);
    let mut prefixed = Vec::with_capacity(4 + bytes.len());
    prefixed.extend_from_slice(&codec::encode_u32((bytes.len() / 4) as u32));
    prefixed.extend_from_slice(bytes);
    codec::decode_f32_slice(&prefixed)
}

/// Writes `bytes` at `offset` in the argument's owning segment.
pub fn write_memory(proc: &mut Process, offset: usize, arg_id: ArgId, bytes: &[u8]) {
    match proc.module.arg(arg_id).segment {
        MemorySegment::Stack => write_to_stack(&mut proc.stack, offset, bytes),
        MemorySegment::Data => write_to_data(&mut proc.data, offset, bytes),
        MemorySegment::Heap => write_to_heap(&mut proc.heap, offset, bytes),
    }
}

#[inline]
pub fn write_to_stack(stack: &mut [u8], offset: usize, bytes: &[u8]) {
    stack[offset..offset + bytes.len()].copy_from_slice(bytes);
}

#[inline]
pub fn write_to_data(data: &mut [u8], offset: usize, bytes: &[u8]) {
    data[offset..offset + bytes.len()].copy_from_slice(bytes);
}

/// Writes a heap object at `offset`: header first, payload after.
///
/// The mark byte and forwarding slot are zeroed; the size field records the
/// payload length as raw 32-bit LE.
pub fn write_to_heap(heap: &mut Heap, offset: usize, payload: &[u8]) {
    let size = codec::encode_i32(payload.len() as i32);
    let bytes = heap.bytes_mut();
    debug_assert!(
        offset + OBJECT_HEADER_SIZE + payload.len() <= bytes.len(),
        "heap object at {offset} overruns the segment"
    );
    bytes[offset..offset + MARK_SIZE + FORWARDING_ADDRESS_SIZE].fill(0);
    bytes[offset + MARK_SIZE + FORWARDING_ADDRESS_SIZE..offset + OBJECT_HEADER_SIZE]
        .copy_from_slice(&size);
    bytes[offset + OBJECT_HEADER_SIZE..offset + OBJECT_HEADER_SIZE + payload.len()]
        .copy_from_slice(payload);
}
