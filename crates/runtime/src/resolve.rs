//! Address resolution.
//!
//! Translates `(frame pointer, argument)` into an absolute byte offset in
//! the argument's owning segment by walking the argument's projection
//! program: array-index, field-access and pointer-load steps, applied left
//! to right.
//!
//! The resolver reads memory (index values, pointer slots) but never
//! mutates it.

use crate::access;
use crate::codec;
use crate::memory::{OBJECT_HEADER_SIZE, Process};
use crate::types::{ArgId, DerefOp, MemorySegment};

/// Resolves `arg` against the frame at `fp` to an absolute byte offset.
///
/// The walk keeps a running `offset` (seeded with the argument's base
/// offset), a current element `elt` (advanced by field steps), and a field
/// cursor. The cursor indexes the *root* argument's `fields` sequence even
/// after `elt` has been reassigned; chained projections past a pointer hop
/// rely on this.
///
/// After the walk, pointer arguments and data-segment arguments already
/// hold absolute offsets and are returned as-is; everything else is
/// frame-relative and gets `fp` added.
pub fn resolve(proc: &Process, fp: usize, arg_id: ArgId) -> usize {
    let arg = proc.module.arg(arg_id);
    let mut offset = arg.offset;
    let mut elt = arg;
    let mut field_cursor = 0;

    for op in &arg.deref_ops {
        match op {
            DerefOp::Index => {
                for (dim, idx) in elt.indexes.iter().enumerate() {
                    // Row-major: stride of dimension `dim` is the product
                    // of the extents of every inner dimension.
                    let mut stride: usize = elt.lengths[dim + 1..].iter().product();
                    if elt.is_struct {
                        let layout = elt.custom_type.expect("struct argument without layout");
                        stride *= proc.module.struct_type(layout).size;
                    } else {
                        stride *= elt.size;
                    }
                    offset += access::read_i32(proc, fp, *idx) as usize * stride;
                }
            }
            DerefOp::Field => {
                elt = proc.module.arg(arg.fields[field_cursor]);
                offset += elt.offset;
                field_cursor += 1;
            }
            DerefOp::Pointer => {
                for _ in 0..elt.dereference_levels {
                    debug_assert!(
                        fp + offset + elt.size <= proc.stack.len(),
                        "pointer slot for {} out of stack bounds",
                        arg.name
                    );
                    let slot = &proc.stack[fp + offset..fp + offset + elt.size];
                    let target = codec::decode_i32(slot);
                    offset = if arg.segment == MemorySegment::Heap {
                        target as usize + OBJECT_HEADER_SIZE
                    } else {
                        target as usize
                    };
                }
            }
        }
    }

    if arg.is_pointer || arg.segment == MemorySegment::Data {
        offset
    } else {
        fp + offset
    }
}
