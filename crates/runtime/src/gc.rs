//! Mark-compact garbage collection.
//!
//! Stop-the-world, single-threaded, triggered only by the allocator on
//! overflow. A cycle makes two passes over the active call stack and one
//! over the heap:
//!
//! 1. **Mark, plan, rewrite roots.** Every non-null pointer root across the
//!    active frames marks its object, the object is assigned a forwarding
//!    address (the running watermark of live bytes), and the root slot is
//!    rewritten to that post-compaction address. An object reached through
//!    more than one root keeps its first forwarding address; later roots
//!    are rewritten from the header slot and do not advance the watermark.
//! 2. **Relocate.** The heap is walked in object order; marked objects are
//!    unmarked and copied down to their forwarding addresses, unmarked ones
//!    are reclaimed by being skipped. Forwarding targets never exceed
//!    sources, so the overlapping copy moves low-to-high.
//!
//! The root set is precise: each operator enumerates its pointer-typed
//! arguments (`pointer_args`) and the collector never scans the stack
//! conservatively.

use tracing::debug;

use crate::codec;
use crate::memory::{
    FORWARDING_ADDRESS_SIZE, MARK_SIZE, NULL_HEAP_ADDRESS, NULL_HEAP_ADDRESS_OFFSET,
    OBJECT_HEADER_SIZE, Process, TYPE_POINTER_SIZE,
};

/// Sets the mark byte of every heap object reachable from the active
/// frames' pointer roots. No forwarding, no compaction; exposed for tests
/// and inspection tooling.
pub fn mark(proc: &mut Process) {
    let mut fp = 0;
    for c in 0..proc.active_frame_count() {
        let op = proc.module.operator(proc.call_stack[c].operator);
        for &ptr in &op.pointer_args {
            let root = fp + proc.module.arg(ptr).offset;
            let heap_offset = codec::decode_i32(&proc.stack[root..root + TYPE_POINTER_SIZE]);
            if heap_offset == NULL_HEAP_ADDRESS {
                continue;
            }
            proc.heap.bytes_mut()[heap_offset as usize] = 1;
        }
        fp += op.size;
    }
}

/// Runs one full collection cycle.
///
/// On return every surviving header's mark byte is 0, every live root
/// holds its object's post-compaction address, and `heap_pointer` equals
/// the sentinel offset plus the total size (headers included) of live
/// objects.
pub fn mark_and_compact(proc: &mut Process) {
    let old_watermark = proc.heap.heap_pointer;
    let mut fp = 0;
    let mut faddr = NULL_HEAP_ADDRESS_OFFSET as i32;
    let mut live_objects = 0usize;

    // Pass 1: mark, assign forwarding addresses, rewrite roots.
    for c in 0..proc.active_frame_count() {
        let op = proc.module.operator(proc.call_stack[c].operator);
        for &ptr in &op.pointer_args {
            let root = fp + proc.module.arg(ptr).offset;
            let heap_offset = codec::decode_i32(&proc.stack[root..root + TYPE_POINTER_SIZE]);
            if heap_offset == NULL_HEAP_ADDRESS {
                continue;
            }
            let h = heap_offset as usize;
            debug_assert!(
                h + OBJECT_HEADER_SIZE <= proc.heap.bytes().len(),
                "root at stack offset {root} points past the heap"
            );

            if proc.heap.bytes()[h] == 1 {
                // Already visited through another root: reuse the assigned
                // forwarding address instead of planning a second copy.
                let assigned = codec::decode_i32(
                    &proc.heap.bytes()[h + MARK_SIZE..h + MARK_SIZE + FORWARDING_ADDRESS_SIZE],
                );
                proc.stack[root..root + TYPE_POINTER_SIZE]
                    .copy_from_slice(&codec::encode_i32(assigned));
                continue;
            }

            proc.heap.bytes_mut()[h] = 1;

            let forwarded = codec::encode_i32(faddr);
            proc.heap.bytes_mut()[h + MARK_SIZE..h + MARK_SIZE + FORWARDING_ADDRESS_SIZE]
                .copy_from_slice(&forwarded);
            proc.stack[root..root + TYPE_POINTER_SIZE].copy_from_slice(&forwarded);

            let obj_size = codec::decode_i32(
                &proc.heap.bytes()
                    [h + MARK_SIZE + FORWARDING_ADDRESS_SIZE..h + OBJECT_HEADER_SIZE],
            );
            faddr += (OBJECT_HEADER_SIZE + obj_size as usize) as i32;
            live_objects += 1;
        }
        fp += op.size;
    }

    // Pass 2: relocate live objects, reclaim the rest.
    let mut new_heap_pointer = NULL_HEAP_ADDRESS_OFFSET;
    let mut c = NULL_HEAP_ADDRESS_OFFSET;
    while c < proc.heap.heap_pointer {
        let bytes = proc.heap.bytes_mut();
        debug_assert!(c + OBJECT_HEADER_SIZE <= bytes.len(), "truncated header at {c}");
        let forwarding = codec::decode_i32(
            &bytes[c + MARK_SIZE..c + MARK_SIZE + FORWARDING_ADDRESS_SIZE],
        ) as usize;
        let obj_size = codec::decode_i32(
            &bytes[c + MARK_SIZE + FORWARDING_ADDRESS_SIZE..c + OBJECT_HEADER_SIZE],
        ) as usize;
        let total = OBJECT_HEADER_SIZE + obj_size;

        if bytes[c] == 1 {
            // Clear the mark before the copy so the relocated header is
            // already clean. Forwarding targets are at or below the source,
            // which makes the overlapping copy safe.
            bytes[c] = 0;
            bytes.copy_within(c..c + total, forwarding);
            new_heap_pointer += total;
        }

        c += total;
    }

    proc.heap.heap_pointer = new_heap_pointer;
    debug!(
        live_objects,
        live_bytes = new_heap_pointer - NULL_HEAP_ADDRESS_OFFSET,
        reclaimed = old_watermark - new_heap_pointer,
        "heap compacted"
    );
}
