//! End-to-end scenarios for the Vesper runtime core.
//!
//! These tests drive the public surface the way an embedding would: build a
//! module description, start a process, execute or allocate, and check the
//! memory image afterwards.

use vesper_runtime::memory::{
    NULL_HEAP_ADDRESS, NULL_HEAP_ADDRESS_OFFSET, OBJECT_HEADER_SIZE, Process,
};
use vesper_runtime::types::{Argument, DerefOp, MemorySegment, Module};
use vesper_runtime::{Error, codec, gc};
use vesper_tests::TestHarness;

fn harness_with_root_frame(roots: usize, heap_capacity: usize) -> TestHarness {
    let mut harness = TestHarness::new().heap_capacity(heap_capacity);
    let mut pointer_args = Vec::new();
    for slot in 0..roots {
        pointer_args.push(harness.pointer_arg(&format!("p{slot}"), slot * 4));
    }
    let main = harness.operator("main", 64, vec![], vec![], pointer_args);
    harness.call(main);
    harness
}

/// Scenario: write `i32 -1` at stack offset 16 with fp 0, read it back.
#[test]
fn test_scalar_round_trip() {
    let mut harness = TestHarness::new();
    let n = harness.stack_arg("n", 16, 4);
    let main = harness.operator("main", 64, vec![], vec![], vec![]);
    harness.call(main);

    harness.write_stack_i32(16, -1);
    assert_eq!(harness.read_arg_i32(0, n), -1);
    assert_eq!(
        &harness.process().stack[16..20],
        &[0xFF, 0xFF, 0xFF, 0xFF]
    );
}

/// Scenario: three 10-byte objects, only the middle rooted, a fourth
/// allocation overflows the heap and triggers collection.
#[test]
fn test_allocate_then_collect() {
    let mut harness = harness_with_root_frame(1, 256);

    let a1 = harness.alloc_object(&[0x11; 10]);
    let a2 = harness.alloc_object(&[0x22; 10]);
    let a3 = harness.alloc_object(&[0x33; 10]);
    assert_eq!(a1 - NULL_HEAP_ADDRESS_OFFSET, 0);
    assert_eq!(a2 - NULL_HEAP_ADDRESS_OFFSET, 19);
    assert_eq!(a3 - NULL_HEAP_ADDRESS_OFFSET, 38);

    harness.write_stack_i32(0, a2 as i32);

    // 61 bytes used; a 209-byte object cannot fit without collecting.
    let big = harness.alloc_object(&[0x44; 200]);

    assert_eq!(harness.read_stack_i32(0), NULL_HEAP_ADDRESS_OFFSET as i32);
    assert_eq!(harness.heap_payload(NULL_HEAP_ADDRESS_OFFSET, 10), &[0x22; 10]);
    assert_eq!(big, NULL_HEAP_ADDRESS_OFFSET + 19);
    assert_eq!(
        harness.process().heap.heap_pointer,
        NULL_HEAP_ADDRESS_OFFSET + 19 + OBJECT_HEADER_SIZE + 200
    );
}

/// Scenario: a null root is untouched by collection and contributes nothing
/// to the watermark.
#[test]
fn test_null_root_is_inert() {
    let mut harness = harness_with_root_frame(1, 256);
    harness.alloc_object(&[9; 20]);
    harness.write_stack_i32(0, NULL_HEAP_ADDRESS);

    gc::mark_and_compact(harness.start());

    assert_eq!(harness.read_stack_i32(0), NULL_HEAP_ADDRESS);
    assert_eq!(
        harness.process().heap.heap_pointer,
        NULL_HEAP_ADDRESS_OFFSET
    );
}

/// Invariant: payload bytes observed through a root before a cycle are
/// observed unchanged through the rewritten root afterwards.
#[test]
fn test_collection_preserves_payload_through_pointer() {
    let mut harness = TestHarness::new().heap_capacity(256);
    let boxed = harness.arg(Argument {
        is_pointer: true,
        segment: MemorySegment::Heap,
        dereference_levels: 1,
        deref_ops: vec![DerefOp::Pointer],
        ..Argument::scalar("boxed", 0, 4, MemorySegment::Stack)
    });
    let root = harness.pointer_arg("boxed", 0);
    let main = harness.operator("main", 64, vec![], vec![], vec![root]);
    harness.call(main);

    harness.alloc_object(&[0xEE; 30]);
    let live = harness.alloc_object(&codec::encode_i32(-559038737));
    harness.write_stack_i32(0, live as i32);
    assert_eq!(harness.read_arg_i32(0, boxed), -559038737);

    gc::mark_and_compact(harness.start());

    // The root moved; the value read through it did not.
    assert_ne!(harness.read_stack_i32(0), live as i32);
    assert_eq!(harness.read_arg_i32(0, boxed), -559038737);
}

/// Invariant: after collection the watermark equals the sentinel offset
/// plus the header-inclusive sizes of live objects.
#[test]
fn test_watermark_counts_live_objects() {
    let mut harness = harness_with_root_frame(3, 512);

    let keep_a = harness.alloc_object(&[1; 10]);
    harness.alloc_object(&[2; 40]);
    let keep_b = harness.alloc_object(&[3; 25]);
    harness.alloc_object(&[4; 7]);
    let keep_c = harness.alloc_object(&[5; 3]);

    harness.write_stack_i32(0, keep_a as i32);
    harness.write_stack_i32(4, keep_b as i32);
    harness.write_stack_i32(8, keep_c as i32);

    gc::mark_and_compact(harness.start());

    let live_total = (OBJECT_HEADER_SIZE + 10) + (OBJECT_HEADER_SIZE + 25) + (OBJECT_HEADER_SIZE + 3);
    assert_eq!(
        harness.process().heap.heap_pointer,
        NULL_HEAP_ADDRESS_OFFSET + live_total
    );
    assert_eq!(harness.heap_payload(harness.read_stack_i32(0) as usize, 10), &[1; 10]);
    assert_eq!(harness.heap_payload(harness.read_stack_i32(4) as usize, 25), &[3; 25]);
    assert_eq!(harness.heap_payload(harness.read_stack_i32(8) as usize, 3), &[5; 3]);
}

/// Invariant: a second cycle with no intervening mutation leaves the heap
/// byte-identical.
#[test]
fn test_collection_idempotent_end_to_end() {
    let mut harness = harness_with_root_frame(2, 256);
    let a = harness.alloc_object(&[6; 12]);
    harness.alloc_object(&[7; 12]);
    let b = harness.alloc_object(&[8; 12]);
    harness.write_stack_i32(0, a as i32);
    harness.write_stack_i32(4, b as i32);

    gc::mark_and_compact(harness.start());
    let heap_first = harness.process().heap.bytes().to_vec();
    let stack_first = harness.process().stack.clone();

    gc::mark_and_compact(harness.start());
    assert_eq!(harness.process().heap.bytes(), &heap_first[..]);
    assert_eq!(harness.process().stack, stack_first);
}

/// A post-collection allocation still too large for the heap is fatal.
#[test]
fn test_heap_exhaustion_is_fatal() {
    let mut harness = harness_with_root_frame(1, 64);
    let keep = harness.alloc_object(&[1; 30]);
    harness.write_stack_i32(0, keep as i32);

    let err = harness
        .start()
        .allocate(OBJECT_HEADER_SIZE + 40)
        .unwrap_err();
    assert!(matches!(err, Error::HeapExhausted { .. }));
    // The surviving object was compacted and kept.
    assert_eq!(harness.heap_payload(NULL_HEAP_ADDRESS_OFFSET, 30), &[1; 30]);
}

/// End-to-end program: box a value on the heap, collect, and read it back
/// through the dereferencing argument.
#[test]
fn test_program_with_boxing_survives_collection() {
    let mut harness = TestHarness::new().heap_capacity(128);
    let v = harness.stack_arg("v", 0, 4);
    let boxed_slot = harness.pointer_arg("boxed", 4);
    let boxed_value = harness.arg(Argument {
        is_pointer: true,
        segment: MemorySegment::Heap,
        dereference_levels: 1,
        deref_ops: vec![DerefOp::Pointer],
        ..Argument::scalar("boxed", 4, 4, MemorySegment::Stack)
    });
    let new = harness.operator("heap.new", 8, vec![v], vec![boxed_slot], vec![boxed_slot]);
    harness.call(new);

    harness.write_stack_i32(0, 271828);
    harness.run().unwrap();
    assert_eq!(harness.read_arg_i32(0, boxed_value), 271828);

    // Enough garbage to force a collection on the next allocation.
    harness.alloc_object(&[0; 60]);
    let refill = harness.alloc_object(&[0; 40]);

    assert_eq!(refill, NULL_HEAP_ADDRESS_OFFSET + OBJECT_HEADER_SIZE + 4);
    assert_eq!(harness.read_arg_i32(0, boxed_value), 271828);
}

/// Arithmetic program across two frames, exercising dispatch and
/// frame-pointer advance together.
#[test]
fn test_two_frame_arithmetic_program() {
    let mut harness = TestHarness::new();
    let lhs = harness.stack_arg("lhs", 0, 4);
    let rhs = harness.stack_arg("rhs", 4, 4);
    let out = harness.stack_arg("out", 8, 4);
    let add = harness.operator("i32.add", 12, vec![lhs, rhs], vec![out], vec![]);
    let mul = harness.operator("i32.mul", 12, vec![lhs, rhs], vec![out], vec![]);
    harness.call(add);
    harness.call(mul);

    harness.write_stack_i32(0, 19);
    harness.write_stack_i32(4, 23);
    harness.write_stack_i32(12, 6);
    harness.write_stack_i32(16, 7);

    harness.run().unwrap();
    assert_eq!(harness.read_stack_i32(8), 42);
    assert_eq!(harness.read_stack_i32(20), 42);
}

/// Module descriptions round-trip through their serialized form, so the
/// compiler half of the toolchain can hand them across a boundary.
#[test]
fn test_module_description_round_trips_serialized() {
    let mut harness = TestHarness::new();
    let lhs = harness.stack_arg("lhs", 0, 4);
    let rhs = harness.stack_arg("rhs", 4, 4);
    let out = harness.stack_arg("out", 8, 4);
    let boxed = harness.pointer_arg("boxed", 12);
    // A dereferencing argument so the serialized form carries role tags,
    // segment tags and a projection program, not just scalars.
    harness.arg(Argument {
        is_pointer: true,
        segment: MemorySegment::Heap,
        dereference_levels: 1,
        deref_ops: vec![DerefOp::Pointer],
        ..Argument::scalar("boxed", 12, 4, MemorySegment::Stack)
    });
    let add = harness.operator("i32.add", 16, vec![lhs, rhs], vec![out], vec![boxed]);
    harness.call(add);
    let module = harness.start().module.clone();

    let encoded = serde_json::to_string(&module).unwrap();
    let decoded: Module = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, module);

    // The decoded description is a working program, not just an equal one.
    let mut rebuilt = Process::new(decoded).unwrap();
    vesper_runtime::access::write_to_stack(&mut rebuilt.stack, 0, &codec::encode_i32(2));
    vesper_runtime::access::write_to_stack(&mut rebuilt.stack, 4, &codec::encode_i32(3));
    vesper_runtime::run(&mut rebuilt, &vesper_runtime::NativeRegistry::with_builtins()).unwrap();
    assert_eq!(codec::decode_i32(&rebuilt.stack[8..12]), 5);
}
