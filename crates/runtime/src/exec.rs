//! Straight-line execution over the call plan.
//!
//! The compiler schedules the program as an ordered sequence of frames; the
//! executor walks them in program order, maintaining the frame pointer the
//! same way the collector does, and dispatches each frame's operator to a
//! registered native body. Reads for a frame complete before its body runs;
//! writes complete before the next frame starts, which is also what makes
//! the allocator's collection point quiescent.

use indexmap::IndexMap;
use tracing::trace;

use crate::access;
use crate::codec;
use crate::error::{Error, Result};
use crate::memory::{OBJECT_HEADER_SIZE, Process};
use crate::resolve::resolve;
use crate::types::OperatorId;

/// A native operator body.
///
/// Bodies look their argument ids up through the module's operator table
/// and use the typed read/write surface; they never touch segment bytes
/// directly.
pub type NativeFn = fn(&mut Process, usize, OperatorId) -> Result<()>;

/// Name-to-body table for native operators.
///
/// Insertion-ordered so diagnostics and iteration stay deterministic.
#[derive(Default)]
pub struct NativeRegistry {
    natives: IndexMap<String, NativeFn>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in operator bodies.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("i32.add", native_i32_add);
        registry.register("i32.mul", native_i32_mul);
        registry.register("f32.add", native_f32_add);
        registry.register("f64.add", native_f64_add);
        registry.register("assign", native_assign);
        registry.register("heap.new", native_heap_new);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, body: NativeFn) {
        self.natives.insert(name.into(), body);
    }

    pub fn get(&self, name: &str) -> Option<NativeFn> {
        self.natives.get(name).copied()
    }
}

/// Executes the whole call plan against `registry`.
pub fn run(proc: &mut Process, registry: &NativeRegistry) -> Result<()> {
    let mut fp = 0;
    for c in 0..proc.active_frame_count() {
        let op_id = proc.call_stack[c].operator;
        let op = proc.module.operator(op_id);
        let (name, size) = (op.name.clone(), op.size);
        let body = registry
            .get(&name)
            .ok_or_else(|| Error::UnknownNative(name.clone()))?;
        trace!(frame = c, fp, operator = %name, "dispatch");
        body(proc, fp, op_id)?;
        fp += size;
    }
    Ok(())
}

fn native_i32_add(proc: &mut Process, fp: usize, op_id: OperatorId) -> Result<()> {
    let op = proc.module.operator(op_id);
    let (lhs, rhs, out) = (op.inputs[0], op.inputs[1], op.outputs[0]);
    let sum = access::read_i32(proc, fp, lhs).wrapping_add(access::read_i32(proc, fp, rhs));
    let offset = resolve(proc, fp, out);
    access::write_memory(proc, offset, out, &codec::encode_i32(sum));
    Ok(())
}

fn native_i32_mul(proc: &mut Process, fp: usize, op_id: OperatorId) -> Result<()> {
    let op = proc.module.operator(op_id);
    let (lhs, rhs, out) = (op.inputs[0], op.inputs[1], op.outputs[0]);
    let product = access::read_i32(proc, fp, lhs).wrapping_mul(access::read_i32(proc, fp, rhs));
    let offset = resolve(proc, fp, out);
    access::write_memory(proc, offset, out, &codec::encode_i32(product));
    Ok(())
}

fn native_f32_add(proc: &mut Process, fp: usize, op_id: OperatorId) -> Result<()> {
    let op = proc.module.operator(op_id);
    let (lhs, rhs, out) = (op.inputs[0], op.inputs[1], op.outputs[0]);
    let sum = access::read_f32(proc, fp, lhs) + access::read_f32(proc, fp, rhs);
    let offset = resolve(proc, fp, out);
    access::write_memory(proc, offset, out, &codec::encode_f32(sum));
    Ok(())
}

fn native_f64_add(proc: &mut Process, fp: usize, op_id: OperatorId) -> Result<()> {
    let op = proc.module.operator(op_id);
    let (lhs, rhs, out) = (op.inputs[0], op.inputs[1], op.outputs[0]);
    let sum = access::read_f64(proc, fp, lhs) + access::read_f64(proc, fp, rhs);
    let offset = resolve(proc, fp, out);
    access::write_memory(proc, offset, out, &codec::encode_f64(sum));
    Ok(())
}

/// Copies the input's raw bytes to the output's resolved location.
fn native_assign(proc: &mut Process, fp: usize, op_id: OperatorId) -> Result<()> {
    let op = proc.module.operator(op_id);
    let (input, out) = (op.inputs[0], op.outputs[0]);
    let bytes = access::read_from_stack(proc, fp, input).to_vec();
    let offset = resolve(proc, fp, out);
    access::write_memory(proc, offset, out, &bytes);
    Ok(())
}

/// Boxes the input on the heap and stores the object's address in the
/// output pointer slot.
fn native_heap_new(proc: &mut Process, fp: usize, op_id: OperatorId) -> Result<()> {
    let op = proc.module.operator(op_id);
    let (input, out) = (op.inputs[0], op.outputs[0]);
    let payload = access::read_from_stack(proc, fp, input).to_vec();
    let object = proc.allocate(payload.len() + OBJECT_HEADER_SIZE)?;
    access::write_to_heap(&mut proc.heap, object, &payload);
    let slot = resolve(proc, fp, out);
    access::write_to_stack(&mut proc.stack, slot, &codec::encode_i32(object as i32));
    Ok(())
}
