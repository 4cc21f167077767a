//! Compiled module description.
//!
//! These types are the artifact the compiler hands to the runtime: argument
//! descriptors, struct layouts, operators and the call plan. They are
//! populated by the front end, immutable during execution, and serializable
//! so a compiled module can be shipped between the two halves of the
//! toolchain.
//!
//! Argument descriptors form a DAG (`fields` and `indexes` reference other
//! descriptors). They live in a single arena on [`Module`] and refer to each
//! other by [`ArgId`] index rather than by owning pointers.

use serde::{Deserialize, Serialize};

/// Index of an argument descriptor in the module's argument arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgId(pub u32);

impl ArgId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a struct layout in the module's struct table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructId(pub u32);

impl StructId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of an operator in the module's operator table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorId(pub u32);

impl OperatorId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which memory segment an argument's bytes live in.
///
/// A closed set: the read/write paths pattern-match on it directly. Segment
/// access is the hottest path in the interpreter, so this stays an enum
/// rather than a trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemorySegment {
    /// Call frames, frame-relative offsets.
    Stack,
    /// Static data, absolute offsets baked at compile time.
    Data,
    /// Bump-allocated objects, absolute offsets past the null sentinel.
    Heap,
}

/// One projection step applied by the address resolver, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerefOp {
    /// Consume all array dimensions of the current element (row-major).
    Index,
    /// Advance to the next entry of the argument's `fields` sequence.
    Field,
    /// Follow `dereference_levels` pointer hops through the stack.
    Pointer,
}

/// Describes one operand: its type shape, location, and the projection
/// needed to reach its value.
///
/// `offset` is frame-relative for stack arguments and absolute for data and
/// heap arguments; the resolver's final discriminator accounts for the
/// difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Declared name, kept for diagnostics only.
    pub name: String,
    /// Base byte offset; meaning depends on `segment`.
    pub offset: usize,
    /// Byte width of a single element of the primitive type.
    pub size: usize,
    /// Byte width of the whole argument, array extent included.
    pub total_size: usize,
    /// Owning memory segment.
    pub segment: MemorySegment,
    /// The argument's type is a heap pointer.
    pub is_pointer: bool,
    /// The argument's element type is a declared struct.
    pub is_struct: bool,
    /// The argument is passed by reference.
    pub is_reference: bool,
    /// Pointer hops the resolver follows on a `Pointer` step.
    pub dereference_levels: usize,
    /// Pointer levels the declared type carries.
    pub indirection_levels: usize,
    /// Projection program, applied in order by the resolver.
    pub deref_ops: Vec<DerefOp>,
    /// Index-supplying arguments, one per array dimension.
    pub indexes: Vec<ArgId>,
    /// Dimension extents of the outer array type.
    pub lengths: Vec<usize>,
    /// Child descriptors consumed by `Field` steps, in order.
    pub fields: Vec<ArgId>,
    /// Struct layout supplying the element stride when `is_struct`.
    pub custom_type: Option<StructId>,
}

impl Argument {
    /// A scalar descriptor with no projection program. Builders fill in the
    /// role tags and sequences they need.
    pub fn scalar(name: impl Into<String>, offset: usize, size: usize, segment: MemorySegment) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
            total_size: size,
            segment,
            is_pointer: false,
            is_struct: false,
            is_reference: false,
            dereference_levels: 0,
            indirection_levels: 0,
            deref_ops: Vec::new(),
            indexes: Vec::new(),
            lengths: Vec::new(),
            fields: Vec::new(),
            custom_type: None,
        }
    }
}

/// A declared struct type; `size` is the stride of one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructType {
    pub name: String,
    pub size: usize,
}

/// An operator: a callable unit with a fixed-size frame.
///
/// `pointer_args` is the precise GC root set for a frame running this
/// operator. The compiler enumerates it; the collector accepts it as input
/// and never rediscovers roots by scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    /// Name the native registry dispatches on.
    pub name: String,
    /// Frame size in bytes.
    pub size: usize,
    /// Formal input arguments.
    pub inputs: Vec<ArgId>,
    /// Formal output arguments.
    pub outputs: Vec<ArgId>,
    /// The subset of this operator's arguments typed as heap pointers.
    pub pointer_args: Vec<ArgId>,
}

/// One entry of the call plan: a frame running `operator`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub operator: OperatorId,
}

/// A fully compiled module, ready to execute.
///
/// The front end produces this; the runtime treats every field as
/// immutable. The call plan is the program's execution schedule: a
/// straight-line sequence of frames, topmost last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Initial contents of the static data segment.
    pub data: Vec<u8>,
    /// Struct layout table.
    pub structs: Vec<StructType>,
    /// Argument descriptor arena.
    pub args: Vec<Argument>,
    /// Operator table.
    pub operators: Vec<Operator>,
    /// Execution schedule, in program order.
    pub call_plan: Vec<Call>,
}

impl Module {
    pub fn arg(&self, id: ArgId) -> &Argument {
        &self.args[id.index()]
    }

    pub fn operator(&self, id: OperatorId) -> &Operator {
        &self.operators[id.index()]
    }

    pub fn struct_type(&self, id: StructId) -> &StructType {
        &self.structs[id.index()]
    }

    /// Appends a descriptor to the arena and returns its id.
    pub fn add_arg(&mut self, arg: Argument) -> ArgId {
        let id = ArgId::new(self.args.len() as u32);
        self.args.push(arg);
        id
    }

    /// Appends an operator and returns its id.
    pub fn add_operator(&mut self, operator: Operator) -> OperatorId {
        let id = OperatorId::new(self.operators.len() as u32);
        self.operators.push(operator);
        id
    }

    /// Appends a struct layout and returns its id.
    pub fn add_struct(&mut self, layout: StructType) -> StructId {
        let id = StructId::new(self.structs.len() as u32);
        self.structs.push(layout);
        id
    }
}
