//! The code generation seam.
//!
//! Semantic analysis never builds machine code itself. Every emission goes
//! through the [`Backend`] trait, which exposes SSA-style primitives: blocks,
//! stack slots, loads and stores, constants, primitive instructions, calls
//! and branches. Values and blocks are opaque `Copy` handles owned by the
//! backend.
//!
//! [`RecordingBackend`] keeps every emitted instruction as data, which is
//! what the tests inspect.

mod recording;

pub use recording::{Instr, RecordedBlock, RecordedFunction, RecordingBackend};

use std::fmt;

use shadel_types::TypeSpec;

/// An SSA value produced by the backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// A basic block.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A declared function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub u32);

/// How one parameter is passed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamAbi {
    pub ty: TypeSpec,
    /// Output parameters are passed as an address.
    pub by_ref: bool,
}

/// The calling convention of a declared function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionAbi {
    pub params: Vec<ParamAbi>,
    pub ret: TypeSpec,
}

/// Emission primitives used by lowering.
///
/// Implementations keep one insertion point. Every method that emits an
/// instruction appends it to the current block.
pub trait Backend {
    // ========================================================================
    // Functions and globals
    // ========================================================================

    /// Declare a function. Declaring the same symbol twice yields the same id.
    fn declare_function(&mut self, symbol: &str, abi: &FunctionAbi) -> FunctionId;

    /// Whether `function` already has a body.
    fn has_body(&self, function: FunctionId) -> bool;

    /// Start the body of `function` and return its entry block, which
    /// becomes the insertion point.
    fn begin_function(&mut self, function: FunctionId) -> BlockId;

    /// Finish the function started last.
    fn end_function(&mut self);

    /// The incoming value of parameter `index` of the current function.
    fn param(&mut self, index: u32) -> ValueId;

    /// The address of a global, declaring it on first use.
    fn global(&mut self, symbol: &str, ty: &TypeSpec) -> ValueId;

    // ========================================================================
    // Blocks
    // ========================================================================

    fn create_block(&mut self, label: &str) -> BlockId;
    fn switch_to(&mut self, block: BlockId);
    fn current_block(&self) -> BlockId;

    /// Whether the current block already ends in a terminator.
    fn is_terminated(&self) -> bool;

    // ========================================================================
    // Storage
    // ========================================================================

    /// A stack slot for a value of type `ty`.
    fn alloca(&mut self, ty: &TypeSpec, name: &str) -> ValueId;
    /// The per-function slot holding the jump selector.
    fn selector_slot(&mut self) -> ValueId;
    /// The per-function slot holding an in-flight runtime error.
    fn error_slot(&mut self) -> ValueId;
    fn load(&mut self, ty: &TypeSpec, address: ValueId) -> ValueId;
    fn store(&mut self, value: ValueId, address: ValueId);
    fn store_selector(&mut self, slot: ValueId, target: u8);

    /// Address of element `index` inside the array at `base`.
    fn element_ptr(&mut self, base: ValueId, index: ValueId) -> ValueId;
    /// Address of field `field` inside the aggregate at `base`.
    fn field_ptr(&mut self, base: ValueId, field: u32) -> ValueId;

    // ========================================================================
    // Values
    // ========================================================================

    fn const_int(&mut self, value: i64) -> ValueId;
    fn const_float(&mut self, value: f64) -> ValueId;
    fn const_bool(&mut self, value: bool) -> ValueId;
    fn const_string(&mut self, value: &str) -> ValueId;
    /// The zero value of `ty`.
    fn default_value(&mut self, ty: &TypeSpec) -> ValueId;

    /// A primitive instruction such as `add.f` or `not.b`.
    fn instruction(&mut self, name: &'static str, operands: &[ValueId]) -> ValueId;
    fn cast(&mut self, value: ValueId, from: &TypeSpec, to: &TypeSpec) -> ValueId;
    fn aggregate(&mut self, ty: &TypeSpec, elements: &[ValueId]) -> ValueId;
    /// Member `index` of an aggregate value.
    fn extract(&mut self, value: ValueId, index: u32) -> ValueId;

    // ========================================================================
    // Calls and control flow
    // ========================================================================

    /// A call that cannot raise a runtime error.
    fn call(&mut self, callee: &str, args: &[ValueId]) -> ValueId;

    /// A call that continues at `normal`, or at `unwind` if the callee
    /// raised a runtime error. Terminates the current block.
    fn invoke(
        &mut self,
        callee: &str,
        args: &[ValueId],
        normal: BlockId,
        unwind: BlockId,
    ) -> ValueId;

    /// The error caught on entry to an unwind block.
    fn landing_pad(&mut self) -> ValueId;

    fn branch(&mut self, target: BlockId);
    fn cond_branch(&mut self, condition: ValueId, then_block: BlockId, else_block: BlockId);
    fn switch_selector(&mut self, slot: ValueId, cases: &[(u8, BlockId)], default: BlockId);
    fn ret(&mut self, value: Option<ValueId>);
    /// Re-raise the error held in `slot` to the caller.
    fn raise(&mut self, slot: ValueId);
    fn unreachable(&mut self);
}
