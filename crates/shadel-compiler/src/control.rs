//! Control-flow state during lowering.
//!
//! [`ControlState`] tracks the function, lexical scopes, loops and member
//! contexts currently open. Control transfers consult it to find their
//! target block and the scope depth they unwind to.
//!
//! ## Unwinding
//!
//! Each function has one epilogue block that dispatches on a jump-target
//! selector:
//!
//! ```text
//! return v   -> store v, selector = Return, cleanup scopes, br epilogue
//! error e    -> store e, selector = Error,  cleanup scopes, br epilogue
//! epilogue:  switch selector [Return -> ret, Error -> raise]
//! ```
//!
//! `break` and `continue` run the cleanup of the scopes inside the loop and
//! branch straight to the loop's exit or step block.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use shadel_core::CompilationError;
use shadel_types::TypeSpec;

use crate::backend::{BlockId, ValueId};

type Result<T> = std::result::Result<T, CompilationError>;

/// Why control is leaving the current scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum JumpTarget {
    FallThrough = 0,
    Return = 1,
    Continue = 2,
    Break = 3,
    Error = 4,
}

/// The function being lowered.
#[derive(Debug, Clone)]
pub struct FunctionFrame {
    pub name: String,
    pub return_type: TypeSpec,
    /// Slot receiving the return value, absent for `void`.
    pub return_slot: Option<ValueId>,
    pub selector_slot: ValueId,
    pub error_slot: ValueId,
    pub epilogue: BlockId,
    /// Variable scope depth outside the function's own scopes.
    pub scope_depth: usize,
    /// The hidden context argument of a member function.
    pub context: Option<ValueId>,
}

/// A lexical scope opened by a statement.
#[derive(Debug, Clone)]
pub struct ScopeFrame {
    pub name: String,
    /// False once every path through the scope has hit a terminator.
    pub reaches_end: bool,
}

/// An enclosing loop.
#[derive(Debug, Clone)]
pub struct LoopFrame {
    pub continue_block: BlockId,
    pub break_block: BlockId,
    /// Variable scope depth at loop entry.
    pub scope_depth: usize,
    /// Whether any `break` targets this loop.
    pub has_break: bool,
}

/// A distribution's parameter block, visible to its member functions.
#[derive(Debug, Clone)]
pub struct ContextFrame {
    pub name: String,
    pub fields: Vec<(String, TypeSpec)>,
}

#[derive(Debug, Default)]
pub struct ControlState {
    functions: Vec<FunctionFrame>,
    scopes: Vec<ScopeFrame>,
    loops: Vec<LoopFrame>,
    contexts: Vec<ContextFrame>,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Functions
    // ========================================================================

    pub fn push_function(&mut self, frame: FunctionFrame) {
        self.functions.push(frame);
    }

    pub fn pop_function(&mut self) -> Result<FunctionFrame> {
        self.functions
            .pop()
            .ok_or_else(|| CompilationError::internal("function frame underflow"))
    }

    pub fn function(&self) -> Option<&FunctionFrame> {
        self.functions.last()
    }

    pub fn function_mut(&mut self) -> Option<&mut FunctionFrame> {
        self.functions.last_mut()
    }

    pub fn in_function(&self) -> bool {
        !self.functions.is_empty()
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    pub fn push_scope(&mut self, name: impl Into<String>) {
        self.scopes.push(ScopeFrame {
            name: name.into(),
            reaches_end: true,
        });
    }

    pub fn pop_scope(&mut self) -> Result<ScopeFrame> {
        self.scopes
            .pop()
            .ok_or_else(|| CompilationError::internal("scope frame underflow"))
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Whether the current path can still reach the end of the innermost scope.
    pub fn reaches_end(&self) -> bool {
        self.scopes.last().is_none_or(|s| s.reaches_end)
    }

    /// Record that the current path has hit a terminator.
    pub fn mark_terminated(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.reaches_end = false;
        }
    }

    // ========================================================================
    // Loops
    // ========================================================================

    pub fn push_loop(&mut self, frame: LoopFrame) {
        self.loops.push(frame);
    }

    pub fn pop_loop(&mut self) -> Result<LoopFrame> {
        self.loops
            .pop()
            .ok_or_else(|| CompilationError::internal("loop frame underflow"))
    }

    /// The innermost loop of the current function.
    pub fn current_loop(&self) -> Option<&LoopFrame> {
        let floor = self.function().map_or(0, |f| f.scope_depth);
        self.loops.last().filter(|l| l.scope_depth >= floor)
    }

    pub fn in_loop(&self) -> bool {
        self.current_loop().is_some()
    }

    /// Record a `break` out of the innermost loop.
    pub fn mark_break(&mut self) {
        if let Some(l) = self.loops.last_mut() {
            l.has_break = true;
        }
    }

    // ========================================================================
    // Contexts
    // ========================================================================

    pub fn push_context(&mut self, frame: ContextFrame) {
        self.contexts.push(frame);
    }

    pub fn pop_context(&mut self) -> Result<ContextFrame> {
        self.contexts
            .pop()
            .ok_or_else(|| CompilationError::internal("context frame underflow"))
    }

    pub fn context(&self) -> Option<&ContextFrame> {
        self.contexts.last()
    }

    pub fn in_context(&self) -> bool {
        !self.contexts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadel_types::TypeRegistry;

    fn frame(depth: usize) -> FunctionFrame {
        FunctionFrame {
            name: "f".into(),
            return_type: TypeRegistry::new().void(),
            return_slot: None,
            selector_slot: ValueId(0),
            error_slot: ValueId(1),
            epilogue: BlockId(0),
            scope_depth: depth,
            context: None,
        }
    }

    #[test]
    fn selector_round_trips_through_u8() {
        for target in [
            JumpTarget::FallThrough,
            JumpTarget::Return,
            JumpTarget::Continue,
            JumpTarget::Break,
            JumpTarget::Error,
        ] {
            let raw: u8 = target.into();
            assert_eq!(JumpTarget::try_from(raw).unwrap(), target);
        }
        assert!(JumpTarget::try_from(9u8).is_err());
    }

    #[test]
    fn terminators_mark_only_the_innermost_scope() {
        let mut state = ControlState::new();
        state.push_scope("outer");
        state.push_scope("inner");
        state.mark_terminated();
        assert!(!state.reaches_end());
        state.pop_scope().unwrap();
        assert!(state.reaches_end());
    }

    #[test]
    fn loops_do_not_leak_into_nested_functions() {
        let mut state = ControlState::new();
        state.push_function(frame(0));
        state.push_loop(LoopFrame {
            continue_block: BlockId(1),
            break_block: BlockId(2),
            scope_depth: 2,
            has_break: false,
        });
        assert!(state.in_loop());

        state.push_function(frame(5));
        assert!(!state.in_loop());
        state.pop_function().unwrap();
        assert!(state.in_loop());
    }

    #[test]
    fn underflow_is_internal_error() {
        let mut state = ControlState::new();
        assert!(state.pop_function().is_err());
        assert!(state.pop_scope().is_err());
        assert!(state.pop_loop().is_err());
        assert!(state.pop_context().is_err());
    }
}
