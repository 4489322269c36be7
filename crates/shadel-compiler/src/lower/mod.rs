//! The AST evaluation protocol.
//!
//! Every node is first typechecked, then lowered:
//!
//! - [`TypeChecker`] borrows the context immutably. It resolves names,
//!   operators and overloads and computes static types, and can never
//!   emit code or mutate a symbol table.
//! - [`Lowerer`] borrows the context and the backend mutably. It re-runs the
//!   checker for the node at hand, so a typecheck failure stops lowering of
//!   that subtree, then emits code and updates scopes.
//!
//! Independent children are all attempted and their errors merged with
//! [`Join`](shadel_core::Join) and [`accumulate`](shadel_core::accumulate).
//! Work already done when a sibling fails is not rolled back.

mod access;
mod call;
mod distribution;
mod expr;
mod function;
mod global;
mod stmt;
mod typecheck;

pub use typecheck::TypeChecker;

use shadel_core::{CompilationError, Join, with_side_effect};
use shadel_types::{Conversion, ConversionKind, TypeSpec};

use crate::backend::{Backend, BlockId, ValueId};
use crate::context::CompileContext;
use crate::control::JumpTarget;
use crate::lifecycle;

type Result<T> = std::result::Result<T, CompilationError>;

/// A lowered expression value.
#[derive(Debug, Clone)]
pub struct Typed {
    pub value: ValueId,
    pub ty: TypeSpec,
    /// The value is a fresh temporary its consumer must either keep or
    /// destroy. Borrowed values belong to some variable.
    pub owned: bool,
}

/// The address of assignable storage.
#[derive(Debug, Clone)]
pub struct Place {
    pub address: ValueId,
    pub ty: TypeSpec,
}

/// Lowers AST nodes into backend calls.
pub struct Lowerer<'a, 'b> {
    pub(crate) ctx: &'a mut CompileContext<'b>,
    pub(crate) backend: &'a mut dyn Backend,
    /// Where the next global initializer is appended inside the unit's
    /// init function.
    pub(crate) init_cursor: Option<BlockId>,
    /// Owned temporaries still waiting for their consumer. A call that
    /// raises destroys them on its unwind path.
    pub(crate) temporaries: Vec<Typed>,
}

impl<'a, 'b> Lowerer<'a, 'b> {
    pub fn new(ctx: &'a mut CompileContext<'b>, backend: &'a mut dyn Backend) -> Self {
        Self {
            ctx,
            backend,
            init_cursor: None,
            temporaries: Vec::new(),
        }
    }

    pub fn checker(&self) -> TypeChecker<'_, 'b> {
        TypeChecker::new(self.ctx)
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    /// Run `body` inside a new lexical scope.
    ///
    /// The scope is closed whether or not `body` fails. Variable destructors
    /// are emitted on the fall-through exit only if that exit is reachable;
    /// every other exit emitted its own cleanup already.
    pub(crate) fn with_scope<T>(
        &mut self,
        name: &str,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.ctx.push_declaration_scope(name);
        self.ctx.control.push_scope(name);

        let result = body(self);

        let reachable = !self.backend.is_terminated();
        let frame = self.ctx.control.pop_scope().map(|_| ());
        let closed = self.ctx.pop_lexical_scope(reachable, self.backend);
        with_side_effect(result, (frame, closed).join().map(|_| ()))
    }

    /// Variable scope depth.
    pub(crate) fn depth(&self) -> usize {
        self.ctx.variables.depth()
    }

    /// Emit destructors for every scope above `depth`, leaving them open.
    pub(crate) fn unwind_to(&mut self, depth: usize) {
        if self.ctx.options.emit_scope_destructors {
            self.ctx.variables.destroy_above(depth, self.backend);
        }
    }

    /// Leave the scopes above `depth` and branch to `target`.
    pub(crate) fn transfer(&mut self, reason: JumpTarget, depth: usize, target: BlockId) {
        if let Some(frame) = self.ctx.control.function() {
            let slot = frame.selector_slot;
            self.backend.store_selector(slot, reason.into());
        }
        self.unwind_to(depth);
        self.backend.branch(target);
    }

    /// Terminate the current block if lowering left it open.
    pub(crate) fn seal(&mut self) {
        if !self.backend.is_terminated() {
            self.backend.unreachable();
        }
    }

    // ========================================================================
    // Values
    // ========================================================================

    /// Apply a value conversion.
    pub(crate) fn convert(
        &mut self,
        typed: Typed,
        to: &TypeSpec,
        conversion: Conversion,
    ) -> Result<Typed> {
        match conversion.kind {
            ConversionKind::Identity => Ok(Typed {
                ty: to.clone(),
                ..typed
            }),
            ConversionKind::Cast => {
                let value = self.backend.cast(typed.value, &typed.ty, to);
                self.release(&typed);
                Ok(Typed {
                    value,
                    ty: to.clone(),
                    owned: to.needs_destroy(),
                })
            }
            ConversionKind::ArrayView => Err(CompilationError::internal(
                "array views are built from storage, not values",
            )),
        }
    }

    /// A value the consumer owns, copying borrowed managed values.
    pub(crate) fn into_owned(&mut self, typed: Typed) -> ValueId {
        if typed.owned || !typed.ty.needs_destroy() {
            typed.value
        } else {
            lifecycle::emit_copy(self.backend, &typed.ty, typed.value)
        }
    }

    /// Keep `typed` live across the lowering that follows.
    pub(crate) fn hold(&mut self, typed: &Typed) {
        if typed.owned {
            self.temporaries.push(typed.clone());
        }
    }

    /// Run `body`, then forget the temporaries it held. Their consumer has
    /// released them by then.
    pub(crate) fn with_temporaries<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let mark = self.temporaries.len();
        let result = body(self);
        self.temporaries.truncate(mark);
        result
    }

    /// Destroy a temporary once it has been used.
    pub(crate) fn release(&mut self, typed: &Typed) {
        if typed.owned {
            lifecycle::emit_destroy_value(self.backend, &typed.ty, typed.value);
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Emit a call. Calls that may raise a runtime error get an unwind
    /// block that destroys the held temporaries, stores the error and
    /// leaves the function through its epilogue with the `Error` selector.
    pub(crate) fn emit_call(
        &mut self,
        callee: &str,
        args: &[ValueId],
        may_throw: bool,
    ) -> Result<ValueId> {
        if !may_throw {
            return Ok(self.backend.call(callee, args));
        }
        let frame = self.ctx.control.function().cloned().ok_or_else(|| {
            CompilationError::internal(format!("call to '{callee}' outside any function"))
        })?;

        let normal = self.backend.create_block("call.cont");
        let unwind = self.backend.create_block("call.unwind");
        let result = self.backend.invoke(callee, args, normal, unwind);

        self.backend.switch_to(unwind);
        let error = self.backend.landing_pad();
        self.backend.store(error, frame.error_slot);
        for held in &self.temporaries {
            lifecycle::emit_destroy_value(self.backend, &held.ty, held.value);
        }
        self.transfer(JumpTarget::Error, frame.scope_depth, frame.epilogue);

        self.backend.switch_to(normal);
        Ok(result)
    }
}
