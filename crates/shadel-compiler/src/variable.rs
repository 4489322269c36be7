//! Variable entries.

use shadel_core::{Span, SymbolKind};
use shadel_types::TypeSpec;

use crate::backend::{Backend, ValueId};
use crate::lifecycle;
use crate::scope::SymbolEntry;

/// Where a variable's value lives.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    /// A stack slot of the current function.
    Local(ValueId),
    /// Caller-owned storage reached through an output parameter.
    Reference(ValueId),
    /// A global, addressed by its mangled symbol.
    Global(String),
    /// Field `index` of the enclosing distribution's parameter block.
    ContextField(u32),
}

/// A variable bound in some scope.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableEntry {
    pub name: String,
    pub ty: TypeSpec,
    pub storage: Storage,
    /// Emit a destructor when the owning scope is left.
    pub destroy_on_exit: bool,
    pub span: Span,
}

impl VariableEntry {
    /// A stack variable, destroyed on scope exit if its type needs it.
    pub fn local(name: impl Into<String>, ty: TypeSpec, slot: ValueId, span: Span) -> Self {
        Self {
            name: name.into(),
            destroy_on_exit: ty.needs_destroy(),
            ty,
            storage: Storage::Local(slot),
            span,
        }
    }

    pub fn reference(name: impl Into<String>, ty: TypeSpec, address: ValueId, span: Span) -> Self {
        Self {
            name: name.into(),
            ty,
            storage: Storage::Reference(address),
            destroy_on_exit: false,
            span,
        }
    }

    pub fn global(name: impl Into<String>, ty: TypeSpec, symbol: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            ty,
            storage: Storage::Global(symbol.into()),
            destroy_on_exit: false,
            span,
        }
    }

    pub fn context_field(name: impl Into<String>, ty: TypeSpec, index: u32, span: Span) -> Self {
        Self {
            name: name.into(),
            ty,
            storage: Storage::ContextField(index),
            destroy_on_exit: false,
            span,
        }
    }

    /// The mangled symbol of a global.
    pub fn symbol(&self) -> Option<&str> {
        match &self.storage {
            Storage::Global(symbol) => Some(symbol),
            _ => None,
        }
    }
}

impl SymbolEntry for VariableEntry {
    const KIND: SymbolKind = SymbolKind::Variable;

    fn destroy_on_scope_exit(&self) -> bool {
        self.destroy_on_exit
    }

    fn emit_destroy(&self, backend: &mut dyn Backend) -> usize {
        match &self.storage {
            Storage::Local(slot) => lifecycle::emit_destroy(backend, &self.ty, *slot),
            _ => 0,
        }
    }
}
