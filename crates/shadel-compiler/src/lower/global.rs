//! Unit-level declarations.
//!
//! Global initializers run in a generated `<unit>.__init` function. It is
//! opened before the first item and kept open underneath every function
//! lowered afterwards; each global appends its initializer at the saved
//! cursor.

use shadel_ast::{
    FunctionAliasDecl, GlobalVarDecl, Item, ModuleDecl, Script, TypeAliasDecl, VariableAliasDecl,
};
use shadel_core::{CompilationError, Join, Span, SymbolKind, accumulate, with_side_effect};

use super::{Lowerer, Result};
use crate::backend::FunctionAbi;
use crate::control::JumpTarget;
use crate::exports::VariableExport;
use crate::types::UserType;
use crate::variable::VariableEntry;

/// Name of the generated global initializer.
pub const INIT_FUNCTION: &str = "__init";

impl Lowerer<'_, '_> {
    /// Lower a whole script and return the symbol of its init function.
    #[cfg_attr(feature = "profiling", profiling::function)]
    #[tracing::instrument(level = "debug", skip_all, fields(unit = %self.ctx.options.unit_name))]
    pub fn unit(&mut self, script: &Script<'_>) -> Result<String> {
        let init = self.begin_init();
        let items = self.items(script.items());
        let finished = self.finish_init();
        with_side_effect(items, finished).map(|()| init)
    }

    fn begin_init(&mut self) -> String {
        let symbol = self.ctx.global_symbol(INIT_FUNCTION);
        let abi = FunctionAbi {
            params: Vec::new(),
            ret: self.ctx.builtins.types.void(),
        };
        self.open_function(INIT_FUNCTION, &symbol, &abi, false);
        self.init_cursor = Some(self.backend.current_block());
        symbol
    }

    fn finish_init(&mut self) -> Result<()> {
        let cursor = self
            .init_cursor
            .take()
            .ok_or_else(|| CompilationError::internal("init function finished twice"))?;
        self.backend.switch_to(cursor);
        if !self.backend.is_terminated() {
            let frame = self
                .ctx
                .control
                .function()
                .ok_or_else(|| CompilationError::internal("init function frame missing"))?;
            let (slot, epilogue) = (frame.selector_slot, frame.epilogue);
            self.backend.store_selector(slot, JumpTarget::Return.into());
            self.backend.branch(epilogue);
        }
        self.close_function()
    }

    /// Run `body` at the end of the init function.
    fn in_init<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let cursor = self.init_cursor.ok_or_else(|| {
            CompilationError::internal("global initializer outside the unit's init function")
        })?;
        self.backend.switch_to(cursor);
        let result = body(self);
        self.init_cursor = Some(self.backend.current_block());
        result
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Lower every item, reporting the errors of all of them.
    pub(crate) fn items(&mut self, items: &[Item<'_>]) -> Result<()> {
        let results: Vec<_> = items.iter().map(|item| self.item(item)).collect();
        accumulate(results).map(|_| ())
    }

    pub(crate) fn item(&mut self, item: &Item<'_>) -> Result<()> {
        match item {
            Item::GlobalVar(decl) => self.global_var(decl),
            Item::Prototype(decl) => self.prototype(decl),
            Item::Function(decl) => self.function(decl),
            Item::Module(decl) => self.module(decl),
            Item::Distribution(decl) => self.distribution(decl),
            Item::VariableAlias(decl) => self.variable_alias(decl),
            Item::FunctionAlias(decl) => self.function_alias(decl),
            Item::TypeAlias(decl) => self.type_alias(decl),
        }
    }

    /// Declare a global, bind and export it, and append its initializer to
    /// the init function. The name is bound even if the initializer fails.
    fn global_var(&mut self, decl: &GlobalVarDecl<'_>) -> Result<()> {
        let name = decl.name.name;
        let unbound = self.ctx.check_unbound(SymbolKind::Variable, name, decl.name.span);
        let ty = self.ctx.resolve_type(&decl.ty);
        let (ty, ()) = (ty, unbound).join()?;
        if ty.is_void() {
            return Err(CompilationError::message(
                format!("global '{name}' cannot have type 'void'"),
                decl.span,
            ));
        }

        let symbol = self.ctx.global_symbol(name);
        let initialized = self.in_init(|l| {
            let address = l.backend.global(&symbol, &ty);
            let value = match decl.init {
                Some(init) => {
                    let typed = l.expr_as(init, &ty)?;
                    l.into_owned(typed)
                }
                None if ty.has_default() => l.backend.default_value(&ty),
                None => {
                    return Err(CompilationError::message(
                        format!("global '{name}' of type '{ty}' needs an initializer"),
                        decl.span,
                    ));
                }
            };
            l.backend.store(value, address);
            Ok(())
        });

        tracing::debug!(global = %name, symbol = %symbol, ty = %ty, "declare global");
        let bound = self.ctx.variables.set(
            name,
            VariableEntry::global(name, ty.clone(), symbol.clone(), decl.span),
        );
        self.ctx.exports.add_variable(VariableExport {
            name: name.to_string(),
            mangled: symbol,
            ty,
        });
        with_side_effect(initialized, bound)
    }

    /// Lower a module's items inside its own scopes, then hand the closed
    /// scopes to the module tree.
    fn module(&mut self, decl: &ModuleDecl<'_>) -> Result<()> {
        let name = decl.name.name;
        self.open_module(name);
        let items = self.items(decl.items);
        let closed = self.close_module(decl.span);
        with_side_effect(items, closed)
    }

    pub(super) fn open_module(&mut self, name: &str) {
        self.ctx.modules.enter(name);
        self.ctx.exports.push_module(name);
        self.ctx.push_path(name);
        self.ctx.push_declaration_scope(name);
    }

    pub(super) fn close_module(&mut self, span: Span) -> Result<()> {
        self.ctx.pop_path();
        let exports = self.ctx.exports.pop_module();
        let (variables, functions, types) = self.ctx.pop_declaration_scope()?;
        let exited = self.ctx.modules.exit(variables, functions, types, span);
        (exports, exited).join().map(|_| ())
    }

    // ========================================================================
    // Aliases
    // ========================================================================

    /// Bind a local name to a global compiled in another unit.
    fn variable_alias(&mut self, decl: &VariableAliasDecl<'_>) -> Result<()> {
        let name = decl.alias.name;
        let unbound = self.ctx.check_unbound(SymbolKind::Variable, name, decl.alias.span);
        let ty = self.ctx.resolve_type(&decl.ty);
        let (ty, ()) = (ty, unbound).join()?;

        self.ctx.variables.set(
            name,
            VariableEntry::global(name, ty.clone(), decl.target, decl.span),
        )?;
        self.ctx.exports.add_variable(VariableExport {
            name: name.to_string(),
            mangled: decl.target.to_string(),
            ty,
        });
        Ok(())
    }

    /// Bind a local signature to a function compiled in another unit.
    /// Member aliases are not exported.
    fn function_alias(&mut self, decl: &FunctionAliasDecl<'_>) -> Result<()> {
        let mut entry = self.signature_entry(&decl.signature, None, decl.member)?;
        entry.symbol = decl.target.to_string();
        entry.defined = true;
        self.declare(entry, !decl.member).map(|_| ())
    }

    fn type_alias(&mut self, decl: &TypeAliasDecl<'_>) -> Result<()> {
        let name = decl.name.name;
        let unbound = self.ctx.check_unbound(SymbolKind::Type, name, decl.name.span);
        let ty = self.ctx.resolve_type(&decl.ty);
        let (ty, ()) = (ty, unbound).join()?;
        tracing::trace!(alias = %name, ty = %ty, "type alias");
        self.ctx.types.set(
            name,
            UserType {
                ty,
                span: decl.span,
            },
        )
    }
}
