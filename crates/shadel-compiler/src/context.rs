//! The per-unit compilation context.
//!
//! [`CompileContext`] owns every piece of mutable state a unit needs: the
//! symbol tables, the module tree, the control state and the export table.
//! It is threaded by reference through typechecking and lowering; there is
//! no ambient global state.

use shadel_ast::{Path, TypeExpr};
use shadel_core::{CompilationError, Join, Span, SymbolKind};
use shadel_types::{Builtins, TypeSpec};

use crate::backend::Backend;
use crate::control::ControlState;
use crate::exports::ExportTable;
use crate::function::{FunctionEntry, FunctionKey, FunctionOverloadSet};
use crate::mangle;
use crate::module::ModuleTree;
use crate::options::CompilerOptions;
use crate::scope::{Scope, ScopedSymbolTable};
use crate::types::UserType;
use crate::variable::VariableEntry;

type Result<T> = std::result::Result<T, CompilationError>;

/// Mutable state for compiling one unit against shared read-only builtins.
#[derive(Debug)]
pub struct CompileContext<'b> {
    pub builtins: &'b Builtins,
    pub options: CompilerOptions,
    pub variables: ScopedSymbolTable<VariableEntry>,
    pub functions: ScopedSymbolTable<FunctionOverloadSet>,
    pub types: ScopedSymbolTable<UserType>,
    pub modules: ModuleTree,
    pub control: ControlState,
    pub exports: ExportTable,
    /// Scope path used for mangling, starting with the unit name.
    path: Vec<String>,
}

impl<'b> CompileContext<'b> {
    /// A context with the unit's top-level scopes open.
    pub fn new(builtins: &'b Builtins, options: CompilerOptions) -> Self {
        let unit = options.unit_name.clone();
        let mut ctx = Self {
            builtins,
            variables: ScopedSymbolTable::new(),
            functions: ScopedSymbolTable::new(),
            types: ScopedSymbolTable::new(),
            modules: ModuleTree::new(unit.clone()),
            control: ControlState::new(),
            exports: ExportTable::new(unit.clone()),
            path: vec![unit.clone()],
            options,
        };
        ctx.push_declaration_scope(unit);
        ctx
    }

    // ========================================================================
    // Declaration scopes and mangling
    // ========================================================================

    /// Open a scope on the variable, function and type tables together.
    pub fn push_declaration_scope(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.variables.push(name.clone());
        self.functions.push(name.clone());
        self.types.push(name);
    }

    /// Close the innermost declaration scope, destroying nothing.
    pub fn pop_declaration_scope(
        &mut self,
    ) -> Result<(Scope<VariableEntry>, Scope<FunctionOverloadSet>, Scope<UserType>)> {
        let variables = self.variables.take();
        let functions = self.functions.take();
        let types = self.types.take();
        (variables, functions, types).join()
    }

    /// Close the innermost lexical scope, emitting variable destructors if
    /// requested and enabled.
    pub fn pop_lexical_scope(&mut self, emit: bool, backend: &mut dyn Backend) -> Result<()> {
        let emit = emit && self.options.emit_scope_destructors;
        let variables = self.variables.pop(emit, backend);
        let functions = self.functions.take();
        let types = self.types.take();
        (variables, functions, types).join().map(|_| ())
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn push_path(&mut self, segment: impl Into<String>) {
        self.path.push(segment.into());
    }

    pub fn pop_path(&mut self) {
        if self.path.len() > 1 {
            self.path.pop();
        }
    }

    pub fn global_symbol(&self, name: &str) -> String {
        mangle::global_symbol(&self.path, name)
    }

    pub fn function_symbol(&self, name: &str, params: &[TypeSpec]) -> String {
        mangle::function_symbol(&self.path, name, params)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// A builtin type by name, such as `int` for integer literals.
    pub fn builtin_type(&self, name: &str, span: Span) -> Result<TypeSpec> {
        self.builtins.types.lookup(name, span)
    }

    /// Resolve a written type.
    pub fn resolve_type(&self, ty: &TypeExpr<'_>) -> Result<TypeSpec> {
        match ty {
            TypeExpr::Named(path) if path.is_qualified() => {
                let module = self.modules.resolve(path.qualifier())?;
                module
                    .types
                    .get(path.name())
                    .map(|t| t.ty.clone())
                    .ok_or_else(|| CompilationError::undefined(SymbolKind::Type, path.name(), path.span))
            }
            TypeExpr::Named(path) => match self.types.find(path.name()) {
                Some(user) => Ok(user.ty.clone()),
                None => self.builtins.types.lookup(path.name(), path.span),
            },
            TypeExpr::Array {
                element, length, ..
            } => {
                let element = self.resolve_type(element)?;
                Ok(self.builtins.types.array_of(&element, *length))
            }
            TypeExpr::ArrayRef { element, .. } => {
                let element = self.resolve_type(element)?;
                Ok(self.builtins.types.array_ref(&element))
            }
        }
    }

    /// Resolve a possibly qualified variable name.
    pub fn lookup_variable(&self, path: &Path<'_>) -> Result<&VariableEntry> {
        if path.is_qualified() {
            let module = self.modules.resolve(path.qualifier())?;
            return module.variables.get(path.name()).ok_or_else(|| {
                CompilationError::undefined(SymbolKind::Variable, path.name(), path.span)
            });
        }
        self.variables.get(path.name(), path.span)
    }

    /// Every overload visible under a possibly qualified name.
    ///
    /// Overloads are gathered from all open scopes; an inner declaration
    /// hides an outer one with the same parameter types.
    pub fn function_candidates(&self, path: &Path<'_>) -> Result<Vec<&FunctionEntry>> {
        let undeclared = || CompilationError::undefined(SymbolKind::Function, path.name(), path.span);

        if path.is_qualified() {
            let module = self.modules.resolve(path.qualifier())?;
            let set = module.functions.get(path.name()).ok_or_else(undeclared)?;
            return Ok(set.entries().iter().collect());
        }

        let mut seen: Vec<FunctionKey> = Vec::new();
        let mut candidates = Vec::new();
        for scope in self.functions.scopes() {
            let Some(set) = scope.get(path.name()) else {
                continue;
            };
            for entry in set.entries() {
                let key = entry.key();
                if !seen.contains(&key) {
                    seen.push(key);
                    candidates.push(entry);
                }
            }
        }
        if candidates.is_empty() {
            return Err(undeclared());
        }
        Ok(candidates)
    }

    /// Declare a function in the innermost scope.
    pub fn declare_function(&mut self, entry: FunctionEntry) -> Result<FunctionEntry> {
        if self.functions.local(&entry.name).is_none() {
            self.functions
                .set(entry.name.clone(), FunctionOverloadSet::new(entry.name.clone()))?;
        }
        let name = entry.name.clone();
        let set = self
            .functions
            .local_mut(&name)
            .ok_or_else(|| CompilationError::internal("overload set vanished after insert"))?;
        set.declare(entry).cloned()
    }

    /// Mark a declared function as having a body.
    pub fn mark_defined(&mut self, key: &FunctionKey, span: Span) -> Result<()> {
        let entry = self
            .functions
            .local_mut(&key.name)
            .and_then(|set| set.get_mut(key))
            .ok_or_else(|| CompilationError::internal(format!("'{}' defined before declared", key.name)))?;
        if entry.defined {
            return Err(CompilationError::InvalidRedeclaration {
                kind: SymbolKind::Function,
                name: key.name.clone(),
                reason: "function already has a body".to_string(),
                span,
            });
        }
        entry.defined = true;
        Ok(())
    }

    /// Fail if `name` is already bound in the innermost scope of `kind`.
    pub fn check_unbound(&self, kind: SymbolKind, name: &str, span: Span) -> Result<()> {
        let bound = match kind {
            SymbolKind::Variable => self.variables.has_local(name),
            SymbolKind::Type => self.types.has_local(name),
            SymbolKind::Function => self.functions.has_local(name),
            SymbolKind::Module => false,
        };
        if bound {
            return Err(CompilationError::InvalidRedeclaration {
                kind,
                name: name.to_string(),
                reason: format!("{kind} already declared in this scope"),
                span,
            });
        }
        Ok(())
    }
}
