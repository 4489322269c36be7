//! The module ownership tree.
//!
//! A module is compiled with its own scopes pushed on the symbol tables.
//! When it closes, those scopes are moved into a [`Module`] owned by the
//! enclosing module, or by the unit root. Ownership only ever points from
//! parent to child.

use rustc_hash::FxHashMap;
use shadel_ast::Ident;
use shadel_core::{CompilationError, Span, SymbolKind};

use crate::function::FunctionOverloadSet;
use crate::scope::Scope;
use crate::types::UserType;
use crate::variable::VariableEntry;

type Result<T> = std::result::Result<T, CompilationError>;

/// A closed module and everything declared inside it.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    pub variables: Scope<VariableEntry>,
    pub functions: Scope<FunctionOverloadSet>,
    pub types: Scope<UserType>,
    pub children: FxHashMap<String, Module>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn child(&self, name: &str) -> Option<&Module> {
        self.children.get(name)
    }

    /// Follow `path` through child modules.
    pub fn descend(&self, path: &[Ident<'_>]) -> Result<&Module> {
        let mut module = self;
        for segment in path {
            module = module.child(segment.name).ok_or_else(|| {
                CompilationError::undefined(SymbolKind::Module, segment.name, segment.span)
            })?;
        }
        Ok(module)
    }

    fn adopt(&mut self, child: Module, span: Span) -> Result<()> {
        if self.children.contains_key(&child.name) {
            return Err(CompilationError::InvalidRedeclaration {
                kind: SymbolKind::Module,
                name: child.name,
                reason: "Redeclaration of module".to_string(),
                span,
            });
        }
        self.children.insert(child.name.clone(), child);
        Ok(())
    }
}

/// The unit root plus the modules currently being compiled.
#[derive(Debug, Default)]
pub struct ModuleTree {
    root: Module,
    open: Vec<Module>,
}

impl ModuleTree {
    pub fn new(unit_name: impl Into<String>) -> Self {
        Self {
            root: Module::new(unit_name),
            open: Vec::new(),
        }
    }

    pub fn root(&self) -> &Module {
        &self.root
    }

    pub fn into_root(self) -> Module {
        self.root
    }

    /// Number of modules currently open.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Start compiling module `name`.
    pub fn enter(&mut self, name: impl Into<String>) {
        let module = Module::new(name);
        tracing::debug!(module = %module.name, depth = self.open.len() + 1, "enter module");
        self.open.push(module);
    }

    /// Finish the innermost open module, moving its scopes into it and
    /// handing it to its parent.
    pub fn exit(
        &mut self,
        variables: Scope<VariableEntry>,
        functions: Scope<FunctionOverloadSet>,
        types: Scope<UserType>,
        span: Span,
    ) -> Result<()> {
        let mut module = self
            .open
            .pop()
            .ok_or_else(|| CompilationError::internal("module exit without a matching enter"))?;
        module.variables = variables;
        module.functions = functions;
        module.types = types;
        tracing::debug!(module = %module.name, depth = self.open.len(), "exit module");

        let parent = self.open.last_mut().unwrap_or(&mut self.root);
        parent.adopt(module, span)
    }

    /// Move the unit's top-level scopes into the root.
    pub fn close_root(
        &mut self,
        variables: Scope<VariableEntry>,
        functions: Scope<FunctionOverloadSet>,
        types: Scope<UserType>,
    ) {
        self.root.variables = variables;
        self.root.functions = functions;
        self.root.types = types;
    }

    /// Resolve the module named by `qualifier`.
    ///
    /// The first segment is searched among the children of the open modules,
    /// innermost first, then among the root's children.
    pub fn resolve(&self, qualifier: &[Ident<'_>]) -> Result<&Module> {
        let Some((first, rest)) = qualifier.split_first() else {
            return Err(CompilationError::internal("empty module path"));
        };
        let start = self
            .open
            .iter()
            .rev()
            .chain(std::iter::once(&self.root))
            .find_map(|m| m.child(first.name))
            .ok_or_else(|| CompilationError::undefined(SymbolKind::Module, first.name, first.span))?;
        start.descend(rest)
    }
}
