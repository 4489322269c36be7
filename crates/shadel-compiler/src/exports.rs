//! The export table.
//!
//! Records the public variables and functions of a unit, keyed by module
//! path, so a dependent unit can bind aliases to them without recompiling
//! this one.

use std::fmt;

use rustc_hash::FxHashMap;
use shadel_core::CompilationError;
use shadel_types::TypeSpec;

use crate::function::Parameter;
use crate::mangle;

type Result<T> = std::result::Result<T, CompilationError>;

#[derive(Debug, Clone, PartialEq)]
pub struct VariableExport {
    pub name: String,
    pub mangled: String,
    pub ty: TypeSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExport {
    pub name: String,
    pub mangled: String,
    pub return_type: TypeSpec,
    pub params: Vec<Parameter>,
}

impl FunctionExport {
    /// The `name.ret.arg...` key this export is stored under.
    pub fn key(&self) -> String {
        let params: Vec<TypeSpec> = self.params.iter().map(|p| p.ty.clone()).collect();
        mangle::signature_key(&self.name, &self.return_type, &params)
    }
}

/// Exports of one module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleExport {
    pub name: String,
    pub variables: FxHashMap<String, VariableExport>,
    pub functions: FxHashMap<String, FunctionExport>,
    pub modules: FxHashMap<String, ModuleExport>,
}

impl ModuleExport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn variable(&self, name: &str) -> Option<&VariableExport> {
        self.variables.get(name)
    }

    /// A function export by its `name.ret.arg...` key.
    pub fn function(&self, key: &str) -> Option<&FunctionExport> {
        self.functions.get(key)
    }

    /// Every overload exported under `name`.
    pub fn functions_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FunctionExport> {
        self.functions.values().filter(move |f| f.name == name)
    }

    pub fn module(&self, name: &str) -> Option<&ModuleExport> {
        self.modules.get(name)
    }

    fn render(&self, out: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        writeln!(out, "{pad}module {}", self.name)?;

        let mut variables: Vec<_> = self.variables.values().collect();
        variables.sort_by(|a, b| a.name.cmp(&b.name));
        for v in variables {
            writeln!(out, "{pad}  var {}: {} = @{}", v.name, v.ty, v.mangled)?;
        }

        let mut functions: Vec<_> = self.functions.iter().collect();
        functions.sort_by(|a, b| a.0.cmp(b.0));
        for (_, f) in functions {
            let params: Vec<String> = f
                .params
                .iter()
                .map(|p| {
                    if p.output {
                        format!("out {}: {}", p.name, p.ty)
                    } else {
                        format!("{}: {}", p.name, p.ty)
                    }
                })
                .collect();
            writeln!(
                out,
                "{pad}  fn {}({}) -> {} = @{}",
                f.name,
                params.join(", "),
                f.return_type,
                f.mangled
            )?;
        }

        let mut modules: Vec<_> = self.modules.values().collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        for m in modules {
            m.render(out, indent + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ModuleExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

/// Builds the export tree while a unit is compiled.
#[derive(Debug, Default)]
pub struct ExportTable {
    root: ModuleExport,
    stack: Vec<ModuleExport>,
}

impl ExportTable {
    pub fn new(unit_name: impl Into<String>) -> Self {
        Self {
            root: ModuleExport::new(unit_name),
            stack: Vec::new(),
        }
    }

    pub fn root(&self) -> &ModuleExport {
        &self.root
    }

    pub fn into_root(self) -> ModuleExport {
        self.root
    }

    /// Follow a module path from the root.
    pub fn module(&self, path: &[&str]) -> Option<&ModuleExport> {
        path.iter()
            .try_fold(&self.root, |module, segment| module.module(segment))
    }

    fn current(&mut self) -> &mut ModuleExport {
        self.stack.last_mut().unwrap_or(&mut self.root)
    }

    pub fn push_module(&mut self, name: impl Into<String>) {
        self.stack.push(ModuleExport::new(name));
    }

    /// Close the innermost module. If the parent already exports a module
    /// of that name the first one is kept; the symbol tables report the
    /// redeclaration.
    pub fn pop_module(&mut self) -> Result<()> {
        let module = self
            .stack
            .pop()
            .ok_or_else(|| CompilationError::internal("export table pop without push"))?;
        self.current()
            .modules
            .entry(module.name.clone())
            .or_insert(module);
        Ok(())
    }

    pub fn add_variable(&mut self, export: VariableExport) {
        self.current().variables.insert(export.name.clone(), export);
    }

    pub fn add_function(&mut self, export: FunctionExport) {
        self.current().functions.insert(export.key(), export);
    }
}

impl fmt::Display for ExportTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.render(f, 0)
    }
}
