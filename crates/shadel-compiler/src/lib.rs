//! Semantic core of the shadel compiler.
//!
//! Takes a parsed [`Script`] and lowers it through a [`Backend`], checking
//! types, resolving names and overloads, and bridging structured control
//! flow to the backend's blocks.
//!
//! ## Modules
//!
//! - [`backend`]: the emission trait and the in-memory [`RecordingBackend`]
//! - [`scope`]: scoped symbol tables with destructor emission on scope exit
//! - [`function`]: function entries, overload sets and call resolution
//! - [`module`]: the module ownership tree
//! - [`exports`]: the per-unit export table
//! - [`control`]: function, loop and scope frames used while lowering
//! - [`lower`]: the typecheck/lower protocol for every node kind
//! - [`options`]: compiler properties

pub mod backend;
pub mod context;
pub mod control;
pub mod exports;
pub mod function;
pub mod lifecycle;
pub mod lower;
pub mod mangle;
pub mod module;
pub mod options;
pub mod scope;
pub mod types;
pub mod variable;

pub use backend::{Backend, RecordingBackend};
pub use context::CompileContext;
pub use exports::{ExportTable, FunctionExport, ModuleExport, VariableExport};
pub use lower::{Lowerer, TypeChecker};
pub use module::Module;
pub use options::{CompilerOptions, CompilerProperty};

// Re-export the error types from core for convenience
pub use shadel_core::{CompilationError, Diagnostics};

use shadel_ast::Script;
use shadel_types::Builtins;

/// Result of compiling one unit.
#[derive(Debug)]
pub struct CompilationResult {
    /// Name of the compiled unit.
    pub unit: String,
    /// Symbol of the generated global initializer.
    pub init_symbol: Option<String>,
    /// The unit's root module with everything declared in it.
    pub module: Module,
    pub exports: ModuleExport,
    /// Every leaf error, in the order it was found.
    pub errors: Vec<CompilationError>,
    max_reported_errors: usize,
}

impl CompilationResult {
    /// Check if compilation succeeded (no errors).
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::for_section(self.unit.clone());
        for error in &self.errors {
            diagnostics.push_error(error.clone());
        }
        diagnostics
    }

    /// The error report, capped by the `MaxReportedErrors` property.
    pub fn report(&self) -> String {
        self.diagnostics().render(self.max_reported_errors)
    }

    /// The result as a `Result`, merging every error into one.
    pub fn into_result(self) -> Result<Self, CompilationError> {
        match CompilationError::group(self.errors.clone()) {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

/// The compiler entry point. Holds the read-only builtins shared by every
/// unit it compiles.
#[derive(Debug, Clone)]
pub struct Compiler<'b> {
    builtins: &'b Builtins,
    options: CompilerOptions,
}

impl<'b> Compiler<'b> {
    pub fn new(builtins: &'b Builtins, options: CompilerOptions) -> Self {
        Self { builtins, options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut CompilerOptions {
        &mut self.options
    }

    /// Compile a script, emitting code through `backend`.
    ///
    /// Compilation does not stop at the first error: every independent
    /// declaration is attempted and all errors are returned together.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, script: &Script<'_>, backend: &mut dyn Backend) -> CompilationResult {
        let mut ctx = CompileContext::new(self.builtins, self.options.clone());
        let lowered = Lowerer::new(&mut ctx, backend).unit(script);

        let mut errors = Vec::new();
        let init_symbol = match lowered {
            Ok(symbol) => Some(symbol),
            Err(error) => {
                errors.extend(error.flatten());
                None
            }
        };
        match ctx.pop_declaration_scope() {
            Ok((variables, functions, types)) => ctx.modules.close_root(variables, functions, types),
            Err(error) => errors.extend(error.flatten()),
        }

        let unit = self.options.unit_name.clone();
        if errors.is_empty() {
            tracing::debug!(unit = %unit, "compiled unit");
        } else {
            tracing::warn!(unit = %unit, errors = errors.len(), "unit compiled with errors");
        }

        CompilationResult {
            unit,
            init_symbol,
            module: ctx.modules.into_root(),
            exports: ctx.exports.into_root(),
            errors,
            max_reported_errors: self.options.max_reported_errors,
        }
    }
}
