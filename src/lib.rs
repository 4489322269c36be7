//! shadel: the semantic core of a shading-language compiler.
//!
//! A parser hands in an arena-allocated [`Script`](ast::Script); this crate
//! checks it and lowers it through a [`Backend`](compiler::Backend).
//!
//! ```
//! use bumpalo::Bump;
//! use shadel::prelude::*;
//!
//! let arena = Bump::new();
//! let script = ast::Script::new(arena.alloc_slice_copy(&[]), Span::new(1, 1));
//! let mut backend = RecordingBackend::new();
//! let result = compile_script(&script, &CompilerOptions::default(), &mut backend);
//! assert!(result.is_success());
//! ```

pub use shadel_ast as ast;
pub use shadel_compiler as compiler;
pub use shadel_core as core;
pub use shadel_types as types;

use shadel_ast::Script;
use shadel_compiler::{Backend, CompilationResult, Compiler, CompilerOptions};
use shadel_types::Builtins;

/// Compile `script` against the standard builtins.
pub fn compile_script(
    script: &Script<'_>,
    options: &CompilerOptions,
    backend: &mut dyn Backend,
) -> CompilationResult {
    let builtins = Builtins::standard();
    compile_with(&builtins, script, options, backend)
}

/// Compile `script` against caller-provided builtins.
pub fn compile_with(
    builtins: &Builtins,
    script: &Script<'_>,
    options: &CompilerOptions,
    backend: &mut dyn Backend,
) -> CompilationResult {
    tracing::debug!(unit = %options.unit_name, items = script.items().len(), "compile script");
    Compiler::new(builtins, options.clone()).compile(script, backend)
}

// Re-export main types
pub mod prelude {
    pub use crate::ast;
    pub use crate::{compile_script, compile_with};
    pub use shadel_compiler::{
        Backend, CompilationResult, Compiler, CompilerOptions, CompilerProperty, ExportTable,
        ModuleExport, RecordingBackend,
    };
    pub use shadel_core::{CompilationError, Diagnostics, Span};
    pub use shadel_types::{Builtins, TypeSpec};
}
