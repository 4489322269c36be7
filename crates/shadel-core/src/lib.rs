//! Shared foundations for the shadel compiler crates.
//!
//! - [`Span`]: source positions carried by AST nodes and errors
//! - [`CompilationError`]: the compile-time error taxonomy
//! - [`Join`], [`accumulate`]: error-preserving result composition
//! - [`Diagnostics`]: rendering of accumulated errors
//! - [`SignatureHash`]: stable hashing used in mangled names

mod diagnostics;
mod error;
mod hash;
mod join;
mod span;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{CompilationError, SymbolKind};
pub use hash::{SignatureHash, hash_constants};
pub use join::{Join, accumulate, merge_into, with_side_effect};
pub use span::Span;
