//! Abstract syntax tree for the shading language.
//!
//! Nodes are produced by an external parser and allocated in a
//! [`bumpalo::Bump`] arena; every child reference is an `&'ast` borrow into
//! that arena, so a whole tree is freed at once with the arena.
//!
//! ## Layout
//!
//! - [`node`]: identifiers and qualified paths
//! - [`ops`]: operator enums
//! - [`types`]: type expressions (`vec3`, `float[4]`, `float[]`, `a.b.T`)
//! - [`expr`]: expressions
//! - [`stmt`]: statements inside function bodies
//! - [`decl`]: global declarations and the [`Script`] root
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use shadel_ast::{Expr, LiteralExpr, LiteralKind};
//! use shadel_core::Span;
//!
//! let arena = Bump::new();
//! let one = arena.alloc(Expr::Literal(LiteralExpr {
//!     kind: LiteralKind::Int(1),
//!     span: Span::new(1, 1),
//! }));
//! assert_eq!(one.span(), Span::new(1, 1));
//! ```

pub mod decl;
pub mod expr;
pub mod node;
pub mod ops;
pub mod stmt;
pub mod types;

pub use decl::*;
pub use expr::*;
pub use node::*;
pub use ops::*;
pub use stmt::*;
pub use types::*;
