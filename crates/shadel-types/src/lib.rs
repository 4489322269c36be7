//! Types, conversions and operator resolution.
//!
//! ## Architecture
//!
//! Everything in this crate is built once, before any AST is compiled, and
//! is read-only afterwards:
//!
//! - [`TypeRegistry`]: singleton [`TypeSpec`] handles compared by identity
//! - [`ConversionTable`]: legal implicit conversions with argument and operator costs
//! - [`BinaryOpTable`] / [`UnaryOpTable`]: operator candidates and their lowering
//! - [`ranking`]: the shared lowest-cost / ambiguity rule
//! - [`Builtins`]: the four tables bundled with the standard prelude

pub mod builtins;
pub mod conversion;
pub mod operators;
pub mod ranking;
pub mod registry;
pub mod type_def;

pub use builtins::Builtins;
pub use conversion::{Conversion, ConversionKind, ConversionTable};
pub use operators::{
    BinaryCandidate, BinaryOpTable, OpLowering, ResolvedBinary, ResolvedUnary, UnaryCandidate,
    UnaryOpTable,
};
pub use ranking::{Ranking, rank, total_cost};
pub use registry::{FieldInfo, TypeRegistry};
pub use type_def::{Lifecycle, Type, TypeFlags, TypeKind, TypeSpec, quote_types};
