//! User type names.

use shadel_core::{Span, SymbolKind};
use shadel_types::TypeSpec;

use crate::scope::SymbolEntry;

/// A type name bound in some scope, such as a type alias.
#[derive(Debug, Clone, PartialEq)]
pub struct UserType {
    pub ty: TypeSpec,
    pub span: Span,
}

impl SymbolEntry for UserType {
    const KIND: SymbolKind = SymbolKind::Type;
}
