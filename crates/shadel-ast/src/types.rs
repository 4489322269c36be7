//! Type expressions as written in source.

use std::fmt;

use shadel_core::Span;

use crate::Path;

/// A type as written in a declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeExpr<'ast> {
    /// A named type: `float`, `vec3`, `materials.params`.
    Named(Path<'ast>),
    /// A fixed-length array: `float[4]`.
    Array {
        element: &'ast TypeExpr<'ast>,
        length: u32,
        span: Span,
    },
    /// An array reference of unknown length: `float[]`.
    ArrayRef {
        element: &'ast TypeExpr<'ast>,
        span: Span,
    },
}

impl<'ast> TypeExpr<'ast> {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named(path) => path.span,
            TypeExpr::Array { span, .. } | TypeExpr::ArrayRef { span, .. } => *span,
        }
    }
}

impl fmt::Display for TypeExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(path) => write!(f, "{path}"),
            TypeExpr::Array {
                element, length, ..
            } => write!(f, "{element}[{length}]"),
            TypeExpr::ArrayRef { element, .. } => write!(f, "{element}[]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    #[test]
    fn nested_display() {
        let arena = Bump::new();
        let float = arena.alloc(TypeExpr::Named(Path::parse_in(&arena, "float", Span::new(1, 1))));
        let array = arena.alloc(TypeExpr::Array {
            element: float,
            length: 4,
            span: Span::new(1, 1),
        });
        let view = TypeExpr::ArrayRef {
            element: array,
            span: Span::new(1, 1),
        };
        assert_eq!(view.to_string(), "float[4][]");
    }
}
