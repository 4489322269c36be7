//! Expression nodes.

use shadel_core::Span;

use crate::{AssignOp, BinaryOp, Ident, Path, TypeExpr, UnaryOp};

/// An expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    /// Literal value
    Literal(LiteralExpr<'ast>),
    /// Variable reference, possibly module-qualified
    Variable(VariableExpr<'ast>),
    /// Binary operation
    Binary(&'ast BinaryExpr<'ast>),
    /// Unary prefix operation
    Unary(&'ast UnaryExpr<'ast>),
    /// Assignment, plain or compound
    Assign(&'ast AssignExpr<'ast>),
    /// Function call
    Call(&'ast CallExpr<'ast>),
    /// Type constructor such as `vec3(1, 0, 0)`
    Construct(&'ast ConstructExpr<'ast>),
    /// Field access (`v.x`, `a.length`)
    Field(&'ast FieldExpr<'ast>),
    /// Element access (`a[i]`)
    Index(&'ast IndexExpr<'ast>),
}

impl<'ast> Expr<'ast> {
    /// Get the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(e) => e.span,
            Self::Variable(e) => e.span,
            Self::Binary(e) => e.span,
            Self::Unary(e) => e.span,
            Self::Assign(e) => e.span,
            Self::Call(e) => e.span,
            Self::Construct(e) => e.span,
            Self::Field(e) => e.span,
            Self::Index(e) => e.span,
        }
    }

    /// Whether this expression names storage (can be assigned or passed as an output).
    pub fn is_lvalue(&self) -> bool {
        match self {
            Self::Variable(_) => true,
            Self::Field(f) => f.object.is_lvalue(),
            Self::Index(i) => i.object.is_lvalue(),
            _ => false,
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr<'ast> {
    pub kind: LiteralKind<'ast>,
    pub span: Span,
}

/// The kind of literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralKind<'ast> {
    Int(i64),
    Float(f64),
    Bool(bool),
    /// String literal contents, escapes already resolved
    String(&'ast str),
}

/// A reference to a named variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableExpr<'ast> {
    pub path: Path<'ast>,
    pub span: Span,
}

/// A binary operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    pub left: &'ast Expr<'ast>,
    pub op: BinaryOp,
    pub right: &'ast Expr<'ast>,
    pub span: Span,
}

/// A unary prefix operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryExpr<'ast> {
    pub op: UnaryOp,
    pub operand: &'ast Expr<'ast>,
    pub span: Span,
}

/// An assignment expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignExpr<'ast> {
    /// Left-hand side (target)
    pub target: &'ast Expr<'ast>,
    pub op: AssignOp,
    /// Right-hand side (value)
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

/// A call to a named function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    pub callee: Path<'ast>,
    pub args: &'ast [&'ast Expr<'ast>],
    pub span: Span,
}

/// A type constructor call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstructExpr<'ast> {
    pub ty: TypeExpr<'ast>,
    pub args: &'ast [&'ast Expr<'ast>],
    pub span: Span,
}

/// Field access.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub field: Ident<'ast>,
    pub span: Span,
}

/// Element access.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub index: &'ast Expr<'ast>,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    #[test]
    fn lvalues() {
        let arena = Bump::new();
        let var = arena.alloc(Expr::Variable(VariableExpr {
            path: Path::parse_in(&arena, "color", Span::new(1, 1)),
            span: Span::new(1, 1),
        }));
        let field = Expr::Field(arena.alloc(FieldExpr {
            object: var,
            field: Ident::new("x", Span::new(1, 7)),
            span: Span::new(1, 6),
        }));
        let lit = Expr::Literal(LiteralExpr {
            kind: LiteralKind::Float(1.0),
            span: Span::new(1, 1),
        });

        assert!(var.is_lvalue());
        assert!(field.is_lvalue());
        assert!(!lit.is_lvalue());
        assert_eq!(field.span(), Span::new(1, 6));
    }
}
