//! Statement nodes.

use shadel_core::Span;

use crate::{Expr, Ident, TypeExpr};

/// A statement inside a function body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    /// Expression evaluated for its side effects
    Expr(ExprStmt<'ast>),
    /// Local variable declaration
    VarDecl(VarDeclStmt<'ast>),
    /// Braced block introducing a scope
    Block(Block<'ast>),
    If(&'ast IfStmt<'ast>),
    For(&'ast ForStmt<'ast>),
    Break(BreakStmt),
    Continue(ContinueStmt),
    Return(ReturnStmt<'ast>),
    /// Raise a runtime error with a message
    Throw(ThrowStmt<'ast>),
}

impl<'ast> Stmt<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Self::Expr(s) => s.span,
            Self::VarDecl(s) => s.span,
            Self::Block(s) => s.span,
            Self::If(s) => s.span,
            Self::For(s) => s.span,
            Self::Break(s) => s.span,
            Self::Continue(s) => s.span,
            Self::Return(s) => s.span,
            Self::Throw(s) => s.span,
        }
    }

    /// Whether control never falls through past this statement.
    ///
    /// Statements that follow a terminator in the same list are not lowered.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Break(_) | Self::Continue(_) | Self::Return(_) | Self::Throw(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprStmt<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub span: Span,
}

/// `T name;` or `T name = init;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDeclStmt<'ast> {
    pub ty: TypeExpr<'ast>,
    pub name: Ident<'ast>,
    pub init: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

/// `{ stmts }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStmt<'ast> {
    pub condition: &'ast Expr<'ast>,
    pub then_branch: &'ast Stmt<'ast>,
    pub else_branch: Option<&'ast Stmt<'ast>>,
    pub span: Span,
}

/// `for (init; condition; step) body`
///
/// All three header parts are optional. The header and body share one scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForStmt<'ast> {
    pub init: Option<&'ast Stmt<'ast>>,
    pub condition: Option<&'ast Expr<'ast>>,
    pub step: Option<&'ast Expr<'ast>>,
    pub body: &'ast Stmt<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakStmt {
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinueStmt {
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    pub value: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

/// `error "message";`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowStmt<'ast> {
    pub message: &'ast Expr<'ast>,
    pub span: Span,
}
