//! Global declarations and the script root.

use shadel_core::Span;

use crate::{Block, Expr, Ident, TypeExpr};

/// A top-level or module-level declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'ast> {
    GlobalVar(GlobalVarDecl<'ast>),
    /// Function declaration without a body
    Prototype(PrototypeDecl<'ast>),
    Function(FunctionDecl<'ast>),
    Module(ModuleDecl<'ast>),
    Distribution(DistributionDecl<'ast>),
    /// Binds a local name to a variable compiled in another unit
    VariableAlias(VariableAliasDecl<'ast>),
    /// Binds a local name to a function compiled in another unit
    FunctionAlias(FunctionAliasDecl<'ast>),
    TypeAlias(TypeAliasDecl<'ast>),
}

impl<'ast> Item<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Self::GlobalVar(d) => d.span,
            Self::Prototype(d) => d.span,
            Self::Function(d) => d.span,
            Self::Module(d) => d.span,
            Self::Distribution(d) => d.span,
            Self::VariableAlias(d) => d.span,
            Self::FunctionAlias(d) => d.span,
            Self::TypeAlias(d) => d.span,
        }
    }
}

/// A function parameter. Output parameters are passed by reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param<'ast> {
    pub name: Ident<'ast>,
    pub ty: TypeExpr<'ast>,
    pub output: bool,
    pub span: Span,
}

/// Name, return type and parameters shared by prototypes, definitions and aliases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signature<'ast> {
    pub name: Ident<'ast>,
    pub return_type: TypeExpr<'ast>,
    pub params: &'ast [Param<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalVarDecl<'ast> {
    pub ty: TypeExpr<'ast>,
    pub name: Ident<'ast>,
    pub init: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

/// `T name(params);` or `extern "symbol" T name(params);`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrototypeDecl<'ast> {
    pub signature: Signature<'ast>,
    /// External symbol name, when the function is provided by the runtime.
    pub external: Option<&'ast str>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionDecl<'ast> {
    pub signature: Signature<'ast>,
    pub body: Block<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleDecl<'ast> {
    pub name: Ident<'ast>,
    pub items: &'ast [Item<'ast>],
    pub span: Span,
}

/// `distribution name(params) { items }`
///
/// The parameters form a context block read by the internal functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributionDecl<'ast> {
    pub name: Ident<'ast>,
    pub params: &'ast [Param<'ast>],
    pub items: &'ast [Item<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableAliasDecl<'ast> {
    pub alias: Ident<'ast>,
    /// Mangled name of the aliased global.
    pub target: &'ast str,
    pub ty: TypeExpr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionAliasDecl<'ast> {
    /// The local name and signature of the alias.
    pub signature: Signature<'ast>,
    /// Mangled name of the aliased function.
    pub target: &'ast str,
    pub member: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeAliasDecl<'ast> {
    pub name: Ident<'ast>,
    pub ty: TypeExpr<'ast>,
    pub span: Span,
}

/// The root of a parsed compilation unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Script<'ast> {
    items: &'ast [Item<'ast>],
    span: Span,
}

impl<'ast> Script<'ast> {
    pub fn new(items: &'ast [Item<'ast>], span: Span) -> Self {
        Self { items, span }
    }

    /// Get the top-level items in this script.
    pub fn items(&self) -> &'ast [Item<'ast>] {
        self.items
    }

    pub fn span(&self) -> Span {
        self.span
    }
}
