//! Shared AST builders for the integration tests.
//!
//! The parser lives outside this repository, so tests build their scripts
//! directly in a bump arena.

#![allow(dead_code)]

use bumpalo::Bump;
use shadel::ast::*;
use shadel::prelude::*;

pub fn at(line: u32) -> Span {
    Span::new(line, 1)
}

/// Builds AST nodes in one arena. Node spans are `line:1`, where the
/// line is taken from [`Ast::line`].
pub struct Ast<'a> {
    pub arena: &'a Bump,
    line: std::cell::Cell<u32>,
}

impl<'a> Ast<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            line: std::cell::Cell::new(1),
        }
    }

    /// Place the nodes built next on `line`.
    pub fn line(&self, line: u32) -> &Self {
        self.line.set(line);
        self
    }

    fn span(&self) -> Span {
        at(self.line.get())
    }

    // ========================================================================
    // Types
    // ========================================================================

    pub fn ty(&self, name: &'a str) -> TypeExpr<'a> {
        TypeExpr::Named(Path::parse_in(self.arena, name, self.span()))
    }

    pub fn array(&self, element: &'a str, length: u32) -> TypeExpr<'a> {
        TypeExpr::Array {
            element: self.arena.alloc(self.ty(element)),
            length,
            span: self.span(),
        }
    }

    pub fn array_ref(&self, element: &'a str) -> TypeExpr<'a> {
        TypeExpr::ArrayRef {
            element: self.arena.alloc(self.ty(element)),
            span: self.span(),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn literal(&self, kind: LiteralKind<'a>) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Literal(LiteralExpr {
            kind,
            span: self.span(),
        }))
    }

    pub fn int(&self, value: i64) -> &'a Expr<'a> {
        self.literal(LiteralKind::Int(value))
    }

    pub fn float(&self, value: f64) -> &'a Expr<'a> {
        self.literal(LiteralKind::Float(value))
    }

    pub fn boolean(&self, value: bool) -> &'a Expr<'a> {
        self.literal(LiteralKind::Bool(value))
    }

    pub fn string(&self, value: &'a str) -> &'a Expr<'a> {
        self.literal(LiteralKind::String(value))
    }

    pub fn var(&self, name: &'a str) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Variable(VariableExpr {
            path: Path::parse_in(self.arena, name, self.span()),
            span: self.span(),
        }))
    }

    pub fn binary(&self, left: &'a Expr<'a>, op: BinaryOp, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Binary(self.arena.alloc(BinaryExpr {
            left,
            op,
            right,
            span: self.span(),
        })))
    }

    pub fn assign(&self, target: &'a Expr<'a>, op: AssignOp, value: &'a Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Assign(self.arena.alloc(AssignExpr {
            target,
            op,
            value,
            span: self.span(),
        })))
    }

    pub fn call(&self, name: &'a str, args: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Call(self.arena.alloc(CallExpr {
            callee: Path::parse_in(self.arena, name, self.span()),
            args: self.arena.alloc_slice_copy(args),
            span: self.span(),
        })))
    }

    pub fn construct(&self, ty: TypeExpr<'a>, args: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Construct(self.arena.alloc(ConstructExpr {
            ty,
            args: self.arena.alloc_slice_copy(args),
            span: self.span(),
        })))
    }

    pub fn field(&self, object: &'a Expr<'a>, name: &'a str) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Field(self.arena.alloc(FieldExpr {
            object,
            field: Ident::new(name, self.span()),
            span: self.span(),
        })))
    }

    pub fn index(&self, object: &'a Expr<'a>, index: &'a Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Index(self.arena.alloc(IndexExpr {
            object,
            index,
            span: self.span(),
        })))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn expr(&self, expr: &'a Expr<'a>) -> Stmt<'a> {
        Stmt::Expr(ExprStmt {
            expr,
            span: self.span(),
        })
    }

    pub fn decl(&self, ty: &'a str, name: &'a str, init: Option<&'a Expr<'a>>) -> Stmt<'a> {
        Stmt::VarDecl(VarDeclStmt {
            ty: self.ty(ty),
            name: Ident::new(name, self.span()),
            init,
            span: self.span(),
        })
    }

    pub fn block(&self, stmts: &[Stmt<'a>]) -> Stmt<'a> {
        Stmt::Block(Block {
            stmts: self.arena.alloc_slice_copy(stmts),
            span: self.span(),
        })
    }

    pub fn if_else(
        &self,
        condition: &'a Expr<'a>,
        then_branch: Stmt<'a>,
        else_branch: Option<Stmt<'a>>,
    ) -> Stmt<'a> {
        Stmt::If(self.arena.alloc(IfStmt {
            condition,
            then_branch: self.arena.alloc(then_branch),
            else_branch: else_branch.map(|s| &*self.arena.alloc(s)),
            span: self.span(),
        }))
    }

    pub fn for_loop(
        &self,
        init: Option<Stmt<'a>>,
        condition: Option<&'a Expr<'a>>,
        step: Option<&'a Expr<'a>>,
        body: Stmt<'a>,
    ) -> Stmt<'a> {
        Stmt::For(self.arena.alloc(ForStmt {
            init: init.map(|s| &*self.arena.alloc(s)),
            condition,
            step,
            body: self.arena.alloc(body),
            span: self.span(),
        }))
    }

    pub fn brk(&self) -> Stmt<'a> {
        Stmt::Break(BreakStmt { span: self.span() })
    }

    pub fn cont(&self) -> Stmt<'a> {
        Stmt::Continue(ContinueStmt { span: self.span() })
    }

    pub fn ret(&self, value: Option<&'a Expr<'a>>) -> Stmt<'a> {
        Stmt::Return(ReturnStmt {
            value,
            span: self.span(),
        })
    }

    pub fn throw(&self, message: &'a str) -> Stmt<'a> {
        Stmt::Throw(ThrowStmt {
            message: self.string(message),
            span: self.span(),
        })
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    pub fn param(&self, ty: &'a str, name: &'a str) -> Param<'a> {
        Param {
            name: Ident::new(name, self.span()),
            ty: self.ty(ty),
            output: false,
            span: self.span(),
        }
    }

    pub fn out_param(&self, ty: &'a str, name: &'a str) -> Param<'a> {
        Param {
            output: true,
            ..self.param(ty, name)
        }
    }

    pub fn signature(&self, ret: &'a str, name: &'a str, params: &[Param<'a>]) -> Signature<'a> {
        Signature {
            name: Ident::new(name, self.span()),
            return_type: self.ty(ret),
            params: self.arena.alloc_slice_copy(params),
            span: self.span(),
        }
    }

    pub fn function(
        &self,
        ret: &'a str,
        name: &'a str,
        params: &[Param<'a>],
        body: &[Stmt<'a>],
    ) -> Item<'a> {
        self.function_returning(self.ty(ret), name, params, body)
    }

    pub fn function_returning(
        &self,
        ret: TypeExpr<'a>,
        name: &'a str,
        params: &[Param<'a>],
        body: &[Stmt<'a>],
    ) -> Item<'a> {
        Item::Function(FunctionDecl {
            signature: Signature {
                return_type: ret,
                ..self.signature("void", name, params)
            },
            body: Block {
                stmts: self.arena.alloc_slice_copy(body),
                span: self.span(),
            },
            span: self.span(),
        })
    }

    pub fn prototype(&self, ret: &'a str, name: &'a str, params: &[Param<'a>]) -> Item<'a> {
        Item::Prototype(PrototypeDecl {
            signature: self.signature(ret, name, params),
            external: None,
            span: self.span(),
        })
    }

    pub fn external(
        &self,
        symbol: &'a str,
        ret: &'a str,
        name: &'a str,
        params: &[Param<'a>],
    ) -> Item<'a> {
        Item::Prototype(PrototypeDecl {
            signature: self.signature(ret, name, params),
            external: Some(symbol),
            span: self.span(),
        })
    }

    pub fn global(&self, ty: &'a str, name: &'a str, init: Option<&'a Expr<'a>>) -> Item<'a> {
        Item::GlobalVar(GlobalVarDecl {
            ty: self.ty(ty),
            name: Ident::new(name, self.span()),
            init,
            span: self.span(),
        })
    }

    pub fn module(&self, name: &'a str, items: &[Item<'a>]) -> Item<'a> {
        Item::Module(ModuleDecl {
            name: Ident::new(name, self.span()),
            items: self.arena.alloc_slice_copy(items),
            span: self.span(),
        })
    }

    pub fn distribution(&self, name: &'a str, params: &[Param<'a>], items: &[Item<'a>]) -> Item<'a> {
        Item::Distribution(DistributionDecl {
            name: Ident::new(name, self.span()),
            params: self.arena.alloc_slice_copy(params),
            items: self.arena.alloc_slice_copy(items),
            span: self.span(),
        })
    }

    pub fn script(&self, items: &[Item<'a>]) -> Script<'a> {
        Script::new(self.arena.alloc_slice_copy(items), at(1))
    }
}

/// Compile `items` as unit `main` into a fresh recording backend.
pub fn compile(ast: &Ast<'_>, items: &[Item<'_>]) -> (CompilationResult, RecordingBackend) {
    compile_with_options(ast, items, CompilerOptions::default())
}

pub fn compile_with_options(
    ast: &Ast<'_>,
    items: &[Item<'_>],
    options: CompilerOptions,
) -> (CompilationResult, RecordingBackend) {
    let script = Script::new(ast.arena.alloc_slice_copy(items), at(1));
    let mut backend = RecordingBackend::new();
    let result = compile_script(&script, &options, &mut backend);
    (result, backend)
}

/// The symbol of the only overload of `name` exported at the unit root.
pub fn symbol_of(result: &CompilationResult, name: &str) -> String {
    result
        .exports
        .functions_named(name)
        .next()
        .map(|f| f.mangled.clone())
        .unwrap_or_else(|| panic!("'{name}' is not exported"))
}
