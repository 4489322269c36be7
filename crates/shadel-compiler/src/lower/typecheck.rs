//! Static typing of expressions.
//!
//! The checker only reads the context. It is run before lowering any
//! expression, and by call resolution to learn argument types before a
//! candidate is committed to.

use shadel_ast::{
    AssignExpr, BinaryExpr, BinaryOp, CallExpr, ConstructExpr, Expr, FieldExpr, IndexExpr,
    LiteralKind, UnaryExpr,
};
use shadel_core::{CompilationError, Join, Span, accumulate};
use shadel_types::{FieldInfo, ResolvedBinary, ResolvedUnary, TypeKind, TypeSpec};

use crate::context::CompileContext;
use crate::function::{ArgInfo, ResolvedCall, resolve_call};
use crate::variable::Storage;

type Result<T> = std::result::Result<T, CompilationError>;

/// The static type of an assignable expression.
#[derive(Debug, Clone)]
pub struct PlaceType {
    pub ty: TypeSpec,
    pub writable: bool,
}

/// A checked assignment.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub ty: TypeSpec,
    /// The operator behind `op=`, `None` for plain `=`.
    pub compound: Option<ResolvedBinary>,
}

/// A resolved type constructor.
#[derive(Debug, Clone)]
pub enum Construction {
    /// `vecN(...)`, every argument converted to `float`.
    Vector { ty: TypeSpec, component: TypeSpec },
    /// `T[N](...)`, every argument exactly `T`.
    Array { ty: TypeSpec, element: TypeSpec },
    /// `T(x)`, a single converted value.
    Scalar { ty: TypeSpec },
}

impl Construction {
    pub fn ty(&self) -> &TypeSpec {
        match self {
            Construction::Vector { ty, .. }
            | Construction::Array { ty, .. }
            | Construction::Scalar { ty } => ty,
        }
    }
}

pub struct TypeChecker<'c, 'b> {
    ctx: &'c CompileContext<'b>,
}

impl<'c, 'b> TypeChecker<'c, 'b> {
    pub fn new(ctx: &'c CompileContext<'b>) -> Self {
        Self { ctx }
    }

    pub fn expr(&self, expr: &Expr<'_>) -> Result<TypeSpec> {
        match expr {
            Expr::Literal(lit) => self.literal(&lit.kind, lit.span),
            Expr::Variable(var) => Ok(self.ctx.lookup_variable(&var.path)?.ty.clone()),
            Expr::Binary(b) => Ok(self.binary(b)?.candidate.result),
            Expr::Unary(u) => Ok(self.unary(u)?.candidate.result),
            Expr::Assign(a) => self.assign(a),
            Expr::Call(c) => Ok(self.call(c)?.entry.return_type),
            Expr::Construct(c) => Ok(self.construct(c)?.ty().clone()),
            Expr::Field(f) => Ok(self.field(f)?.ty),
            Expr::Index(i) => self.index(i),
        }
    }

    pub fn literal(&self, kind: &LiteralKind<'_>, span: Span) -> Result<TypeSpec> {
        match kind {
            LiteralKind::Int(_) => self.ctx.builtin_type("int", span),
            LiteralKind::Float(_) => self.ctx.builtin_type("float", span),
            LiteralKind::Bool(_) => Ok(self.ctx.builtins.types.bool()),
            LiteralKind::String(_) => self.ctx.builtin_type("string", span),
        }
    }

    pub fn binary(&self, expr: &BinaryExpr<'_>) -> Result<ResolvedBinary> {
        let (lhs, rhs) = (self.expr(expr.left), self.expr(expr.right)).join()?;
        self.ctx.builtins.binary.resolve(
            expr.op,
            &lhs,
            &rhs,
            &self.ctx.builtins.conversions,
            expr.span,
        )
    }

    pub fn unary(&self, expr: &UnaryExpr<'_>) -> Result<ResolvedUnary> {
        let operand = self.expr(expr.operand)?;
        self.ctx.builtins.unary.resolve(
            expr.op,
            &operand,
            &self.ctx.builtins.conversions,
            expr.span,
        )
    }

    /// Type of `lhs op= rhs` given both operand types. The operator's
    /// result must be the target type.
    fn compound(
        &self,
        op: BinaryOp,
        target: &TypeSpec,
        value: &TypeSpec,
        span: Span,
    ) -> Result<ResolvedBinary> {
        let resolved = self.ctx.builtins.binary.resolve(
            op,
            target,
            value,
            &self.ctx.builtins.conversions,
            span,
        )?;
        if resolved.candidate.result != *target {
            return Err(CompilationError::mismatch(
                target,
                &resolved.candidate.result,
                span,
            ));
        }
        Ok(resolved)
    }

    /// Check an assignment once, keeping the operator behind `op=`.
    pub fn assignment(&self, expr: &AssignExpr<'_>) -> Result<Assignment> {
        let (place, value) = (self.place(expr.target), self.expr(expr.value)).join()?;
        if !place.writable {
            return Err(CompilationError::message(
                format!("cannot assign to '{}'", describe(expr.target)),
                expr.span,
            ));
        }
        let compound = match expr.op.binary_op() {
            None => {
                self.ctx
                    .builtins
                    .conversions
                    .convert(&value, &place.ty, expr.value.span())?;
                None
            }
            Some(op) => Some(self.compound(op, &place.ty, &value, expr.span)?),
        };
        Ok(Assignment {
            ty: place.ty,
            compound,
        })
    }

    pub fn assign(&self, expr: &AssignExpr<'_>) -> Result<TypeSpec> {
        self.assignment(expr).map(|checked| checked.ty)
    }

    /// Argument types plus the resolved callee.
    pub fn call(&self, expr: &CallExpr<'_>) -> Result<ResolvedCall> {
        let args = accumulate(expr.args.iter().map(|arg| {
            self.expr(arg).map(|ty| ArgInfo {
                ty,
                lvalue: arg.is_lvalue(),
            })
        }));
        let candidates = self.ctx.function_candidates(&expr.callee);
        let (args, candidates) = (args, candidates).join()?;
        let resolved = resolve_call(
            &expr.callee.to_string(),
            candidates,
            &args,
            &self.ctx.builtins.conversions,
            expr.span,
        )?;
        if resolved.entry.member && self.ctx.control.context().is_none() {
            return Err(CompilationError::message(
                format!(
                    "member function '{}' called outside its distribution",
                    resolved.entry.name
                ),
                expr.span,
            ));
        }
        Ok(resolved)
    }

    pub fn construct(&self, expr: &ConstructExpr<'_>) -> Result<Construction> {
        let ty = self.ctx.resolve_type(&expr.ty)?;
        let args = accumulate(expr.args.iter().map(|arg| self.expr(arg)))?;
        let conversions = &self.ctx.builtins.conversions;
        let arity_error = |expected: usize| {
            CompilationError::message(
                format!(
                    "constructor of '{ty}' takes {expected} argument(s), found {}",
                    args.len()
                ),
                expr.span,
            )
        };

        match ty.kind() {
            TypeKind::Vector { arity } => {
                if args.len() != usize::from(*arity) {
                    return Err(arity_error(usize::from(*arity)));
                }
                let component = self.ctx.builtin_type("float", expr.span)?;
                accumulate(
                    args.iter()
                        .zip(expr.args)
                        .map(|(arg, e)| conversions.convert(arg, &component, e.span())),
                )?;
                Ok(Construction::Vector {
                    ty: ty.clone(),
                    component,
                })
            }
            TypeKind::Array { element, length } => {
                if args.len() != *length as usize {
                    return Err(arity_error(*length as usize));
                }
                accumulate(args.iter().zip(expr.args).map(|(arg, e)| {
                    if arg == element {
                        Ok(())
                    } else {
                        Err(CompilationError::mismatch(element, arg, e.span()))
                    }
                }))?;
                Ok(Construction::Array {
                    element: element.clone(),
                    ty: ty.clone(),
                })
            }
            TypeKind::Int | TypeKind::Float | TypeKind::Bool | TypeKind::String => {
                let [arg] = args.as_slice() else {
                    return Err(arity_error(1));
                };
                conversions.convert(arg, &ty, expr.span)?;
                Ok(Construction::Scalar { ty: ty.clone() })
            }
            _ => Err(CompilationError::message(
                format!("type '{ty}' has no constructor"),
                expr.span,
            )),
        }
    }

    pub fn field(&self, expr: &FieldExpr<'_>) -> Result<FieldInfo> {
        let object = self.expr(expr.object)?;
        self.ctx
            .builtins
            .types
            .field(&object, expr.field.name)
            .ok_or_else(|| {
                CompilationError::message(
                    format!("type '{object}' has no field '{}'", expr.field.name),
                    expr.field.span,
                )
            })
    }

    pub fn index(&self, expr: &IndexExpr<'_>) -> Result<TypeSpec> {
        let (object, index) = (self.expr(expr.object), self.expr(expr.index)).join()?;
        let int = self.ctx.builtin_type("int", expr.span)?;
        let element = object.element().cloned().ok_or_else(|| {
            CompilationError::InvalidOperation {
                op: "[]".to_string(),
                operands: format!("'{object}'"),
                span: expr.span,
            }
        });
        let index = if index == int {
            Ok(())
        } else {
            Err(CompilationError::mismatch(&int, &index, expr.index.span()))
        };
        (element, index).join().map(|(element, ())| element)
    }

    /// The type of an assignable expression, failing on rvalues.
    pub fn place(&self, expr: &Expr<'_>) -> Result<PlaceType> {
        match expr {
            Expr::Variable(var) => {
                let entry = self.ctx.lookup_variable(&var.path)?;
                Ok(PlaceType {
                    ty: entry.ty.clone(),
                    writable: !matches!(entry.storage, Storage::ContextField(_)),
                })
            }
            Expr::Field(f) => {
                let object = self.place(f.object)?;
                let field = self.field(f)?;
                Ok(PlaceType {
                    ty: field.ty,
                    writable: object.writable && field.writable,
                })
            }
            Expr::Index(i) => {
                let object = self.place(i.object)?;
                let ty = self.index(i)?;
                Ok(PlaceType {
                    ty,
                    writable: object.writable || object.ty.array_length().is_none(),
                })
            }
            other => Err(CompilationError::message(
                format!("'{}' is not assignable", describe(other)),
                other.span(),
            )),
        }
    }
}

/// A short rendering of an expression for diagnostics.
fn describe(expr: &Expr<'_>) -> String {
    match expr {
        Expr::Variable(v) => v.path.to_string(),
        Expr::Field(f) => format!("{}.{}", describe(f.object), f.field),
        Expr::Index(i) => format!("{}[...]", describe(i.object)),
        Expr::Call(c) => format!("{}(...)", c.callee),
        Expr::Literal(_) => "literal".to_string(),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::test_support::*;
    use crate::backend::ValueId;
    use crate::options::CompilerOptions;
    use crate::variable::VariableEntry;
    use bumpalo::Bump;
    use shadel_ast::{AssignOp, BinaryOp};
    use shadel_types::{Builtins, ConversionTable, OpLowering};

    fn bind(ctx: &mut CompileContext<'_>, name: &str, ty: &str) {
        let ty = ctx.builtins.types.get(ty).unwrap();
        ctx.variables
            .set(name, VariableEntry::local(name, ty, ValueId(0), sp(1)))
            .unwrap();
    }

    #[test]
    fn literal_types() {
        let arena = Bump::new();
        let builtins = Builtins::standard();
        let ctx = CompileContext::new(&builtins, CompilerOptions::default());
        let checker = TypeChecker::new(&ctx);

        assert_eq!(checker.expr(int(&arena, 1)).unwrap().name(), "int");
        assert_eq!(checker.expr(float(&arena, 1.0)).unwrap().name(), "float");
        assert_eq!(checker.expr(boolean(&arena, true)).unwrap().name(), "bool");
        assert_eq!(checker.expr(string(&arena, "hi")).unwrap().name(), "string");
    }

    #[test]
    fn mixed_arithmetic_converts_to_float() {
        let arena = Bump::new();
        let builtins = Builtins::standard();
        let ctx = CompileContext::new(&builtins, CompilerOptions::default());
        let sum = binary(&arena, int(&arena, 1), BinaryOp::Add, float(&arena, 2.0));
        assert_eq!(TypeChecker::new(&ctx).expr(sum).unwrap().name(), "float");
    }

    #[test]
    fn both_operand_errors_are_reported() {
        let arena = Bump::new();
        let builtins = Builtins::standard();
        let ctx = CompileContext::new(&builtins, CompilerOptions::default());
        let sum = binary(&arena, var(&arena, "a"), BinaryOp::Add, var(&arena, "b"));
        let err = TypeChecker::new(&ctx).expr(sum).unwrap_err();
        assert_eq!(err.count(), 2);
        let text = err.to_string();
        assert!(text.contains("'a'") && text.contains("'b'"));
    }

    #[test]
    fn no_cross_candidate_without_conversions() {
        let arena = Bump::new();
        let standard = Builtins::standard();
        let int_ty = standard.types.get("int").unwrap();
        let float_ty = standard.types.get("float").unwrap();

        let mut builtins = Builtins::empty();
        builtins.types = standard.types;
        let add = [(&int_ty, "add.i"), (&float_ty, "add.f")];
        for (operand, instr) in add {
            builtins
                .binary
                .add(BinaryOp::Add, operand, operand, operand, OpLowering::Instruction(instr));
        }
        builtins.conversions = ConversionTable::new();
        let ctx = CompileContext::new(&builtins, CompilerOptions::default());
        let checker = TypeChecker::new(&ctx);

        let mixed = binary(&arena, int(&arena, 1), BinaryOp::Add, float(&arena, 2.0));
        let err = checker.expr(mixed).unwrap_err();
        assert!(err.to_string().contains("invalid operation '+'"));

        let ints = binary(&arena, int(&arena, 1), BinaryOp::Add, int(&arena, 2));
        assert_eq!(checker.expr(ints).unwrap(), int_ty);
    }

    #[test]
    fn vector_fields_and_array_indexing() {
        let arena = Bump::new();
        let builtins = Builtins::standard();
        let mut ctx = CompileContext::new(&builtins, CompilerOptions::default());
        bind(&mut ctx, "v", "vec3");
        let float_ty = builtins.types.get("float").unwrap();
        let array = builtins.types.array_of(&float_ty, 4);
        ctx.variables
            .set("xs", VariableEntry::local("xs", array, ValueId(1), sp(1)))
            .unwrap();
        let checker = TypeChecker::new(&ctx);

        assert_eq!(checker.expr(field(&arena, var(&arena, "v"), "z")).unwrap(), float_ty);
        let err = checker.expr(field(&arena, var(&arena, "v"), "w")).unwrap_err();
        assert!(err.to_string().contains("has no field 'w'"));

        let element = index(&arena, var(&arena, "xs"), int(&arena, 2));
        assert_eq!(checker.expr(element).unwrap(), float_ty);
        let bad = index(&arena, var(&arena, "xs"), float(&arena, 2.0));
        assert!(checker.expr(bad).unwrap_err().to_string().contains("type mismatch"));

        let length = field(&arena, var(&arena, "xs"), "length");
        let assign_length = assign(&arena, length, AssignOp::Assign, int(&arena, 3));
        assert!(checker.expr(assign_length).unwrap_err().to_string().contains("cannot assign"));
    }

    #[test]
    fn constructors() {
        let arena = Bump::new();
        let builtins = Builtins::standard();
        let ctx = CompileContext::new(&builtins, CompilerOptions::default());
        let checker = TypeChecker::new(&ctx);

        let vec = construct(
            &arena,
            ty(&arena, "vec3"),
            &[int(&arena, 1), float(&arena, 2.0), float(&arena, 3.0)],
        );
        assert_eq!(checker.expr(vec).unwrap().name(), "vec3");

        let short = construct(&arena, ty(&arena, "vec3"), &[float(&arena, 1.0)]);
        assert!(checker.expr(short).unwrap_err().to_string().contains("takes 3 argument"));

        let cast = construct(&arena, ty(&arena, "int"), &[float(&arena, 1.5)]);
        assert_eq!(checker.expr(cast).unwrap().name(), "int");
    }

    #[test]
    fn compound_assignment_needs_matching_result() {
        let arena = Bump::new();
        let builtins = Builtins::standard();
        let mut ctx = CompileContext::new(&builtins, CompilerOptions::default());
        bind(&mut ctx, "n", "int");
        bind(&mut ctx, "x", "float");
        let checker = TypeChecker::new(&ctx);

        let ok = assign(&arena, var(&arena, "x"), AssignOp::AddAssign, int(&arena, 1));
        assert_eq!(checker.expr(ok).unwrap().name(), "float");

        let widened = assign(&arena, var(&arena, "n"), AssignOp::AddAssign, float(&arena, 1.0));
        let err = checker.expr(widened).unwrap_err();
        assert!(err.to_string().contains("expected 'int', found 'float'"));

        let rvalue = assign(&arena, int(&arena, 1), AssignOp::Assign, int(&arena, 2));
        assert!(checker.expr(rvalue).unwrap_err().to_string().contains("not assignable"));
    }

    #[test]
    fn assignment_reports_the_compound_operator() {
        let arena = Bump::new();
        let builtins = Builtins::standard();
        let mut ctx = CompileContext::new(&builtins, CompilerOptions::default());
        bind(&mut ctx, "x", "float");
        let checker = TypeChecker::new(&ctx);

        let checked = |op| {
            let Expr::Assign(expr) = assign(&arena, var(&arena, "x"), op, int(&arena, 1)) else {
                unreachable!()
            };
            checker.assignment(expr).unwrap()
        };
        let plain = checked(AssignOp::Assign);
        assert_eq!(plain.ty.name(), "float");
        assert!(plain.compound.is_none());
        let compound = checked(AssignOp::MulAssign);
        assert_eq!(compound.ty.name(), "float");
        assert!(compound.compound.is_some());
    }
}
