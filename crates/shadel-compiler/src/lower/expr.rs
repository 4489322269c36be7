//! Expression lowering.

use shadel_ast::{AssignExpr, BinaryExpr, ConstructExpr, Expr, LiteralExpr, LiteralKind, UnaryExpr};
use shadel_core::{CompilationError, Join, accumulate};
use shadel_types::{OpLowering, TypeSpec};

use super::typecheck::Construction;
use super::{Lowerer, Result, Typed};
use crate::backend::ValueId;
use crate::lifecycle;

impl Lowerer<'_, '_> {
    pub fn expr(&mut self, expr: &Expr<'_>) -> Result<Typed> {
        match expr {
            Expr::Literal(lit) => self.literal(lit),
            Expr::Variable(var) => self.variable(var),
            Expr::Binary(b) => self.binary(b),
            Expr::Unary(u) => self.unary(u),
            Expr::Assign(a) => self.assign(a),
            Expr::Call(c) => self.call(c),
            Expr::Construct(c) => self.construct(c),
            Expr::Field(f) => self.field(f),
            Expr::Index(i) => self.index(i),
        }
    }

    /// Lower `expr` and convert it to `to`.
    pub(crate) fn expr_as(&mut self, expr: &Expr<'_>, to: &TypeSpec) -> Result<Typed> {
        let ty = self.checker().expr(expr)?;
        let conversion = self
            .ctx
            .builtins
            .conversions
            .convert(&ty, to, expr.span())?;
        let typed = self.expr(expr)?;
        self.convert(typed, to, conversion)
    }

    fn literal(&mut self, lit: &LiteralExpr<'_>) -> Result<Typed> {
        let ty = self.checker().literal(&lit.kind, lit.span)?;
        let value = match lit.kind {
            LiteralKind::Int(v) => self.backend.const_int(v),
            LiteralKind::Float(v) => self.backend.const_float(v),
            LiteralKind::Bool(v) => self.backend.const_bool(v),
            LiteralKind::String(v) => self.backend.const_string(v),
        };
        Ok(Typed {
            value,
            ty,
            owned: false,
        })
    }

    fn apply(&mut self, lowering: OpLowering, operands: &[ValueId]) -> ValueId {
        match lowering {
            OpLowering::Instruction(name) => self.backend.instruction(name, operands),
            OpLowering::Runtime(symbol) => self.backend.call(symbol, operands),
        }
    }

    /// Both operands are always lowered, so an error in each is reported.
    /// `&&` and `||` therefore evaluate both sides.
    fn binary(&mut self, expr: &BinaryExpr<'_>) -> Result<Typed> {
        let resolved = self.checker().binary(expr)?;
        let candidate = resolved.candidate;

        let (lhs, rhs) = self.with_temporaries(|l| {
            let lhs = l.expr(expr.left);
            if let Ok(lhs) = &lhs {
                l.hold(lhs);
            }
            let rhs = l.expr(expr.right);
            (lhs, rhs).join()
        })?;
        let lhs = self.convert(lhs, &candidate.lhs, resolved.lhs_conversion)?;
        let rhs = self.convert(rhs, &candidate.rhs, resolved.rhs_conversion)?;

        let value = self.apply(candidate.lowering, &[lhs.value, rhs.value]);
        self.release(&lhs);
        self.release(&rhs);
        Ok(Typed {
            value,
            owned: candidate.result.needs_destroy(),
            ty: candidate.result,
        })
    }

    fn unary(&mut self, expr: &UnaryExpr<'_>) -> Result<Typed> {
        let resolved = self.checker().unary(expr)?;
        let candidate = resolved.candidate;

        let operand = self.expr(expr.operand)?;
        let operand = self.convert(operand, &candidate.operand, resolved.conversion)?;
        let value = self.apply(candidate.lowering, &[operand.value]);
        self.release(&operand);
        Ok(Typed {
            value,
            owned: candidate.result.needs_destroy(),
            ty: candidate.result,
        })
    }

    /// The target is evaluated before the value. The result borrows the
    /// target's new contents.
    fn assign(&mut self, expr: &AssignExpr<'_>) -> Result<Typed> {
        let checked = self.checker().assignment(expr)?;

        let place = self.place(expr.target)?;
        let new = match checked.compound {
            None => {
                let value = self.expr_as(expr.value, &place.ty)?;
                self.into_owned(value)
            }
            Some(resolved) => {
                let candidate = resolved.candidate;
                let current = self.backend.load(&place.ty, place.address);
                let current = self.convert(
                    Typed {
                        value: current,
                        ty: place.ty.clone(),
                        owned: false,
                    },
                    &candidate.lhs,
                    resolved.lhs_conversion,
                )?;
                let value = self.expr(expr.value)?;
                let value = self.convert(value, &candidate.rhs, resolved.rhs_conversion)?;
                let result = self.apply(candidate.lowering, &[current.value, value.value]);
                self.release(&value);
                result
            }
        };

        lifecycle::emit_destroy(self.backend, &place.ty, place.address);
        self.backend.store(new, place.address);
        Ok(Typed {
            value: new,
            ty: place.ty,
            owned: false,
        })
    }

    fn construct(&mut self, expr: &ConstructExpr<'_>) -> Result<Typed> {
        let construction = self.checker().construct(expr)?;
        match construction {
            Construction::Scalar { ty } => {
                let [arg] = expr.args else {
                    return Err(CompilationError::internal(
                        "scalar constructor passed the arity check",
                    ));
                };
                self.expr_as(arg, &ty)
            }
            Construction::Vector { ty, component } => {
                let components = expr
                    .args
                    .iter()
                    .map(|arg| self.expr_as(arg, &component).map(|t| t.value))
                    .collect::<Vec<_>>();
                let components = accumulate(components)?;
                let value = self.backend.aggregate(&ty, &components);
                Ok(Typed {
                    value,
                    ty,
                    owned: false,
                })
            }
            Construction::Array { ty, element } => {
                let elements = self.with_temporaries(|l| {
                    let elements = expr
                        .args
                        .iter()
                        .map(|arg| -> Result<ValueId> {
                            let typed = l.expr(arg)?;
                            let value = l.into_owned(typed);
                            l.hold(&Typed {
                                value,
                                ty: element.clone(),
                                owned: element.needs_destroy(),
                            });
                            Ok(value)
                        })
                        .collect::<Vec<_>>();
                    accumulate(elements)
                })?;
                let value = self.backend.aggregate(&ty, &elements);
                tracing::trace!(ty = %ty, element = %element, "constructed array");
                Ok(Typed {
                    value,
                    owned: ty.needs_destroy(),
                    ty,
                })
            }
        }
    }

    /// Evaluate a condition as `bool`.
    pub(crate) fn condition(&mut self, expr: &Expr<'_>) -> Result<ValueId> {
        let boolean = self.ctx.builtins.types.bool();
        let ty = self.checker().expr(expr)?;
        if ty != boolean {
            return Err(CompilationError::mismatch(
                &boolean,
                &ty,
                expr.span(),
            ));
        }
        Ok(self.expr(expr)?.value)
    }
}
