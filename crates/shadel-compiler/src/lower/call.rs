//! Call lowering.
//!
//! Arguments are evaluated left to right. Input arguments are passed by
//! value and borrowed by the callee, which copies what it keeps; output
//! arguments pass the address of the caller's storage. Temporaries are
//! held until the call returns, and destroyed on both of its exits.

use shadel_ast::{CallExpr, Expr};
use shadel_core::{CompilationError, accumulate};
use shadel_types::{Conversion, ConversionKind, TypeSpec};

use super::{Lowerer, Result, Typed};
use crate::backend::ValueId;
use crate::function::{Parameter, ResolvedCall};

/// One evaluated argument.
enum Bound {
    Value(Typed),
    Address(ValueId),
    /// A `{length, data}` view, with the array spilled to back it.
    View { view: ValueId, spilled: Option<Typed> },
}

impl Bound {
    fn value(&self) -> ValueId {
        match self {
            Bound::Value(typed) => typed.value,
            Bound::Address(address) => *address,
            Bound::View { view, .. } => *view,
        }
    }

    /// The temporary the caller must destroy after the call.
    fn temporary(&self) -> Option<&Typed> {
        match self {
            Bound::Value(typed) => Some(typed),
            Bound::View { spilled, .. } => spilled.as_ref(),
            Bound::Address(_) => None,
        }
    }
}

impl Lowerer<'_, '_> {
    pub(crate) fn call(&mut self, expr: &CallExpr<'_>) -> Result<Typed> {
        let resolved = self.checker().call(expr)?;
        self.with_temporaries(|l| l.resolved_call(expr, resolved))
    }

    fn resolved_call(&mut self, expr: &CallExpr<'_>, resolved: ResolvedCall) -> Result<Typed> {
        let entry = resolved.entry;

        let bound = expr
            .args
            .iter()
            .zip(&entry.params)
            .zip(resolved.conversions)
            .map(|((arg, param), conversion)| {
                let bound = self.argument(arg, param, conversion);
                if let Some(temporary) = bound.as_ref().ok().and_then(Bound::temporary) {
                    self.hold(temporary);
                }
                bound
            })
            .collect::<Vec<_>>();
        let bound = accumulate(bound)?;

        let mut args = Vec::with_capacity(bound.len() + 1);
        if entry.member {
            let context = self
                .ctx
                .control
                .function()
                .and_then(|f| f.context)
                .ok_or_else(|| {
                    CompilationError::message(
                        format!("member function '{}' needs a distribution context", entry.name),
                        expr.span,
                    )
                })?;
            args.push(context);
        }
        args.extend(bound.iter().map(Bound::value));

        tracing::trace!(callee = %entry.symbol, args = args.len(), "lower call");
        let value = self.emit_call(&entry.symbol, &args, entry.may_throw())?;

        for temporary in bound.iter().filter_map(Bound::temporary) {
            self.release(temporary);
        }

        Ok(Typed {
            value,
            owned: entry.return_type.needs_destroy(),
            ty: entry.return_type,
        })
    }

    fn argument(
        &mut self,
        arg: &Expr<'_>,
        param: &Parameter,
        conversion: Conversion,
    ) -> Result<Bound> {
        if param.output {
            return Ok(Bound::Address(self.place(arg)?.address));
        }
        match conversion.kind {
            ConversionKind::ArrayView => self.array_view(arg, &param.ty),
            _ => {
                let typed = self.expr(arg)?;
                self.convert(typed, &param.ty, conversion).map(Bound::Value)
            }
        }
    }

    /// Build a `{length, data}` view of an array argument. Arrays without
    /// storage are spilled to a temporary slot that outlives the call.
    fn array_view(&mut self, arg: &Expr<'_>, view: &TypeSpec) -> Result<Bound> {
        let (address, array, spilled) = if arg.is_lvalue() {
            let place = self.place(arg)?;
            (place.address, place.ty, None)
        } else {
            let typed = self.expr(arg)?;
            let slot = self.backend.alloca(&typed.ty, "view.tmp");
            self.backend.store(typed.value, slot);
            tracing::trace!(array = %typed.ty, "spilled array for view");
            (slot, typed.ty.clone(), Some(typed))
        };
        let length = array.array_length().ok_or_else(|| {
            CompilationError::internal(format!("array view of non-array '{array}'"))
        })?;

        let length = self.backend.const_int(i64::from(length));
        let view = self.backend.aggregate(view, &[length, address]);
        Ok(Bound::View { view, spilled })
    }
}
