//! Variable, field and element access.

use shadel_ast::{Expr, FieldExpr, IndexExpr, VariableExpr};
use shadel_core::CompilationError;
use shadel_types::TypeKind;

use super::{Lowerer, Place, Result, Typed};
use crate::backend::ValueId;
use crate::variable::Storage;

impl Lowerer<'_, '_> {
    /// The address of an assignable expression.
    pub(crate) fn place(&mut self, expr: &Expr<'_>) -> Result<Place> {
        match expr {
            Expr::Variable(var) => self.variable_place(var),
            Expr::Field(f) => {
                let object = self.place(f.object)?;
                let field = self.checker().field(f)?;
                let address = self.backend.field_ptr(object.address, field.index);
                Ok(Place {
                    address,
                    ty: field.ty,
                })
            }
            Expr::Index(i) => {
                let element = self.checker().index(i)?;
                let object = self.place(i.object)?;
                let index = self.expr(i.index)?;
                let address = self.element_address(&object, index.value);
                Ok(Place {
                    address,
                    ty: element,
                })
            }
            other => {
                self.checker().place(other)?;
                Err(CompilationError::internal("rvalue passed the place check"))
            }
        }
    }

    fn variable_place(&mut self, var: &VariableExpr<'_>) -> Result<Place> {
        let entry = self.ctx.lookup_variable(&var.path)?;
        let (ty, storage) = (entry.ty.clone(), entry.storage.clone());
        let address = match storage {
            Storage::Local(slot) => slot,
            Storage::Reference(address) => address,
            Storage::Global(symbol) => self.backend.global(&symbol, &ty),
            Storage::ContextField(index) => {
                let context = self
                    .ctx
                    .control
                    .function()
                    .and_then(|f| f.context)
                    .ok_or_else(|| {
                        CompilationError::message(
                            format!("distribution parameter '{}' used outside a member function", var.path),
                            var.span,
                        )
                    })?;
                self.backend.field_ptr(context, index)
            }
        };
        Ok(Place { address, ty })
    }

    /// Address of element `index` of the array or array view at `object`.
    fn element_address(&mut self, object: &Place, index: ValueId) -> ValueId {
        match object.ty.kind() {
            TypeKind::ArrayRef { .. } => {
                let view = self.backend.load(&object.ty, object.address);
                let data = self.backend.extract(view, 1);
                self.backend.element_ptr(data, index)
            }
            _ => self.backend.element_ptr(object.address, index),
        }
    }

    pub(crate) fn variable(&mut self, var: &VariableExpr<'_>) -> Result<Typed> {
        let place = self.variable_place(var)?;
        let value = self.backend.load(&place.ty, place.address);
        Ok(Typed {
            value,
            ty: place.ty,
            owned: false,
        })
    }

    pub(crate) fn field(&mut self, expr: &FieldExpr<'_>) -> Result<Typed> {
        let field = self.checker().field(expr)?;
        let object_ty = self.checker().expr(expr.object)?;

        if let Some(length) = object_ty.array_length() {
            // The length is static, but the object's side effects still run.
            match expr.object {
                Expr::Variable(_) => {}
                object if object.is_lvalue() => {
                    self.place(object)?;
                }
                object => {
                    let object = self.expr(object)?;
                    self.release(&object);
                }
            }
            let value = self.backend.const_int(i64::from(length));
            return Ok(Typed {
                value,
                ty: field.ty,
                owned: false,
            });
        }

        if expr.object.is_lvalue() {
            let object = self.place(expr.object)?;
            let address = self.backend.field_ptr(object.address, field.index);
            let value = self.backend.load(&field.ty, address);
            return Ok(Typed {
                value,
                ty: field.ty,
                owned: false,
            });
        }

        let object = self.expr(expr.object)?;
        let value = self.backend.extract(object.value, field.index);
        self.release(&object);
        Ok(Typed {
            value,
            ty: field.ty,
            owned: false,
        })
    }

    pub(crate) fn index(&mut self, expr: &IndexExpr<'_>) -> Result<Typed> {
        let element = self.checker().index(expr)?;

        if expr.object.is_lvalue() {
            let place = self.place(&Expr::Index(expr))?;
            let value = self.backend.load(&place.ty, place.address);
            return Ok(Typed {
                value,
                ty: place.ty,
                owned: false,
            });
        }

        let object = self.expr(expr.object)?;
        let index = self.with_temporaries(|l| {
            l.hold(&object);
            l.expr(expr.index)
        })?;
        let slot = self.backend.alloca(&object.ty, "index.tmp");
        self.backend.store(object.value, slot);
        let address = self.element_address(
            &Place {
                address: slot,
                ty: object.ty.clone(),
            },
            index.value,
        );
        let loaded = self.backend.load(&element, address);
        let value = self.into_owned(Typed {
            value: loaded,
            ty: element.clone(),
            owned: false,
        });
        self.release(&object);
        Ok(Typed {
            value,
            owned: element.needs_destroy(),
            ty: element,
        })
    }
}
