//! Function prototypes and definitions.
//!
//! A function body is lowered as:
//!
//! ```text
//! entry:     selector/error slots, return slot, parameter copies
//!            ... body ...
//! epilogue:  switch selector [Return -> return, Error -> raise]
//! return:    ret (load return slot)
//! raise:     raise error slot
//! ```

use shadel_ast::{FunctionDecl, Param, PrototypeDecl, Signature};
use shadel_core::{CompilationError, Join, Span, SymbolKind, accumulate, with_side_effect};
use shadel_types::TypeSpec;

use super::{Lowerer, Result};
use crate::backend::FunctionAbi;
use crate::control::{FunctionFrame, JumpTarget};
use crate::exports::FunctionExport;
use crate::function::{FunctionEntry, Parameter};
use crate::lifecycle;
use crate::variable::VariableEntry;

/// Type of the hidden first argument of member functions.
pub(super) const CONTEXT_TYPE: &str = "context_ptr";

impl Lowerer<'_, '_> {
    // ========================================================================
    // Declarations
    // ========================================================================

    /// The hidden context parameter type of member functions.
    pub(super) fn member_context(&self, member: bool, span: Span) -> Result<Option<TypeSpec>> {
        if member {
            self.ctx.builtin_type(CONTEXT_TYPE, span).map(Some)
        } else {
            Ok(None)
        }
    }

    pub(super) fn parameters(&self, params: &[Param<'_>]) -> Result<Vec<Parameter>> {
        let mut seen: Vec<&str> = Vec::new();
        accumulate(params.iter().map(|p| {
            if seen.contains(&p.name.name) {
                return Err(CompilationError::InvalidRedeclaration {
                    kind: SymbolKind::Variable,
                    name: p.name.name.to_string(),
                    reason: "parameter name used twice".to_string(),
                    span: p.name.span,
                });
            }
            seen.push(p.name.name);
            let ty = self.ctx.resolve_type(&p.ty)?;
            if ty.is_void() {
                return Err(CompilationError::message(
                    format!("parameter '{}' cannot have type 'void'", p.name),
                    p.span,
                ));
            }
            Ok(Parameter {
                name: p.name.name.to_string(),
                ty,
                output: p.output,
            })
        }))
    }

    /// Build the entry a signature declares.
    pub(crate) fn signature_entry(
        &self,
        signature: &Signature<'_>,
        external: Option<&str>,
        member: bool,
    ) -> Result<FunctionEntry> {
        let ret = self.ctx.resolve_type(&signature.return_type);
        let params = self.parameters(signature.params);
        let (return_type, params) = (ret, params).join()?;

        let name = signature.name.name.to_string();
        let symbol = match external {
            Some(symbol) => symbol.to_string(),
            None => {
                let types: Vec<TypeSpec> = params.iter().map(|p| p.ty.clone()).collect();
                self.ctx.function_symbol(&name, &types)
            }
        };
        Ok(FunctionEntry {
            name,
            return_type,
            params,
            external: external.is_some(),
            member,
            symbol,
            defined: false,
            span: signature.span,
        })
    }

    /// Declare `entry` in the current scope and with the backend.
    pub(crate) fn declare(&mut self, entry: FunctionEntry, export: bool) -> Result<FunctionEntry> {
        let context = self.member_context(entry.member, entry.span)?;
        let declared = self.ctx.declare_function(entry)?;
        self.backend
            .declare_function(&declared.symbol, &declared.abi(context.as_ref()));

        if export && !declared.external {
            let hidden = context.map(|ty| Parameter {
                name: "ctx".to_string(),
                ty,
                output: false,
            });
            self.ctx.exports.add_function(FunctionExport {
                name: declared.name.clone(),
                mangled: declared.symbol.clone(),
                return_type: declared.return_type.clone(),
                params: hidden.into_iter().chain(declared.params.iter().cloned()).collect(),
            });
        }
        tracing::debug!(function = %declared, symbol = %declared.symbol, "declared function");
        Ok(declared)
    }

    pub(crate) fn prototype(&mut self, decl: &PrototypeDecl<'_>) -> Result<()> {
        let member = decl.external.is_none() && self.ctx.control.in_context();
        let entry = self.signature_entry(&decl.signature, decl.external, member)?;
        self.declare(entry, true).map(|_| ())
    }

    // ========================================================================
    // Bodies
    // ========================================================================

    /// Begin the body of `symbol` and push its frame.
    pub(crate) fn open_function(
        &mut self,
        name: &str,
        symbol: &str,
        abi: &FunctionAbi,
        member: bool,
    ) -> FunctionFrame {
        let id = self.backend.declare_function(symbol, abi);
        self.backend.begin_function(id);

        let selector_slot = self.backend.selector_slot();
        let error_slot = self.backend.error_slot();
        let return_slot = if abi.ret.is_void() {
            None
        } else {
            let slot = self.backend.alloca(&abi.ret, "retval");
            let zero = self.backend.default_value(&abi.ret);
            self.backend.store(zero, slot);
            Some(slot)
        };
        let context = member.then(|| self.backend.param(0));
        let epilogue = self.backend.create_block("epilogue");

        let frame = FunctionFrame {
            name: name.to_string(),
            return_type: abi.ret.clone(),
            return_slot,
            selector_slot,
            error_slot,
            epilogue,
            scope_depth: self.depth(),
            context,
        };
        self.ctx.control.push_function(frame.clone());
        frame
    }

    /// Emit the epilogue of the innermost function, finish it, and pop its
    /// frame.
    pub(crate) fn close_function(&mut self) -> Result<()> {
        let frame = self.ctx.control.pop_function()?;

        self.backend.switch_to(frame.epilogue);
        let ret_block = self.backend.create_block("return");
        let raise_block = self.backend.create_block("raise");
        let invalid = self.backend.create_block("invalid");
        self.backend.switch_selector(
            frame.selector_slot,
            &[
                (JumpTarget::Return.into(), ret_block),
                (JumpTarget::Error.into(), raise_block),
            ],
            invalid,
        );

        self.backend.switch_to(ret_block);
        let value = frame
            .return_slot
            .map(|slot| self.backend.load(&frame.return_type, slot));
        self.backend.ret(value);

        self.backend.switch_to(raise_block);
        self.backend.raise(frame.error_slot);

        self.backend.switch_to(invalid);
        self.backend.unreachable();

        self.backend.end_function();
        Ok(())
    }

    /// Bind parameters as variables of the function's scope. Inputs are
    /// copied into locals the function owns; outputs alias the caller's
    /// storage.
    fn bind_params(&mut self, entry: &FunctionEntry, params: &[Param<'_>]) -> Result<()> {
        let offset = u32::from(entry.member);
        let results = entry
            .params
            .iter()
            .zip(params)
            .enumerate()
            .map(|(index, (param, ast))| {
                self.ctx
                    .check_unbound(SymbolKind::Variable, &param.name, ast.name.span)?;
                let incoming = self.backend.param(index as u32 + offset);
                let variable = if param.output {
                    VariableEntry::reference(&param.name, param.ty.clone(), incoming, ast.span)
                } else {
                    let owned = lifecycle::emit_copy(self.backend, &param.ty, incoming);
                    let slot = self.backend.alloca(&param.ty, &param.name);
                    self.backend.store(owned, slot);
                    VariableEntry::local(&param.name, param.ty.clone(), slot, ast.span)
                };
                self.ctx.variables.set(&param.name, variable)
            })
            .collect::<Vec<_>>();
        accumulate(results).map(|_| ())
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    #[tracing::instrument(level = "debug", skip_all, fields(function = %decl.signature.name))]
    pub(crate) fn function(&mut self, decl: &FunctionDecl<'_>) -> Result<()> {
        let member = self.ctx.control.in_context();
        let entry = self.signature_entry(&decl.signature, None, member)?;
        let entry = self.declare(entry, true)?;
        self.ctx.mark_defined(&entry.key(), decl.signature.name.span)?;

        let context = self.member_context(entry.member, decl.span)?;
        let frame = self.open_function(
            &entry.name,
            &entry.symbol,
            &entry.abi(context.as_ref()),
            entry.member,
        );

        let body = self.with_scope(&entry.name, |l| {
            let params = l.bind_params(&entry, decl.signature.params);
            let stmts = l.stmts(decl.body.stmts);
            (params, stmts).join().map(|_| ())
        });

        let fallthrough = if self.backend.is_terminated() {
            Ok(())
        } else {
            self.backend
                .store_selector(frame.selector_slot, JumpTarget::Return.into());
            self.backend.branch(frame.epilogue);
            if !entry.return_type.is_void() && self.ctx.options.require_return_paths {
                Err(CompilationError::MissingReturn {
                    name: entry.name.clone(),
                    span: decl.span,
                })
            } else {
                Ok(())
            }
        };

        let closed = self.close_function();
        tracing::debug!(symbol = %entry.symbol, "lowered function");
        with_side_effect((body, fallthrough).join().map(|_| ()), closed)
    }
}
