//! Statement lowering.
//!
//! Every exit from a scope emits the destructors of the scopes it leaves:
//!
//! - fall-through: the scope's own variables, when [`Lowerer::with_scope`]
//!   closes it
//! - `break`/`continue`: every scope opened inside the loop
//! - `return`/`throw`/an unwinding call: every scope of the function
//!
//! After a terminator the rest of a statement list is dead and not lowered.

use shadel_ast::{Block, ForStmt, IfStmt, ReturnStmt, Stmt, ThrowStmt, VarDeclStmt};
use shadel_core::{CompilationError, Join, Span, SymbolKind, accumulate};
use shadel_types::builtins::RAISE_ERROR;

use super::{Lowerer, Result};
use crate::control::{JumpTarget, LoopFrame};
use crate::variable::VariableEntry;

impl Lowerer<'_, '_> {
    /// Lower a statement list, stopping once control cannot reach the next
    /// statement.
    pub(crate) fn stmts(&mut self, stmts: &[Stmt<'_>]) -> Result<()> {
        let mut results = Vec::new();
        for stmt in stmts {
            if self.backend.is_terminated() || !self.ctx.control.reaches_end() {
                tracing::trace!(span = %stmt.span(), "skipping unreachable statement");
                break;
            }
            results.push(self.stmt(stmt));
            if self.backend.is_terminated() {
                self.ctx.control.mark_terminated();
            }
        }
        accumulate(results).map(|_| ())
    }

    pub(crate) fn stmt(&mut self, stmt: &Stmt<'_>) -> Result<()> {
        match stmt {
            Stmt::Expr(s) => {
                let typed = self.expr(s.expr)?;
                self.release(&typed);
                Ok(())
            }
            Stmt::VarDecl(decl) => self.var_decl(decl),
            Stmt::Block(block) => self.block(block),
            Stmt::If(s) => self.if_stmt(s),
            Stmt::For(s) => self.for_stmt(s),
            Stmt::Break(s) => self.loop_exit(JumpTarget::Break, s.span),
            Stmt::Continue(s) => self.loop_exit(JumpTarget::Continue, s.span),
            Stmt::Return(s) => self.return_stmt(s),
            Stmt::Throw(s) => self.throw_stmt(s),
        }
    }

    pub(crate) fn block(&mut self, block: &Block<'_>) -> Result<()> {
        self.with_scope("block", |l| l.stmts(block.stmts))
    }

    fn var_decl(&mut self, decl: &VarDeclStmt<'_>) -> Result<()> {
        let name = decl.name.name;
        let unbound = self.ctx.check_unbound(SymbolKind::Variable, name, decl.name.span);
        let ty = self.ctx.resolve_type(&decl.ty);
        let (ty, ()) = (ty, unbound).join()?;

        if ty.is_void() {
            return Err(CompilationError::message(
                format!("variable '{name}' cannot have type 'void'"),
                decl.span,
            ));
        }

        // The initializer sees the scope before the new name is bound.
        let value = match decl.init {
            Some(init) => {
                let typed = self.expr_as(init, &ty)?;
                self.into_owned(typed)
            }
            None if ty.has_default() => self.backend.default_value(&ty),
            None => {
                return Err(CompilationError::message(
                    format!("variable '{name}' of type '{ty}' needs an initializer"),
                    decl.span,
                ));
            }
        };

        let slot = self.backend.alloca(&ty, name);
        self.backend.store(value, slot);
        tracing::trace!(variable = %name, ty = %ty, "declare local");
        self.ctx
            .variables
            .set(name, VariableEntry::local(name, ty, slot, decl.span))
    }

    fn if_stmt(&mut self, stmt: &IfStmt<'_>) -> Result<()> {
        let condition = self.condition(stmt.condition);
        let cond_value = match &condition {
            Ok(value) => *value,
            Err(_) => self.backend.const_bool(false),
        };

        let then_block = self.backend.create_block("if.then");
        let merge = self.backend.create_block("if.end");
        let else_block = match stmt.else_branch {
            Some(_) => self.backend.create_block("if.else"),
            None => merge,
        };
        self.backend.cond_branch(cond_value, then_block, else_block);

        self.backend.switch_to(then_block);
        let then_result = self.with_scope("if.then", |l| l.stmt(stmt.then_branch));
        let then_ends = self.backend.is_terminated();
        if !then_ends {
            self.backend.branch(merge);
        }

        let (else_result, else_ends) = match stmt.else_branch {
            Some(branch) => {
                self.backend.switch_to(else_block);
                let result = self.with_scope("if.else", |l| l.stmt(branch));
                let ends = self.backend.is_terminated();
                if !ends {
                    self.backend.branch(merge);
                }
                (result, ends)
            }
            None => (Ok(()), false),
        };

        self.backend.switch_to(merge);
        if then_ends && else_ends {
            self.backend.unreachable();
        }

        (condition, then_result, else_result).join().map(|_| ())
    }

    /// `for (init; cond; step) body`. The init variables live in one scope
    /// around the whole loop; the body gets a fresh scope per iteration.
    fn for_stmt(&mut self, stmt: &ForStmt<'_>) -> Result<()> {
        self.with_scope("for", |l| {
            let init = match stmt.init {
                Some(init) => l.stmt(init),
                None => Ok(()),
            };

            let cond_block = l.backend.create_block("for.cond");
            let body_block = l.backend.create_block("for.body");
            let step_block = l.backend.create_block("for.step");
            let exit_block = l.backend.create_block("for.end");
            l.backend.branch(cond_block);

            l.backend.switch_to(cond_block);
            let condition = match stmt.condition {
                Some(cond) => {
                    let result = l.condition(cond);
                    let value = match &result {
                        Ok(value) => *value,
                        Err(_) => l.backend.const_bool(false),
                    };
                    l.backend.cond_branch(value, body_block, exit_block);
                    result.map(|_| ())
                }
                None => {
                    l.backend.branch(body_block);
                    Ok(())
                }
            };

            l.backend.switch_to(body_block);
            let depth = l.depth();
            l.ctx.control.push_loop(LoopFrame {
                continue_block: step_block,
                break_block: exit_block,
                scope_depth: depth,
                has_break: false,
            });
            let body = l.with_scope("for.body", |l| l.stmt(stmt.body));
            if !l.backend.is_terminated() {
                l.backend.branch(step_block);
            }
            let frame = l.ctx.control.pop_loop();

            l.backend.switch_to(step_block);
            let step = match stmt.step {
                Some(step) => l.expr(step).map(|typed| l.release(&typed)),
                None => Ok(()),
            };
            l.backend.branch(cond_block);

            l.backend.switch_to(exit_block);
            let frame = frame?;
            if stmt.condition.is_none() && !frame.has_break {
                l.backend.unreachable();
            }

            (init, condition, body, step).join().map(|_| ())
        })
    }

    fn loop_exit(&mut self, reason: JumpTarget, span: Span) -> Result<()> {
        let keyword = match reason {
            JumpTarget::Break => "break",
            _ => "continue",
        };
        let frame = self
            .ctx
            .control
            .current_loop()
            .cloned()
            .ok_or(CompilationError::InvalidControlFlow { keyword, span })?;

        let target = match reason {
            JumpTarget::Break => {
                self.ctx.control.mark_break();
                frame.break_block
            }
            _ => frame.continue_block,
        };
        self.unwind_to(frame.scope_depth);
        self.backend.branch(target);
        Ok(())
    }

    fn return_stmt(&mut self, stmt: &ReturnStmt<'_>) -> Result<()> {
        let frame = self.ctx.control.function().cloned().ok_or_else(|| {
            CompilationError::message("'return' outside any function", stmt.span)
        })?;

        match (stmt.value, frame.return_slot) {
            (Some(value), Some(slot)) => {
                let typed = self.expr_as(value, &frame.return_type)?;
                let value = self.into_owned(typed);
                self.backend.store(value, slot);
            }
            (None, None) => {}
            (Some(value), None) => {
                let found = self.checker().expr(value)?;
                return Err(CompilationError::mismatch("void", found, value.span()));
            }
            (None, Some(_)) => {
                return Err(CompilationError::mismatch(
                    &frame.return_type,
                    "void",
                    stmt.span,
                ));
            }
        }

        self.transfer(JumpTarget::Return, frame.scope_depth, frame.epilogue);
        Ok(())
    }

    /// `throw msg`: build the runtime error, then leave the function the way
    /// a `return` does, with the `Error` selector.
    fn throw_stmt(&mut self, stmt: &ThrowStmt<'_>) -> Result<()> {
        let frame = self.ctx.control.function().cloned().ok_or_else(|| {
            CompilationError::message("'throw' outside any function", stmt.span)
        })?;
        let string = self.ctx.builtin_type("string", stmt.span)?;

        let message = self.expr_as(stmt.message, &string)?;
        let error = self.backend.call(RAISE_ERROR, &[message.value]);
        self.release(&message);
        self.backend.store(error, frame.error_slot);
        self.transfer(JumpTarget::Error, frame.scope_depth, frame.epilogue);
        Ok(())
    }
}
