//! Distributions.
//!
//! The parameters of a distribution form a context block. A generated
//! `<name>.new` allocates and fills it, `<name>.destroy` releases it.
//! Functions declared inside the distribution are members: they receive the
//! block as a hidden first argument and read the parameters through it.

use shadel_ast::DistributionDecl;
use shadel_core::{CompilationError, Join, accumulate, with_side_effect};
use shadel_types::TypeSpec;
use shadel_types::builtins::{CONTEXT_ALLOC, CONTEXT_FREE};

use super::function::CONTEXT_TYPE;
use super::{Lowerer, Result};
use crate::backend::{FunctionAbi, ParamAbi};
use crate::control::ContextFrame;
use crate::exports::FunctionExport;
use crate::function::Parameter;
use crate::lifecycle;
use crate::variable::VariableEntry;

/// The member every distribution must define.
pub const EVALUATE: &str = "evaluate";
const CONSTRUCTOR: &str = "new";
const DESTRUCTOR: &str = "destroy";

impl Lowerer<'_, '_> {
    #[tracing::instrument(level = "debug", skip_all, fields(distribution = %decl.name))]
    pub(crate) fn distribution(&mut self, decl: &DistributionDecl<'_>) -> Result<()> {
        let name = decl.name.name;
        if let Some(outer) = self.ctx.control.context() {
            return Err(CompilationError::message(
                format!(
                    "distribution '{name}' cannot be declared inside distribution '{}'",
                    outer.name
                ),
                decl.span,
            ));
        }
        let fields = self.parameters(decl.params);
        let context = self.ctx.builtin_type(CONTEXT_TYPE, decl.span);
        let (fields, context) = (fields, context).join()?;
        if let Some((field, ast)) = fields.iter().zip(decl.params).find(|(f, _)| f.output) {
            return Err(CompilationError::message(
                format!("distribution parameter '{}' cannot be an output", field.name),
                ast.span,
            ));
        }

        self.open_module(name);
        self.ctx.control.push_context(ContextFrame {
            name: name.to_string(),
            fields: fields.iter().map(|f| (f.name.clone(), f.ty.clone())).collect(),
        });

        let bound = fields
            .iter()
            .zip(decl.params)
            .enumerate()
            .map(|(index, (field, ast))| {
                self.ctx.variables.set(
                    &field.name,
                    VariableEntry::context_field(&field.name, field.ty.clone(), index as u32, ast.span),
                )
            })
            .collect::<Vec<_>>();
        let bound = accumulate(bound).map(|_| ());
        let items = self.items(decl.items);
        let evaluate = if self.ctx.functions.has_local(EVALUATE) {
            Ok(())
        } else {
            Err(CompilationError::message(
                format!("distribution '{name}' does not define '{EVALUATE}'"),
                decl.span,
            ))
        };

        self.constructor(&fields, &context);
        self.destructor(&fields, &context);
        tracing::debug!(fields = fields.len(), "lowered distribution");

        let popped = self.ctx.control.pop_context().map(|_| ());
        let closed = self.close_module(decl.span);
        with_side_effect(
            (bound, items, evaluate).join().map(|_| ()),
            (popped, closed).join().map(|_| ()),
        )
    }

    /// `<name>.new(fields...)`: allocate the block and copy each argument
    /// into its field.
    fn constructor(&mut self, fields: &[Parameter], context: &TypeSpec) {
        let symbol = self.ctx.global_symbol(CONSTRUCTOR);
        let abi = FunctionAbi {
            params: fields
                .iter()
                .map(|f| ParamAbi {
                    ty: f.ty.clone(),
                    by_ref: false,
                })
                .collect(),
            ret: context.clone(),
        };
        let id = self.backend.declare_function(&symbol, &abi);
        self.backend.begin_function(id);

        let size: u32 = fields.iter().map(|f| f.ty.size()).sum();
        let size = self.backend.const_int(i64::from(size));
        let block = self.backend.call(CONTEXT_ALLOC, &[size]);
        for (index, field) in fields.iter().enumerate() {
            let index = index as u32;
            let incoming = self.backend.param(index);
            let owned = lifecycle::emit_copy(self.backend, &field.ty, incoming);
            let slot = self.backend.field_ptr(block, index);
            self.backend.store(owned, slot);
        }
        self.backend.ret(Some(block));
        self.backend.end_function();

        self.ctx.exports.add_function(FunctionExport {
            name: CONSTRUCTOR.to_string(),
            mangled: symbol,
            return_type: context.clone(),
            params: fields.to_vec(),
        });
    }

    /// `<name>.destroy(ctx)`: destroy the managed fields and free the block.
    fn destructor(&mut self, fields: &[Parameter], context: &TypeSpec) {
        let symbol = self.ctx.global_symbol(DESTRUCTOR);
        let void = self.ctx.builtins.types.void();
        let abi = FunctionAbi {
            params: vec![ParamAbi {
                ty: context.clone(),
                by_ref: false,
            }],
            ret: void.clone(),
        };
        let id = self.backend.declare_function(&symbol, &abi);
        self.backend.begin_function(id);

        let block = self.backend.param(0);
        for (index, field) in fields.iter().enumerate() {
            if field.ty.needs_destroy() {
                let slot = self.backend.field_ptr(block, index as u32);
                lifecycle::emit_destroy(self.backend, &field.ty, slot);
            }
        }
        self.backend.call(CONTEXT_FREE, &[block]);
        self.backend.ret(None);
        self.backend.end_function();

        self.ctx.exports.add_function(FunctionExport {
            name: DESTRUCTOR.to_string(),
            mangled: symbol,
            return_type: void,
            params: vec![Parameter {
                name: "ctx".to_string(),
                ty: context.clone(),
                output: false,
            }],
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Instr, RecordingBackend};
    use crate::context::CompileContext;
    use crate::lower::test_support::*;
    use crate::options::CompilerOptions;
    use bumpalo::Bump;
    use shadel_ast::{AssignOp, Ident, Item, Param, Script};
    use shadel_types::Builtins;
    use shadel_types::builtins::{STRING_COPY, STRING_DESTROY};

    fn distribution<'a>(
        arena: &'a Bump,
        name: &'a str,
        params: &[Param<'a>],
        items: &[Item<'a>],
    ) -> Item<'a> {
        Item::Distribution(DistributionDecl {
            name: Ident::new(name, sp(1)),
            params: arena.alloc_slice_copy(params),
            items: arena.alloc_slice_copy(items),
            span: sp(1),
        })
    }

    fn compile<'a>(
        ctx: &mut CompileContext<'_>,
        backend: &mut RecordingBackend,
        arena: &'a Bump,
        items: &[Item<'a>],
    ) -> Result<String> {
        let script = Script::new(arena.alloc_slice_copy(items), sp(1));
        Lowerer::new(ctx, backend).unit(&script)
    }

    fn lambert<'a>(arena: &'a Bump) -> Item<'a> {
        distribution(
            arena,
            "lambert",
            &[param(arena, "vec3", "albedo"), param(arena, "string", "label")],
            &[
                function(
                    arena,
                    "float",
                    "weight",
                    &[],
                    &[ret(Some(field(arena, var(arena, "albedo"), "x")))],
                ),
                function(
                    arena,
                    "float",
                    EVALUATE,
                    &[],
                    &[ret(Some(call(arena, "weight", &[])))],
                ),
            ],
        )
    }

    #[test]
    fn constructor_and_destructor_manage_the_block() {
        let arena = Bump::new();
        let builtins = Builtins::standard();
        let mut ctx = CompileContext::new(&builtins, CompilerOptions::default());
        let mut backend = RecordingBackend::new();
        compile(&mut ctx, &mut backend, &arena, &[lambert(&arena)]).unwrap();

        assert_eq!(backend.calls_in("main.lambert.new", CONTEXT_ALLOC), 1);
        assert_eq!(backend.calls_in("main.lambert.new", STRING_COPY), 1);
        let stores = backend
            .instructions("main.lambert.new")
            .into_iter()
            .filter(|i| matches!(i, Instr::FieldPtr { .. }))
            .count();
        assert_eq!(stores, 2);

        assert_eq!(backend.calls_in("main.lambert.destroy", STRING_DESTROY), 1);
        assert_eq!(backend.calls_in("main.lambert.destroy", CONTEXT_FREE), 1);
        backend.verify().unwrap();
    }

    #[test]
    fn members_receive_and_forward_the_context() {
        let arena = Bump::new();
        let builtins = Builtins::standard();
        let mut ctx = CompileContext::new(&builtins, CompilerOptions::default());
        let mut backend = RecordingBackend::new();
        compile(&mut ctx, &mut backend, &arena, &[lambert(&arena)]).unwrap();

        let module = ctx.modules.root().child("lambert").unwrap();
        let evaluate = &module.functions.get(EVALUATE).unwrap().entries()[0];
        assert!(evaluate.member);
        let recorded = backend.function(&evaluate.symbol).unwrap();
        assert_eq!(recorded.params, ["context_ptr"]);

        let listing = backend.instructions(&evaluate.symbol);
        let context = listing
            .iter()
            .find_map(|i| match i {
                Instr::Param { dst, index: 0 } => Some(*dst),
                _ => None,
            })
            .unwrap();
        assert!(listing.iter().any(
            |i| matches!(i, Instr::Invoke { args, callee, .. } if callee.starts_with("main.lambert.weight") && args == &vec![context])
        ));

        let exports = ctx.exports.module(&["lambert"]).unwrap();
        let exported = exports.functions_named(EVALUATE).next().unwrap();
        assert_eq!(exported.params[0].name, "ctx");
        assert_eq!(exports.functions_named("new").next().unwrap().params.len(), 2);
        assert!(exports.functions_named("destroy").next().is_some());
    }

    #[test]
    fn evaluate_is_required() {
        let arena = Bump::new();
        let builtins = Builtins::standard();
        let mut ctx = CompileContext::new(&builtins, CompilerOptions::default());
        let mut backend = RecordingBackend::new();
        let empty = distribution(&arena, "empty", &[param(&arena, "float", "k")], &[]);
        let err = compile(&mut ctx, &mut backend, &arena, &[empty]).unwrap_err();
        assert!(err.to_string().contains("distribution 'empty' does not define 'evaluate'"));
    }

    #[test]
    fn parameters_are_read_only() {
        let arena = Bump::new();
        let builtins = Builtins::standard();
        let mut ctx = CompileContext::new(&builtins, CompilerOptions::default());
        let mut backend = RecordingBackend::new();
        let body = [
            expr_stmt(assign(&arena, var(&arena, "k"), AssignOp::Assign, float(&arena, 2.0))),
            ret(Some(var(&arena, "k"))),
        ];
        let dist = distribution(
            &arena,
            "scaled",
            &[param(&arena, "float", "k")],
            &[function(&arena, "float", EVALUATE, &[], &body)],
        );
        let err = compile(&mut ctx, &mut backend, &arena, &[dist]).unwrap_err();
        assert!(err.to_string().contains("cannot assign to 'k'"));
    }

    #[test]
    fn distributions_do_not_nest() {
        let arena = Bump::new();
        let builtins = Builtins::standard();
        let mut ctx = CompileContext::new(&builtins, CompilerOptions::default());
        let mut backend = RecordingBackend::new();
        let inner = distribution(&arena, "inner", &[], &[]);
        let outer = distribution(
            &arena,
            "outer",
            &[],
            &[inner, function(&arena, "float", EVALUATE, &[], &[ret(Some(float(&arena, 0.5)))])],
        );
        let err = compile(&mut ctx, &mut backend, &arena, &[outer]).unwrap_err();
        assert_eq!(err.count(), 1);
        assert!(err.to_string().contains("cannot be declared inside distribution 'outer'"));
    }
}
