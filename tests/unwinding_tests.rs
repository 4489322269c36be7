//! Destructor emission on every way out of a scope.
//!
//! Each test counts the string destructor calls emitted into one function.
//! A local `string` must be destroyed exactly once on every path that
//! leaves its scope.

mod common;

use bumpalo::Bump;
use common::{Ast, compile, compile_with_options, symbol_of};
use shadel::ast::{AssignOp, BinaryOp};
use shadel::compiler::backend::Instr;
use shadel::prelude::*;
use shadel::types::builtins::{RAISE_ERROR, STRING_DESTROY};

fn destroys(backend: &RecordingBackend, symbol: &str) -> usize {
    backend.calls_in(symbol, STRING_DESTROY)
}

#[test]
fn fall_through_destroys_locals() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let body = [ast.decl("string", "s", Some(ast.string("a")))];
    let (result, backend) = compile(&ast, &[ast.function("void", "f", &[], &body)]);
    assert!(result.is_success(), "{}", result.report());

    assert_eq!(destroys(&backend, &symbol_of(&result, "f")), 1);
    backend.verify().unwrap();
}

#[test]
fn return_destroys_every_open_scope() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let body = [
        ast.decl("string", "a", Some(ast.string("a"))),
        ast.block(&[
            ast.decl("string", "b", Some(ast.string("b"))),
            ast.ret(Some(ast.float(1.0))),
        ]),
    ];
    let (result, backend) = compile(&ast, &[ast.function("float", "f", &[], &body)]);
    assert!(result.is_success(), "{}", result.report());

    let f = symbol_of(&result, "f");
    // the return path is the only exit; the closing scopes are unreachable
    assert_eq!(destroys(&backend, &f), 2);
    backend.verify().unwrap();
}

#[test]
fn statements_after_a_return_are_not_lowered() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let body = [
        ast.ret(None),
        ast.decl("string", "dead", Some(ast.string("x"))),
        ast.expr(ast.call("missing", &[])),
    ];
    let (result, backend) = compile(&ast, &[ast.function("void", "f", &[], &body)]);
    assert!(result.is_success(), "{}", result.report());

    let f = symbol_of(&result, "f");
    assert_eq!(destroys(&backend, &f), 0);
    assert!(!backend.instructions(&f).iter().any(|i| matches!(i, Instr::ConstString { .. })));
}

#[test]
fn break_destroys_only_the_loop_body() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let body = [
        ast.decl("string", "outer", Some(ast.string("o"))),
        ast.for_loop(
            None,
            None,
            None,
            ast.block(&[ast.decl("string", "s", Some(ast.string("a"))), ast.brk()]),
        ),
    ];
    let (result, backend) = compile(&ast, &[ast.function("void", "f", &[], &body)]);
    assert!(result.is_success(), "{}", result.report());

    // one for `s` on break, one for `outer` when the function falls through
    assert_eq!(destroys(&backend, &symbol_of(&result, "f")), 2);
    backend.verify().unwrap();
}

#[test]
fn continue_destroys_the_body_but_keeps_the_counter() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let looped = ast.for_loop(
        Some(ast.decl("int", "i", Some(ast.int(0)))),
        Some(ast.binary(ast.var("i"), BinaryOp::Less, ast.int(3))),
        Some(ast.assign(ast.var("i"), AssignOp::AddAssign, ast.int(1))),
        ast.block(&[ast.decl("string", "s", Some(ast.string("a"))), ast.cont()]),
    );
    let (result, backend) = compile(&ast, &[ast.function("void", "f", &[], &[looped])]);
    assert!(result.is_success(), "{}", result.report());

    let f = symbol_of(&result, "f");
    assert_eq!(destroys(&backend, &f), 1);
    let listing = backend.instructions(&f);
    assert!(listing.iter().any(|i| matches!(i, Instr::Op { name: "add.i", .. })));
    assert!(listing.iter().any(|i| matches!(i, Instr::Op { name: "cmp.lt.i", .. })));
    backend.verify().unwrap();
}

#[test]
fn loop_without_exit_ends_in_unreachable() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let looped = ast.for_loop(None, None, None, ast.block(&[]));
    let (result, backend) = compile(&ast, &[ast.function("float", "spin", &[], &[looped])]);
    // no path reaches the end, so no return is required
    assert!(result.is_success(), "{}", result.report());

    let spin = symbol_of(&result, "spin");
    let exit = backend
        .function(&spin)
        .unwrap()
        .blocks
        .iter()
        .filter_map(|b| backend.block(*b))
        .find(|b| b.label == "for.end")
        .unwrap();
    assert_eq!(exit.instrs, [Instr::Unreachable]);
    backend.verify().unwrap();
}

#[test]
fn break_and_continue_outside_loops() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let body = [ast.line(2).brk(), ast.line(3).cont()];
    let (result, _) = compile(&ast, &[ast.line(1).function("void", "f", &[], &body)]);

    // the first bad statement does not end the list
    let messages: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
    assert_eq!(
        messages,
        [
            "at 2:1: invalid use of 'break' outside any loop",
            "at 3:1: invalid use of 'continue' outside any loop",
        ]
    );
}

#[test]
fn throw_unwinds_through_the_error_selector() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let body = [
        ast.decl("string", "s", Some(ast.string("a"))),
        ast.throw("out of range"),
    ];
    let (result, backend) = compile(&ast, &[ast.function("void", "f", &[], &body)]);
    assert!(result.is_success(), "{}", result.report());

    let f = symbol_of(&result, "f");
    assert_eq!(destroys(&backend, &f), 1);
    assert_eq!(backend.calls_in(&f, RAISE_ERROR), 1);
    let listing = backend.instructions(&f);
    assert!(listing.iter().any(|i| matches!(i, Instr::StoreSelector { target: 4, .. })));
    assert!(listing.iter().any(|i| matches!(i, Instr::Raise { .. })));
    backend.verify().unwrap();
}

#[test]
fn raising_call_destroys_locals_on_both_paths() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let items = [
        ast.function("void", "g", &[], &[]),
        ast.function(
            "void",
            "f",
            &[],
            &[
                ast.decl("string", "s", Some(ast.string("a"))),
                ast.expr(ast.call("g", &[])),
            ],
        ),
    ];
    let (result, backend) = compile(&ast, &items);
    assert!(result.is_success(), "{}", result.report());

    let f = symbol_of(&result, "f");
    // once on the unwind path, once when the body falls through
    assert_eq!(destroys(&backend, &f), 2);
    assert!(backend.instructions(&f).iter().any(|i| matches!(i, Instr::LandingPad { .. })));
    backend.verify().unwrap();
}

#[test]
fn parameters_are_copied_and_destroyed() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let items = [ast.function(
        "string",
        "echo",
        &[ast.param("string", "s")],
        &[ast.ret(Some(ast.var("s")))],
    )];
    let (result, backend) = compile(&ast, &items);
    assert!(result.is_success(), "{}", result.report());

    let echo = symbol_of(&result, "echo");
    // the parameter copy dies with the function; the returned value is a
    // second copy the caller owns
    assert_eq!(destroys(&backend, &echo), 1);
    assert_eq!(backend.calls_in(&echo, "gd_builtin_copy_string"), 2);
}

#[test]
fn disabled_scope_destructors_emit_nothing() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let body = [
        ast.decl("string", "s", Some(ast.string("a"))),
        ast.if_else(ast.boolean(true), ast.ret(None), None),
    ];
    let mut options = CompilerOptions::default();
    options.set_property(CompilerProperty::EmitScopeDestructors, 0);
    let (result, backend) =
        compile_with_options(&ast, &[ast.function("void", "f", &[], &body)], options);
    assert!(result.is_success(), "{}", result.report());

    assert_eq!(destroys(&backend, &symbol_of(&result, "f")), 0);
    backend.verify().unwrap();
}

#[test]
fn temporaries_live_across_a_raising_call_are_destroyed_on_unwind() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let items = [
        ast.function("float", "f", &[], &[ast.ret(Some(ast.float(1.0)))]),
        ast.function(
            "void",
            "g",
            &[ast.param("string", "s"), ast.param("float", "x")],
            &[],
        ),
        ast.function(
            "void",
            "h",
            &[],
            &[ast.expr(ast.call(
                "g",
                &[
                    ast.binary(ast.string("x"), BinaryOp::Add, ast.string("y")),
                    ast.call("f", &[]),
                ],
            ))],
        ),
    ];
    let (result, backend) = compile(&ast, &items);
    assert!(result.is_success(), "{}", result.report());

    let h = symbol_of(&result, "h");
    // the concatenation dies once on each unwind path and once after `g`
    assert_eq!(destroys(&backend, &h), 3);
    let unwinds: Vec<_> = backend
        .function(&h)
        .unwrap()
        .blocks
        .iter()
        .filter_map(|b| backend.block(*b))
        .filter(|b| b.label == "call.unwind")
        .collect();
    assert_eq!(unwinds.len(), 2);
    for block in unwinds {
        assert!(
            block
                .instrs
                .iter()
                .any(|i| matches!(i, Instr::Call { callee, .. } if callee == STRING_DESTROY))
        );
    }
    backend.verify().unwrap();
}

#[test]
fn left_operand_survives_a_raising_right_operand() {
    let arena = Bump::new();
    let ast = Ast::new(&arena);
    let items = [
        ast.function("string", "name", &[], &[ast.ret(Some(ast.string("n")))]),
        ast.function(
            "void",
            "h",
            &[],
            &[ast.decl(
                "string",
                "s",
                Some(ast.binary(
                    ast.binary(ast.string("a"), BinaryOp::Add, ast.string("b")),
                    BinaryOp::Add,
                    ast.call("name", &[]),
                )),
            )],
        ),
    ];
    let (result, backend) = compile(&ast, &items);
    assert!(result.is_success(), "{}", result.report());

    let h = symbol_of(&result, "h");
    let unwind = backend
        .function(&h)
        .unwrap()
        .blocks
        .iter()
        .filter_map(|b| backend.block(*b))
        .find(|b| b.label == "call.unwind")
        .unwrap();
    // `"a" + "b"` is pending when `name()` raises
    let destroyed = unwind
        .instrs
        .iter()
        .filter(|i| matches!(i, Instr::Call { callee, .. } if callee == STRING_DESTROY))
        .count();
    assert_eq!(destroyed, 1);
    backend.verify().unwrap();
}
