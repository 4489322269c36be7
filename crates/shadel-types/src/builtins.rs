//! The standard language prelude.
//!
//! [`Builtins`] bundles the four read-only tables every compilation needs.
//! It is built once and then only read, so one instance can back any number
//! of compilations, including concurrent ones.

use shadel_ast::{BinaryOp, UnaryOp};

use crate::conversion::ConversionTable;
use crate::operators::{BinaryOpTable, OpLowering, UnaryOpTable};
use crate::registry::TypeRegistry;
use crate::type_def::{Lifecycle, Type, TypeFlags, TypeKind, TypeSpec};

/// Runtime symbol that copies a string value.
pub const STRING_COPY: &str = "gd_builtin_copy_string";
/// Runtime symbol that releases a string value.
pub const STRING_DESTROY: &str = "gd_builtin_destroy_string";
/// Runtime symbol that concatenates two strings into a fresh one.
pub const STRING_CONCAT: &str = "gd_builtin_concat_string";
/// Runtime symbol that builds a runtime error value from a string message.
pub const RAISE_ERROR: &str = "gd_builtin_error";
/// Runtime symbol that allocates a distribution's parameter block.
pub const CONTEXT_ALLOC: &str = "gd_builtin_alloc_context";
/// Runtime symbol that releases a distribution's parameter block.
pub const CONTEXT_FREE: &str = "gd_builtin_free_context";

pub(crate) fn register_standard_types(registry: &mut TypeRegistry) {
    let numeric = TypeFlags::ARITHMETIC | TypeFlags::COMPARABLE;
    let vector = TypeFlags::ARITHMETIC | TypeFlags::DIFFERENTIABLE;

    let standard = [
        Type::new("int", "i", TypeKind::Int, 4).with_flags(numeric),
        Type::new("float", "f", TypeKind::Float, 4)
            .with_flags(numeric | TypeFlags::DIFFERENTIABLE),
        Type::new("string", "s", TypeKind::String, 16).with_lifecycle(Lifecycle::Managed {
            copy: STRING_COPY,
            destroy: STRING_DESTROY,
        }),
        Type::new("vec2", "v2", TypeKind::Vector { arity: 2 }, 8).with_flags(vector),
        Type::new("vec3", "v3", TypeKind::Vector { arity: 3 }, 12).with_flags(vector),
        Type::new("vec4", "v4", TypeKind::Vector { arity: 4 }, 16).with_flags(vector),
        Type::new("scene_ptr", "scene", TypeKind::Opaque, 8).with_flags(TypeFlags::OPAQUE),
        Type::new("ray", "ray", TypeKind::Opaque, 32).with_flags(TypeFlags::OPAQUE),
        Type::new("isect", "isect", TypeKind::Opaque, 48).with_flags(TypeFlags::OPAQUE),
        Type::new("light", "light", TypeKind::Opaque, 8).with_flags(TypeFlags::OPAQUE),
        Type::new("dfunc", "dfunc", TypeKind::Opaque, 8).with_flags(TypeFlags::OPAQUE),
        Type::new("context_ptr", "ctx", TypeKind::Opaque, 8).with_flags(TypeFlags::OPAQUE),
        Type::new("module", "mod", TypeKind::Module, 0).with_flags(TypeFlags::NO_DEFAULT),
    ];

    for ty in standard {
        let name = ty.name().to_string();
        if registry.register(ty).is_err() {
            tracing::debug!(%name, "standard type already registered");
        }
    }
}

/// The read-only tables consulted during compilation.
#[derive(Debug, Default)]
pub struct Builtins {
    pub types: TypeRegistry,
    pub conversions: ConversionTable,
    pub binary: BinaryOpTable,
    pub unary: UnaryOpTable,
}

impl Builtins {
    /// Only `void` and `bool`, no conversions and no operators.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The full standard prelude.
    pub fn standard() -> Self {
        let types = TypeRegistry::with_standard_types();
        let mut builtins = Builtins {
            types,
            ..Default::default()
        };
        builtins.install_standard_conversions();
        builtins.install_standard_operators();
        tracing::debug!(
            types = builtins.types.len(),
            conversions = builtins.conversions.len(),
            "built standard prelude"
        );
        builtins
    }

    fn named(&self, name: &str) -> Option<TypeSpec> {
        self.types.get(name)
    }

    fn install_standard_conversions(&mut self) {
        if let (Some(int), Some(float)) = (self.named("int"), self.named("float")) {
            self.conversions.add(&int, &float, 1, 1);
            self.conversions.add(&float, &int, 1, 2);
        }
    }

    fn install_standard_operators(&mut self) {
        let boolean = self.types.bool();

        for (name, suffix) in [("int", "i"), ("float", "f")] {
            let Some(ty) = self.named(name) else { continue };
            let arithmetic: [(BinaryOp, &'static str); 4] = match suffix {
                "i" => [
                    (BinaryOp::Add, "add.i"),
                    (BinaryOp::Sub, "sub.i"),
                    (BinaryOp::Mul, "mul.i"),
                    (BinaryOp::Div, "div.i"),
                ],
                _ => [
                    (BinaryOp::Add, "add.f"),
                    (BinaryOp::Sub, "sub.f"),
                    (BinaryOp::Mul, "mul.f"),
                    (BinaryOp::Div, "div.f"),
                ],
            };
            for (op, instr) in arithmetic {
                self.binary.add(op, &ty, &ty, &ty, OpLowering::Instruction(instr));
            }

            let comparisons: [(BinaryOp, &'static str); 6] = match suffix {
                "i" => [
                    (BinaryOp::Less, "cmp.lt.i"),
                    (BinaryOp::LessEqual, "cmp.le.i"),
                    (BinaryOp::Greater, "cmp.gt.i"),
                    (BinaryOp::GreaterEqual, "cmp.ge.i"),
                    (BinaryOp::Equal, "cmp.eq.i"),
                    (BinaryOp::NotEqual, "cmp.ne.i"),
                ],
                _ => [
                    (BinaryOp::Less, "cmp.lt.f"),
                    (BinaryOp::LessEqual, "cmp.le.f"),
                    (BinaryOp::Greater, "cmp.gt.f"),
                    (BinaryOp::GreaterEqual, "cmp.ge.f"),
                    (BinaryOp::Equal, "cmp.eq.f"),
                    (BinaryOp::NotEqual, "cmp.ne.f"),
                ],
            };
            for (op, instr) in comparisons {
                self.binary
                    .add(op, &ty, &ty, &boolean, OpLowering::Instruction(instr));
            }

            let neg = if suffix == "i" { "neg.i" } else { "neg.f" };
            self.unary
                .add(UnaryOp::Neg, &ty, &ty, OpLowering::Instruction(neg));
        }

        for (op, instr) in [
            (BinaryOp::And, "and.b"),
            (BinaryOp::Or, "or.b"),
            (BinaryOp::Equal, "cmp.eq.b"),
            (BinaryOp::NotEqual, "cmp.ne.b"),
        ] {
            self.binary
                .add(op, &boolean, &boolean, &boolean, OpLowering::Instruction(instr));
        }
        self.unary.add(
            UnaryOp::Not,
            &boolean,
            &boolean,
            OpLowering::Instruction("not.b"),
        );

        let float = self.named("float");
        let vectors: [(&str, [&'static str; 7]); 3] = [
            (
                "vec2",
                [
                    "gd_builtin_add_v2",
                    "gd_builtin_sub_v2",
                    "gd_builtin_mul_v2",
                    "gd_builtin_div_v2",
                    "gd_builtin_scale_v2",
                    "gd_builtin_inv_scale_v2",
                    "gd_builtin_neg_v2",
                ],
            ),
            (
                "vec3",
                [
                    "gd_builtin_add_v3",
                    "gd_builtin_sub_v3",
                    "gd_builtin_mul_v3",
                    "gd_builtin_div_v3",
                    "gd_builtin_scale_v3",
                    "gd_builtin_inv_scale_v3",
                    "gd_builtin_neg_v3",
                ],
            ),
            (
                "vec4",
                [
                    "gd_builtin_add_v4",
                    "gd_builtin_sub_v4",
                    "gd_builtin_mul_v4",
                    "gd_builtin_div_v4",
                    "gd_builtin_scale_v4",
                    "gd_builtin_inv_scale_v4",
                    "gd_builtin_neg_v4",
                ],
            ),
        ];
        for (name, [add, sub, mul, div, scale, inv_scale, neg]) in vectors {
            let Some(v) = self.named(name) else { continue };
            for (op, symbol) in [
                (BinaryOp::Add, add),
                (BinaryOp::Sub, sub),
                (BinaryOp::Mul, mul),
                (BinaryOp::Div, div),
            ] {
                self.binary.add(op, &v, &v, &v, OpLowering::Runtime(symbol));
            }
            if let Some(float) = &float {
                self.binary
                    .add(BinaryOp::Mul, &v, float, &v, OpLowering::Runtime(scale));
                self.binary
                    .add(BinaryOp::Div, &v, float, &v, OpLowering::Runtime(inv_scale));
            }
            self.unary
                .add(UnaryOp::Neg, &v, &v, OpLowering::Runtime(neg));
        }

        if let Some(string) = self.named("string") {
            self.binary.add(
                BinaryOp::Add,
                &string,
                &string,
                &string,
                OpLowering::Runtime(STRING_CONCAT),
            );
        }
    }
}
