//! Type definitions and the identity-compared [`TypeSpec`] handle.
//!
//! Every distinct type exists exactly once, owned by the
//! [`TypeRegistry`](crate::TypeRegistry). Resolution code only ever compares
//! handles, and handle equality is pointer equality: two types with the same
//! shape but different registrations are different types.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use bitflags::bitflags;

bitflags! {
    /// Capabilities of a type that operator and field lookup consult.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeFlags: u16 {
        /// Supports `+ - * /`.
        const ARITHMETIC = 1 << 0;
        /// Supports ordering comparisons.
        const COMPARABLE = 1 << 1;
        /// Carries derivative information for shading differentials.
        const DIFFERENTIABLE = 1 << 2;
        /// A runtime handle with no visible structure.
        const OPAQUE = 1 << 3;
        /// Supports `a[i]` and `.length`.
        const INDEXABLE = 1 << 4;
        /// Cannot be declared without an initializer.
        const NO_DEFAULT = 1 << 5;
    }
}

/// How values of a type are initialized, copied and destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Plain bits: copying is a store, destruction is a no-op.
    Trivial,
    /// Owned by the runtime; copy and destroy go through builtin calls.
    Managed {
        copy: &'static str,
        destroy: &'static str,
    },
    /// An array of managed elements, destroyed one element at a time.
    ElementWise,
}

/// The structural category of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Bool,
    Int,
    Float,
    String,
    /// `vec2`..`vec4`, components are `float`.
    Vector { arity: u8 },
    /// `T[N]`
    Array { element: TypeSpec, length: u32 },
    /// `T[]`, a `{length, data}` view of some array.
    ArrayRef { element: TypeSpec },
    /// A runtime handle such as `ray` or `light`.
    Opaque,
    /// The type of a module name used as a value.
    Module,
}

/// A registered type.
#[derive(Debug)]
pub struct Type {
    name: String,
    code: String,
    kind: TypeKind,
    size: u32,
    flags: TypeFlags,
    lifecycle: Lifecycle,
}

impl Type {
    /// A trivial type with no flags.
    pub fn new(name: impl Into<String>, code: impl Into<String>, kind: TypeKind, size: u32) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            kind,
            size,
            flags: TypeFlags::empty(),
            lifecycle: Lifecycle::Trivial,
        }
    }

    pub fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// The source-level name (`vec3`, `float[4]`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The short code used inside mangled names (`v3`, `f[4]`).
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Storage size in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    /// Whether leaving a scope must emit a destructor for values of this type.
    pub fn needs_destroy(&self) -> bool {
        !matches!(self.lifecycle, Lifecycle::Trivial)
    }

    /// Whether a declaration without initializer is allowed.
    pub fn has_default(&self) -> bool {
        !self.is_void() && !self.flags.contains(TypeFlags::NO_DEFAULT)
    }

    /// Element type of arrays and array references.
    pub fn element(&self) -> Option<&TypeSpec> {
        match &self.kind {
            TypeKind::Array { element, .. } | TypeKind::ArrayRef { element } => Some(element),
            _ => None,
        }
    }

    /// Static length of a fixed-size array.
    pub fn array_length(&self) -> Option<u32> {
        match &self.kind {
            TypeKind::Array { length, .. } => Some(*length),
            _ => None,
        }
    }

    pub fn vector_arity(&self) -> Option<u8> {
        match &self.kind {
            TypeKind::Vector { arity } => Some(*arity),
            _ => None,
        }
    }
}

/// A shared handle to a registered [`Type`].
///
/// Cloning is cheap. Equality and hashing use the handle's identity, never
/// the type's structure.
#[derive(Clone)]
pub struct TypeSpec(Arc<Type>);

impl TypeSpec {
    pub(crate) fn new(ty: Type) -> Self {
        TypeSpec(Arc::new(ty))
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for TypeSpec {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeSpec {}

impl Hash for TypeSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl Deref for TypeSpec {
    type Target = Type;

    fn deref(&self) -> &Type {
        &self.0
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeSpec({})", self.0.name)
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Render a list of types as `'int', 'float'` for error messages.
pub fn quote_types<'a>(types: impl IntoIterator<Item = &'a TypeSpec>) -> String {
    types
        .into_iter()
        .map(|t| format!("'{}'", t.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_not_structure() {
        let a = TypeSpec::new(Type::new("int", "i", TypeKind::Int, 4));
        let b = TypeSpec::new(Type::new("int", "i", TypeKind::Int, 4));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn lifecycle_drives_destruction() {
        let managed = Type::new("string", "s", TypeKind::String, 16).with_lifecycle(
            Lifecycle::Managed {
                copy: "copy_fn",
                destroy: "destroy_fn",
            },
        );
        let plain = Type::new("float", "f", TypeKind::Float, 4);
        assert!(managed.needs_destroy());
        assert!(!plain.needs_destroy());
    }

    #[test]
    fn array_accessors() {
        let float = TypeSpec::new(Type::new("float", "f", TypeKind::Float, 4));
        let arr = Type::new(
            "float[3]",
            "f[3]",
            TypeKind::Array {
                element: float.clone(),
                length: 3,
            },
            12,
        );
        assert_eq!(arr.element(), Some(&float));
        assert_eq!(arr.array_length(), Some(3));
        assert_eq!(arr.vector_arity(), None);
    }

    #[test]
    fn quoting() {
        let a = TypeSpec::new(Type::new("int", "i", TypeKind::Int, 4));
        let b = TypeSpec::new(Type::new("vec3", "v3", TypeKind::Vector { arity: 3 }, 12));
        assert_eq!(quote_types([&a, &b]), "'int', 'vec3'");
    }
}
