//! The type registry.
//!
//! Named types are registered up front. Array and array-reference types are
//! derived on demand and interned so that `float[4]` requested twice yields
//! the same handle. Interning goes through a lock, so a finished registry can
//! be shared by reference between threads compiling separate units.

use std::sync::{PoisonError, RwLock};

use rustc_hash::FxHashMap;
use shadel_core::{CompilationError, Span, SymbolKind};

use crate::type_def::{Lifecycle, Type, TypeFlags, TypeKind, TypeSpec};

type Result<T> = std::result::Result<T, CompilationError>;

/// Size in bytes of an array reference: a 32-bit length plus a pointer.
pub const ARRAY_REF_SIZE: u32 = 16;

/// A field reachable through `value.name`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Position of the field inside the value.
    pub index: u32,
    pub ty: TypeSpec,
    /// Whether the field may be assigned.
    pub writable: bool,
}

/// Owns every type of a compilation.
#[derive(Debug)]
pub struct TypeRegistry {
    named: FxHashMap<String, TypeSpec>,
    arrays: RwLock<FxHashMap<(TypeSpec, u32), TypeSpec>>,
    array_refs: RwLock<FxHashMap<TypeSpec, TypeSpec>>,
    void: TypeSpec,
    boolean: TypeSpec,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry holding only `void` and `bool`, which control flow needs.
    pub fn new() -> Self {
        let void = TypeSpec::new(Type::new("void", "v", TypeKind::Void, 0));
        let boolean = TypeSpec::new(Type::new("bool", "b", TypeKind::Bool, 1));
        let mut named = FxHashMap::default();
        named.insert("void".to_string(), void.clone());
        named.insert("bool".to_string(), boolean.clone());
        Self {
            named,
            arrays: RwLock::new(FxHashMap::default()),
            array_refs: RwLock::new(FxHashMap::default()),
            void,
            boolean,
        }
    }

    /// A registry with the full standard prelude.
    pub fn with_standard_types() -> Self {
        let mut registry = Self::new();
        crate::builtins::register_standard_types(&mut registry);
        registry
    }

    /// Register a named type.
    pub fn register(&mut self, ty: Type) -> Result<TypeSpec> {
        if self.named.contains_key(ty.name()) {
            return Err(CompilationError::InvalidRedeclaration {
                kind: SymbolKind::Type,
                name: ty.name().to_string(),
                reason: "type is already registered".to_string(),
                span: Span::UNKNOWN,
            });
        }
        let spec = TypeSpec::new(ty);
        self.named.insert(spec.name().to_string(), spec.clone());
        Ok(spec)
    }

    pub fn get(&self, name: &str) -> Option<TypeSpec> {
        self.named.get(name).cloned()
    }

    /// Look up a named type, failing with "undeclared type".
    pub fn lookup(&self, name: &str, span: Span) -> Result<TypeSpec> {
        self.get(name)
            .ok_or_else(|| CompilationError::undefined(SymbolKind::Type, name, span))
    }

    pub fn void(&self) -> TypeSpec {
        self.void.clone()
    }

    pub fn bool(&self) -> TypeSpec {
        self.boolean.clone()
    }

    /// Number of named types.
    pub fn len(&self) -> usize {
        self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    /// The interned `element[length]` type.
    pub fn array_of(&self, element: &TypeSpec, length: u32) -> TypeSpec {
        let key = (element.clone(), length);
        if let Some(found) = self
            .arrays
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return found.clone();
        }

        let mut arrays = self.arrays.write().unwrap_or_else(PoisonError::into_inner);
        arrays
            .entry(key)
            .or_insert_with(|| {
                let lifecycle = if element.needs_destroy() {
                    Lifecycle::ElementWise
                } else {
                    Lifecycle::Trivial
                };
                TypeSpec::new(
                    Type::new(
                        format!("{}[{}]", element.name(), length),
                        format!("{}[{}]", element.code(), length),
                        TypeKind::Array {
                            element: element.clone(),
                            length,
                        },
                        element.size().saturating_mul(length),
                    )
                    .with_flags(TypeFlags::INDEXABLE)
                    .with_lifecycle(lifecycle),
                )
            })
            .clone()
    }

    /// The interned `element[]` type.
    pub fn array_ref(&self, element: &TypeSpec) -> TypeSpec {
        if let Some(found) = self
            .array_refs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(element)
        {
            return found.clone();
        }

        let mut refs = self
            .array_refs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        refs.entry(element.clone())
            .or_insert_with(|| {
                TypeSpec::new(
                    Type::new(
                        format!("{}[]", element.name()),
                        format!("{}[]", element.code()),
                        TypeKind::ArrayRef {
                            element: element.clone(),
                        },
                        ARRAY_REF_SIZE,
                    )
                    .with_flags(TypeFlags::INDEXABLE | TypeFlags::NO_DEFAULT),
                )
            })
            .clone()
    }

    /// Resolve `value.name` on a value of type `ty`.
    pub fn field(&self, ty: &TypeSpec, name: &str) -> Option<FieldInfo> {
        match ty.kind() {
            TypeKind::Vector { arity } => {
                let index = match name {
                    "x" => 0,
                    "y" => 1,
                    "z" => 2,
                    "w" => 3,
                    _ => return None,
                };
                if index >= u32::from(*arity) {
                    return None;
                }
                Some(FieldInfo {
                    index,
                    ty: self.get("float")?,
                    writable: true,
                })
            }
            TypeKind::Array { .. } | TypeKind::ArrayRef { .. } if name == "length" => {
                Some(FieldInfo {
                    index: 0,
                    ty: self.get("int")?,
                    writable: false,
                })
            }
            _ => None,
        }
    }
}
