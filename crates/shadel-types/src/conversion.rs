//! Implicit conversions between types.
//!
//! Each legal conversion `src -> dst` carries two independent costs: one
//! used when binding a function argument, one used when matching operator
//! candidates. Identical types always convert at `(0, 0)`.
//!
//! ## Special Case
//!
//! A fixed array converts to the array reference of the same element type
//! at `(1, 1)` without a table entry. That conversion only exists for
//! argument binding: [`ConversionTable::convert`] refuses it, because
//! building the view needs the array's storage, not its value.

use rustc_hash::FxHashMap;
use shadel_core::{CompilationError, Span};

use crate::type_def::{TypeKind, TypeSpec};

type Result<T> = std::result::Result<T, CompilationError>;

/// How a conversion is lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    /// No code needed.
    Identity,
    /// A backend value cast between primitive types.
    Cast,
    /// Build a `{length, data}` view from array storage.
    ArrayView,
}

/// A legal conversion and its costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub kind: ConversionKind,
    /// Cost when binding a function argument.
    pub arg_cost: u32,
    /// Cost when matching an operator candidate.
    pub op_cost: u32,
}

impl Conversion {
    pub const IDENTITY: Conversion = Conversion {
        kind: ConversionKind::Identity,
        arg_cost: 0,
        op_cost: 0,
    };

    pub const ARRAY_VIEW: Conversion = Conversion {
        kind: ConversionKind::ArrayView,
        arg_cost: 1,
        op_cost: 1,
    };

    pub fn is_identity(&self) -> bool {
        self.kind == ConversionKind::Identity
    }
}

/// The table of registered conversions.
#[derive(Debug, Default)]
pub struct ConversionTable {
    entries: FxHashMap<(TypeSpec, TypeSpec), Conversion>,
}

impl ConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a cast conversion `src -> dst`.
    pub fn add(&mut self, src: &TypeSpec, dst: &TypeSpec, arg_cost: u32, op_cost: u32) {
        self.entries.insert(
            (src.clone(), dst.clone()),
            Conversion {
                kind: ConversionKind::Cast,
                arg_cost,
                op_cost,
            },
        );
    }

    /// Whether `src` converts to `dst`, and at what cost.
    pub fn can_convert(&self, src: &TypeSpec, dst: &TypeSpec) -> Option<Conversion> {
        if src == dst {
            return Some(Conversion::IDENTITY);
        }
        if let Some(conversion) = self.entries.get(&(src.clone(), dst.clone())) {
            return Some(*conversion);
        }
        match (src.kind(), dst.kind()) {
            (
                TypeKind::Array { element: from, .. },
                TypeKind::ArrayRef { element: to },
            ) if from == to => Some(Conversion::ARRAY_VIEW),
            _ => None,
        }
    }

    /// A value conversion `src -> dst`, or "invalid conversion".
    pub fn convert(&self, src: &TypeSpec, dst: &TypeSpec, span: Span) -> Result<Conversion> {
        match self.can_convert(src, dst) {
            Some(conversion) if conversion.kind != ConversionKind::ArrayView => Ok(conversion),
            _ => Err(CompilationError::InvalidConversion {
                from: src.name().to_string(),
                to: dst.name().to_string(),
                span,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeRegistry;

    fn numeric() -> (TypeRegistry, ConversionTable) {
        let registry = TypeRegistry::with_standard_types();
        let mut table = ConversionTable::new();
        let int = registry.get("int").unwrap();
        let float = registry.get("float").unwrap();
        table.add(&int, &float, 1, 1);
        table.add(&float, &int, 1, 2);
        (registry, table)
    }

    #[test]
    fn identical_types_cost_nothing() {
        let (registry, table) = numeric();
        for name in ["void", "bool", "int", "float", "string", "vec3", "ray"] {
            let ty = registry.get(name).unwrap();
            let conversion = table.can_convert(&ty, &ty).unwrap();
            assert_eq!((conversion.arg_cost, conversion.op_cost), (0, 0), "{name}");
        }
        let arr = registry.array_of(&registry.get("float").unwrap(), 4);
        assert!(table.can_convert(&arr, &arr).unwrap().is_identity());
    }

    #[test]
    fn registered_costs_are_reported() {
        let (registry, table) = numeric();
        let int = registry.get("int").unwrap();
        let float = registry.get("float").unwrap();

        let widen = table.can_convert(&int, &float).unwrap();
        assert_eq!((widen.arg_cost, widen.op_cost), (1, 1));
        let narrow = table.can_convert(&float, &int).unwrap();
        assert_eq!((narrow.arg_cost, narrow.op_cost), (1, 2));
    }

    #[test]
    fn unrelated_types_do_not_convert() {
        let (registry, table) = numeric();
        let vec3 = registry.get("vec3").unwrap();
        let float = registry.get("float").unwrap();
        assert!(table.can_convert(&vec3, &float).is_none());

        let err = table.convert(&vec3, &float, Span::new(2, 2)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 2:2: invalid conversion from 'vec3' to 'float'"
        );
    }

    #[test]
    fn array_to_reference_only_binds_arguments() {
        let (registry, table) = numeric();
        let float = registry.get("float").unwrap();
        let int = registry.get("int").unwrap();
        let arr = registry.array_of(&float, 4);
        let view = registry.array_ref(&float);

        assert_eq!(table.can_convert(&arr, &view), Some(Conversion::ARRAY_VIEW));
        assert!(table.can_convert(&arr, &registry.array_ref(&int)).is_none());
        assert!(table.convert(&arr, &view, Span::UNKNOWN).is_err());
    }
}
