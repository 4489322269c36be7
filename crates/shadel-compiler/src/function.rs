//! Function entries, overload sets and call resolution.
//!
//! ## Resolution
//!
//! 1. Keep candidates whose arity matches the call.
//! 2. An output parameter needs an assignable argument of exactly the
//!    parameter's type; output parameters never convert.
//! 3. Every input argument must convert to its parameter type.
//! 4. Viable candidates are scored by summed argument-binding cost; the
//!    unique cheapest wins, a tie is ambiguous.

use std::fmt;

use shadel_core::{CompilationError, Span, SymbolKind};
use shadel_types::{Conversion, ConversionTable, Ranking, TypeSpec, quote_types, rank, total_cost};

use crate::backend::{FunctionAbi, ParamAbi};
use crate::scope::SymbolEntry;

type Result<T> = std::result::Result<T, CompilationError>;

// ============================================================================
// Entries
// ============================================================================

/// A declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeSpec,
    /// Output parameters bind the caller's storage.
    pub output: bool,
}

/// Identity of a function: name plus ordered parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionKey {
    pub name: String,
    pub params: Vec<TypeSpec>,
}

/// A declared function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionEntry {
    pub name: String,
    pub return_type: TypeSpec,
    pub params: Vec<Parameter>,
    /// Provided by the runtime under `symbol`; cannot raise runtime errors.
    pub external: bool,
    /// Receives the enclosing distribution's context as a hidden first argument.
    pub member: bool,
    /// The backend callable.
    pub symbol: String,
    /// Whether a body has been lowered.
    pub defined: bool,
    pub span: Span,
}

impl FunctionEntry {
    pub fn key(&self) -> FunctionKey {
        FunctionKey {
            name: self.name.clone(),
            params: self.param_types(),
        }
    }

    pub fn param_types(&self) -> Vec<TypeSpec> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }

    /// Calls to script functions may unwind with a runtime error.
    pub fn may_throw(&self) -> bool {
        !self.external
    }

    /// The calling convention, with the hidden context parameter for members.
    pub fn abi(&self, context: Option<&TypeSpec>) -> FunctionAbi {
        let hidden = context.filter(|_| self.member).map(|ty| ParamAbi {
            ty: ty.clone(),
            by_ref: false,
        });
        FunctionAbi {
            params: hidden
                .into_iter()
                .chain(self.params.iter().map(|p| ParamAbi {
                    ty: p.ty.clone(),
                    by_ref: p.output,
                }))
                .collect(),
            ret: self.return_type.clone(),
        }
    }
}

impl fmt::Display for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if p.output {
                write!(f, "out ")?;
            }
            write!(f, "{}", p.ty)?;
        }
        write!(f, ")")
    }
}

// ============================================================================
// Overload sets
// ============================================================================

/// Every function declared under one name in one scope.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionOverloadSet {
    name: String,
    entries: Vec<FunctionEntry>,
}

impl SymbolEntry for FunctionOverloadSet {
    const KIND: SymbolKind = SymbolKind::Function;
}

impl FunctionOverloadSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[FunctionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &FunctionKey) -> Option<&FunctionEntry> {
        self.entries
            .iter()
            .find(|e| e.name == key.name && e.param_types() == key.params)
    }

    pub fn get_mut(&mut self, key: &FunctionKey) -> Option<&mut FunctionEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.name == key.name && e.param_types() == key.params)
    }

    /// Declare `entry`.
    ///
    /// Redeclaring an existing key is idempotent when the return type,
    /// output flags and linkage all match, and yields the existing entry.
    pub fn declare(&mut self, entry: FunctionEntry) -> Result<&FunctionEntry> {
        let key = entry.key();
        let Some(index) = self
            .entries
            .iter()
            .position(|e| e.name == key.name && e.param_types() == key.params)
        else {
            self.entries.push(entry);
            return self
                .entries
                .last()
                .ok_or_else(|| CompilationError::internal("overload set lost a pushed entry"));
        };

        let existing = &self.entries[index];
        let redeclaration = |reason: String| CompilationError::InvalidRedeclaration {
            kind: SymbolKind::Function,
            name: entry.name.clone(),
            reason,
            span: entry.span,
        };

        if existing.return_type != entry.return_type {
            return Err(redeclaration(format!(
                "return type '{}' differs from previous declaration '{}'",
                entry.return_type, existing.return_type
            )));
        }
        let outputs = |e: &FunctionEntry| e.params.iter().map(|p| p.output).collect::<Vec<_>>();
        if outputs(existing) != outputs(&entry) {
            return Err(redeclaration(
                "output parameters differ from previous declaration".to_string(),
            ));
        }
        if existing.external != entry.external {
            let previous = if existing.external { "external" } else { "local" };
            return Err(redeclaration(format!("previously declared as {previous}")));
        }
        if existing.external && existing.symbol != entry.symbol {
            return Err(redeclaration(format!(
                "external symbol '{}' differs from previous '{}'",
                entry.symbol, existing.symbol
            )));
        }
        if existing.member != entry.member {
            return Err(redeclaration(
                "member linkage differs from previous declaration".to_string(),
            ));
        }
        Ok(&self.entries[index])
    }
}

// ============================================================================
// Call resolution
// ============================================================================

/// Static information about one call argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgInfo {
    pub ty: TypeSpec,
    /// Whether the argument names storage.
    pub lvalue: bool,
}

/// A resolved call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCall {
    pub entry: FunctionEntry,
    /// One conversion per argument.
    pub conversions: Vec<Conversion>,
}

fn bind(
    candidate: &FunctionEntry,
    args: &[ArgInfo],
    conversions: &ConversionTable,
) -> Option<(u32, Vec<Conversion>)> {
    if candidate.params.len() != args.len() {
        return None;
    }
    let bound: Vec<Option<Conversion>> = candidate
        .params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            if param.output {
                (arg.lvalue && arg.ty == param.ty).then_some(Conversion::IDENTITY)
            } else {
                conversions.can_convert(&arg.ty, &param.ty)
            }
        })
        .collect();
    let cost = total_cost(bound.iter().map(|c| c.map(|c| c.arg_cost)))?;
    Some((cost, bound.into_iter().flatten().collect()))
}

/// Resolve a call to `name` among `candidates`.
pub fn resolve_call<'e>(
    name: &str,
    candidates: impl IntoIterator<Item = &'e FunctionEntry>,
    args: &[ArgInfo],
    conversions: &ConversionTable,
    span: Span,
) -> Result<ResolvedCall> {
    let scored = candidates.into_iter().filter_map(|candidate| {
        let (cost, conversions) = bind(candidate, args, conversions)?;
        Some((cost, (candidate, conversions)))
    });

    match rank(scored) {
        Ranking::Unique((entry, conversions)) => {
            tracing::trace!(function = %name, symbol = %entry.symbol, "resolved call");
            Ok(ResolvedCall {
                entry: entry.clone(),
                conversions,
            })
        }
        Ranking::NoViable => Err(CompilationError::NoMatchingFunction {
            name: name.to_string(),
            args: quote_types(args.iter().map(|a| &a.ty)),
            span,
        }),
        Ranking::Ambiguous(tied) => {
            let mut names: Vec<String> = tied.iter().map(|(e, _)| format!("'{e}'")).collect();
            names.sort();
            Err(CompilationError::AmbiguousCall {
                name: name.to_string(),
                candidates: names.join(" or "),
                span,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadel_types::{Builtins, ConversionKind};

    fn param(name: &str, ty: &TypeSpec, output: bool) -> Parameter {
        Parameter {
            name: name.to_string(),
            ty: ty.clone(),
            output,
        }
    }

    fn entry(name: &str, ret: &TypeSpec, params: Vec<Parameter>) -> FunctionEntry {
        FunctionEntry {
            name: name.to_string(),
            return_type: ret.clone(),
            params,
            external: false,
            member: false,
            symbol: format!("main.{name}"),
            defined: false,
            span: Span::new(1, 1),
        }
    }

    fn arg(ty: &TypeSpec) -> ArgInfo {
        ArgInfo {
            ty: ty.clone(),
            lvalue: false,
        }
    }

    #[test]
    fn identical_redeclaration_is_idempotent() {
        let b = Builtins::standard();
        let float = b.types.get("float").unwrap();
        let mut set = FunctionOverloadSet::new("f");

        set.declare(entry("f", &float, vec![param("x", &float, false)]))
            .unwrap();
        let again = set
            .declare(entry("f", &float, vec![param("y", &float, false)]))
            .unwrap();
        assert_eq!(again.params[0].name, "x");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn different_return_type_is_invalid_redeclaration() {
        let b = Builtins::standard();
        let float = b.types.get("float").unwrap();
        let int = b.types.get("int").unwrap();
        let mut set = FunctionOverloadSet::new("f");

        set.declare(entry("f", &float, vec![param("x", &float, false)]))
            .unwrap();
        let err = set
            .declare(entry("f", &int, vec![param("x", &float, false)]))
            .unwrap_err();
        assert!(matches!(err, CompilationError::InvalidRedeclaration { .. }));
        assert!(err.to_string().contains("invalid redeclaration of function 'f'"));
    }

    #[test]
    fn linkage_mismatch_is_invalid_redeclaration() {
        let b = Builtins::standard();
        let float = b.types.get("float").unwrap();
        let mut set = FunctionOverloadSet::new("sqrt");

        let mut external = entry("sqrt", &float, vec![param("x", &float, false)]);
        external.external = true;
        external.symbol = "gd_builtin_sqrt".to_string();
        set.declare(external).unwrap();

        let err = set
            .declare(entry("sqrt", &float, vec![param("x", &float, false)]))
            .unwrap_err();
        assert!(err.to_string().contains("previously declared as external"));
    }

    #[test]
    fn overloads_with_different_params_coexist() {
        let b = Builtins::standard();
        let float = b.types.get("float").unwrap();
        let int = b.types.get("int").unwrap();
        let mut set = FunctionOverloadSet::new("f");
        set.declare(entry("f", &float, vec![param("x", &float, false)]))
            .unwrap();
        set.declare(entry("f", &int, vec![param("x", &int, false)]))
            .unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn int_argument_converts_to_float_parameter() {
        let b = Builtins::standard();
        let float = b.types.get("float").unwrap();
        let int = b.types.get("int").unwrap();
        let f = entry("f", &float, vec![param("x", &float, false)]);

        let resolved = resolve_call("f", [&f], &[arg(&int)], &b.conversions, Span::UNKNOWN).unwrap();
        assert_eq!(resolved.entry.return_type, float);
        assert_eq!(resolved.conversions[0].kind, ConversionKind::Cast);
    }

    #[test]
    fn cheapest_overload_wins() {
        let b = Builtins::standard();
        let float = b.types.get("float").unwrap();
        let int = b.types.get("int").unwrap();
        let f_float = entry("f", &float, vec![param("x", &float, false)]);
        let f_int = entry("f", &int, vec![param("x", &int, false)]);

        let resolved = resolve_call(
            "f",
            [&f_float, &f_int],
            &[arg(&int)],
            &b.conversions,
            Span::UNKNOWN,
        )
        .unwrap();
        assert_eq!(resolved.entry.return_type, int);
    }

    #[test]
    fn equal_argument_costs_are_ambiguous() {
        let b = Builtins::standard();
        let float = b.types.get("float").unwrap();
        let int = b.types.get("int").unwrap();
        let a = entry("g", &float, vec![param("x", &int, false), param("y", &float, false)]);
        let c = entry("g", &float, vec![param("x", &float, false), param("y", &int, false)]);

        let err = resolve_call(
            "g",
            [&a, &c],
            &[arg(&int), arg(&int)],
            &b.conversions,
            Span::UNKNOWN,
        )
        .unwrap_err();
        assert!(matches!(err, CompilationError::AmbiguousCall { .. }));
    }

    #[test]
    fn output_parameters_need_exact_lvalues() {
        let b = Builtins::standard();
        let float = b.types.get("float").unwrap();
        let int = b.types.get("int").unwrap();
        let f = entry("sample", &b.types.void(), vec![param("out", &float, true)]);

        let exact = ArgInfo {
            ty: float.clone(),
            lvalue: true,
        };
        assert!(resolve_call("sample", [&f], &[exact], &b.conversions, Span::UNKNOWN).is_ok());

        let converted = ArgInfo {
            ty: int,
            lvalue: true,
        };
        let err =
            resolve_call("sample", [&f], &[converted], &b.conversions, Span::UNKNOWN).unwrap_err();
        assert!(matches!(err, CompilationError::NoMatchingFunction { .. }));

        let temporary = arg(&float);
        assert!(resolve_call("sample", [&f], &[temporary], &b.conversions, Span::UNKNOWN).is_err());
    }

    #[test]
    fn member_abi_prepends_context() {
        let b = Builtins::standard();
        let float = b.types.get("float").unwrap();
        let ctx = b.types.get("context_ptr").unwrap();
        let mut f = entry("evaluate", &float, vec![param("x", &float, false)]);
        assert_eq!(f.abi(Some(&ctx)).params.len(), 1);
        f.member = true;
        let abi = f.abi(Some(&ctx));
        assert_eq!(abi.params.len(), 2);
        assert_eq!(abi.params[0].ty, ctx);
    }
}
