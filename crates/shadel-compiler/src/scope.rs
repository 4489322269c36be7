//! Scoped symbol tables.
//!
//! A [`ScopedSymbolTable`] is a stack of [`Scope`]s, each a name to entry
//! map. Lookup walks from the innermost scope outwards; insertion always
//! targets the innermost scope. The same structure backs variables,
//! function overload sets and user types.
//!
//! Entries can ask to be destroyed when their scope is left. Destruction
//! order among the entries of one scope follows map iteration order and is
//! unspecified.

use rustc_hash::FxHashMap;
use shadel_core::{CompilationError, Span, SymbolKind};

use crate::backend::Backend;

type Result<T> = std::result::Result<T, CompilationError>;

// ============================================================================
// Entries
// ============================================================================

/// Something stored in a scope.
pub trait SymbolEntry {
    /// What a failed lookup reports as undeclared.
    const KIND: SymbolKind;

    /// Whether leaving the owning scope must emit a destructor.
    fn destroy_on_scope_exit(&self) -> bool {
        false
    }

    /// Emit the destructor, returning how many destructor calls were emitted.
    fn emit_destroy(&self, _backend: &mut dyn Backend) -> usize {
        0
    }
}

// ============================================================================
// Scope
// ============================================================================

/// One lexical scope.
#[derive(Debug, Clone)]
pub struct Scope<E> {
    name: String,
    entries: FxHashMap<String, E>,
}

impl<E> Default for Scope<E> {
    fn default() -> Self {
        Self::new("")
    }
}

impl<E> Scope<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&E> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut E> {
        self.entries.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: E) -> Option<E> {
        self.entries.insert(name.into(), entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &E)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: SymbolEntry> Scope<E> {
    /// Emit destructors for every entry flagged for destruction.
    pub fn destroy(&self, backend: &mut dyn Backend) -> usize {
        self.entries
            .values()
            .filter(|e| e.destroy_on_scope_exit())
            .map(|e| e.emit_destroy(backend))
            .sum()
    }
}

// ============================================================================
// ScopedSymbolTable
// ============================================================================

/// A stack of scopes.
#[derive(Debug, Clone)]
pub struct ScopedSymbolTable<E> {
    scopes: Vec<Scope<E>>,
}

impl<E> Default for ScopedSymbolTable<E> {
    fn default() -> Self {
        Self { scopes: Vec::new() }
    }
}

impl<E: SymbolEntry> ScopedSymbolTable<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Open a new innermost scope.
    pub fn push(&mut self, name: impl Into<String>) {
        let name = name.into();
        tracing::trace!(kind = %E::KIND, scope = %name, depth = self.scopes.len() + 1, "push scope");
        self.scopes.push(Scope::new(name));
    }

    /// Close the innermost scope, optionally emitting its destructors first.
    pub fn pop(&mut self, emit_destructors: bool, backend: &mut dyn Backend) -> Result<Scope<E>> {
        let scope = self.scopes.pop().ok_or_else(|| {
            CompilationError::internal(format!("pop on an empty {} table", E::KIND))
        })?;
        let destroyed = if emit_destructors {
            scope.destroy(backend)
        } else {
            0
        };
        tracing::trace!(
            kind = %E::KIND,
            scope = %scope.name,
            depth = self.scopes.len(),
            destroyed,
            "pop scope"
        );
        Ok(scope)
    }

    /// Close the innermost scope without emitting anything.
    pub fn take(&mut self) -> Result<Scope<E>> {
        self.scopes.pop().ok_or_else(|| {
            CompilationError::internal(format!("pop on an empty {} table", E::KIND))
        })
    }

    /// Emit destructors for every scope above `depth`, innermost first,
    /// without closing them. Used on control transfers out of nested scopes.
    pub fn destroy_above(&self, depth: usize, backend: &mut dyn Backend) -> usize {
        self.scopes
            .iter()
            .skip(depth)
            .rev()
            .map(|scope| scope.destroy(backend))
            .sum()
    }

    /// Look a name up innermost-first.
    pub fn find(&self, name: &str) -> Option<&E> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    /// Look a name up innermost-first, failing with "undeclared <kind>".
    pub fn get(&self, name: &str, span: Span) -> Result<&E> {
        self.find(name)
            .ok_or_else(|| CompilationError::undefined(E::KIND, name, span))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut E> {
        self.scopes.iter_mut().rev().find_map(|s| s.get_mut(name))
    }

    /// Whether any open scope binds `name`.
    pub fn has_key(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Whether the innermost scope binds `name`.
    pub fn has_local(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|s| s.contains(name))
    }

    /// The innermost scope's entry for `name`.
    pub fn local(&self, name: &str) -> Option<&E> {
        self.scopes.last().and_then(|s| s.get(name))
    }

    pub fn local_mut(&mut self, name: &str) -> Option<&mut E> {
        self.scopes.last_mut().and_then(|s| s.get_mut(name))
    }

    /// Insert or overwrite `name` in the innermost scope.
    pub fn set(&mut self, name: impl Into<String>, entry: E) -> Result<()> {
        let scope = self.scopes.last_mut().ok_or_else(|| {
            CompilationError::internal(format!("set on an empty {} table", E::KIND))
        })?;
        scope.insert(name, entry);
        Ok(())
    }

    /// Open scopes, innermost first.
    pub fn scopes(&self) -> impl Iterator<Item = &Scope<E>> {
        self.scopes.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FunctionAbi, RecordingBackend};
    use shadel_types::TypeRegistry;

    #[derive(Debug, Clone, PartialEq)]
    struct Probe {
        value: i32,
        destroy: bool,
    }

    impl SymbolEntry for Probe {
        const KIND: SymbolKind = SymbolKind::Variable;

        fn destroy_on_scope_exit(&self) -> bool {
            self.destroy
        }

        fn emit_destroy(&self, backend: &mut dyn Backend) -> usize {
            let v = backend.const_int(i64::from(self.value));
            backend.call("destroy", &[v]);
            1
        }
    }

    fn subject(value: i32, destroy: bool) -> Probe {
        Probe { value, destroy }
    }

    fn backend() -> RecordingBackend {
        let registry = TypeRegistry::new();
        let mut backend = RecordingBackend::new();
        let f = backend.declare_function(
            "f",
            &FunctionAbi {
                params: Vec::new(),
                ret: registry.void(),
            },
        );
        backend.begin_function(f);
        backend
    }

    #[test]
    fn lookup_is_innermost_first() {
        let mut table = ScopedSymbolTable::new();
        table.push("outer");
        table.set("x", subject(1, false)).unwrap();
        table.push("inner");
        table.set("x", subject(2, false)).unwrap();

        assert_eq!(table.get("x", Span::UNKNOWN).unwrap().value, 2);
        assert!(table.has_local("x"));

        let mut backend = backend();
        table.pop(true, &mut backend).unwrap();
        assert_eq!(table.get("x", Span::UNKNOWN).unwrap().value, 1);
    }

    #[test]
    fn missing_name_is_undeclared() {
        let mut table: ScopedSymbolTable<Probe> = ScopedSymbolTable::new();
        table.push("global");
        let err = table.get("albedo", Span::new(4, 2)).unwrap_err();
        assert_eq!(err.to_string(), "at 4:2: undeclared variable 'albedo'");
        assert!(!table.has_key("albedo"));
    }

    #[test]
    fn set_targets_innermost_scope() {
        let mut table = ScopedSymbolTable::new();
        table.push("outer");
        table.push("inner");
        table.set("y", subject(1, false)).unwrap();
        assert!(table.has_local("y"));

        let mut backend = backend();
        table.pop(false, &mut backend).unwrap();
        assert!(!table.has_key("y"));
    }

    #[test]
    fn pop_emits_one_destructor_per_flagged_entry() {
        let mut table = ScopedSymbolTable::new();
        table.push("block");
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            table.set(*name, subject(i as i32, i != 3)).unwrap();
        }

        let mut backend = backend();
        table.pop(true, &mut backend).unwrap();
        assert_eq!(backend.calls_in("f", "destroy"), 3);
    }

    #[test]
    fn pop_without_destructors_emits_nothing() {
        let mut table = ScopedSymbolTable::new();
        table.push("block");
        table.set("a", subject(0, true)).unwrap();

        let mut backend = backend();
        table.pop(false, &mut backend).unwrap();
        assert_eq!(backend.calls_in("f", "destroy"), 0);
    }

    #[test]
    fn destroy_above_leaves_scopes_open() {
        let mut table = ScopedSymbolTable::new();
        table.push("function");
        table.set("a", subject(0, true)).unwrap();
        table.push("loop");
        table.set("b", subject(1, true)).unwrap();
        table.push("body");
        table.set("c", subject(2, true)).unwrap();

        let mut backend = backend();
        assert_eq!(table.destroy_above(1, &mut backend), 2);
        assert_eq!(table.depth(), 3);
        assert_eq!(table.destroy_above(0, &mut backend), 3);
    }

    #[test]
    fn pop_on_empty_table_is_internal_error() {
        let mut table: ScopedSymbolTable<Probe> = ScopedSymbolTable::new();
        let mut backend = backend();
        let err = table.pop(true, &mut backend).unwrap_err();
        assert!(matches!(err, CompilationError::Internal { .. }));
        assert!(table.set("x", subject(0, false)).is_err());
    }
}
