//! Compiler configuration.
//!
//! Options are addressed through [`CompilerProperty`], one integer value per
//! property, the same way the host sets them through a generic
//! "set property" entry point.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use shadel_core::CompilationError;

/// A tunable compiler property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum CompilerProperty {
    /// Emit destructor calls when variables leave scope (default: 1).
    EmitScopeDestructors = 0,
    /// Report non-void functions that can fall off their end (default: 1).
    RequireReturnPaths = 1,
    /// Cap on errors in the rendered report, 0 for no cap (default: 0).
    MaxReportedErrors = 2,
}

impl CompilerProperty {
    pub fn default_value(&self) -> u64 {
        match self {
            CompilerProperty::EmitScopeDestructors => 1,
            CompilerProperty::RequireReturnPaths => 1,
            CompilerProperty::MaxReportedErrors => 0,
        }
    }
}

/// Options for one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Name of the compilation unit. Every mangled symbol starts with it.
    pub unit_name: String,
    pub emit_scope_destructors: bool,
    pub require_return_paths: bool,
    pub max_reported_errors: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self::new("main")
    }
}

impl CompilerOptions {
    pub fn new(unit_name: impl Into<String>) -> Self {
        Self {
            unit_name: unit_name.into(),
            emit_scope_destructors: CompilerProperty::EmitScopeDestructors.default_value() != 0,
            require_return_paths: CompilerProperty::RequireReturnPaths.default_value() != 0,
            max_reported_errors: CompilerProperty::MaxReportedErrors.default_value() as usize,
        }
    }

    pub fn set_property(&mut self, property: CompilerProperty, value: u64) {
        match property {
            CompilerProperty::EmitScopeDestructors => self.emit_scope_destructors = value != 0,
            CompilerProperty::RequireReturnPaths => self.require_return_paths = value != 0,
            CompilerProperty::MaxReportedErrors => {
                self.max_reported_errors = usize::try_from(value).unwrap_or(usize::MAX)
            }
        }
    }

    pub fn property(&self, property: CompilerProperty) -> u64 {
        match property {
            CompilerProperty::EmitScopeDestructors => u64::from(self.emit_scope_destructors),
            CompilerProperty::RequireReturnPaths => u64::from(self.require_return_paths),
            CompilerProperty::MaxReportedErrors => self.max_reported_errors as u64,
        }
    }

    /// Set a property by its raw number.
    pub fn set_raw_property(&mut self, property: u32, value: u64) -> Result<(), CompilationError> {
        let property = CompilerProperty::try_from(property).map_err(|_| {
            CompilationError::internal(format!("unknown compiler property {property}"))
        })?;
        self.set_property(property, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = CompilerOptions::default();
        assert_eq!(options.unit_name, "main");
        assert!(options.emit_scope_destructors);
        assert!(options.require_return_paths);
        assert_eq!(options.property(CompilerProperty::MaxReportedErrors), 0);
    }

    #[test]
    fn set_and_read_back() {
        let mut options = CompilerOptions::new("lights");
        options.set_property(CompilerProperty::RequireReturnPaths, 0);
        assert!(!options.require_return_paths);
        assert_eq!(options.property(CompilerProperty::RequireReturnPaths), 0);

        options
            .set_raw_property(u32::from(CompilerProperty::MaxReportedErrors), 5)
            .unwrap();
        assert_eq!(options.max_reported_errors, 5);
    }

    #[test]
    fn unknown_raw_property() {
        let mut options = CompilerOptions::default();
        let err = options.set_raw_property(99, 1).unwrap_err();
        assert!(err.to_string().contains("unknown compiler property 99"));
    }
}
