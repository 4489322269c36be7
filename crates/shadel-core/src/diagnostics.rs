//! Human-readable rendering of compile errors.
//!
//! A unit that fails reports every leaf error it accumulated, each with its
//! source location:
//!
//! ```text
//! shader.sl: at 4:7: undeclared function 'g'
//! shader.sl: at 9:3: invalid use of 'break' outside any loop
//! ```

use std::fmt;

use crate::{CompilationError, Span};

/// A single rendered error.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Where the error occurred.
    pub span: Span,
    /// The full error text, including its location prefix.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// All diagnostics for one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    section: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics labelled with a source section (usually the unit name).
    pub fn for_section(section: impl Into<String>) -> Self {
        Self {
            section: Some(section.into()),
            diagnostics: Vec::new(),
        }
    }

    /// Record every leaf of `error`.
    pub fn push_error(&mut self, error: CompilationError) {
        for leaf in error.flatten() {
            self.diagnostics.push(Diagnostic {
                span: leaf.span(),
                message: leaf.to_string(),
            });
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Render at most `limit` diagnostics (0 means all), one per line.
    ///
    /// When the list is truncated a trailing line says how many were hidden.
    pub fn render(&self, limit: usize) -> String {
        let shown = if limit == 0 {
            self.diagnostics.len()
        } else {
            limit.min(self.diagnostics.len())
        };

        let mut out = String::new();
        for diagnostic in &self.diagnostics[..shown] {
            if let Some(section) = &self.section {
                out.push_str(section);
                out.push_str(": ");
            }
            out.push_str(&diagnostic.message);
            out.push('\n');
        }
        let hidden = self.diagnostics.len() - shown;
        if hidden > 0 {
            out.push_str(&format!("... and {hidden} more error(s)\n"));
        }
        out
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(0))
    }
}

impl From<CompilationError> for Diagnostics {
    fn from(error: CompilationError) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push_error(error);
        diagnostics
    }
}
