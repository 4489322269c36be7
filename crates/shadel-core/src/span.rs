//! Source locations attached to AST nodes and compile errors.

use std::fmt;

/// A position in the shader source, as reported by the parser.
///
/// Only the start of a construct is tracked. Diagnostics print it as
/// `line:col`, both 1-indexed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed, 0 when unknown).
    pub line: u32,
    /// Column number (1-indexed, 0 when unknown).
    pub col: u32,
}

impl Span {
    /// A span for compiler-synthesised constructs with no source position.
    pub const UNKNOWN: Span = Span { line: 0, col: 0 };

    #[inline]
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Whether this span points at real source text.
    #[inline]
    pub fn is_known(&self) -> bool {
        self.line != 0
    }

    /// Returns whichever span starts first in the source.
    ///
    /// Unknown spans never win over known ones.
    #[inline]
    pub fn earliest(self, other: Span) -> Span {
        match (self.is_known(), other.is_known()) {
            (true, false) => self,
            (false, true) => other,
            _ if (other.line, other.col) < (self.line, self.col) => other,
            _ => self,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
