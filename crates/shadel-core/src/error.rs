//! Compile-time error values.
//!
//! Every typecheck and lowering step returns `Result<T, CompilationError>`.
//! Errors are plain values: they are merged, never thrown past a sibling,
//! and only inspected once a whole unit has been walked.
//!
//! ## Error Shape
//!
//! ```text
//! CompilationError
//! ├── leaf variants   - one problem at one source location
//! ├── Pair(a, b)      - two independent failures merged by `join`
//! └── Group([..])     - three or more failures merged by `accumulate`
//! ```
//!
//! A compound error renders every leaf on its own line, so nothing merged
//! into it is lost from the final report.

use std::fmt;

use thiserror::Error;

use crate::Span;

/// The symbol table a failed lookup was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Function,
    Type,
    Module,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Function => "function",
            SymbolKind::Type => "type",
            SymbolKind::Module => "module",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while type checking and lowering a compilation unit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// A name was not found in any enclosing scope.
    #[error("at {span}: undeclared {kind} '{name}'")]
    UndefinedName {
        /// Which table the lookup ran against.
        kind: SymbolKind,
        /// The (possibly qualified) name.
        name: String,
        /// Where the name was used.
        span: Span,
    },

    /// An expression has the wrong static type for its context.
    #[error("at {span}: type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch {
        /// The type required by the context.
        expected: String,
        /// The type the expression actually has.
        found: String,
        /// Where the expression occurred.
        span: Span,
    },

    /// No operator candidate accepts the operand types.
    #[error("at {span}: invalid operation '{op}' on {operands}")]
    InvalidOperation {
        /// The operator symbol.
        op: String,
        /// The operand types, already quoted.
        operands: String,
        /// Where the operation occurred.
        span: Span,
    },

    /// Several operator candidates tie at the lowest conversion cost.
    #[error("at {span}: ambiguous operation '{op}' on {operands}: could be {candidates}")]
    AmbiguousOperation {
        /// The operator symbol.
        op: String,
        /// The operand types, already quoted.
        operands: String,
        /// The tied candidate signatures.
        candidates: String,
        /// Where the operation occurred.
        span: Span,
    },

    /// Overloads exist but none accepts the argument types.
    #[error("at {span}: no matching function for call to '{name}({args})'")]
    NoMatchingFunction {
        /// The function name.
        name: String,
        /// The argument types.
        args: String,
        /// Where the call occurred.
        span: Span,
    },

    /// Several overloads tie at the lowest conversion cost.
    #[error("at {span}: ambiguous call to '{name}': could be {candidates}")]
    AmbiguousCall {
        /// The function name.
        name: String,
        /// The tied candidate signatures.
        candidates: String,
        /// Where the call occurred.
        span: Span,
    },

    /// A declaration conflicts with an earlier one of the same name.
    #[error("at {span}: invalid redeclaration of {kind} '{name}': {reason}")]
    InvalidRedeclaration {
        /// What was redeclared.
        kind: SymbolKind,
        /// The redeclared name.
        name: String,
        /// How the declarations disagree.
        reason: String,
        /// Where the redeclaration occurred.
        span: Span,
    },

    /// No implicit conversion exists between two types.
    #[error("at {span}: invalid conversion from '{from}' to '{to}'")]
    InvalidConversion {
        /// The source type.
        from: String,
        /// The target type.
        to: String,
        /// Where the conversion was required.
        span: Span,
    },

    /// `break` or `continue` used outside any loop.
    #[error("at {span}: invalid use of '{keyword}' outside any loop")]
    InvalidControlFlow {
        /// The offending keyword.
        keyword: &'static str,
        /// Where the statement occurred.
        span: Span,
    },

    /// A non-void function can reach the end of its body.
    #[error("at {span}: function '{name}' does not return a value on every path")]
    MissingReturn {
        /// The function name.
        name: String,
        /// Where the function was declared.
        span: Span,
    },

    /// Any other located error.
    #[error("at {span}: {message}")]
    Message {
        /// The error message.
        message: String,
        /// Where the error occurred.
        span: Span,
    },

    /// A compiler invariant was broken.
    #[error("internal error: {message}")]
    Internal {
        /// The error message.
        message: String,
    },

    /// Two independent failures.
    #[error("{0}\n{1}")]
    Pair(Box<CompilationError>, Box<CompilationError>),

    /// Three or more independent failures, in source order of discovery.
    #[error("{}", render_group(.0))]
    Group(Vec<CompilationError>),
}

fn render_group(errors: &[CompilationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl CompilationError {
    /// Shorthand for [`CompilationError::Message`].
    pub fn message(message: impl Into<String>, span: Span) -> Self {
        CompilationError::Message {
            message: message.into(),
            span,
        }
    }

    /// Shorthand for [`CompilationError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }

    /// Shorthand for [`CompilationError::UndefinedName`].
    pub fn undefined(kind: SymbolKind, name: impl Into<String>, span: Span) -> Self {
        CompilationError::UndefinedName {
            kind,
            name: name.into(),
            span,
        }
    }

    /// Shorthand for [`CompilationError::TypeMismatch`].
    pub fn mismatch(expected: impl fmt::Display, found: impl fmt::Display, span: Span) -> Self {
        CompilationError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
            span,
        }
    }

    /// Merge two independent errors into one that reports both.
    pub fn merge(first: CompilationError, second: CompilationError) -> Self {
        CompilationError::Pair(Box::new(first), Box::new(second))
    }

    /// Merge any number of errors. Returns `None` for an empty list.
    pub fn group(mut errors: Vec<CompilationError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            2 => {
                let second = errors.pop()?;
                let first = errors.pop()?;
                Some(CompilationError::merge(first, second))
            }
            _ => Some(CompilationError::Group(errors)),
        }
    }

    /// Whether this error bundles several failures.
    pub fn is_compound(&self) -> bool {
        matches!(self, CompilationError::Pair(..) | CompilationError::Group(_))
    }

    /// Number of leaf errors contained in this error.
    pub fn count(&self) -> usize {
        match self {
            CompilationError::Pair(a, b) => a.count() + b.count(),
            CompilationError::Group(errors) => errors.iter().map(|e| e.count()).sum(),
            _ => 1,
        }
    }

    /// Split into leaf errors, left to right.
    pub fn flatten(self) -> Vec<CompilationError> {
        let mut leaves = Vec::with_capacity(self.count());
        self.flatten_into(&mut leaves);
        leaves
    }

    fn flatten_into(self, out: &mut Vec<CompilationError>) {
        match self {
            CompilationError::Pair(a, b) => {
                a.flatten_into(out);
                b.flatten_into(out);
            }
            CompilationError::Group(errors) => {
                for e in errors {
                    e.flatten_into(out);
                }
            }
            leaf => out.push(leaf),
        }
    }

    /// Where this error occurred. Compound errors report their earliest leaf.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::UndefinedName { span, .. }
            | CompilationError::TypeMismatch { span, .. }
            | CompilationError::InvalidOperation { span, .. }
            | CompilationError::AmbiguousOperation { span, .. }
            | CompilationError::NoMatchingFunction { span, .. }
            | CompilationError::AmbiguousCall { span, .. }
            | CompilationError::InvalidRedeclaration { span, .. }
            | CompilationError::InvalidConversion { span, .. }
            | CompilationError::InvalidControlFlow { span, .. }
            | CompilationError::MissingReturn { span, .. }
            | CompilationError::Message { span, .. } => *span,
            CompilationError::Internal { .. } => Span::UNKNOWN,
            CompilationError::Pair(a, b) => a.span().earliest(b.span()),
            CompilationError::Group(errors) => errors
                .iter()
                .map(|e| e.span())
                .fold(Span::UNKNOWN, Span::earliest),
        }
    }
}
