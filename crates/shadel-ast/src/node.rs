//! Names and qualified paths.

use std::fmt;

use bumpalo::Bump;
use shadel_core::Span;

/// An identifier with its source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

impl<'ast> Ident<'ast> {
    pub fn new(name: &'ast str, span: Span) -> Self {
        Self { name, span }
    }
}

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A possibly module-qualified name such as `lights.point.falloff`.
///
/// The last segment is the symbol; the ones before it name modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Path<'ast> {
    pub segments: &'ast [Ident<'ast>],
    pub span: Span,
}

impl<'ast> Path<'ast> {
    /// Build a path by splitting `dotted` on `.`, allocating the segments in `arena`.
    pub fn parse_in(arena: &'ast Bump, dotted: &'ast str, span: Span) -> Self {
        let segments: Vec<Ident<'ast>> = dotted.split('.').map(|s| Ident::new(s, span)).collect();
        Self {
            segments: arena.alloc_slice_copy(&segments),
            span,
        }
    }

    /// A single-segment path.
    pub fn single(ident: &'ast Ident<'ast>) -> Self {
        Self {
            segments: std::slice::from_ref(ident),
            span: ident.span,
        }
    }

    /// The final segment, or `""` for an empty path.
    pub fn name(&self) -> &'ast str {
        self.segments.last().map(|s| s.name).unwrap_or("")
    }

    /// The module segments before the name.
    pub fn qualifier(&self) -> &'ast [Ident<'ast>] {
        match self.segments.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.segments.len() > 1
    }
}

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment.name)?;
        }
        Ok(())
    }
}
