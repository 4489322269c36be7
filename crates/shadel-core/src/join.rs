//! Combinators for composing independent results.
//!
//! `?` stops at the first failure, which would hide a second independent
//! error (the right operand of a binary expression, the third argument of a
//! call). These helpers evaluate everything they are given and merge every
//! failure into one [`CompilationError`].
//!
//! - mapping is plain [`Result::map`]
//! - [`Join::join`] turns a tuple of results into a result of a tuple
//! - [`accumulate`] turns a sequence of results into a result of a `Vec`
//!
//! # Examples
//!
//! ```
//! use shadel_core::{CompilationError, Join, Span};
//!
//! let lhs: Result<i32, CompilationError> = Err(CompilationError::message("bad lhs", Span::new(1, 1)));
//! let rhs: Result<i32, CompilationError> = Err(CompilationError::message("bad rhs", Span::new(1, 5)));
//!
//! let err = (lhs, rhs).join().unwrap_err();
//! assert_eq!(err.count(), 2);
//! ```

use crate::CompilationError;

type Result<T> = std::result::Result<T, CompilationError>;

/// Fold `next` into an optional accumulated error.
#[inline]
pub fn merge_into(acc: Option<CompilationError>, next: CompilationError) -> CompilationError {
    match acc {
        Some(prev) => CompilationError::merge(prev, next),
        None => next,
    }
}

/// Keep the value of `value` but also surface the error of `side`.
///
/// Used where a cleanup step (popping a scope, closing a module) must run
/// after the main work and may fail on its own.
pub fn with_side_effect<T>(value: Result<T>, side: Result<()>) -> Result<T> {
    match (value, side) {
        (Ok(v), Ok(())) => Ok(v),
        (Err(e), Ok(())) | (Ok(_), Err(e)) => Err(e),
        (Err(a), Err(b)) => Err(CompilationError::merge(a, b)),
    }
}

/// Combine a tuple of independent results.
///
/// If exactly one element failed, that error is returned unchanged. If
/// several failed, all of them are merged, left to right.
pub trait Join {
    /// The tuple of success values.
    type Output;

    fn join(self) -> Result<Self::Output>;
}

macro_rules! impl_join {
    ($($value:ident : $ty:ident),+) => {
        impl<$($ty),+> Join for ($(Result<$ty>,)+) {
            type Output = ($($ty,)+);

            fn join(self) -> Result<Self::Output> {
                let ($($value,)+) = self;
                let mut error: Option<CompilationError> = None;
                $(
                    let $value = match $value {
                        Ok(v) => Some(v),
                        Err(e) => {
                            error = Some(merge_into(error.take(), e));
                            None
                        }
                    };
                )+
                match ($($value,)+) {
                    ($(Some($value),)+) => Ok(($($value,)+)),
                    _ => Err(error.unwrap_or_else(|| {
                        CompilationError::internal("join lost track of a failed operand")
                    })),
                }
            }
        }
    };
}

impl_join!(a: A, b: B);
impl_join!(a: A, b: B, c: C);
impl_join!(a: A, b: B, c: C, d: D);
impl_join!(a: A, b: B, c: C, d: D, e: E);
impl_join!(a: A, b: B, c: C, d: D, e: E, f: F);

/// Collect a sequence of results, keeping every error.
///
/// The whole sequence is always consumed.
pub fn accumulate<T, I>(results: I) -> Result<Vec<T>>
where
    I: IntoIterator<Item = Result<T>>,
{
    let mut values = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(v) => values.push(v),
            Err(e) => errors.push(e),
        }
    }
    match CompilationError::group(errors) {
        None => Ok(values),
        Some(e) => Err(e),
    }
}
