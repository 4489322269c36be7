//! Binary and unary operator tables.
//!
//! Each table maps an operator to its registered candidates. Resolution is
//! a pure function of the operand types and the conversion table:
//!
//! 1. a candidate is viable if every operand converts to its parameter type
//! 2. viable candidates are scored by the summed operator-conversion cost
//! 3. the unique cheapest candidate wins, a tie is "ambiguous operation",
//!    no viable candidate is "invalid operation"

use std::fmt;

use rustc_hash::FxHashMap;
use shadel_ast::{BinaryOp, UnaryOp};
use shadel_core::{CompilationError, Span};

use crate::conversion::{Conversion, ConversionTable};
use crate::ranking::{Ranking, rank, total_cost};
use crate::type_def::{TypeSpec, quote_types};

type Result<T> = std::result::Result<T, CompilationError>;

/// How an operator candidate is lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpLowering {
    /// A backend instruction, e.g. `add.i`.
    Instruction(&'static str),
    /// A call into the runtime library.
    Runtime(&'static str),
}

impl fmt::Display for OpLowering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpLowering::Instruction(name) => write!(f, "{name}"),
            OpLowering::Runtime(symbol) => write!(f, "call {symbol}"),
        }
    }
}

/// One registered binary operator overload.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryCandidate {
    pub op: BinaryOp,
    pub lhs: TypeSpec,
    pub rhs: TypeSpec,
    pub result: TypeSpec,
    pub lowering: OpLowering,
}

impl fmt::Display for BinaryCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {}) -> {}", self.op, self.lhs, self.rhs, self.result)
    }
}

/// A resolved binary operation with the conversions each operand needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBinary {
    pub candidate: BinaryCandidate,
    pub lhs_conversion: Conversion,
    pub rhs_conversion: Conversion,
}

/// One registered unary operator overload.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryCandidate {
    pub op: UnaryOp,
    pub operand: TypeSpec,
    pub result: TypeSpec,
    pub lowering: OpLowering,
}

impl fmt::Display for UnaryCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) -> {}", self.op, self.operand, self.result)
    }
}

/// A resolved unary operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUnary {
    pub candidate: UnaryCandidate,
    pub conversion: Conversion,
}

fn describe<T: fmt::Display>(candidates: &[&T]) -> String {
    let mut names: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
    names.sort();
    names.join(" or ")
}

/// Binary operator candidates, keyed by operator.
#[derive(Debug, Default)]
pub struct BinaryOpTable {
    candidates: FxHashMap<BinaryOp, Vec<BinaryCandidate>>,
}

impl BinaryOpTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        op: BinaryOp,
        lhs: &TypeSpec,
        rhs: &TypeSpec,
        result: &TypeSpec,
        lowering: OpLowering,
    ) {
        self.candidates.entry(op).or_default().push(BinaryCandidate {
            op,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
            result: result.clone(),
            lowering,
        });
    }

    pub fn candidates(&self, op: BinaryOp) -> &[BinaryCandidate] {
        self.candidates.get(&op).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve `lhs op rhs`.
    pub fn resolve(
        &self,
        op: BinaryOp,
        lhs: &TypeSpec,
        rhs: &TypeSpec,
        conversions: &ConversionTable,
        span: Span,
    ) -> Result<ResolvedBinary> {
        let scored = self.candidates(op).iter().filter_map(|candidate| {
            let l = conversions.can_convert(lhs, &candidate.lhs)?;
            let r = conversions.can_convert(rhs, &candidate.rhs)?;
            let cost = total_cost([Some(l.op_cost), Some(r.op_cost)])?;
            Some((cost, (candidate, l, r)))
        });

        match rank(scored) {
            Ranking::Unique((candidate, lhs_conversion, rhs_conversion)) => {
                tracing::trace!(
                    op = %op,
                    lhs = %lhs,
                    rhs = %rhs,
                    result = %candidate.result,
                    "resolved binary operator"
                );
                Ok(ResolvedBinary {
                    candidate: candidate.clone(),
                    lhs_conversion,
                    rhs_conversion,
                })
            }
            Ranking::NoViable => Err(CompilationError::InvalidOperation {
                op: op.to_string(),
                operands: quote_types([lhs, rhs]),
                span,
            }),
            Ranking::Ambiguous(tied) => {
                let tied: Vec<_> = tied.into_iter().map(|(c, _, _)| c).collect();
                Err(CompilationError::AmbiguousOperation {
                    op: op.to_string(),
                    operands: quote_types([lhs, rhs]),
                    candidates: describe(&tied),
                    span,
                })
            }
        }
    }
}

/// Unary operator candidates, keyed by operator.
#[derive(Debug, Default)]
pub struct UnaryOpTable {
    candidates: FxHashMap<UnaryOp, Vec<UnaryCandidate>>,
}

impl UnaryOpTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, op: UnaryOp, operand: &TypeSpec, result: &TypeSpec, lowering: OpLowering) {
        self.candidates.entry(op).or_default().push(UnaryCandidate {
            op,
            operand: operand.clone(),
            result: result.clone(),
            lowering,
        });
    }

    pub fn candidates(&self, op: UnaryOp) -> &[UnaryCandidate] {
        self.candidates.get(&op).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve `op operand`.
    pub fn resolve(
        &self,
        op: UnaryOp,
        operand: &TypeSpec,
        conversions: &ConversionTable,
        span: Span,
    ) -> Result<ResolvedUnary> {
        let scored = self.candidates(op).iter().filter_map(|candidate| {
            let conversion = conversions.can_convert(operand, &candidate.operand)?;
            Some((conversion.op_cost, (candidate, conversion)))
        });

        match rank(scored) {
            Ranking::Unique((candidate, conversion)) => {
                tracing::trace!(op = %op, operand = %operand, result = %candidate.result, "resolved unary operator");
                Ok(ResolvedUnary {
                    candidate: candidate.clone(),
                    conversion,
                })
            }
            Ranking::NoViable => Err(CompilationError::InvalidOperation {
                op: op.to_string(),
                operands: quote_types([operand]),
                span,
            }),
            Ranking::Ambiguous(tied) => {
                let tied: Vec<_> = tied.into_iter().map(|(c, _)| c).collect();
                Err(CompilationError::AmbiguousOperation {
                    op: op.to_string(),
                    operands: quote_types([operand]),
                    candidates: describe(&tied),
                    span,
                })
            }
        }
    }
}
