//! Cost-based selection among viable candidates.
//!
//! Operator and function resolution share the same final step: keep the
//! candidates with the lowest total conversion cost, succeed if exactly one
//! remains, report ambiguity otherwise. Nothing here depends on the order
//! the candidates were registered in.

/// Outcome of ranking scored candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ranking<T> {
    /// No candidate was viable.
    NoViable,
    /// A single candidate has the lowest cost.
    Unique(T),
    /// Several candidates tie at the lowest cost.
    Ambiguous(Vec<T>),
}

/// Rank `(cost, candidate)` pairs.
pub fn rank<T>(scored: impl IntoIterator<Item = (u32, T)>) -> Ranking<T> {
    let mut best_cost = u32::MAX;
    let mut best: Vec<T> = Vec::new();

    for (cost, candidate) in scored {
        if cost < best_cost {
            best_cost = cost;
            best.clear();
            best.push(candidate);
        } else if cost == best_cost {
            best.push(candidate);
        }
    }

    match best.len() {
        0 => Ranking::NoViable,
        1 => match best.pop() {
            Some(only) => Ranking::Unique(only),
            None => Ranking::NoViable,
        },
        _ => Ranking::Ambiguous(best),
    }
}

/// Sum candidate conversion costs, or `None` if any operand is not convertible.
pub fn total_cost(costs: impl IntoIterator<Item = Option<u32>>) -> Option<u32> {
    costs
        .into_iter()
        .try_fold(0u32, |acc, cost| cost.map(|c| acc.saturating_add(c)))
}
