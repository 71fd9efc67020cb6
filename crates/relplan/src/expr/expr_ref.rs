use std::fmt;

use super::Expr;

/// An ordinal-resolved wrapper around some expression.
///
/// Produced by [`crate::logical::resolve`] in two situations: (1) a requested expression matched
/// a child's output *whole* (e.g. the parent asked for `a.i + 1` and a child already computes
/// exactly that), so rather than re-deriving it we just reference its position; (2) an
/// `AggregateExpr` was hoisted into a node's `agg_core` and replaced in the output by a reference
/// to its slot.
///
/// Kept as its own `Expr` variant rather than folded into `ColumnExpr`: several call sites need
/// to detect "already resolved, do not re-descend" explicitly, and overloading `ColumnExpr` for
/// that would make every `ColumnExpr` consumer have to guess whether "ordinal" means "column in
/// this node's own output" (`ExprRef`) or "column in a child's output" (`ColumnExpr`
/// post-resolution) — two different index spaces.
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct ExprRef {
    /// Position in the producing node's own input vector (i.e. `children_output` during
    /// resolution, or `agg_core` for an aggregate's hoisted functions).
    pub ordinal: usize,
    /// The expression this ordinal stands in for, kept around for printing and for
    /// `search_replace` to still find matches inside already-resolved subtrees when explicitly
    /// asked to.
    pub resolved: Box<Expr>,
}

impl fmt::Display for ExprRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.ordinal)
    }
}
