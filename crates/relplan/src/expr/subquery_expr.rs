use std::fmt;

use crate::logical::bind_context::BindContextIdx;
use crate::logical::operator::LogicalPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubqueryType {
    /// A subquery used where a single scalar value is expected, e.g. `(SELECT max(b.j) ...)`.
    Scalar,
    /// `EXISTS (...)`.
    Exists,
    /// `NOT EXISTS (...)`.
    NotExists,
    /// `x IN (...)` / `x = ANY (...)`.
    Any,
}

/// An as-yet-unrewritten subquery appearing inside an expression tree.
///
/// Once [`crate::logical::subquery_rewrite`] runs, every `SubqueryExpr` reachable from a filter
/// has either been turned into a mark/single join or, if
/// `enable_subquery_to_markjoin` is off, is left as-is for the executor to evaluate per outer row.
#[derive(Debug, Clone)]
pub struct SubqueryExpr {
    pub bind_idx: BindContextIdx,
    pub subquery_type: SubqueryType,
    pub plan: Box<LogicalPlan>,
}

impl PartialEq for SubqueryExpr {
    fn eq(&self, other: &Self) -> bool {
        self.subquery_type == other.subquery_type && self.plan == other.plan
    }
}

impl std::hash::Hash for SubqueryExpr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.subquery_type.hash(state);
    }
}

impl fmt::Display for SubqueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subquery_type {
            SubqueryType::Scalar => write!(f, "(SUBQUERY)"),
            SubqueryType::Exists => write!(f, "EXISTS(SUBQUERY)"),
            SubqueryType::NotExists => write!(f, "NOT EXISTS(SUBQUERY)"),
            SubqueryType::Any => write!(f, "ANY(SUBQUERY)"),
        }
    }
}
