//! Static cost and cardinality estimates: computed from fixed selectivity assumptions
//! (`EQUALITY_SELECTIVITY`, `INEQUALITY_SELECTIVITY`, `DEFAULT_SELECTIVITY`) tied to operator
//! type and child cardinalities, stable for a given input — no histogram or sampled-statistics
//! system, and no reasoning about reordering many base relations at once; translation is direct,
//! not search-based.

use std::fmt;

use crate::expr::comparison_expr::ComparisonOperator;
use crate::expr::Expr;

pub mod assumptions {
    pub const EQUALITY_SELECTIVITY: f64 = 0.1;
    pub const INEQUALITY_SELECTIVITY: f64 = 0.3;
    pub const DEFAULT_SELECTIVITY: f64 = 0.3;
    /// Assumed row count for a base table with no catalog statistics attached.
    pub const DEFAULT_BASE_CARDINALITY: f64 = 1000.0;
}

/// An estimated, unitless cost figure for one physical node's own work (excluding children).
/// `PhysNode::cost` sums a node's own cost with its children's, so regression fixtures print the
/// cumulative cost at every level the way `EXPLAIN ANALYZE` output usually does.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Cost(pub f64);

impl Cost {
    pub const ZERO: Cost = Cost(0.0);

    pub fn plus_children(self, children: &[f64]) -> Cost {
        Cost(self.0 + children.iter().sum::<f64>())
    }
}

impl std::ops::Add for Cost {
    type Output = Cost;
    fn add(self, rhs: Cost) -> Cost {
        Cost(self.0 + rhs.0)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Cardinality (row count estimate) for a base scan with no pushed-down filter.
pub fn scan_cardinality(catalog_cardinality: Option<f64>) -> f64 {
    catalog_cardinality.unwrap_or(assumptions::DEFAULT_BASE_CARDINALITY)
}

pub fn scan_cost(cardinality: f64) -> Cost {
    Cost(cardinality)
}

/// Selectivity applied by a residual filter, picked from the predicate's top-level operator:
/// equality narrows more than inequality; anything else falls back to the default.
fn selectivity_of(predicate: &Expr) -> f64 {
    match predicate {
        Expr::Comparison(c) if c.op == ComparisonOperator::Eq => assumptions::EQUALITY_SELECTIVITY,
        Expr::Comparison(_) => assumptions::INEQUALITY_SELECTIVITY,
        _ => assumptions::DEFAULT_SELECTIVITY,
    }
}

pub fn filter_cardinality(child_cardinality: f64, predicate: &Expr) -> f64 {
    child_cardinality * selectivity_of(predicate)
}

pub fn filter_cost(child_cardinality: f64) -> Cost {
    Cost(child_cardinality)
}

/// Cardinality of an inner/outer/cross join: the cross product scaled by the predicate's
/// selectivity (cross joins have no predicate to narrow by, so they keep the full product).
pub fn join_cardinality(left_cardinality: f64, right_cardinality: f64, predicate: &Expr) -> f64 {
    left_cardinality * right_cardinality * selectivity_of(predicate)
}

pub fn hash_join_cost(left_cardinality: f64, right_cardinality: f64) -> Cost {
    Cost(left_cardinality + right_cardinality)
}

pub fn nl_join_cost(left_cardinality: f64, right_cardinality: f64) -> Cost {
    Cost(left_cardinality * right_cardinality)
}

/// Mark/single joins never fan out the left side: at most one right-side row is kept per left
/// row (a single mark join enforces this; a plain mark join just adds a boolean).
pub fn mark_join_cardinality(left_cardinality: f64) -> f64 {
    left_cardinality
}

pub fn mark_join_cost(left_cardinality: f64, right_cardinality: f64) -> Cost {
    Cost(left_cardinality + right_cardinality)
}

/// Grouped aggregation narrows toward the number of distinct group-key combinations; with no
/// group keys at all a `HashAgg` always emits exactly one row.
pub fn agg_cardinality(child_cardinality: f64, has_group_keys: bool) -> f64 {
    if has_group_keys {
        (child_cardinality * 0.1).max(1.0)
    } else {
        1.0
    }
}

pub fn agg_cost(child_cardinality: f64) -> Cost {
    Cost(child_cardinality)
}

pub fn order_cost(child_cardinality: f64) -> Cost {
    if child_cardinality <= 1.0 {
        Cost(child_cardinality)
    } else {
        Cost(child_cardinality * child_cardinality.log2())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::column_expr::ColumnExpr;
    use crate::expr::comparison_expr::ComparisonExpr;
    use crate::logical::table_ref::TableRefId;

    fn eq_predicate() -> Expr {
        Expr::Comparison(ComparisonExpr {
            op: ComparisonOperator::Eq,
            left: Box::new(Expr::Column(ColumnExpr::unresolved("i", TableRefId(0)))),
            right: Box::new(Expr::Column(ColumnExpr::unresolved("j", TableRefId(1)))),
        })
    }

    #[test]
    fn equality_filter_is_more_selective_than_inequality() {
        let eq = filter_cardinality(1000.0, &eq_predicate());
        let lt = filter_cardinality(
            1000.0,
            &Expr::Comparison(ComparisonExpr {
                op: ComparisonOperator::Lt,
                left: Box::new(Expr::Column(ColumnExpr::unresolved("i", TableRefId(0)))),
                right: Box::new(Expr::Column(ColumnExpr::unresolved("j", TableRefId(1)))),
            }),
        );
        assert!(eq < lt);
    }

    #[test]
    fn nl_join_cost_grows_quadratically() {
        assert_eq!(nl_join_cost(10.0, 10.0), Cost(100.0));
        assert_eq!(hash_join_cost(10.0, 10.0), Cost(20.0));
    }

    #[test]
    fn ungrouped_aggregate_always_has_one_row() {
        assert_eq!(agg_cardinality(10_000.0, false), 1.0);
    }
}
