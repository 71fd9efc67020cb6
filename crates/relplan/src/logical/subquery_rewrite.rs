//! Subquery-to-join rewriting.
//!
//! Runs after ordinal resolution (bind → resolve → rewrite → translate), so every
//! `Column`/`ExprRef` this pass touches already carries concrete ordinals, and every
//! `SubqueryExpr`'s own nested plan was already resolved by [`crate::logical::resolve`]. This
//! pass therefore builds new `Join` nodes directly rather than re-invoking `resolve`: it computes
//! the handful of new ordinals (the appended marker/value column) itself.

use relplan_error::{OptionExt, Result};

use crate::expr::column_expr::ColumnExpr;
use crate::expr::comparison_expr::{ComparisonExpr, ComparisonOperator};
use crate::expr::conjunction_expr::{and_all, split_conjuncts};
use crate::expr::expr_ref::ExprRef;
use crate::expr::literal_expr::{LiteralExpr, Value};
use crate::expr::subquery_expr::{SubqueryExpr, SubqueryType};
use crate::expr::Expr;
use crate::logical::operator::{JoinType, LogicalPlan, MARKER_COLUMN};

/// Rewrites every EXISTS/IN/scalar subquery reachable from a `Filter` predicate in `plan` into a
/// mark/single join. A no-op when `enable` is false — subqueries are left for the executor to
/// evaluate per outer row. Idempotent: a second call finds no `SubqueryExpr` left in any filter
/// this pass already converted.
pub fn rewrite_subqueries(plan: LogicalPlan, enable: bool) -> Result<LogicalPlan> {
    if !enable {
        tracing::trace!("subquery rewriting disabled, leaving plan untouched");
        return Ok(plan);
    }
    tracing::debug!("rewriting correlated subqueries into joins");
    rewrite_node(plan)
}

fn rewrite_node(plan: LogicalPlan) -> Result<LogicalPlan> {
    match plan {
        LogicalPlan::Filter(mut n) => {
            let child = rewrite_node(n.children.remove(0))?;
            let predicate = n.filter.take().required("Filter predicate")?;
            let (new_child, new_predicate) = rewrite_filter_predicate(child, predicate)?;
            n.children = vec![new_child];
            n.filter = Some(new_predicate);
            Ok(LogicalPlan::Filter(n))
        }
        mut other => {
            let children = std::mem::take(other.children_mut());
            let mut rewritten = Vec::with_capacity(children.len());
            for child in children {
                rewritten.push(rewrite_node(child)?);
            }
            *other.children_mut() = rewritten;
            Ok(other)
        }
    }
}

/// Splits `predicate` into its AND-conjuncts and rewrites each independently, threading the
/// (possibly join-augmented) child through so a later conjunct sees any join an earlier one
/// introduced.
fn rewrite_filter_predicate(child: LogicalPlan, predicate: Expr) -> Result<(LogicalPlan, Expr)> {
    let mut current_child = child;
    let mut new_conjuncts = Vec::new();
    for conjunct in split_conjuncts(&predicate) {
        let (next_child, next_conjunct) = rewrite_conjunct(current_child, conjunct)?;
        current_child = next_child;
        new_conjuncts.push(next_conjunct);
    }
    let rebuilt = and_all(new_conjuncts).required("at least one predicate conjunct")?;
    Ok((current_child, rebuilt))
}

fn rewrite_conjunct(child: LogicalPlan, conjunct: Expr) -> Result<(LogicalPlan, Expr)> {
    if let Expr::Subquery(s) = &conjunct {
        if matches!(s.subquery_type, SubqueryType::Exists | SubqueryType::NotExists) {
            let negate = s.subquery_type == SubqueryType::NotExists;
            let plan = rewrite_node((*s.plan).clone())?;
            let (plan, correlation) = extract_correlation(plan);
            return Ok(rewrite_exists(child, plan, correlation, negate));
        }
    }

    if let Expr::Comparison(c) = &conjunct {
        if c.op == ComparisonOperator::Eq {
            if let Expr::Subquery(s) = c.right.as_ref() {
                if s.subquery_type == SubqueryType::Any {
                    let plan = rewrite_node((*s.plan).clone())?;
                    let (plan, correlation) = extract_correlation(plan);
                    let outer_expr = (*c.left).clone();
                    return rewrite_in(child, plan, correlation, outer_expr);
                }
            }
        }
    }

    if let Some(sub) = find_scalar_subquery(&conjunct).cloned() {
        let plan = rewrite_node((*sub.plan).clone())?;
        let (plan, correlation) = extract_correlation(plan);
        let sub = SubqueryExpr {
            plan: Box::new(plan),
            ..sub
        };
        return rewrite_scalar(child, conjunct, sub, correlation);
    }

    Ok((child, conjunct))
}

/// Lifts a subquery's own top-level `Filter` predicate out of its plan entirely, to become the
/// predicate of the join that replaces it: the join evaluates it with both sides' columns in
/// scope, same as the `Filter` did, and the subquery plan handed to `build_mark_join`/the single
/// join contributes just its scan/aggregate (a TPC-H Q4-shaped correlated EXISTS, for instance,
/// has `l_orderkey = o_orderkey AND l_commitdate < l_receiptdate` both end up on the MarkJoin, not
/// split across a join predicate and a residual `Filter` underneath it). Descends through
/// `Aggregate` (the shape a correlated scalar subquery's `WHERE` commonly sits under) but not
/// arbitrarily deep — full decorrelation of nested subqueries at any depth is out of scope here,
/// the same deliberate limit on generality the hashability check below takes.
fn extract_correlation(plan: LogicalPlan) -> (LogicalPlan, Expr) {
    match plan {
        LogicalPlan::Filter(mut n) => {
            let predicate = n.filter.take().expect("Filter node always carries a predicate");
            let child = n.children.remove(0);
            let (child, child_predicate) = extract_correlation(child);
            let combined = if is_true_literal(&child_predicate) {
                predicate
            } else {
                and_all(vec![predicate, child_predicate]).expect("two conjuncts always produce Some")
            };
            (child, combined)
        }
        LogicalPlan::Aggregate(mut n) => {
            let child = n.children.remove(0);
            let (child, predicate) = extract_correlation(child);
            n.children = vec![child];
            (LogicalPlan::Aggregate(n), predicate)
        }
        other => (other, true_literal()),
    }
}

fn is_true_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal(LiteralExpr { value: Value::Boolean(true), .. }))
}

/// `EXISTS (...)` / `NOT EXISTS (...)`: left-preserving join, right side contributes only
/// `#marker`. `NOT EXISTS` is encoded as `#marker <> TRUE` rather than a dedicated boolean-not
/// operator, since the expression algebra has none.
fn rewrite_exists(child: LogicalPlan, subquery_plan: LogicalPlan, correlation: Expr, negate: bool) -> (LogicalPlan, Expr) {
    let (join_node, marker) = build_mark_join(child, subquery_plan, correlation);
    let replacement = if negate {
        Expr::Comparison(ComparisonExpr {
            op: ComparisonOperator::NotEq,
            left: Box::new(marker),
            right: Box::new(true_literal()),
        })
    } else {
        marker
    };
    (join_node, replacement)
}

/// `x IN (SELECT ...)`: the same mark join as EXISTS, but with a real equality predicate between
/// `x` and the subquery's single projected column, so the physical translator can still pick a
/// hash join for it.
fn rewrite_in(child: LogicalPlan, subquery_plan: LogicalPlan, correlation: Expr, outer_expr: Expr) -> Result<(LogicalPlan, Expr)> {
    let left_len = child.output().len();
    let right_value = subquery_plan
        .output()
        .first()
        .cloned()
        .required("IN subquery must project exactly one column")?;
    let in_equality = Expr::Comparison(ComparisonExpr {
        op: ComparisonOperator::Eq,
        left: Box::new(outer_expr),
        right: Box::new(Expr::ExprRef(ExprRef {
            ordinal: left_len,
            resolved: Box::new(right_value),
        })),
    });
    let join_predicate = if is_true_literal(&correlation) {
        in_equality
    } else {
        and_all(vec![in_equality, correlation]).expect("two conjuncts always produce Some")
    };
    let (join_node, marker) = build_mark_join(child, subquery_plan, join_predicate);
    Ok((join_node, marker))
}

/// A scalar subquery used as a value somewhere inside a larger expression (e.g.
/// `a.i = (SELECT max(b.j) ...)`): `SingleJoin`, the subquery's single column appended to the
/// left output and spliced into `conjunct` wherever the `Subquery` node appeared.
fn rewrite_scalar(child: LogicalPlan, conjunct: Expr, sub: SubqueryExpr, correlation: Expr) -> Result<(LogicalPlan, Expr)> {
    let left_len = child.output().len();
    let right_value = sub
        .plan
        .output()
        .first()
        .cloned()
        .required("scalar subquery must project exactly one column")?;
    let value_ref = Expr::ExprRef(ExprRef {
        ordinal: left_len,
        resolved: Box::new(right_value),
    });

    let mut join_output = child.output().to_vec();
    join_output.push(value_ref.clone());
    let join_node = match LogicalPlan::join(child, (*sub.plan).clone(), JoinType::SingleJoin, correlation) {
        LogicalPlan::Join(mut n) => {
            n.output = join_output;
            LogicalPlan::Join(n)
        }
        _ => unreachable!("LogicalPlan::join always builds a Join node"),
    };

    let rewritten_conjunct = conjunct.search_replace(&Expr::Subquery(sub), &value_ref);
    Ok((join_node, rewritten_conjunct))
}

/// Builds a `MarkJoin` of `child` and `subquery_plan` under `join_predicate`, appending a
/// `#marker` column to the left output. Returns the join and a `Column` referencing that marker
/// by alias (its embedded ordinal is never read by anything that matters — parents find the
/// marker by alias, the same as `clone_fix_column_ordinal::fix_column` does for any other column
/// — but filling it in keeps every `Column` the resolver sees `is_resolved()`).
fn build_mark_join(child: LogicalPlan, subquery_plan: LogicalPlan, join_predicate: Expr) -> (LogicalPlan, Expr) {
    let left_len = child.output().len();
    let mut join_output = child.output().to_vec();
    let marker = Expr::Column(ColumnExpr {
        alias: MARKER_COLUMN.to_string(),
        tab_ref: None,
        outer_ref: false,
        ordinal: left_len as i64,
    });
    join_output.push(marker.clone());

    let join_node = match LogicalPlan::join(child, subquery_plan, JoinType::MarkJoin, join_predicate) {
        LogicalPlan::Join(mut n) => {
            n.output = join_output;
            LogicalPlan::Join(n)
        }
        _ => unreachable!("LogicalPlan::join always builds a Join node"),
    };
    (join_node, marker)
}

fn find_scalar_subquery(expr: &Expr) -> Option<&SubqueryExpr> {
    match expr {
        Expr::Subquery(s) if s.subquery_type == SubqueryType::Scalar => Some(s),
        Expr::Literal(_) | Expr::Column(_) | Expr::ExprRef(_) | Expr::Subquery(_) => None,
        Expr::Arith(a) => find_scalar_subquery(&a.left).or_else(|| find_scalar_subquery(&a.right)),
        Expr::Comparison(c) => find_scalar_subquery(&c.left).or_else(|| find_scalar_subquery(&c.right)),
        Expr::Conjunction(c) => find_scalar_subquery(&c.left).or_else(|| find_scalar_subquery(&c.right)),
        Expr::Function(f) => f.args.iter().find_map(find_scalar_subquery),
        Expr::Aggregate(a) => a.args.iter().find_map(find_scalar_subquery),
    }
}

fn true_literal() -> Expr {
    Expr::Literal(LiteralExpr::new(Value::Boolean(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::column_expr::ColumnExpr;
    use crate::expr::literal_expr::DataType;
    use crate::logical::bind_context::BindContext;
    use crate::logical::table_ref::{TableRef, TableRefId};

    fn orders() -> TableRef {
        TableRef::base_table(
            TableRefId(0),
            "orders",
            vec![("o_orderkey".into(), DataType::Int64)],
        )
    }

    fn lineitem() -> TableRef {
        TableRef::base_table(
            TableRefId(1),
            "lineitem",
            vec![("l_orderkey".into(), DataType::Int64)],
        )
    }

    #[test]
    fn exists_rewrites_to_markjoin_and_column_reference() {
        let orders_table = orders();
        let o_cols = orders_table.all_column_refs();
        let outer_scan = LogicalPlan::scan(orders_table, None);

        let lineitem_table = lineitem();
        let l_cols = lineitem_table.all_column_refs();
        let inner_scan = LogicalPlan::scan(lineitem_table, None);
        let correlated_pred = Expr::Comparison(ComparisonExpr {
            op: ComparisonOperator::Eq,
            left: Box::new(l_cols[0].clone()),
            right: Box::new(Expr::Column(ColumnExpr::outer("o_orderkey", TableRefId(0)))),
        });
        let subquery_plan = LogicalPlan::new_filter(inner_scan, correlated_pred);

        let exists_expr = Expr::Subquery(SubqueryExpr {
            bind_idx: BindContext::new().root(),
            subquery_type: SubqueryType::Exists,
            plan: Box::new(subquery_plan),
        });

        let filtered = LogicalPlan::new_filter(
            {
                let mut scan = outer_scan;
                *scan.output_mut() = o_cols.clone();
                scan
            },
            exists_expr,
        );

        let rewritten = rewrite_subqueries(filtered, true).unwrap();
        match rewritten {
            LogicalPlan::Filter(n) => match n.filter.unwrap() {
                Expr::Column(c) => assert_eq!(c.alias, MARKER_COLUMN),
                other => panic!("expected marker column reference, got {other:?}"),
            },
            other => panic!("expected filter, got {other:?}"),
        }
    }

    #[test]
    fn disabled_rewrite_is_a_no_op() {
        let table = orders();
        let cols = table.all_column_refs();
        let scan = LogicalPlan::scan(table, None);
        let subquery_plan = LogicalPlan::result(vec![]);
        let exists_expr = Expr::Subquery(SubqueryExpr {
            bind_idx: BindContext::new().root(),
            subquery_type: SubqueryType::Exists,
            plan: Box::new(subquery_plan),
        });
        let filtered = LogicalPlan::new_filter(scan, exists_expr.clone());
        let untouched = rewrite_subqueries(filtered.clone(), false).unwrap();
        assert_eq!(untouched.filter(), Some(&exists_expr));
        let _ = cols;
    }
}
