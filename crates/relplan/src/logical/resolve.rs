//! Ordinal resolution: rewrites every `ColRef` reachable from a node's filter/output so it
//! carries the position of the matching expression in its producing child's output vector.

use std::collections::HashSet;

use relplan_error::{OptionExt, PlanError, Result};

use crate::expr::aggregate_expr::AggregateExpr;
use crate::expr::arith_expr::ArithExpr;
use crate::expr::column_expr::ColumnExpr;
use crate::expr::comparison_expr::ComparisonExpr;
use crate::expr::conjunction_expr::ConjunctionExpr;
use crate::expr::expr_ref::ExprRef;
use crate::expr::function_expr::FunctionExpr;
use crate::expr::subquery_expr::SubqueryExpr;
use crate::expr::{Expr, ExprKind};
use crate::logical::operator::{JoinType, LogicalPlan};
use crate::logical::table_ref::TableRefId;

/// Resolution runs before subquery rewriting (bind → resolve → rewrite → translate), so every
/// `SubqueryExpr` reachable from `req_output` or a filter/having/join predicate has its own
/// nested plan resolved here too, recursively — `resolve` never leaves a `SubqueryExpr` with an
/// unresolved plan behind for the rewriter to trip over.
pub fn resolve(node: LogicalPlan, req_output: &[Expr], remove_redundant: bool) -> Result<LogicalPlan> {
    tracing::trace!(kind = node.kind_name(), requested = req_output.len(), "resolving node");
    let owned_req_output: Vec<Expr> = req_output
        .iter()
        .map(resolve_nested_subqueries)
        .collect::<Result<Vec<_>>>()?;
    let req_output: &[Expr] = &owned_req_output;

    match node {
        LogicalPlan::Scan(mut n) => {
            // A scan can only ever emit raw stored columns, never a computed expression — so any
            // composite request (e.g. an aggregate's `a2 + a3` argument) is decomposed down to
            // its `Column` leaves before becoming part of this node's output.
            let mut requested_columns = Vec::new();
            for e in req_output {
                if e.is_column() {
                    requested_columns.push(e.clone());
                } else {
                    requested_columns.extend(e.retrieve_all_col_expr().into_iter().map(Expr::Column));
                }
            }
            let mut output = dedup_if(requested_columns, remove_redundant);
            n.node.table_ref.add_outer_refs_to_output(&mut output);
            n.output = output;
            Ok(LogicalPlan::Scan(n))
        }

        LogicalPlan::Filter(mut n) => {
            let predicate = n.filter.clone().required("Filter predicate")?;
            let predicate = resolve_nested_subqueries(&predicate)?;
            let mut req_from_child = req_output.to_vec();
            req_from_child.extend(predicate.retrieve_all_col_expr().into_iter().map(Expr::Column));
            let req_from_child = dedup_exprs(req_from_child);

            let child = n.children.remove(0);
            let resolved_child = resolve(child, &req_from_child, true)?;
            let children_output = resolved_child.output().to_vec();

            let fixed_predicate = clone_fix_column_ordinal(&predicate, &children_output)?;
            let fixed_output = req_output
                .iter()
                .map(|e| clone_fix_column_ordinal(e, &children_output))
                .collect::<Result<Vec<_>>>()?;

            n.filter = Some(fixed_predicate);
            n.output = dedup_if(fixed_output, remove_redundant);
            n.children = vec![resolved_child];
            Ok(LogicalPlan::Filter(n))
        }

        LogicalPlan::Join(mut n) => {
            let right = n.children.pop().required("Join right child")?;
            let left = n.children.pop().required("Join left child")?;
            let predicate = resolve_nested_subqueries(&n.node.predicate)?;

            let left_refs = plan_table_refs(&left);
            let right_refs = plan_table_refs(&right);

            let mut left_reqs = Vec::new();
            let mut right_reqs = Vec::new();
            for e in req_output.iter().chain(std::iter::once(&predicate)) {
                route_join_request(e, &left_refs, &right_refs, &mut left_reqs, &mut right_reqs)?;
            }

            let left_resolved = resolve(left, &dedup_exprs(left_reqs), true)?;
            let right_resolved = resolve(right, &dedup_exprs(right_reqs), true)?;

            let mut children_output = left_resolved.output().to_vec();
            children_output.extend(right_resolved.output().iter().cloned());

            let fixed_predicate = clone_fix_column_ordinal(&predicate, &children_output)?;
            let fixed_output = req_output
                .iter()
                .map(|e| clone_fix_column_ordinal(e, &children_output))
                .collect::<Result<Vec<_>>>()?;
            let mut fixed_output = dedup_if(fixed_output, remove_redundant);

            if matches!(n.node.join_type, JoinType::MarkJoin | JoinType::SingleMarkJoin)
                && !fixed_output
                    .iter()
                    .any(|e| matches!(e, Expr::Column(c) if c.alias == super::operator::MARKER_COLUMN))
            {
                let ordinal = fixed_output.len();
                fixed_output.push(Expr::Column(ColumnExpr {
                    alias: super::operator::MARKER_COLUMN.to_string(),
                    tab_ref: None,
                    outer_ref: false,
                    ordinal: ordinal as i64,
                }));
            }

            n.node.predicate = fixed_predicate;
            n.output = fixed_output;
            n.children = vec![left_resolved, right_resolved];
            Ok(LogicalPlan::Join(n))
        }

        LogicalPlan::Aggregate(mut n) => {
            let having = n.filter.as_ref().map(resolve_nested_subqueries).transpose()?;
            let group_keys = n.node.group_keys.clone();

            let mut req_from_child = Vec::new();
            for e in group_keys.iter().chain(having.iter()).chain(req_output.iter()) {
                collect_child_requests(e, &mut req_from_child);
            }
            let req_from_child = dedup_exprs(req_from_child);

            let child = n.children.remove(0);
            let resolved_child = resolve(child, &req_from_child, true)?;
            let children_output = resolved_child.output().to_vec();

            let fixed_group_keys = group_keys
                .iter()
                .map(|e| clone_fix_column_ordinal(e, &children_output))
                .collect::<Result<Vec<_>>>()?;
            let fixed_having = having
                .as_ref()
                .map(|h| clone_fix_column_ordinal(h, &children_output))
                .transpose()?;
            let fixed_output = req_output
                .iter()
                .map(|e| clone_fix_column_ordinal(e, &children_output))
                .collect::<Result<Vec<_>>>()?;
            let fixed_output = dedup_if(fixed_output, remove_redundant);

            let mut agg_core: Vec<AggregateExpr> = Vec::new();
            let final_output: Vec<Expr> = fixed_output
                .iter()
                .map(|e| replace_aggregates(e, fixed_group_keys.len(), &mut agg_core))
                .collect();

            validate_non_grouped_columns(&fixed_group_keys, &final_output)?;

            n.node.group_keys = fixed_group_keys;
            n.node.agg_core = agg_core;
            n.filter = fixed_having;
            n.output = final_output;
            n.children = vec![resolved_child];
            Ok(LogicalPlan::Aggregate(n))
        }

        LogicalPlan::Order(mut n) => {
            let mut req_from_child = req_output.to_vec();
            for e in &n.node.order_exprs {
                req_from_child.extend(e.retrieve_all_col_expr().into_iter().map(Expr::Column));
            }
            let req_from_child = dedup_exprs(req_from_child);

            let child = n.children.remove(0);
            let resolved_child = resolve(child, &req_from_child, true)?;
            let children_output = resolved_child.output().to_vec();

            let fixed_order_exprs = n
                .node
                .order_exprs
                .iter()
                .map(|e| clone_fix_column_ordinal(e, &children_output))
                .collect::<Result<Vec<_>>>()?;
            let fixed_output = req_output
                .iter()
                .map(|e| clone_fix_column_ordinal(e, &children_output))
                .collect::<Result<Vec<_>>>()?;

            n.node.order_exprs = fixed_order_exprs;
            n.output = dedup_if(fixed_output, remove_redundant);
            n.children = vec![resolved_child];
            Ok(LogicalPlan::Order(n))
        }

        LogicalPlan::FromQuery(mut n) => {
            let child = n.children.remove(0);
            let req_from_child = child.output().to_vec();
            let resolved_child = resolve(child, &req_from_child, true)?;

            let mut output = resolved_child.output().to_vec();
            n.node.table_ref.add_outer_refs_to_output(&mut output);
            n.output = output;
            n.children = vec![resolved_child];
            Ok(LogicalPlan::FromQuery(n))
        }

        LogicalPlan::Insert(mut n) => {
            let child = n.children.remove(0);
            let req_from_child = child.output().to_vec();
            let resolved_child = resolve(child, &req_from_child, true)?;
            n.output = Vec::new();
            n.children = vec![resolved_child];
            Ok(LogicalPlan::Insert(n))
        }

        LogicalPlan::Result(n) => Ok(LogicalPlan::Result(n)),

        LogicalPlan::MemoRef(mut n) => {
            n.output = req_output.to_vec();
            Ok(LogicalPlan::MemoRef(n))
        }
    }
}

/// Recursively resolves the plan owned by every `SubqueryExpr` reachable from `expr`, leaving
/// everything else untouched. See the note on [`resolve`] for why this has to happen here rather
/// than in the rewriter.
fn resolve_nested_subqueries(expr: &Expr) -> Result<Expr> {
    match expr {
        Expr::Subquery(s) => {
            let req = s.plan.output().to_vec();
            let resolved_plan = resolve((*s.plan).clone(), &req, true)?;
            Ok(Expr::Subquery(SubqueryExpr {
                bind_idx: s.bind_idx,
                subquery_type: s.subquery_type,
                plan: Box::new(resolved_plan),
            }))
        }
        Expr::Literal(_) | Expr::Column(_) | Expr::ExprRef(_) => Ok(expr.clone()),
        Expr::Arith(a) => Ok(Expr::Arith(ArithExpr {
            op: a.op,
            left: Box::new(resolve_nested_subqueries(&a.left)?),
            right: Box::new(resolve_nested_subqueries(&a.right)?),
        })),
        Expr::Comparison(c) => Ok(Expr::Comparison(ComparisonExpr {
            op: c.op,
            left: Box::new(resolve_nested_subqueries(&c.left)?),
            right: Box::new(resolve_nested_subqueries(&c.right)?),
        })),
        Expr::Conjunction(c) => Ok(Expr::Conjunction(ConjunctionExpr {
            op: c.op,
            left: Box::new(resolve_nested_subqueries(&c.left)?),
            right: Box::new(resolve_nested_subqueries(&c.right)?),
        })),
        Expr::Function(f) => Ok(Expr::Function(FunctionExpr {
            name: f.name.clone(),
            args: f.args.iter().map(resolve_nested_subqueries).collect::<Result<Vec<_>>>()?,
        })),
        Expr::Aggregate(a) => Ok(Expr::Aggregate(AggregateExpr {
            kind: a.kind,
            args: a.args.iter().map(resolve_nested_subqueries).collect::<Result<Vec<_>>>()?,
        })),
    }
}

/// Attempts a whole-expression match against `children_output` first (yielding an `ExprRef`);
/// otherwise rebuilds `expr` with every `Column` leaf's ordinal set to its position in
/// `children_output`, found by alias (tab_ref only disambiguates a tie).
pub fn clone_fix_column_ordinal(expr: &Expr, children_output: &[Expr]) -> Result<Expr> {
    if let Some(i) = children_output.iter().position(|c| c.equals_ignoring_ordinal(expr)) {
        return Ok(Expr::ExprRef(ExprRef {
            ordinal: i,
            resolved: Box::new(expr.clone()),
        }));
    }

    match expr {
        Expr::ExprRef(_) | Expr::Literal(_) | Expr::Subquery(_) => Ok(expr.clone()),
        Expr::Column(c) => {
            if c.outer_ref {
                return Ok(expr.clone());
            }
            fix_column(c, children_output)
        }
        Expr::Arith(a) => Ok(Expr::Arith(ArithExpr {
            op: a.op,
            left: Box::new(clone_fix_column_ordinal(&a.left, children_output)?),
            right: Box::new(clone_fix_column_ordinal(&a.right, children_output)?),
        })),
        Expr::Comparison(c) => Ok(Expr::Comparison(ComparisonExpr {
            op: c.op,
            left: Box::new(clone_fix_column_ordinal(&c.left, children_output)?),
            right: Box::new(clone_fix_column_ordinal(&c.right, children_output)?),
        })),
        Expr::Conjunction(c) => Ok(Expr::Conjunction(ConjunctionExpr {
            op: c.op,
            left: Box::new(clone_fix_column_ordinal(&c.left, children_output)?),
            right: Box::new(clone_fix_column_ordinal(&c.right, children_output)?),
        })),
        Expr::Function(f) => Ok(Expr::Function(FunctionExpr {
            name: f.name.clone(),
            args: f
                .args
                .iter()
                .map(|a| clone_fix_column_ordinal(a, children_output))
                .collect::<Result<Vec<_>>>()?,
        })),
        Expr::Aggregate(a) => Ok(Expr::Aggregate(AggregateExpr {
            kind: a.kind,
            args: a
                .args
                .iter()
                .map(|a| clone_fix_column_ordinal(a, children_output))
                .collect::<Result<Vec<_>>>()?,
        })),
    }
}

fn fix_column(c: &ColumnExpr, children_output: &[Expr]) -> Result<Expr> {
    let candidates: Vec<usize> = children_output
        .iter()
        .enumerate()
        .filter_map(|(i, e)| match e {
            Expr::Column(cc) if cc.alias == c.alias => Some(i),
            _ => None,
        })
        .collect();

    match candidates.len() {
        0 => Err(PlanError::semantic(format!(
            "column `{}` cannot be resolved against its child's output",
            c.alias
        ))),
        1 => Ok(Expr::Column(ColumnExpr {
            ordinal: candidates[0] as i64,
            ..c.clone()
        })),
        _ => {
            let narrowed: Vec<usize> = candidates
                .into_iter()
                .filter(|&i| matches!(&children_output[i], Expr::Column(cc) if cc.tab_ref == c.tab_ref))
                .collect();
            match narrowed.len() {
                1 => Ok(Expr::Column(ColumnExpr {
                    ordinal: narrowed[0] as i64,
                    ..c.clone()
                })),
                _ => Err(PlanError::semantic(format!(
                    "column reference `{}` is ambiguous",
                    c.alias
                ))),
            }
        }
    }
}

/// Routes `e` to the left or right child request list by its table-ref set, decomposing into
/// `ColRef` leaves when `e` straddles both sides.
fn route_join_request(
    e: &Expr,
    left_refs: &HashSet<TableRefId>,
    right_refs: &HashSet<TableRefId>,
    left_reqs: &mut Vec<Expr>,
    right_reqs: &mut Vec<Expr>,
) -> Result<()> {
    let refs = e.table_refs();
    if refs.is_empty() || refs.is_subset(left_refs) {
        left_reqs.push(e.clone());
        return Ok(());
    }
    if refs.is_subset(right_refs) {
        right_reqs.push(e.clone());
        return Ok(());
    }

    for col in e.retrieve_all_col_expr() {
        if col.outer_ref {
            continue;
        }
        let tab_ref = col
            .tab_ref
            .ok_or_else(|| PlanError::invalid_program(format!("unbound column `{}` in join predicate", col.alias)))?;
        if left_refs.contains(&tab_ref) {
            left_reqs.push(Expr::Column(col));
        } else if right_refs.contains(&tab_ref) {
            right_reqs.push(Expr::Column(col));
        } else {
            return Err(PlanError::invalid_program(format!(
                "column `{}` belongs to neither side of the join",
                col.alias
            )));
        }
    }
    Ok(())
}

/// Child-output requests an `Aggregate` node's group keys/having/output imply: every `Aggregate`
/// subtree is replaced by its `non_func_dependencies`, every bare `Column` is requested whole.
fn collect_child_requests(expr: &Expr, out: &mut Vec<Expr>) {
    match expr {
        Expr::Aggregate(a) => out.extend(a.non_func_dependencies()),
        Expr::Column(_) => out.push(expr.clone()),
        Expr::Literal(_) | Expr::Subquery(_) | Expr::ExprRef(_) => {}
        Expr::Arith(a) => {
            collect_child_requests(&a.left, out);
            collect_child_requests(&a.right, out);
        }
        Expr::Comparison(c) => {
            collect_child_requests(&c.left, out);
            collect_child_requests(&c.right, out);
        }
        Expr::Conjunction(c) => {
            collect_child_requests(&c.left, out);
            collect_child_requests(&c.right, out);
        }
        Expr::Function(f) => {
            for a in &f.args {
                collect_child_requests(a, out);
            }
        }
    }
}

/// Replaces every `Aggregate` subtree of `expr` by an `ExprRef` into `agg_core`, appending new
/// entries to `agg_core` in discovery order. `base_ordinal` is the number of group keys, since
/// the aggregate node's own output vector is conceptually `[group_keys..., agg_core...]`.
fn replace_aggregates(expr: &Expr, base_ordinal: usize, agg_core: &mut Vec<AggregateExpr>) -> Expr {
    if let Expr::Aggregate(a) = expr {
        let idx = match agg_core.iter().position(|existing| existing == a) {
            Some(idx) => idx,
            None => {
                agg_core.push(a.clone());
                agg_core.len() - 1
            }
        };
        return Expr::ExprRef(ExprRef {
            ordinal: base_ordinal + idx,
            resolved: Box::new(expr.clone()),
        });
    }
    expr.map_children(|c| replace_aggregates(c, base_ordinal, agg_core))
}

fn validate_non_grouped_columns(group_keys: &[Expr], output: &[Expr]) -> Result<()> {
    for expr in output {
        let offending = expr.visit_each_exists(
            &|e| match e {
                Expr::Column(_) => !group_keys.iter().any(|g| g.equals_ignoring_ordinal(e)),
                _ => false,
            },
            &[ExprKind::ExprRef],
        );
        if offending {
            return Err(PlanError::semantic(format!(
                "column `{expr}` must appear in the GROUP BY clause or be used in an aggregate function"
            )));
        }
    }
    Ok(())
}

fn dedup_exprs(exprs: Vec<Expr>) -> Vec<Expr> {
    let mut out: Vec<Expr> = Vec::new();
    for e in exprs {
        if !out.iter().any(|existing| existing.equals_ignoring_ordinal(&e)) {
            out.push(e);
        }
    }
    out
}

fn dedup_if(exprs: Vec<Expr>, remove_redundant: bool) -> Vec<Expr> {
    if remove_redundant {
        dedup_exprs(exprs)
    } else {
        exprs
    }
}

pub(crate) fn plan_table_refs(plan: &LogicalPlan) -> HashSet<TableRefId> {
    let mut out = HashSet::new();
    collect_plan_table_refs(plan, &mut out);
    out
}

fn collect_plan_table_refs(plan: &LogicalPlan, out: &mut HashSet<TableRefId>) {
    match plan {
        LogicalPlan::Scan(n) => {
            out.insert(n.node.table_ref.id());
        }
        LogicalPlan::FromQuery(n) => {
            out.insert(n.node.table_ref.id());
        }
        LogicalPlan::MemoRef(_) => collect_plan_table_refs(&plan.memo_sign(), out),
        _ => {}
    }
    for child in plan.children() {
        collect_plan_table_refs(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::comparison_expr::ComparisonOperator;
    use crate::expr::literal_expr::{DataType, Value};
    use crate::logical::table_ref::TableRef;

    fn orders_table() -> TableRef {
        TableRef::base_table(
            TableRefId(0),
            "orders",
            vec![
                ("o_orderkey".into(), DataType::Int64),
                ("o_orderpriority".into(), DataType::Utf8),
            ],
        )
    }

    #[test]
    fn scan_resolution_keeps_requested_columns_in_order() {
        let table = orders_table();
        let cols = table.all_column_refs();
        let scan = LogicalPlan::scan(table, None);
        let resolved = resolve(scan, &[cols[1].clone()], true).unwrap();
        assert_eq!(resolved.output().len(), 1);
        match &resolved.output()[0] {
            Expr::Column(c) => assert_eq!(c.alias, "o_orderpriority"),
            other => panic!("expected column, got {other:?}"),
        }
    }

    #[test]
    fn filter_wires_predicate_ordinals_against_child_output() {
        let table = orders_table();
        let cols = table.all_column_refs();
        let scan = LogicalPlan::scan(table, None);
        let predicate = Expr::Comparison(ComparisonExpr {
            op: ComparisonOperator::Eq,
            left: Box::new(cols[0].clone()),
            right: Box::new(Expr::Literal(crate::expr::literal_expr::LiteralExpr::new(Value::Int64(1)))),
        });
        let filter = LogicalPlan::new_filter(scan, predicate);
        let resolved = resolve(filter, &[cols[0].clone()], true).unwrap();
        match resolved.filter().unwrap() {
            Expr::Comparison(c) => match c.left.as_ref() {
                Expr::Column(left) => assert_eq!(left.ordinal, 0),
                other => panic!("expected column, got {other:?}"),
            },
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn aggregate_wires_group_keys_and_dedupes_agg_core() {
        let table = TableRef::base_table(
            TableRefId(0),
            "t",
            vec![
                ("a1".into(), DataType::Int64),
                ("a2".into(), DataType::Int64),
                ("a3".into(), DataType::Int64),
            ],
        );
        let cols = table.all_column_refs();
        let a1 = cols[0].clone();
        let a2 = cols[1].clone();
        let a3 = cols[2].clone();
        let scan = LogicalPlan::scan(table, None);

        let sum_a1 = Expr::Aggregate(AggregateExpr {
            kind: crate::expr::aggregate_expr::AggKind::Sum,
            args: vec![a1.clone()],
        });
        let sum_a2_a3 = Expr::Aggregate(AggregateExpr {
            kind: crate::expr::aggregate_expr::AggKind::Sum,
            args: vec![Expr::Arith(ArithExpr {
                op: crate::expr::arith_expr::ArithOperator::Add,
                left: Box::new(a2),
                right: Box::new(a3),
            })],
        });
        // a1, sum(a1), sum(a1) + sum(a2+a3)
        let output_exprs = vec![
            a1.clone(),
            sum_a1.clone(),
            Expr::Arith(ArithExpr {
                op: crate::expr::arith_expr::ArithOperator::Add,
                left: Box::new(sum_a1.clone()),
                right: Box::new(sum_a2_a3.clone()),
            }),
        ];

        let agg = LogicalPlan::aggregate(scan, vec![a1.clone()], None);
        let resolved = resolve(agg, &output_exprs, true).unwrap();

        let agg_core = match &resolved {
            LogicalPlan::Aggregate(n) => &n.node.agg_core,
            other => panic!("expected aggregate, got {other:?}"),
        };
        assert_eq!(agg_core.len(), 2);
        assert_eq!(agg_core[0], match &sum_a1 {
            Expr::Aggregate(a) => a.clone(),
            _ => unreachable!(),
        });
    }

    #[test]
    fn non_grouped_column_is_rejected() {
        let table = TableRef::base_table(
            TableRefId(0),
            "a",
            vec![("i".into(), DataType::Int64), ("j".into(), DataType::Int64)],
        );
        let cols = table.all_column_refs();
        let scan = LogicalPlan::scan(table, None);
        let sum_j = Expr::Aggregate(AggregateExpr {
            kind: crate::expr::aggregate_expr::AggKind::Sum,
            args: vec![cols[1].clone()],
        });
        let agg = LogicalPlan::aggregate(scan, Vec::new(), None);
        let err = resolve(agg, &[cols[0].clone(), sum_j], true).unwrap_err();
        assert!(matches!(err, PlanError::SemanticAnalyze { .. }));
    }
}
