//! Logical-to-physical translation: `to_physical(logic, options) -> Result<PhysicalPlan>`, a
//! single post-order walk mapping each logical node to its physical counterpart and picking a
//! join strategy for generic joins.

use std::collections::HashSet;

use relplan_error::{not_implemented, Result};

use crate::config::PlannerConfig;
use crate::expr::comparison_expr::ComparisonOperator;
use crate::expr::Expr;
use crate::logical::operator::{JoinType, LogicalPlan};
use crate::logical::resolve::plan_table_refs;
use crate::logical::table_ref::{TableRef, TableRefId};
use crate::physical::cost;
use crate::physical::operator::{
    FilterNode, FromQueryNode, HashAggNode, HashJoinNode, InsertNode, MarkJoinNode, NLJoinNode, OrderNode, PhysNode, PhysicalPlan,
    ProfilingNode, ResultNode, ScanFileNode, ScanNode, SingleJoinNode, SingleMarkJoinNode,
};
use crate::physical::profiling::ProfileRecord;

pub fn to_physical(logical: &LogicalPlan, options: &PlannerConfig) -> Result<PhysicalPlan> {
    tracing::debug!(profiling = options.profiling_enabled, "translating logical plan to physical");
    translate(logical, options)
}

fn translate(logical: &LogicalPlan, options: &PlannerConfig) -> Result<PhysicalPlan> {
    let logical = logical.memo_sign();
    let physical = match &logical {
        LogicalPlan::Scan(n) => {
            let base_cardinality = cost::scan_cardinality(None);
            let cardinality = match &n.filter {
                Some(f) => cost::filter_cardinality(base_cardinality, f),
                None => base_cardinality,
            };
            let node_cost = cost::scan_cost(base_cardinality);
            match &n.node.table_ref {
                TableRef::ExternalFile(_) => PhysicalPlan::ScanFile(PhysNode::new(
                    ScanFileNode,
                    Vec::new(),
                    n.output.clone(),
                    n.filter.clone(),
                    node_cost,
                    cardinality,
                )),
                _ => PhysicalPlan::Scan(PhysNode::new(ScanNode, Vec::new(), n.output.clone(), n.filter.clone(), node_cost, cardinality)),
            }
        }

        LogicalPlan::Filter(n) => {
            let child = translate(&n.children[0], options)?;
            let predicate = n.filter.clone().expect("Filter node always carries a predicate");
            let cardinality = cost::filter_cardinality(child.cardinality(), &predicate);
            let node_cost = cost::filter_cost(child.cardinality()).plus_children(&[child.cost().0]);
            PhysicalPlan::Filter(PhysNode::new(FilterNode, vec![child], n.output.clone(), Some(predicate), node_cost, cardinality))
        }

        LogicalPlan::Join(n) => {
            let left_logical = &n.children[0];
            let right_logical = &n.children[1];
            let left_refs = plan_table_refs(left_logical);
            let right_refs = plan_table_refs(right_logical);
            let left = translate(left_logical, options)?;
            let right = translate(right_logical, options)?;
            let predicate = n.node.predicate.clone();

            match n.node.join_type {
                JoinType::MarkJoin => {
                    let cardinality = cost::mark_join_cardinality(left.cardinality());
                    let node_cost = cost::mark_join_cost(left.cardinality(), right.cardinality()).plus_children(&[left.cost().0, right.cost().0]);
                    PhysicalPlan::MarkJoin(PhysNode::new(
                        MarkJoinNode { predicate },
                        vec![left, right],
                        n.output.clone(),
                        None,
                        node_cost,
                        cardinality,
                    ))
                }
                JoinType::SingleJoin => {
                    let cardinality = cost::mark_join_cardinality(left.cardinality());
                    let node_cost = cost::mark_join_cost(left.cardinality(), right.cardinality()).plus_children(&[left.cost().0, right.cost().0]);
                    PhysicalPlan::SingleJoin(PhysNode::new(
                        SingleJoinNode { predicate },
                        vec![left, right],
                        n.output.clone(),
                        None,
                        node_cost,
                        cardinality,
                    ))
                }
                JoinType::SingleMarkJoin => {
                    let cardinality = cost::mark_join_cardinality(left.cardinality());
                    let node_cost = cost::mark_join_cost(left.cardinality(), right.cardinality()).plus_children(&[left.cost().0, right.cost().0]);
                    PhysicalPlan::SingleMarkJoin(PhysNode::new(
                        SingleMarkJoinNode { predicate },
                        vec![left, right],
                        n.output.clone(),
                        None,
                        node_cost,
                        cardinality,
                    ))
                }
                join_type => {
                    let hashable = filter_hashable(&predicate, &left_refs, &right_refs);
                    let left_outer_free = !subtree_has_outer_ref(left_logical);
                    let use_hash = options.enable_hashjoin && hashable && left_outer_free;
                    tracing::trace!(%join_type, hashable, left_outer_free, use_hash, "choosing join strategy");

                    if use_hash {
                        let cardinality = cost::join_cardinality(left.cardinality(), right.cardinality(), &predicate);
                        let node_cost =
                            cost::hash_join_cost(left.cardinality(), right.cardinality()).plus_children(&[left.cost().0, right.cost().0]);
                        PhysicalPlan::HashJoin(PhysNode::new(
                            HashJoinNode { join_type, predicate },
                            vec![left, right],
                            n.output.clone(),
                            None,
                            node_cost,
                            cardinality,
                        ))
                    } else if options.enable_nljoin {
                        let cardinality = cost::join_cardinality(left.cardinality(), right.cardinality(), &predicate);
                        let node_cost = cost::nl_join_cost(left.cardinality(), right.cardinality()).plus_children(&[left.cost().0, right.cost().0]);
                        PhysicalPlan::NLJoin(PhysNode::new(
                            NLJoinNode { join_type, predicate },
                            vec![left, right],
                            n.output.clone(),
                            None,
                            node_cost,
                            cardinality,
                        ))
                    } else {
                        not_implemented!("join predicate {predicate} is not hashable and nested-loop join is disabled");
                    }
                }
            }
        }

        LogicalPlan::Aggregate(n) => {
            let child = translate(&n.children[0], options)?;
            let cardinality = cost::agg_cardinality(child.cardinality(), !n.node.group_keys.is_empty());
            let node_cost = cost::agg_cost(child.cardinality()).plus_children(&[child.cost().0]);
            PhysicalPlan::HashAgg(PhysNode::new(
                HashAggNode {
                    group_keys: n.node.group_keys.clone(),
                    agg_core: n.node.agg_core.clone(),
                },
                vec![child],
                n.output.clone(),
                n.filter.clone(),
                node_cost,
                cardinality,
            ))
        }

        LogicalPlan::Order(n) => {
            let child = translate(&n.children[0], options)?;
            let cardinality = child.cardinality();
            let node_cost = cost::order_cost(child.cardinality()).plus_children(&[child.cost().0]);
            PhysicalPlan::Order(PhysNode::new(
                OrderNode {
                    order_exprs: n.node.order_exprs.clone(),
                    descending: n.node.descending.clone(),
                },
                vec![child],
                n.output.clone(),
                None,
                node_cost,
                cardinality,
            ))
        }

        LogicalPlan::FromQuery(n) => {
            let child = translate(&n.children[0], options)?;
            let cardinality = child.cardinality();
            let node_cost = child.cost();
            PhysicalPlan::FromQuery(PhysNode::new(
                FromQueryNode {
                    table_ref: n.node.table_ref.clone(),
                },
                vec![child],
                n.output.clone(),
                None,
                node_cost,
                cardinality,
            ))
        }

        LogicalPlan::Insert(n) => {
            let child = translate(&n.children[0], options)?;
            let node_cost = child.cost();
            PhysicalPlan::Insert(PhysNode::new(
                InsertNode {
                    target_table: n.node.target_table.clone(),
                },
                vec![child],
                n.output.clone(),
                None,
                node_cost,
                0.0,
            ))
        }

        LogicalPlan::Result(n) => PhysicalPlan::Result(PhysNode::new(ResultNode, Vec::new(), n.output.clone(), None, cost::Cost::ZERO, 1.0)),

        LogicalPlan::MemoRef(_) => unreachable!("memo_sign() above always resolves MemoRef to its canonical member"),
    };

    Ok(wrap_profiling(physical, options))
}

/// A predicate is hashable iff it is a binary equality whose two sides have non-empty,
/// non-outer table-reference sets that partition cleanly across the join's two children.
/// Composite AND-of-equalities are deliberately not recognized here — multi-key hash join
/// construction is left as a fixed-off generalization rather than implemented.
fn filter_hashable(predicate: &Expr, left_refs: &HashSet<TableRefId>, right_refs: &HashSet<TableRefId>) -> bool {
    match predicate {
        Expr::Comparison(c) if c.op == ComparisonOperator::Eq => {
            let l = c.left.table_refs();
            let r = c.right.table_refs();
            if l.is_empty() || r.is_empty() {
                return false;
            }
            (l.is_subset(left_refs) && r.is_subset(right_refs)) || (l.is_subset(right_refs) && r.is_subset(left_refs))
        }
        _ => false,
    }
}

/// Whether any `Column` reachable from this subtree's filters/outputs is bound against an
/// enclosing scope. A hash join materializes its left side into a table once; that's unsound if
/// the left side's rows themselves depend on a correlated outer value that changes per outer
/// row, so such a join always falls back to `NLJoin`.
fn subtree_has_outer_ref(plan: &LogicalPlan) -> bool {
    let has_outer = |e: &Expr| e.retrieve_all_col_expr().iter().any(|c| c.outer_ref);
    if plan.output().iter().any(has_outer) {
        return true;
    }
    if plan.filter().is_some_and(has_outer) {
        return true;
    }
    if let LogicalPlan::Join(n) = plan {
        if has_outer(&n.node.predicate) {
            return true;
        }
    }
    plan.children().iter().any(subtree_has_outer_ref)
}

fn wrap_profiling(node: PhysicalPlan, options: &PlannerConfig) -> PhysicalPlan {
    if !options.profiling_enabled {
        return node;
    }
    let cost = node.cost();
    let cardinality = node.cardinality();
    let output = node.output().to_vec();
    PhysicalPlan::Profiling(PhysNode {
        filter: None,
        output,
        children: vec![node],
        cost,
        cardinality,
        profile: Some(ProfileRecord::empty()),
        node: ProfilingNode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::column_expr::ColumnExpr;
    use crate::expr::comparison_expr::ComparisonExpr;
    use crate::expr::literal_expr::DataType;
    use crate::logical::resolve::resolve;
    use crate::logical::table_ref::TableRefId;

    fn base_scan(id: usize, name: &str) -> LogicalPlan {
        LogicalPlan::scan(
            TableRef::base_table(TableRefId(id), name, vec![("i".to_string(), DataType::Int64), ("j".to_string(), DataType::Int64)]),
            None,
        )
    }

    fn col(alias: &str, t: TableRefId) -> Expr {
        Expr::Column(ColumnExpr::unresolved(alias, t))
    }

    #[test]
    fn equality_join_across_two_scans_becomes_hash_join() {
        let a = base_scan(0, "a");
        let b = base_scan(1, "b");
        let predicate = Expr::Comparison(ComparisonExpr {
            op: ComparisonOperator::Eq,
            left: Box::new(col("i", TableRefId(0))),
            right: Box::new(col("j", TableRefId(1))),
        });
        let join = LogicalPlan::join(a, b, JoinType::Inner, predicate);
        let resolved = resolve(join, &[col("i", TableRefId(0))], true).unwrap();

        let physical = to_physical(&resolved, &PlannerConfig::default()).unwrap();
        assert!(matches!(physical, PhysicalPlan::HashJoin(_)));
    }

    #[test]
    fn inequality_join_falls_back_to_nl_join() {
        let a = base_scan(0, "a");
        let b = base_scan(1, "b");
        let predicate = Expr::Comparison(ComparisonExpr {
            op: ComparisonOperator::Lt,
            left: Box::new(col("i", TableRefId(0))),
            right: Box::new(col("j", TableRefId(1))),
        });
        let join = LogicalPlan::join(a, b, JoinType::Inner, predicate);
        let resolved = resolve(join, &[], true).unwrap();

        let physical = to_physical(&resolved, &PlannerConfig::default()).unwrap();
        assert!(matches!(physical, PhysicalPlan::NLJoin(_)));
    }

    #[test]
    fn disabling_both_join_kinds_is_not_implemented() {
        let a = base_scan(0, "a");
        let b = base_scan(1, "b");
        let predicate = Expr::Comparison(ComparisonExpr {
            op: ComparisonOperator::Lt,
            left: Box::new(col("i", TableRefId(0))),
            right: Box::new(col("j", TableRefId(1))),
        });
        let join = LogicalPlan::join(a, b, JoinType::Inner, predicate);
        let resolved = resolve(join, &[], true).unwrap();

        let options = PlannerConfig {
            enable_hashjoin: false,
            enable_nljoin: false,
            ..PlannerConfig::default()
        };
        let err = to_physical(&resolved, &options).unwrap_err();
        assert!(matches!(err, relplan_error::PlanError::NotImplemented { .. }));
    }

    #[test]
    fn translation_is_deterministic_across_repeated_calls() {
        let a = base_scan(0, "a");
        let b = base_scan(1, "b");
        let predicate = Expr::Comparison(ComparisonExpr {
            op: ComparisonOperator::Eq,
            left: Box::new(col("i", TableRefId(0))),
            right: Box::new(col("j", TableRefId(1))),
        });
        let join = LogicalPlan::join(a, b, JoinType::Inner, predicate);
        let resolved = resolve(join, &[col("i", TableRefId(0))], true).unwrap();

        let first = to_physical(&resolved, &PlannerConfig::default()).unwrap();
        let second = to_physical(&resolved, &PlannerConfig::default()).unwrap();
        similar_asserts::assert_eq!(first, second);
    }

    #[test]
    fn profiling_wraps_every_node_when_enabled() {
        let scan = base_scan(0, "a");
        let resolved = resolve(scan, &[col("i", TableRefId(0))], true).unwrap();
        let options = PlannerConfig {
            profiling_enabled: true,
            ..PlannerConfig::default()
        };
        let physical = to_physical(&resolved, &options).unwrap();
        assert!(matches!(physical, PhysicalPlan::Profiling(_)));
        assert!(matches!(physical.physical_sign(), PhysicalPlan::Scan(_)));
    }
}
