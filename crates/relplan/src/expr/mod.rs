//! The expression algebra: a closed family of expression nodes with deep cloning, structural
//! equality/hashing, recursive visitation and search-and-replace.
//!
//! Laid out one file per variant: the enum lives here, each case's data and `Display` impl lives
//! in its own module.

pub mod aggregate_expr;
pub mod arith_expr;
pub mod column_expr;
pub mod comparison_expr;
pub mod conjunction_expr;
pub mod expr_ref;
pub mod function_expr;
pub mod literal_expr;
pub mod subquery_expr;

use std::collections::HashSet;
use std::fmt;

use aggregate_expr::AggregateExpr;
use arith_expr::ArithExpr;
use column_expr::ColumnExpr;
use comparison_expr::ComparisonExpr;
use conjunction_expr::ConjunctionExpr;
use expr_ref::ExprRef;
use function_expr::FunctionExpr;
use literal_expr::{DataType, LiteralExpr};
use subquery_expr::SubqueryExpr;

use crate::logical::table_ref::TableRefId;

#[derive(Debug, Clone, PartialEq, Hash)]
pub enum Expr {
    Literal(LiteralExpr),
    Column(ColumnExpr),
    Arith(ArithExpr),
    Comparison(ComparisonExpr),
    Conjunction(ConjunctionExpr),
    Function(FunctionExpr),
    Aggregate(AggregateExpr),
    Subquery(SubqueryExpr),
    ExprRef(ExprRef),
}

/// Bare discriminant of an [`Expr`], with no payload. Used by [`Expr::visit_each_exists`] to name
/// subtree roots to skip without having to construct a dummy value of that variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Literal,
    Column,
    Arith,
    Comparison,
    Conjunction,
    Function,
    Aggregate,
    Subquery,
    ExprRef,
}

impl Expr {
    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Literal(_) => ExprKind::Literal,
            Expr::Column(_) => ExprKind::Column,
            Expr::Arith(_) => ExprKind::Arith,
            Expr::Comparison(_) => ExprKind::Comparison,
            Expr::Conjunction(_) => ExprKind::Conjunction,
            Expr::Function(_) => ExprKind::Function,
            Expr::Aggregate(_) => ExprKind::Aggregate,
            Expr::Subquery(_) => ExprKind::Subquery,
            Expr::ExprRef(_) => ExprKind::ExprRef,
        }
    }

    pub fn is_column(&self) -> bool {
        matches!(self, Expr::Column(_))
    }

    pub fn is_expr_ref(&self) -> bool {
        matches!(self, Expr::ExprRef(_))
    }

    pub fn as_column(&self) -> Option<&ColumnExpr> {
        match self {
            Expr::Column(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_aggregate(&self) -> Option<&AggregateExpr> {
        match self {
            Expr::Aggregate(a) => Some(a),
            _ => None,
        }
    }

    /// Rebuilds this expression with every direct and indirect child replaced by `f(child)`.
    /// Leaves (`Literal`, `Column`, `Subquery`) are returned unchanged — a `Subquery` is opaque
    /// at the expression-tree level; rewriting what's inside it is the subquery rewriter's job,
    /// operating on the logical plan it owns, not on this `Expr`.
    pub fn map_children<F: FnMut(&Expr) -> Expr>(&self, mut f: F) -> Expr {
        match self {
            Expr::Literal(_) | Expr::Column(_) | Expr::Subquery(_) => self.clone(),
            Expr::Arith(a) => Expr::Arith(ArithExpr {
                op: a.op,
                left: Box::new(f(&a.left)),
                right: Box::new(f(&a.right)),
            }),
            Expr::Comparison(c) => Expr::Comparison(ComparisonExpr {
                op: c.op,
                left: Box::new(f(&c.left)),
                right: Box::new(f(&c.right)),
            }),
            Expr::Conjunction(c) => Expr::Conjunction(ConjunctionExpr {
                op: c.op,
                left: Box::new(f(&c.left)),
                right: Box::new(f(&c.right)),
            }),
            Expr::Function(fe) => Expr::Function(FunctionExpr {
                name: fe.name.clone(),
                args: fe.args.iter().map(|a| f(a)).collect(),
            }),
            Expr::Aggregate(a) => Expr::Aggregate(AggregateExpr {
                kind: a.kind,
                args: a.args.iter().map(|a| f(a)).collect(),
            }),
            Expr::ExprRef(r) => Expr::ExprRef(ExprRef {
                ordinal: r.ordinal,
                resolved: Box::new(f(&r.resolved)),
            }),
        }
    }

    /// Pre-order traversal, visiting `self` before any children.
    pub fn visit_each<F: FnMut(&Expr)>(&self, f: &mut F) {
        f(self);
        match self {
            Expr::Literal(_) | Expr::Column(_) | Expr::Subquery(_) => {}
            Expr::Arith(a) => {
                a.left.visit_each(f);
                a.right.visit_each(f);
            }
            Expr::Comparison(c) => {
                c.left.visit_each(f);
                c.right.visit_each(f);
            }
            Expr::Conjunction(c) => {
                c.left.visit_each(f);
                c.right.visit_each(f);
            }
            Expr::Function(fe) => {
                for a in &fe.args {
                    a.visit_each(f);
                }
            }
            Expr::Aggregate(a) => {
                for a in &a.args {
                    a.visit_each(f);
                }
            }
            Expr::ExprRef(r) => r.resolved.visit_each(f),
        }
    }

    /// Pre-order traversal that short-circuits as soon as `pred` returns true, and does not
    /// descend into any subtree whose root kind is in `stop_kinds`.
    pub fn visit_each_exists<F: Fn(&Expr) -> bool>(&self, pred: &F, stop_kinds: &[ExprKind]) -> bool {
        if pred(self) {
            return true;
        }
        if stop_kinds.contains(&self.kind()) {
            return false;
        }
        match self {
            Expr::Literal(_) | Expr::Column(_) | Expr::Subquery(_) => false,
            Expr::Arith(a) => {
                a.left.visit_each_exists(pred, stop_kinds) || a.right.visit_each_exists(pred, stop_kinds)
            }
            Expr::Comparison(c) => {
                c.left.visit_each_exists(pred, stop_kinds) || c.right.visit_each_exists(pred, stop_kinds)
            }
            Expr::Conjunction(c) => {
                c.left.visit_each_exists(pred, stop_kinds) || c.right.visit_each_exists(pred, stop_kinds)
            }
            Expr::Function(fe) => fe.args.iter().any(|a| a.visit_each_exists(pred, stop_kinds)),
            Expr::Aggregate(a) => a.args.iter().any(|a| a.visit_each_exists(pred, stop_kinds)),
            Expr::ExprRef(r) => r.resolved.visit_each_exists(pred, stop_kinds),
        }
    }

    /// Returns a clone of `self` with every subtree structurally equal to `target` replaced by a
    /// clone of `replacement`.
    pub fn search_replace(&self, target: &Expr, replacement: &Expr) -> Expr {
        if self == target {
            return replacement.clone();
        }
        self.map_children(|child| child.search_replace(target, replacement))
    }

    /// The set of (non-outer) table refs named by any `Column` in this expression. A `Subquery`
    /// is opaque here: its own column references live in a different scope and don't contribute
    /// to this expression's table-ref set.
    pub fn table_refs(&self) -> HashSet<TableRefId> {
        let mut out = HashSet::new();
        self.visit_each(&mut |e| {
            if let Expr::Column(c) = e {
                if !c.outer_ref {
                    if let Some(t) = c.tab_ref {
                        out.insert(t);
                    }
                }
            }
        });
        out
    }

    /// Every `Column` leaf reachable from this expression, in traversal order.
    pub fn retrieve_all_col_expr(&self) -> Vec<ColumnExpr> {
        let mut out = Vec::new();
        self.visit_each(&mut |e| {
            if let Expr::Column(c) = e {
                out.push(c.clone());
            }
        });
        out
    }

    /// Deep clone with every `Column.ordinal` reset to unresolved (`-1`). Outer refs keep
    /// `outer_ref = true` (resolution never needs to touch that flag).
    pub fn clone_resetting_ordinals(&self) -> Expr {
        match self {
            Expr::Column(c) => Expr::Column(ColumnExpr {
                ordinal: -1,
                ..c.clone()
            }),
            other => other.map_children(|c| c.clone_resetting_ordinals()),
        }
    }

    /// Structural equality ignoring the resolved `ordinal` on any `Column` — which is exactly
    /// what `PartialEq` already does (`ColumnExpr`'s hand-written impl skips `ordinal`); this is
    /// just a name for call sites where that's clearer than a bare `==`.
    pub fn equals_ignoring_ordinal(&self, other: &Expr) -> bool {
        self == other
    }

    /// Best-effort result type. Returns `None` where a full catalog/function registry would be
    /// required to know (plain columns, scalar function calls) — this crate does not carry one.
    pub fn datatype(&self) -> Option<DataType> {
        match self {
            Expr::Literal(l) => Some(l.datatype),
            Expr::Comparison(_) | Expr::Conjunction(_) => Some(DataType::Boolean),
            Expr::Arith(a) => {
                let (l, r) = (a.left.datatype()?, a.right.datatype()?);
                Some(if l == DataType::Float64 || r == DataType::Float64 {
                    DataType::Float64
                } else {
                    DataType::Int64
                })
            }
            Expr::Aggregate(a) => match a.kind {
                aggregate_expr::AggKind::Count => Some(DataType::Int64),
                _ => a.args.first().and_then(|a| a.datatype()),
            },
            Expr::ExprRef(r) => r.resolved.datatype(),
            Expr::Column(_) | Expr::Function(_) | Expr::Subquery(_) => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(e) => write!(f, "{e}"),
            Expr::Column(e) => write!(f, "{e}"),
            Expr::Arith(e) => write!(f, "{e}"),
            Expr::Comparison(e) => write!(f, "{e}"),
            Expr::Conjunction(e) => write!(f, "{e}"),
            Expr::Function(e) => write!(f, "{e}"),
            Expr::Aggregate(e) => write!(f, "{e}"),
            Expr::Subquery(e) => write!(f, "{e}"),
            Expr::ExprRef(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::literal_expr::Value;
    use crate::logical::table_ref::TableRefId;

    fn col(alias: &str, t: TableRefId) -> Expr {
        Expr::Column(ColumnExpr::unresolved(alias, t))
    }

    fn lit(v: i64) -> Expr {
        Expr::Literal(LiteralExpr::new(Value::Int64(v)))
    }

    #[test]
    fn equality_ignores_ordinal() {
        let mut resolved = ColumnExpr::unresolved("a", TableRefId(0));
        resolved.ordinal = 3;
        let unresolved = ColumnExpr::unresolved("a", TableRefId(0));
        assert_eq!(Expr::Column(resolved), Expr::Column(unresolved));
    }

    #[test]
    fn search_replace_rewrites_every_matching_subtree() {
        let a = col("a", TableRefId(0));
        let expr = Expr::Arith(ArithExpr {
            op: arith_expr::ArithOperator::Add,
            left: Box::new(a.clone()),
            right: Box::new(a.clone()),
        });
        let replaced = expr.search_replace(&a, &lit(9));
        let expected = Expr::Arith(ArithExpr {
            op: arith_expr::ArithOperator::Add,
            left: Box::new(lit(9)),
            right: Box::new(lit(9)),
        });
        assert_eq!(replaced, expected);
    }

    #[test]
    fn table_refs_excludes_outer_and_skips_into_subquery() {
        let t0 = TableRefId(0);
        let t1 = TableRefId(1);
        let outer = Expr::Column(ColumnExpr::outer("k", t1));
        let local = col("i", t0);
        let expr = Expr::Comparison(ComparisonExpr {
            op: comparison_expr::ComparisonOperator::Eq,
            left: Box::new(local),
            right: Box::new(outer),
        });
        let refs = expr.table_refs();
        assert_eq!(refs.len(), 1);
        assert!(refs.contains(&t0));
    }

    #[test]
    fn visit_each_exists_stops_at_expr_ref() {
        let inner = col("a", TableRefId(0));
        let wrapped = Expr::ExprRef(ExprRef {
            ordinal: 0,
            resolved: Box::new(inner.clone()),
        });
        assert!(wrapped.visit_each_exists(&|e| *e == inner, &[]));
        assert!(!wrapped.visit_each_exists(&|e| *e == inner, &[ExprKind::ExprRef]));
    }

    #[test]
    fn clone_resetting_ordinals_only_touches_columns() {
        let mut c = ColumnExpr::unresolved("a", TableRefId(0));
        c.ordinal = 7;
        let expr = Expr::Arith(ArithExpr {
            op: arith_expr::ArithOperator::Add,
            left: Box::new(Expr::Column(c)),
            right: Box::new(lit(1)),
        });
        let reset = expr.clone_resetting_ordinals();
        match reset {
            Expr::Arith(a) => match *a.left {
                Expr::Column(c) => assert_eq!(c.ordinal, -1),
                _ => panic!("expected column"),
            },
            _ => panic!("expected arith"),
        }
    }
}
