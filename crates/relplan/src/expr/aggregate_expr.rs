use std::fmt;

use fmtutil::IntoDisplayableSlice;

use super::Expr;

/// The closed set of aggregate functions this crate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggKind {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl fmt::Display for AggKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count => write!(f, "count"),
            Self::Sum => write!(f, "sum"),
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
            Self::Avg => write!(f, "avg"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Hash)]
pub struct AggregateExpr {
    pub kind: AggKind,
    /// Arguments to the aggregate. Empty for `count(*)`.
    pub args: Vec<Expr>,
}

impl AggregateExpr {
    /// The arguments to this aggregate with any nested aggregate functions stripped out, so
    /// `sum(a + b)` yields `{a + b}` but `sum(sum(a))` (never valid SQL) yields `{}` rather than
    /// descending into the inner aggregate. The set of plain columns this aggregate's arguments
    /// actually read, used by the resolver to figure out what its child needs to produce.
    pub fn non_func_dependencies(&self) -> Vec<Expr> {
        self.args
            .iter()
            .filter(|a| !matches!(a, Expr::Aggregate(_)))
            .cloned()
            .collect()
    }
}

impl fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.args.display_with_parens())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::column_expr::ColumnExpr;
    use crate::expr::arith_expr::{ArithExpr, ArithOperator};
    use crate::logical::table_ref::TableRefId;

    #[test]
    fn non_func_dependencies_keeps_plain_argument_expression() {
        let a = Expr::Column(ColumnExpr::unresolved("a", TableRefId(0)));
        let b = Expr::Column(ColumnExpr::unresolved("b", TableRefId(0)));
        let sum_arg = Expr::Arith(ArithExpr {
            op: ArithOperator::Add,
            left: Box::new(a),
            right: Box::new(b),
        });
        let agg = AggregateExpr {
            kind: AggKind::Sum,
            args: vec![sum_arg.clone()],
        };
        assert_eq!(agg.non_func_dependencies(), vec![sum_arg]);
    }
}
