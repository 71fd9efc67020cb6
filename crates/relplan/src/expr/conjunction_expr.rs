use std::fmt;

use super::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConjunctionOperator {
    And,
    Or,
}

impl fmt::Display for ConjunctionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Hash)]
pub struct ConjunctionExpr {
    pub op: ConjunctionOperator,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

impl fmt::Display for ConjunctionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.left, self.op, self.right)
    }
}

/// ANDs every expression in `exprs` together, left to right. Returns `None` for an empty
/// iterator rather than manufacturing a `TRUE` literal — callers (e.g. filter pushdown) decide
/// what an empty conjunct list means for them.
pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    let mut iter = exprs.into_iter();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, next| {
        Expr::Conjunction(ConjunctionExpr {
            op: ConjunctionOperator::And,
            left: Box::new(acc),
            right: Box::new(next),
        })
    }))
}

/// Splits a (possibly nested) AND conjunction back into its individual conjuncts, in left to
/// right order. The inverse of [`and_all`] for `ConjunctionOperator::And`.
pub fn split_conjuncts(expr: &Expr) -> Vec<Expr> {
    match expr {
        Expr::Conjunction(ConjunctionExpr {
            op: ConjunctionOperator::And,
            left,
            right,
        }) => {
            let mut out = split_conjuncts(left);
            out.extend(split_conjuncts(right));
            out
        }
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::literal_expr::{LiteralExpr, Value};

    fn lit(v: i64) -> Expr {
        Expr::Literal(LiteralExpr::new(Value::Int64(v)))
    }

    #[test]
    fn and_all_then_split_conjuncts_roundtrips() {
        let exprs = vec![lit(1), lit(2), lit(3)];
        let anded = and_all(exprs.clone()).unwrap();
        assert_eq!(split_conjuncts(&anded), exprs);
    }

    #[test]
    fn and_all_empty_is_none() {
        assert!(and_all(Vec::<Expr>::new()).is_none());
    }
}
