//! Named relations a [`crate::logical::operator::LogicalPlan`] scans or a [`ColumnExpr`] points
//! into.
//!
//! A table ref is identified by a small `Copy` id everywhere it's *referenced* (cheap to compare,
//! cheap to carry around in a [`crate::expr::Expr::Column`]), while the actual column list and,
//! for subqueries, the owned plan live once in the [`TableRef`] the id names.

use once_cell::sync::OnceCell;
use std::rc::Rc;

use crate::expr::column_expr::ColumnExpr;
use crate::expr::literal_expr::DataType;
use crate::expr::Expr;
use crate::logical::bind_context::BindContext;
use crate::logical::operator::LogicalPlan;

/// Identifies one [`TableRef`] across the whole plan tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableRefId(pub usize);

#[derive(Debug)]
pub struct BaseTableRef {
    pub id: TableRefId,
    pub name: String,
    pub columns: Vec<(String, DataType)>,
    output_cache: OnceCell<Vec<Expr>>,
}

#[derive(Debug)]
pub struct ExternalFileRef {
    pub id: TableRefId,
    pub filename: String,
    pub columns: Vec<(String, DataType)>,
    output_cache: OnceCell<Vec<Expr>>,
}

#[derive(Debug)]
pub struct SubqueryTableRef {
    pub id: TableRefId,
    pub alias: String,
    /// The nested query's plan root.
    pub plan: Box<LogicalPlan>,
    /// Scopes visible while the subquery body was bound.
    pub bind_context: BindContext,
    /// Outer-scope columns referenced somewhere inside `plan`. These must be threaded through
    /// this table ref's output so they survive for correlated evaluation above it (see
    /// `add_outer_refs_to_output`).
    pub outer_refs: Vec<Expr>,
    output_cache: OnceCell<Vec<Expr>>,
}

/// A named source a scan or from-clause entry can point at.
#[derive(Debug, Clone)]
pub enum TableRef {
    BaseTable(Rc<BaseTableRef>),
    SubqueryRef(Rc<SubqueryTableRef>),
    ExternalFile(Rc<ExternalFileRef>),
}

impl TableRef {
    pub fn base_table(id: TableRefId, name: impl Into<String>, columns: Vec<(String, DataType)>) -> Self {
        TableRef::BaseTable(Rc::new(BaseTableRef {
            id,
            name: name.into(),
            columns,
            output_cache: OnceCell::new(),
        }))
    }

    pub fn external_file(
        id: TableRefId,
        filename: impl Into<String>,
        columns: Vec<(String, DataType)>,
    ) -> Self {
        TableRef::ExternalFile(Rc::new(ExternalFileRef {
            id,
            filename: filename.into(),
            columns,
            output_cache: OnceCell::new(),
        }))
    }

    pub fn subquery(
        id: TableRefId,
        alias: impl Into<String>,
        plan: LogicalPlan,
        bind_context: BindContext,
        outer_refs: Vec<Expr>,
    ) -> Self {
        TableRef::SubqueryRef(Rc::new(SubqueryTableRef {
            id,
            alias: alias.into(),
            plan: Box::new(plan),
            bind_context,
            outer_refs,
            output_cache: OnceCell::new(),
        }))
    }

    pub fn id(&self) -> TableRefId {
        match self {
            TableRef::BaseTable(t) => t.id,
            TableRef::SubqueryRef(t) => t.id,
            TableRef::ExternalFile(t) => t.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TableRef::BaseTable(t) => &t.name,
            TableRef::SubqueryRef(t) => &t.alias,
            TableRef::ExternalFile(t) => &t.filename,
        }
    }

    fn columns(&self) -> Option<&[(String, DataType)]> {
        match self {
            TableRef::BaseTable(t) => Some(&t.columns),
            TableRef::ExternalFile(t) => Some(&t.columns),
            TableRef::SubqueryRef(_) => None,
        }
    }

    fn output_cache(&self) -> &OnceCell<Vec<Expr>> {
        match self {
            TableRef::BaseTable(t) => &t.output_cache,
            TableRef::ExternalFile(t) => &t.output_cache,
            TableRef::SubqueryRef(t) => &t.output_cache,
        }
    }

    /// The ordered list of [`ColumnExpr`] leaves this table ref exposes as its logical output.
    ///
    /// For base tables and external files this is derived from the catalog-provided column
    /// list. For a subquery-as-table this is derived from the subquery plan's own (already
    /// resolved) output, one `ColumnExpr` per position.
    pub fn all_column_refs(&self) -> Vec<Expr> {
        self.output_cache()
            .get_or_init(|| match self {
                TableRef::SubqueryRef(t) => (0..t.plan.output().len())
                    .map(|ordinal| {
                        Expr::Column(ColumnExpr {
                            alias: format!("col{ordinal}"),
                            tab_ref: Some(self.id()),
                            outer_ref: false,
                            ordinal: ordinal as i64,
                        })
                    })
                    .collect(),
                _ => self
                    .columns()
                    .expect("base table/external file always carries a column list")
                    .iter()
                    .enumerate()
                    .map(|(ordinal, (name, _))| {
                        Expr::Column(ColumnExpr {
                            alias: name.clone(),
                            tab_ref: Some(self.id()),
                            outer_ref: false,
                            ordinal: ordinal as i64,
                        })
                    })
                    .collect(),
            })
            .clone()
    }

    /// Appends any outer-scope columns this table ref depends on to `list`, skipping ones
    /// already present by structural equality. Only subqueries ever carry outer refs; base
    /// tables and external files are a no-op.
    pub fn add_outer_refs_to_output(&self, list: &mut Vec<Expr>) {
        if let TableRef::SubqueryRef(t) = self {
            for outer in &t.outer_refs {
                if !list.iter().any(|existing| existing.equals_ignoring_ordinal(outer)) {
                    list.push(outer.clone());
                }
            }
        }
    }
}

impl PartialEq for TableRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for TableRef {}

impl std::hash::Hash for TableRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_table_column_refs_carry_ordinals() {
        let t = TableRef::base_table(
            TableRefId(0),
            "orders",
            vec![
                ("o_orderkey".to_string(), DataType::Int64),
                ("o_orderpriority".to_string(), DataType::Utf8),
            ],
        );
        let cols = t.all_column_refs();
        assert_eq!(cols.len(), 2);
        match &cols[1] {
            Expr::Column(c) => {
                assert_eq!(c.alias, "o_orderpriority");
                assert_eq!(c.ordinal, 1);
                assert_eq!(c.tab_ref, Some(TableRefId(0)));
            }
            other => panic!("expected column, got {other:?}"),
        }
    }

    #[test]
    fn table_ref_equality_is_by_id_not_pointer() {
        let a = TableRef::base_table(TableRefId(5), "a", vec![]);
        let b = a.clone();
        assert_eq!(a, b);
    }
}
