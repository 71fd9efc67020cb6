//! A minimal binder-scope tracker.
//!
//! Full SQL binding (resolving `orders.o_orderkey` style names against catalog schemas) is
//! expected to happen upstream of this crate — an external parser/binder hands us an already-bound
//! tree of [`crate::expr::Expr`] referencing [`crate::logical::table_ref::TableRef`]s directly.
//! What this module keeps is the bookkeeping a `Subquery` table reference needs to carry around:
//! the chain of scopes that were visible while its body was bound.

use super::table_ref::TableRefId;

/// Index of a [`ChildBindContext`] within a [`BindContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindContextIdx(pub usize);

/// A single level of scoping: the table refs visible at one nesting depth of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildBindContext {
    /// The enclosing scope, if any. `None` for the outermost context of a statement.
    pub parent: Option<BindContextIdx>,
    /// Table refs bound directly in this scope, in FROM-clause order.
    pub scopes: Vec<TableRefId>,
}

/// The full chain of scopes visible while binding one query (and its subqueries).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindContext {
    contexts: Vec<ChildBindContext>,
}

impl BindContext {
    pub fn new() -> Self {
        BindContext {
            contexts: vec![ChildBindContext::default()],
        }
    }

    pub fn root(&self) -> BindContextIdx {
        BindContextIdx(0)
    }

    /// Opens a new scope nested under `parent`, returning its index.
    pub fn new_child(&mut self, parent: BindContextIdx) -> BindContextIdx {
        let idx = self.contexts.len();
        self.contexts.push(ChildBindContext {
            parent: Some(parent),
            scopes: Vec::new(),
        });
        BindContextIdx(idx)
    }

    pub fn push_table_ref(&mut self, idx: BindContextIdx, table_ref: TableRefId) {
        self.contexts[idx.0].scopes.push(table_ref);
    }

    /// Walks from `idx` up through enclosing scopes, true if `table_ref` is visible somewhere in
    /// the chain (used only by tests/diagnostics — resolution itself works off already-bound
    /// `Expr` trees, not name lookup).
    pub fn is_visible(&self, idx: BindContextIdx, table_ref: TableRefId) -> bool {
        let mut cur = Some(idx);
        while let Some(i) = cur {
            let ctx = &self.contexts[i.0];
            if ctx.scopes.contains(&table_ref) {
                return true;
            }
            cur = ctx.parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outer_scope_is_visible_from_child() {
        let mut bc = BindContext::new();
        let outer_table = TableRefId(0);
        bc.push_table_ref(bc.root(), outer_table);

        let child = bc.new_child(bc.root());
        assert!(bc.is_visible(child, outer_table));
        assert!(!bc.is_visible(child, TableRefId(1)));
    }
}
