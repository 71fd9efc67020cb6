//! A minimal Cascades-style memo group.
//!
//! This core does not implement search: it only defines the shape a [`crate::logical::operator::LogicalPlan`]
//! needs so that a future memo-based optimizer and the direct translation path in
//! [`crate::physical::translate`] can share one tree type. `use_memo` (see [`crate::config::PlannerConfig`])
//! stays `false` by default; direct translation must work against a fully materialized tree with
//! no `MemoRef` present at all.

use std::cell::RefCell;
use std::rc::Rc;

use crate::logical::operator::LogicalPlan;

/// A set of logically-equivalent plans for one subtree, one of which is canonical.
#[derive(Debug)]
pub struct MemoGroup {
    members: Vec<LogicalPlan>,
    canonical_idx: usize,
}

impl MemoGroup {
    pub fn new(canonical: LogicalPlan) -> Self {
        MemoGroup {
            members: vec![canonical],
            canonical_idx: 0,
        }
    }

    pub fn into_shared(self) -> Rc<RefCell<MemoGroup>> {
        Rc::new(RefCell::new(self))
    }

    /// Adds an equivalent member without changing which one is canonical.
    pub fn add_member(&mut self, plan: LogicalPlan) {
        self.members.push(plan);
    }

    pub fn canonical(&self) -> LogicalPlan {
        self.members[self.canonical_idx].clone()
    }

    pub fn set_canonical(&mut self, idx: usize) {
        assert!(idx < self.members.len(), "memo group member index out of range");
        self.canonical_idx = idx;
    }

    pub fn members(&self) -> &[LogicalPlan] {
        &self.members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::column_expr::ColumnExpr;
    use crate::expr::Expr;
    use crate::logical::operator::{LogicalPlan, ScanNode};
    use crate::logical::table_ref::{TableRef, TableRefId};

    fn scan(id: usize) -> LogicalPlan {
        let table_ref = TableRef::base_table(TableRefId(id), "t", vec![]);
        LogicalPlan::scan(table_ref, None)
    }

    #[test]
    fn canonical_defaults_to_first_member() {
        let group = MemoGroup::new(scan(0));
        assert_eq!(group.canonical(), scan(0));
    }

    #[test]
    fn set_canonical_switches_member() {
        let mut group = MemoGroup::new(scan(0));
        group.add_member(scan(1));
        group.set_canonical(1);
        assert_eq!(group.canonical(), scan(1));
        // sanity: column built from a bogus table ref never equals the canonical scan.
        let _ = Expr::Column(ColumnExpr::unresolved("x", TableRefId(9)));
    }
}
