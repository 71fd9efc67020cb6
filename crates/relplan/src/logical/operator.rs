//! The logical plan tree: a closed family of node kinds built around a generic [`Node<K>`]
//! carrying the fields common to every kind, wrapped by an enum that tags which kind-specific
//! payload `K` a given node holds.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::expr::aggregate_expr::AggregateExpr;
use crate::expr::Expr;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::logical::memo::MemoGroup;
use crate::logical::table_ref::TableRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    Semi,
    AntiSemi,
    /// EXISTS/IN rewrite target: left-preserving, right side contributes only a `#marker` bool.
    MarkJoin,
    /// Scalar-subquery rewrite target: left-preserving, right side contributes its single value
    /// column; at most one right-side match per outer row.
    SingleJoin,
    /// `SingleJoin` with an accompanying `#marker` (used when the scalar subquery also needs to
    /// distinguish "no match" from "matched a SQL NULL").
    SingleMarkJoin,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER"),
            Self::Left => write!(f, "LEFT"),
            Self::Right => write!(f, "RIGHT"),
            Self::Full => write!(f, "FULL"),
            Self::Cross => write!(f, "CROSS"),
            Self::Semi => write!(f, "SEMI"),
            Self::AntiSemi => write!(f, "ANTI"),
            Self::MarkJoin => write!(f, "MARK"),
            Self::SingleJoin => write!(f, "SINGLE"),
            Self::SingleMarkJoin => write!(f, "SINGLE_MARK"),
        }
    }
}

/// Name of the boolean column a mark/single-mark join appends to its left output.
pub const MARKER_COLUMN: &str = "#marker";

/// Wrapper carrying the fields every logical node kind shares.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<K> {
    /// Residual predicate evaluated at this node (`WHERE` for `Filter`, `HAVING` for
    /// `Aggregate`). `None` elsewhere.
    pub filter: Option<Expr>,
    /// This node's own output expression list, filled in by [`crate::logical::resolve`].
    pub output: Vec<Expr>,
    pub children: Vec<LogicalPlan>,
    pub node: K,
}

impl<K> Node<K> {
    pub fn leaf(node: K) -> Self {
        Node {
            filter: None,
            output: Vec::new(),
            children: Vec::new(),
            node,
        }
    }

    pub fn unary(node: K, child: LogicalPlan) -> Self {
        Node {
            filter: None,
            output: Vec::new(),
            children: vec![child],
            node,
        }
    }

    pub fn binary(node: K, left: LogicalPlan, right: LogicalPlan) -> Self {
        Node {
            filter: None,
            output: Vec::new(),
            children: vec![left, right],
            node,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanNode {
    pub table_ref: TableRef,
}

/// Payload-less: `Filter`'s predicate lives in [`Node::filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterNode;

#[derive(Debug, Clone, PartialEq)]
pub struct JoinNode {
    pub join_type: JoinType,
    pub predicate: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateNode {
    pub group_keys: Vec<Expr>,
    /// Deduplicated aggregate functions discovered in the output, in discovery order — the
    /// executor's aggregate-state vector. Populated by [`crate::logical::resolve`].
    pub agg_core: Vec<AggregateExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderNode {
    pub order_exprs: Vec<Expr>,
    pub descending: Vec<bool>,
}

/// A subquery used as a relation (`FROM (SELECT ...) t`). `table_ref` is always a
/// [`TableRef::SubqueryRef`].
#[derive(Debug, Clone, PartialEq)]
pub struct FromQueryNode {
    pub table_ref: TableRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertNode {
    pub target_table: TableRef,
}

/// Payload-less: a `Result` node's literal row lives in [`Node::output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultNode;

#[derive(Debug, Clone)]
pub struct MemoRefNode {
    pub group: Rc<RefCell<MemoGroup>>,
}

impl PartialEq for MemoRefNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.group, &other.group) || self.group.borrow().canonical() == other.group.borrow().canonical()
    }
}

#[derive(Debug, Clone)]
pub enum LogicalPlan {
    Scan(Node<ScanNode>),
    Filter(Node<FilterNode>),
    Join(Node<JoinNode>),
    Aggregate(Node<AggregateNode>),
    Order(Node<OrderNode>),
    FromQuery(Node<FromQueryNode>),
    Insert(Node<InsertNode>),
    Result(Node<ResultNode>),
    MemoRef(Node<MemoRefNode>),
}

impl LogicalPlan {
    pub fn scan(table_ref: TableRef, filter: Option<Expr>) -> Self {
        let mut node = Node::leaf(ScanNode { table_ref });
        node.filter = filter;
        LogicalPlan::Scan(node)
    }

    pub fn new_filter(child: LogicalPlan, predicate: Expr) -> Self {
        let mut node = Node::unary(FilterNode, child);
        node.filter = Some(predicate);
        LogicalPlan::Filter(node)
    }

    pub fn join(left: LogicalPlan, right: LogicalPlan, join_type: JoinType, predicate: Expr) -> Self {
        LogicalPlan::Join(Node::binary(JoinNode { join_type, predicate }, left, right))
    }

    pub fn aggregate(child: LogicalPlan, group_keys: Vec<Expr>, having: Option<Expr>) -> Self {
        let mut node = Node::unary(
            AggregateNode {
                group_keys,
                agg_core: Vec::new(),
            },
            child,
        );
        node.filter = having;
        LogicalPlan::Aggregate(node)
    }

    pub fn order(child: LogicalPlan, order_exprs: Vec<Expr>, descending: Vec<bool>) -> Self {
        LogicalPlan::Order(Node::unary(
            OrderNode {
                order_exprs,
                descending,
            },
            child,
        ))
    }

    pub fn from_query(child: LogicalPlan, table_ref: TableRef) -> Self {
        LogicalPlan::FromQuery(Node::unary(FromQueryNode { table_ref }, child))
    }

    pub fn insert(child: LogicalPlan, target_table: TableRef) -> Self {
        LogicalPlan::Insert(Node::unary(InsertNode { target_table }, child))
    }

    pub fn result(output: Vec<Expr>) -> Self {
        let mut node = Node::leaf(ResultNode);
        node.output = output;
        LogicalPlan::Result(node)
    }

    pub fn memo_ref(group: Rc<RefCell<MemoGroup>>) -> Self {
        LogicalPlan::MemoRef(Node::leaf(MemoRefNode { group }))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            LogicalPlan::Scan(_) => "Scan",
            LogicalPlan::Filter(_) => "Filter",
            LogicalPlan::Join(_) => "Join",
            LogicalPlan::Aggregate(_) => "Aggregate",
            LogicalPlan::Order(_) => "Order",
            LogicalPlan::FromQuery(_) => "FromQuery",
            LogicalPlan::Insert(_) => "Insert",
            LogicalPlan::Result(_) => "Result",
            LogicalPlan::MemoRef(_) => "MemoRef",
        }
    }

    pub fn filter(&self) -> Option<&Expr> {
        match self {
            LogicalPlan::Scan(n) => n.filter.as_ref(),
            LogicalPlan::Filter(n) => n.filter.as_ref(),
            LogicalPlan::Join(n) => n.filter.as_ref(),
            LogicalPlan::Aggregate(n) => n.filter.as_ref(),
            LogicalPlan::Order(n) => n.filter.as_ref(),
            LogicalPlan::FromQuery(n) => n.filter.as_ref(),
            LogicalPlan::Insert(n) => n.filter.as_ref(),
            LogicalPlan::Result(n) => n.filter.as_ref(),
            LogicalPlan::MemoRef(n) => n.filter.as_ref(),
        }
    }

    pub fn output(&self) -> &[Expr] {
        match self {
            LogicalPlan::Scan(n) => &n.output,
            LogicalPlan::Filter(n) => &n.output,
            LogicalPlan::Join(n) => &n.output,
            LogicalPlan::Aggregate(n) => &n.output,
            LogicalPlan::Order(n) => &n.output,
            LogicalPlan::FromQuery(n) => &n.output,
            LogicalPlan::Insert(n) => &n.output,
            LogicalPlan::Result(n) => &n.output,
            LogicalPlan::MemoRef(n) => &n.output,
        }
    }

    pub fn output_mut(&mut self) -> &mut Vec<Expr> {
        match self {
            LogicalPlan::Scan(n) => &mut n.output,
            LogicalPlan::Filter(n) => &mut n.output,
            LogicalPlan::Join(n) => &mut n.output,
            LogicalPlan::Aggregate(n) => &mut n.output,
            LogicalPlan::Order(n) => &mut n.output,
            LogicalPlan::FromQuery(n) => &mut n.output,
            LogicalPlan::Insert(n) => &mut n.output,
            LogicalPlan::Result(n) => &mut n.output,
            LogicalPlan::MemoRef(n) => &mut n.output,
        }
    }

    pub fn children(&self) -> &[LogicalPlan] {
        match self {
            LogicalPlan::Scan(n) => &n.children,
            LogicalPlan::Filter(n) => &n.children,
            LogicalPlan::Join(n) => &n.children,
            LogicalPlan::Aggregate(n) => &n.children,
            LogicalPlan::Order(n) => &n.children,
            LogicalPlan::FromQuery(n) => &n.children,
            LogicalPlan::Insert(n) => &n.children,
            LogicalPlan::Result(n) => &n.children,
            LogicalPlan::MemoRef(n) => &n.children,
        }
    }

    pub fn children_mut(&mut self) -> &mut Vec<LogicalPlan> {
        match self {
            LogicalPlan::Scan(n) => &mut n.children,
            LogicalPlan::Filter(n) => &mut n.children,
            LogicalPlan::Join(n) => &mut n.children,
            LogicalPlan::Aggregate(n) => &mut n.children,
            LogicalPlan::Order(n) => &mut n.children,
            LogicalPlan::FromQuery(n) => &mut n.children,
            LogicalPlan::Insert(n) => &mut n.children,
            LogicalPlan::Result(n) => &mut n.children,
            LogicalPlan::MemoRef(n) => &mut n.children,
        }
    }

    /// Follows `MemoRef` to its group's canonical member, recursively. A no-op (`self.clone()`)
    /// for every other kind — direct translation without any memo involvement never pays for
    /// this beyond a clone.
    pub fn memo_sign(&self) -> LogicalPlan {
        match self {
            LogicalPlan::MemoRef(n) => n.node.group.borrow().canonical().memo_sign(),
            other => other.clone(),
        }
    }
}

impl PartialEq for LogicalPlan {
    fn eq(&self, other: &Self) -> bool {
        match (self.memo_sign(), other.memo_sign()) {
            (LogicalPlan::Scan(a), LogicalPlan::Scan(b)) => a == b,
            (LogicalPlan::Filter(a), LogicalPlan::Filter(b)) => a == b,
            (LogicalPlan::Join(a), LogicalPlan::Join(b)) => a == b,
            (LogicalPlan::Aggregate(a), LogicalPlan::Aggregate(b)) => a == b,
            (LogicalPlan::Order(a), LogicalPlan::Order(b)) => a == b,
            (LogicalPlan::FromQuery(a), LogicalPlan::FromQuery(b)) => a == b,
            (LogicalPlan::Insert(a), LogicalPlan::Insert(b)) => a == b,
            (LogicalPlan::Result(a), LogicalPlan::Result(b)) => a == b,
            (LogicalPlan::MemoRef(a), LogicalPlan::MemoRef(b)) => a == b,
            _ => false,
        }
    }
}

impl Explainable for Node<ScanNode> {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let mut ent = ExplainEntry::new("Scan").with_value("table", self.node.table_ref.name());
        if conf.verbose {
            ent = ent.with_value("table_ref", self.node.table_ref.id().0);
        }
        ent
    }
}

impl Explainable for Node<FilterNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Filter")
    }
}

impl Explainable for Node<JoinNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Join").with_value("type", self.node.join_type)
    }
}

impl Explainable for Node<AggregateNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Aggregate")
    }
}

impl Explainable for Node<OrderNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Order")
    }
}

impl Explainable for Node<FromQueryNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("FromQuery").with_value("alias", self.node.table_ref.name())
    }
}

impl Explainable for Node<InsertNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Insert").with_value("table", self.node.target_table.name())
    }
}

impl Explainable for Node<ResultNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Result")
    }
}

impl Explainable for Node<MemoRefNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("MemoRef").with_value("canonical", self.node.group.borrow().canonical().kind_name())
    }
}

impl Explainable for LogicalPlan {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        match self {
            LogicalPlan::Scan(n) => n.explain_entry(conf),
            LogicalPlan::Filter(n) => n.explain_entry(conf),
            LogicalPlan::Join(n) => n.explain_entry(conf),
            LogicalPlan::Aggregate(n) => n.explain_entry(conf),
            LogicalPlan::Order(n) => n.explain_entry(conf),
            LogicalPlan::FromQuery(n) => n.explain_entry(conf),
            LogicalPlan::Insert(n) => n.explain_entry(conf),
            LogicalPlan::Result(n) => n.explain_entry(conf),
            LogicalPlan::MemoRef(n) => n.explain_entry(conf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::column_expr::ColumnExpr;
    use crate::logical::table_ref::TableRefId;

    #[test]
    fn memo_ref_compares_equal_to_its_canonical_member() {
        let table = TableRef::base_table(TableRefId(0), "a", vec![]);
        let scan = LogicalPlan::scan(table, None);
        let group = MemoGroup::new(scan.clone()).into_shared();
        let memo = LogicalPlan::memo_ref(group);
        assert_eq!(memo, scan);
    }

    #[test]
    fn different_scans_are_not_equal() {
        let a = LogicalPlan::scan(TableRef::base_table(TableRefId(0), "a", vec![]), None);
        let b = LogicalPlan::scan(TableRef::base_table(TableRefId(1), "b", vec![]), None);
        assert_ne!(a, b);
    }

    #[test]
    fn filter_predicate_lives_in_common_field() {
        let table = TableRef::base_table(TableRefId(0), "a", vec![]);
        let scan = LogicalPlan::scan(table, None);
        let predicate = Expr::Column(ColumnExpr::unresolved("i", TableRefId(0)));
        let f = LogicalPlan::new_filter(scan, predicate.clone());
        assert_eq!(f.filter(), Some(&predicate));
    }

    #[test]
    fn scan_explain_entry_names_the_table() {
        let scan = LogicalPlan::scan(TableRef::base_table(TableRefId(0), "orders", vec![]), None);
        let entry = scan.explain_entry(ExplainConfig::default());
        assert_eq!(entry.to_string(), "Scan (table = orders)");
    }

    #[test]
    fn join_explain_entry_carries_join_type() {
        let left = LogicalPlan::scan(TableRef::base_table(TableRefId(0), "a", vec![]), None);
        let right = LogicalPlan::scan(TableRef::base_table(TableRefId(1), "b", vec![]), None);
        let predicate = Expr::Column(ColumnExpr::unresolved("x", TableRefId(0)));
        let join = LogicalPlan::join(left, right, JoinType::Left, predicate);
        let entry = join.explain_entry(ExplainConfig::default());
        assert_eq!(entry.to_string(), "Join (type = LEFT)");
    }
}
