//! The physical plan tree: built the same way as [`crate::logical::operator::LogicalPlan`] — a
//! generic [`PhysNode<K>`] carrying the fields every physical kind shares, wrapped by an enum
//! tagging which kind-specific payload a node holds.

use std::fmt;

use crate::expr::aggregate_expr::AggregateExpr;
use crate::expr::Expr;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::logical::operator::JoinType;
use crate::logical::table_ref::TableRef;
use crate::physical::cost::Cost;
use crate::physical::profiling::ProfileRecord;

/// Wrapper carrying the fields every physical node kind shares.
#[derive(Debug, Clone)]
pub struct PhysNode<K> {
    /// Residual predicate evaluated at this node: a pushed-down scan filter, a standalone
    /// `Filter`'s `WHERE`, or a join's condition for kinds that don't carry it in their payload.
    pub filter: Option<Expr>,
    pub output: Vec<Expr>,
    pub children: Vec<PhysicalPlan>,
    pub cost: Cost,
    pub cardinality: f64,
    pub profile: Option<ProfileRecord>,
    pub node: K,
}

impl<K> PhysNode<K> {
    pub fn new(node: K, children: Vec<PhysicalPlan>, output: Vec<Expr>, filter: Option<Expr>, cost: Cost, cardinality: f64) -> Self {
        PhysNode {
            filter,
            output,
            children,
            cost,
            cardinality,
            profile: None,
            node,
        }
    }
}

impl<K: PartialEq> PartialEq for PhysNode<K> {
    fn eq(&self, other: &Self) -> bool {
        self.filter == other.filter
            && self.output == other.output
            && self.children == other.children
            && self.node == other.node
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanNode;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanFileNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterNode;

#[derive(Debug, Clone, PartialEq)]
pub struct HashAggNode {
    pub group_keys: Vec<Expr>,
    pub agg_core: Vec<AggregateExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderNode {
    pub order_exprs: Vec<Expr>,
    pub descending: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NLJoinNode {
    pub join_type: JoinType,
    pub predicate: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashJoinNode {
    pub join_type: JoinType,
    pub predicate: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkJoinNode {
    pub predicate: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleJoinNode {
    pub predicate: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleMarkJoinNode {
    pub predicate: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromQueryNode {
    pub table_ref: TableRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertNode {
    pub target_table: TableRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultNode;

/// Transparent pass-through, invisible to plan equality and to printing — it renders as its
/// wrapped node. Carries no payload of its own; its sole child is the node it wraps, and its
/// common `profile` field is what the executor fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfilingNode;

#[derive(Debug, Clone)]
pub enum PhysicalPlan {
    Scan(PhysNode<ScanNode>),
    ScanFile(PhysNode<ScanFileNode>),
    Filter(PhysNode<FilterNode>),
    HashAgg(PhysNode<HashAggNode>),
    Order(PhysNode<OrderNode>),
    NLJoin(PhysNode<NLJoinNode>),
    HashJoin(PhysNode<HashJoinNode>),
    MarkJoin(PhysNode<MarkJoinNode>),
    SingleJoin(PhysNode<SingleJoinNode>),
    SingleMarkJoin(PhysNode<SingleMarkJoinNode>),
    FromQuery(PhysNode<FromQueryNode>),
    Insert(PhysNode<InsertNode>),
    Result(PhysNode<ResultNode>),
    Profiling(PhysNode<ProfilingNode>),
}

impl PhysicalPlan {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PhysicalPlan::Scan(_) => "Scan",
            PhysicalPlan::ScanFile(_) => "ScanFile",
            PhysicalPlan::Filter(_) => "Filter",
            PhysicalPlan::HashAgg(_) => "HashAgg",
            PhysicalPlan::Order(_) => "Order",
            PhysicalPlan::NLJoin(_) => "NLJoin",
            PhysicalPlan::HashJoin(_) => "HashJoin",
            PhysicalPlan::MarkJoin(_) => "MarkJoin",
            PhysicalPlan::SingleJoin(_) => "SingleJoin",
            PhysicalPlan::SingleMarkJoin(_) => "SingleMarkJoin",
            PhysicalPlan::FromQuery(_) => "FromQuery",
            PhysicalPlan::Insert(_) => "Insert",
            PhysicalPlan::Result(_) => "Result",
            PhysicalPlan::Profiling(_) => "Profiling",
        }
    }

    pub fn output(&self) -> &[Expr] {
        match self {
            PhysicalPlan::Profiling(n) => n.children[0].output(),
            PhysicalPlan::Scan(n) => &n.output,
            PhysicalPlan::ScanFile(n) => &n.output,
            PhysicalPlan::Filter(n) => &n.output,
            PhysicalPlan::HashAgg(n) => &n.output,
            PhysicalPlan::Order(n) => &n.output,
            PhysicalPlan::NLJoin(n) => &n.output,
            PhysicalPlan::HashJoin(n) => &n.output,
            PhysicalPlan::MarkJoin(n) => &n.output,
            PhysicalPlan::SingleJoin(n) => &n.output,
            PhysicalPlan::SingleMarkJoin(n) => &n.output,
            PhysicalPlan::FromQuery(n) => &n.output,
            PhysicalPlan::Insert(n) => &n.output,
            PhysicalPlan::Result(n) => &n.output,
        }
    }

    pub fn filter(&self) -> Option<&Expr> {
        match self {
            PhysicalPlan::Profiling(n) => n.children[0].filter(),
            PhysicalPlan::Scan(n) => n.filter.as_ref(),
            PhysicalPlan::ScanFile(n) => n.filter.as_ref(),
            PhysicalPlan::Filter(n) => n.filter.as_ref(),
            PhysicalPlan::HashAgg(n) => n.filter.as_ref(),
            PhysicalPlan::Order(n) => n.filter.as_ref(),
            PhysicalPlan::NLJoin(n) => n.filter.as_ref(),
            PhysicalPlan::HashJoin(n) => n.filter.as_ref(),
            PhysicalPlan::MarkJoin(n) => n.filter.as_ref(),
            PhysicalPlan::SingleJoin(n) => n.filter.as_ref(),
            PhysicalPlan::SingleMarkJoin(n) => n.filter.as_ref(),
            PhysicalPlan::FromQuery(n) => n.filter.as_ref(),
            PhysicalPlan::Insert(n) => n.filter.as_ref(),
            PhysicalPlan::Result(n) => n.filter.as_ref(),
        }
    }

    pub fn children(&self) -> &[PhysicalPlan] {
        match self {
            PhysicalPlan::Profiling(n) => &n.children,
            PhysicalPlan::Scan(n) => &n.children,
            PhysicalPlan::ScanFile(n) => &n.children,
            PhysicalPlan::Filter(n) => &n.children,
            PhysicalPlan::HashAgg(n) => &n.children,
            PhysicalPlan::Order(n) => &n.children,
            PhysicalPlan::NLJoin(n) => &n.children,
            PhysicalPlan::HashJoin(n) => &n.children,
            PhysicalPlan::MarkJoin(n) => &n.children,
            PhysicalPlan::SingleJoin(n) => &n.children,
            PhysicalPlan::SingleMarkJoin(n) => &n.children,
            PhysicalPlan::FromQuery(n) => &n.children,
            PhysicalPlan::Insert(n) => &n.children,
            PhysicalPlan::Result(n) => &n.children,
        }
    }

    pub fn cost(&self) -> Cost {
        match self {
            PhysicalPlan::Profiling(n) => n.children[0].cost(),
            PhysicalPlan::Scan(n) => n.cost,
            PhysicalPlan::ScanFile(n) => n.cost,
            PhysicalPlan::Filter(n) => n.cost,
            PhysicalPlan::HashAgg(n) => n.cost,
            PhysicalPlan::Order(n) => n.cost,
            PhysicalPlan::NLJoin(n) => n.cost,
            PhysicalPlan::HashJoin(n) => n.cost,
            PhysicalPlan::MarkJoin(n) => n.cost,
            PhysicalPlan::SingleJoin(n) => n.cost,
            PhysicalPlan::SingleMarkJoin(n) => n.cost,
            PhysicalPlan::FromQuery(n) => n.cost,
            PhysicalPlan::Insert(n) => n.cost,
            PhysicalPlan::Result(n) => n.cost,
        }
    }

    pub fn cardinality(&self) -> f64 {
        match self {
            PhysicalPlan::Profiling(n) => n.children[0].cardinality(),
            PhysicalPlan::Scan(n) => n.cardinality,
            PhysicalPlan::ScanFile(n) => n.cardinality,
            PhysicalPlan::Filter(n) => n.cardinality,
            PhysicalPlan::HashAgg(n) => n.cardinality,
            PhysicalPlan::Order(n) => n.cardinality,
            PhysicalPlan::NLJoin(n) => n.cardinality,
            PhysicalPlan::HashJoin(n) => n.cardinality,
            PhysicalPlan::MarkJoin(n) => n.cardinality,
            PhysicalPlan::SingleJoin(n) => n.cardinality,
            PhysicalPlan::SingleMarkJoin(n) => n.cardinality,
            PhysicalPlan::FromQuery(n) => n.cardinality,
            PhysicalPlan::Insert(n) => n.cardinality,
            PhysicalPlan::Result(n) => n.cardinality,
        }
    }

    /// The profile record the executor would write into, skipping to the wrapped node's own
    /// slot when profiling is disabled and no [`PhysicalPlan::Profiling`] wraps this node.
    pub fn profile(&self) -> Option<ProfileRecord> {
        match self {
            PhysicalPlan::Profiling(n) => n.profile,
            _ => None,
        }
    }

    /// Follows `Profiling` to its wrapped node, recursively. A no-op (borrow) for every other
    /// kind, mirroring [`crate::logical::operator::LogicalPlan::memo_sign`].
    pub fn physical_sign(&self) -> &PhysicalPlan {
        match self {
            PhysicalPlan::Profiling(n) => n.children[0].physical_sign(),
            other => other,
        }
    }
}

impl PartialEq for PhysicalPlan {
    fn eq(&self, other: &Self) -> bool {
        match (self.physical_sign(), other.physical_sign()) {
            (PhysicalPlan::Scan(a), PhysicalPlan::Scan(b)) => a == b,
            (PhysicalPlan::ScanFile(a), PhysicalPlan::ScanFile(b)) => a == b,
            (PhysicalPlan::Filter(a), PhysicalPlan::Filter(b)) => a == b,
            (PhysicalPlan::HashAgg(a), PhysicalPlan::HashAgg(b)) => a == b,
            (PhysicalPlan::Order(a), PhysicalPlan::Order(b)) => a == b,
            (PhysicalPlan::NLJoin(a), PhysicalPlan::NLJoin(b)) => a == b,
            (PhysicalPlan::HashJoin(a), PhysicalPlan::HashJoin(b)) => a == b,
            (PhysicalPlan::MarkJoin(a), PhysicalPlan::MarkJoin(b)) => a == b,
            (PhysicalPlan::SingleJoin(a), PhysicalPlan::SingleJoin(b)) => a == b,
            (PhysicalPlan::SingleMarkJoin(a), PhysicalPlan::SingleMarkJoin(b)) => a == b,
            (PhysicalPlan::FromQuery(a), PhysicalPlan::FromQuery(b)) => a == b,
            (PhysicalPlan::Insert(a), PhysicalPlan::Insert(b)) => a == b,
            (PhysicalPlan::Result(a), PhysicalPlan::Result(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for PhysicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind_name())
    }
}

macro_rules! explain_with_cost {
    ($node:expr, $name:expr) => {{
        ExplainEntry::new($name)
            .with_value("cost", $node.cost)
            .with_value("card", format!("{:.1}", $node.cardinality))
    }};
}

impl Explainable for PhysNode<ScanNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "ScanTable")
    }
}

impl Explainable for PhysNode<ScanFileNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "ScanFile")
    }
}

impl Explainable for PhysNode<FilterNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "Filter")
    }
}

impl Explainable for PhysNode<HashAggNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "HashAgg")
    }
}

impl Explainable for PhysNode<OrderNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "Order")
    }
}

impl Explainable for PhysNode<NLJoinNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "NLJoin")
            .with_value("type", self.node.join_type)
            .with_value("predicate", &self.node.predicate)
    }
}

impl Explainable for PhysNode<HashJoinNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "HashJoin")
            .with_value("type", self.node.join_type)
            .with_value("predicate", &self.node.predicate)
    }
}

impl Explainable for PhysNode<MarkJoinNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "MarkJoin").with_value("predicate", &self.node.predicate)
    }
}

impl Explainable for PhysNode<SingleJoinNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "SingleJoin").with_value("predicate", &self.node.predicate)
    }
}

impl Explainable for PhysNode<SingleMarkJoinNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "SingleMarkJoin").with_value("predicate", &self.node.predicate)
    }
}

impl Explainable for PhysNode<FromQueryNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "FromQuery").with_value("alias", self.node.table_ref.name())
    }
}

impl Explainable for PhysNode<InsertNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "Insert").with_value("table", self.node.target_table.name())
    }
}

impl Explainable for PhysNode<ResultNode> {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        explain_with_cost!(self, "Result")
    }
}

impl Explainable for PhysicalPlan {
    /// `Profiling` is unwrapped by the caller (`explain::formatter`) before this is ever
    /// reached; reaching it here would mean a bug in that unwrap, not a valid render target.
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        match self {
            PhysicalPlan::Scan(n) => n.explain_entry(conf),
            PhysicalPlan::ScanFile(n) => n.explain_entry(conf),
            PhysicalPlan::Filter(n) => n.explain_entry(conf),
            PhysicalPlan::HashAgg(n) => n.explain_entry(conf),
            PhysicalPlan::Order(n) => n.explain_entry(conf),
            PhysicalPlan::NLJoin(n) => n.explain_entry(conf),
            PhysicalPlan::HashJoin(n) => n.explain_entry(conf),
            PhysicalPlan::MarkJoin(n) => n.explain_entry(conf),
            PhysicalPlan::SingleJoin(n) => n.explain_entry(conf),
            PhysicalPlan::SingleMarkJoin(n) => n.explain_entry(conf),
            PhysicalPlan::FromQuery(n) => n.explain_entry(conf),
            PhysicalPlan::Insert(n) => n.explain_entry(conf),
            PhysicalPlan::Result(n) => n.explain_entry(conf),
            PhysicalPlan::Profiling(n) => n.children[0].explain_entry(conf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::table_ref::TableRefId;

    fn leaf_scan() -> PhysicalPlan {
        PhysicalPlan::Scan(PhysNode::new(ScanNode, Vec::new(), Vec::new(), None, Cost(10.0), 10.0))
    }

    #[test]
    fn profiling_is_invisible_to_equality() {
        let scan = leaf_scan();
        let wrapped = PhysicalPlan::Profiling(PhysNode {
            filter: None,
            output: Vec::new(),
            children: vec![scan.clone()],
            cost: Cost(0.0),
            cardinality: 0.0,
            profile: Some(ProfileRecord::empty()),
            node: ProfilingNode,
        });
        assert_eq!(scan, wrapped);
    }

    #[test]
    fn profiling_forwards_cost_and_cardinality() {
        let scan = leaf_scan();
        let wrapped = PhysicalPlan::Profiling(PhysNode {
            filter: None,
            output: Vec::new(),
            children: vec![scan],
            cost: Cost(0.0),
            cardinality: 0.0,
            profile: Some(ProfileRecord::empty()),
            node: ProfilingNode,
        });
        assert_eq!(wrapped.cost(), Cost(10.0));
        assert_eq!(wrapped.cardinality(), 10.0);
    }

    #[test]
    fn explain_entry_carries_cost_and_cardinality() {
        let scan = leaf_scan();
        let entry = scan.explain_entry(ExplainConfig::default());
        assert_eq!(entry.to_string(), "ScanTable (cost = 10.00, card = 10.0)");
        let _ = TableRefId(0);
    }
}
