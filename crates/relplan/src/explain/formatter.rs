//! Renders a [`LogicalPlan`] as deterministic, depth-indented text that regression fixtures can
//! pin down byte-for-byte, or as JSON for tooling that wants the structured form.

use fmtutil::IntoDisplayableSlice;
use relplan_error::{Result, ResultExt};
use serde::{Deserialize, Serialize};

use super::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::subquery_expr::SubqueryExpr;
use crate::expr::Expr;
use crate::logical::operator::LogicalPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainFormat {
    Text,
    Json,
}

/// Formats a logical plan tree for one of the two output shapes above.
#[derive(Debug)]
pub struct ExplainFormatter {
    config: ExplainConfig,
    format: ExplainFormat,
}

impl ExplainFormatter {
    pub fn new(config: ExplainConfig, format: ExplainFormat) -> Self {
        ExplainFormatter { config, format }
    }

    pub fn format_logical_plan(&self, root: &LogicalPlan) -> Result<String> {
        let node = ExplainNode::walk(root, self.config);
        self.format(&node)
    }

    fn format(&self, node: &ExplainNode) -> Result<String> {
        match self.format {
            ExplainFormat::Text => {
                let mut buf = String::new();
                node.write_text(0, true, &mut buf).context("failed to write explain buffer")?;
                Ok(buf)
            }
            ExplainFormat::Json => serde_json::to_string(node).context("failed to serialize explain plan to json"),
        }
    }
}

/// One rendered node: its entry, the node-specific detail lines below it, and its children
/// (a `Filter`'s un-rewritten subqueries are folded in as extra children, see [`subqueries_of`]).
#[derive(Debug, Serialize, Deserialize)]
struct ExplainNode {
    entry: ExplainEntry,
    details: Vec<String>,
    children: Vec<ExplainNode>,
}

impl ExplainNode {
    fn walk(plan: &LogicalPlan, config: ExplainConfig) -> ExplainNode {
        let entry = plan.explain_entry(config);
        let mut details = vec![format!("Output: {}", plan.output().display_with_brackets())];
        details.extend(node_specific_details(plan));

        let mut children: Vec<ExplainNode> = plan.children().iter().map(|c| Self::walk(c, config)).collect();
        if let Some(predicate) = plan.filter() {
            for sub in subqueries_of(predicate) {
                children.push(Self::walk(&sub.plan, config));
            }
        }

        ExplainNode { entry, details, children }
    }

    fn write_text(&self, depth: usize, is_root: bool, buf: &mut String) -> std::fmt::Result {
        use std::fmt::Write as _;

        let indent = "  ".repeat(depth);
        if is_root {
            writeln!(buf, "{indent}{}", self.entry)?;
        } else {
            writeln!(buf, "{indent}-> {}", self.entry)?;
        }
        for detail in &self.details {
            writeln!(buf, "{indent}  {detail}")?;
        }
        for child in &self.children {
            child.write_text(depth + 1, false, buf)?;
        }
        Ok(())
    }
}

/// The "filter, group by, order by, aggregates" detail lines, beyond the `Output:` line every
/// node gets. `PhysicProfiling`'s counterpart in
/// `physical::profiling` never reaches this function: it is transparent and unwraps to its
/// child before the walk ever calls [`Explainable::explain_entry`] on it.
fn node_specific_details(plan: &LogicalPlan) -> Vec<String> {
    match plan {
        LogicalPlan::Filter(n) => n.filter.as_ref().map(|f| format!("Filter: {f}")).into_iter().collect(),
        LogicalPlan::Aggregate(n) => {
            let mut lines = Vec::new();
            if !n.node.group_keys.is_empty() {
                lines.push(format!("Group by: {}", n.node.group_keys.display_with_brackets()));
            }
            if !n.node.agg_core.is_empty() {
                lines.push(format!("Aggregates: {}", n.node.agg_core.display_with_brackets()));
            }
            if let Some(having) = &n.filter {
                lines.push(format!("Having: {having}"));
            }
            lines
        }
        LogicalPlan::Order(n) => {
            let rendered: Vec<String> = n
                .node
                .order_exprs
                .iter()
                .zip(&n.node.descending)
                .map(|(e, desc)| format!("{e} {}", if *desc { "DESC" } else { "ASC" }))
                .collect();
            vec![format!("Order by: {}", rendered.display_with_brackets())]
        }
        _ => Vec::new(),
    }
}

/// Every `Subquery` expression reachable from `expr`, in traversal order. Unlike
/// [`Expr::visit_each`], this does descend into a found `Subquery`'s sibling positions so a
/// conjunct with more than one un-rewritten subquery surfaces all of them, but does not reach
/// inside a subquery's own plan — that plan is a separate [`LogicalPlan`] the caller walks on
/// its own.
fn subqueries_of(expr: &Expr) -> Vec<&SubqueryExpr> {
    fn walk<'a>(expr: &'a Expr, out: &mut Vec<&'a SubqueryExpr>) {
        match expr {
            Expr::Subquery(s) => out.push(s),
            Expr::Literal(_) | Expr::Column(_) => {}
            Expr::Arith(a) => {
                walk(&a.left, out);
                walk(&a.right, out);
            }
            Expr::Comparison(c) => {
                walk(&c.left, out);
                walk(&c.right, out);
            }
            Expr::Conjunction(c) => {
                walk(&c.left, out);
                walk(&c.right, out);
            }
            Expr::Function(f) => {
                for a in &f.args {
                    walk(a, out);
                }
            }
            Expr::Aggregate(a) => {
                for a in &a.args {
                    walk(a, out);
                }
            }
            Expr::ExprRef(r) => walk(&r.resolved, out),
        }
    }
    let mut out = Vec::new();
    walk(expr, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::column_expr::ColumnExpr;
    use crate::logical::operator::JoinType;
    use crate::logical::table_ref::{TableRef, TableRefId};

    #[test]
    fn text_format_indents_children_under_their_parent() {
        let scan = LogicalPlan::scan(
            TableRef::base_table(TableRefId(0), "orders", vec![("o_id".to_string(), crate::expr::literal_expr::DataType::Int64)]),
            None,
        );
        let predicate = Expr::Column(ColumnExpr {
            alias: "o_id".to_string(),
            tab_ref: Some(TableRefId(0)),
            outer_ref: false,
            ordinal: 0,
        });
        let mut filter_child = scan;
        *filter_child.output_mut() = vec![predicate.clone()];
        let plan = LogicalPlan::new_filter(filter_child, predicate);

        let formatter = ExplainFormatter::new(ExplainConfig::default(), ExplainFormat::Text);
        let text = formatter.format_logical_plan(&plan).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Filter");
        assert!(lines[1].trim_start().starts_with("Output:"));
        assert!(lines.iter().any(|l| l.trim_start().starts_with("Filter: o_id")));
        assert!(lines.iter().any(|l| l.trim_start().starts_with("-> Scan")));
    }

    #[test]
    fn json_format_round_trips_through_serde_json() {
        let left = LogicalPlan::scan(TableRef::base_table(TableRefId(0), "a", vec![]), None);
        let right = LogicalPlan::scan(TableRef::base_table(TableRefId(1), "b", vec![]), None);
        let predicate = Expr::Column(ColumnExpr::unresolved("x", TableRefId(0)));
        let plan = LogicalPlan::join(left, right, JoinType::Inner, predicate);

        let formatter = ExplainFormatter::new(ExplainConfig::default(), ExplainFormat::Json);
        let json = formatter.format_logical_plan(&plan).unwrap();
        assert!(json.contains("\"name\":\"Join\""));
    }
}
