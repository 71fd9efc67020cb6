//! Relational plan algebra: binds a query's table/column references, resolves column ordinals,
//! rewrites correlated subqueries into joins, and translates the result into a physical plan with
//! static cost/cardinality estimates attached.

pub mod config;
pub mod explain;
pub mod expr;
pub mod logical;
pub mod physical;
