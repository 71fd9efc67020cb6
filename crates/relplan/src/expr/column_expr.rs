use std::fmt;

use crate::logical::table_ref::TableRefId;

/// A reference to a column, either unresolved (fresh out of the binder) or resolved to a
/// concrete position in its producing child's output.
///
/// `ordinal` starts at `-1` and is only ever written by [`crate::logical::resolve`]. It is
/// intentionally excluded from [`PartialEq`]/[`Hash`] so two column references naming the same
/// column compare equal whether or not either has been resolved yet.
#[derive(Debug, Clone)]
pub struct ColumnExpr {
    /// The name this column is addressed by in the query text.
    pub alias: String,
    /// The table ref this column is bound against. `None` before binding.
    pub tab_ref: Option<TableRefId>,
    /// Set when this column is bound against an enclosing query scope rather than the current
    /// one.
    pub outer_ref: bool,
    /// Position in the producing child's output vector. `-1` until resolved.
    pub ordinal: i64,
}

impl ColumnExpr {
    pub fn unresolved(alias: impl Into<String>, tab_ref: TableRefId) -> Self {
        ColumnExpr {
            alias: alias.into(),
            tab_ref: Some(tab_ref),
            outer_ref: false,
            ordinal: -1,
        }
    }

    pub fn outer(alias: impl Into<String>, tab_ref: TableRefId) -> Self {
        ColumnExpr {
            alias: alias.into(),
            tab_ref: Some(tab_ref),
            outer_ref: true,
            ordinal: -1,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.outer_ref || self.ordinal >= 0
    }
}

impl PartialEq for ColumnExpr {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias && self.tab_ref == other.tab_ref && self.outer_ref == other.outer_ref
    }
}

impl std::hash::Hash for ColumnExpr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.alias.hash(state);
        self.tab_ref.hash(state);
        self.outer_ref.hash(state);
    }
}

impl fmt::Display for ColumnExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.outer_ref {
            write!(f, "outer.{}", self.alias)
        } else {
            write!(f, "{}", self.alias)
        }
    }
}
