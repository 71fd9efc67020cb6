//! Pipeline configuration: the recognized options collected into one value threaded through the
//! pipeline rather than a process-wide global.

/// Options recognized by [`crate::logical::subquery_rewrite::rewrite_subqueries`] and
/// [`crate::physical::translate::to_physical`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    /// Whether the EXISTS/IN/scalar-subquery rewrite fires at all. When false, subqueries are
    /// left as `SubqueryExpr` nodes for the executor to evaluate per outer row.
    pub enable_subquery_to_markjoin: bool,
    /// If false, a hashable join predicate is never selected; every generic join becomes a
    /// `NLJoin`.
    pub enable_hashjoin: bool,
    /// If false (alongside a non-hashable predicate with `enable_hashjoin` also false),
    /// translation raises `PlanError::NotImplemented` instead of falling back to `NLJoin`.
    pub enable_nljoin: bool,
    /// Route through the memo optimizer instead of direct translation. Unused by this crate:
    /// direct translation requires a fully materialized tree with no `MemoRef` present, and this
    /// crate does not implement memo-based search.
    pub use_memo: bool,
    /// Wrap each physical node in the `Profiling` decorator.
    pub profiling_enabled: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            enable_subquery_to_markjoin: true,
            enable_hashjoin: true,
            enable_nljoin: true,
            use_memo: false,
            profiling_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_the_standard_pipeline() {
        let conf = PlannerConfig::default();
        assert!(conf.enable_subquery_to_markjoin);
        assert!(conf.enable_hashjoin);
        assert!(conf.enable_nljoin);
        assert!(!conf.use_memo);
        assert!(!conf.profiling_enabled);
    }
}
