//! The `Explainable` trait and the entry type it produces.
//!
//! Every plan node implements `explain_entry`, returning a small builder-style `ExplainEntry`
//! that `explain::formatter` walks and renders.

use std::fmt;

use fmtutil::IntoDisplayableSlice;
use serde::{Deserialize, Serialize};

/// Knobs controlling how much detail an [`Explainable`] node puts into its entry.
///
/// `verbose` turns on details that are useful for debugging a plan but that regression fixtures
/// don't want to pin down byte-for-byte when false (e.g. table ref ids alongside names).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplainConfig {
    pub verbose: bool,
}

/// One rendered plan node: a name plus an ordered list of `key = value` details.
///
/// Values are pre-rendered to strings at construction time so `ExplainEntry` stays
/// `Send + Sync` and trivially serializable, independent of whatever type produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainEntry {
    name: String,
    values: Vec<(String, String)>,
}

impl ExplainEntry {
    pub fn new(name: impl Into<String>) -> Self {
        ExplainEntry {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Appends a single `key = value` detail, rendered via the value's `Display` impl.
    pub fn with_value(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.values.push((key.into(), value.to_string()));
        self
    }

    /// Appends a `key = [v1, v2, ...]` detail built from an iterator of displayable values.
    pub fn with_values<I>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        let rendered: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
        self.values.push((key.into(), rendered.display_with_brackets().to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }
}

impl fmt::Display for ExplainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.values.is_empty() {
            let rendered = self
                .values
                .iter()
                .map(|(k, v)| format!("{k} = {v}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " ({rendered})")?;
        }
        Ok(())
    }
}

/// Implemented by every logical and physical plan node so `explain::formatter` can walk a tree
/// of these entries without matching on concrete node types itself.
pub trait Explainable {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_with_no_values_renders_bare_name() {
        let entry = ExplainEntry::new("Filter");
        assert_eq!(entry.to_string(), "Filter");
    }

    #[test]
    fn entry_with_values_renders_key_equals_value() {
        let entry = ExplainEntry::new("ArbitraryJoin").with_value("join_type", "Inner");
        assert_eq!(entry.to_string(), "ArbitraryJoin (join_type = Inner)");
    }

    #[test]
    fn with_values_joins_as_bracketed_list() {
        let entry = ExplainEntry::new("Order").with_values("keys", vec!["a", "b"]);
        assert_eq!(entry.to_string(), "Order (keys = [a, b])");
    }
}
