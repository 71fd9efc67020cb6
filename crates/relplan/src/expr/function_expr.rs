use std::fmt;

use fmtutil::IntoDisplayableSlice;

use super::Expr;

/// A scalar function call, e.g. `cos(a1 * 7)`.
///
/// Carries only the call's shape (name + args), enough to drive ordinal resolution and printing;
/// resolving the name against a function registry and planning its execution both happen
/// upstream of this crate.
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct FunctionExpr {
    pub name: String,
    pub args: Vec<Expr>,
}

impl fmt::Display for FunctionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.display_with_brackets())
    }
}
