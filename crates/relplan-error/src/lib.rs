//! Shared error type for the planning pipeline.
//!
//! Every other crate in this workspace returns `relplan_error::Result<T>` rather than rolling
//! its own error enum, so that callers never need to match on more than one error type while
//! walking bind -> resolve -> rewrite -> translate.

use std::fmt;

pub type Result<T, E = PlanError> = std::result::Result<T, E>;

/// The error taxonomy produced by the planning pipeline.
///
/// Planning errors are fatal for the query they occur in: there is no partial success, and
/// nothing in this workspace swallows or retries one of these.
#[derive(Debug)]
pub enum PlanError {
    /// A name could not be bound, a column reference is ambiguous, a non-grouped column appears
    /// in an aggregate's output, or a subquery's arity doesn't match its use.
    SemanticAnalyze { message: String },

    /// Ordinal resolution could not place a required expression on either side of a join, or
    /// some other internal invariant the binder should have guaranteed didn't hold. This
    /// indicates a planner bug, not a user error.
    InvalidProgram { message: String },

    /// A logical node kind has no physical mapping configured under the current options.
    NotImplemented { message: String },

    /// Raised only by the execution boundary (out of scope for this crate, but part of the
    /// taxonomy callers need to match on).
    SemanticExecution { message: String },

    /// Catch-all for errors that don't fit the taxonomy above, with an optional wrapped cause.
    Other {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl PlanError {
    pub fn new(message: impl Into<String>) -> Self {
        PlanError::Other {
            message: message.into(),
            source: None,
        }
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        PlanError::SemanticAnalyze {
            message: message.into(),
        }
    }

    pub fn invalid_program(message: impl Into<String>) -> Self {
        PlanError::InvalidProgram {
            message: message.into(),
        }
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        PlanError::NotImplemented {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PlanError::SemanticAnalyze { message } => message,
            PlanError::InvalidProgram { message } => message,
            PlanError::NotImplemented { message } => message,
            PlanError::SemanticExecution { message } => message,
            PlanError::Other { message, .. } => message,
        }
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::SemanticAnalyze { message } => write!(f, "semantic error: {message}"),
            PlanError::InvalidProgram { message } => write!(f, "invalid program: {message}"),
            PlanError::NotImplemented { message } => write!(f, "not implemented: {message}"),
            PlanError::SemanticExecution { message } => {
                write!(f, "execution error: {message}")
            }
            PlanError::Other { message, .. } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanError::Other {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Construct a [`PlanError::NotImplemented`] and return it wrapped in `Err`.
///
/// A single macro call replaces the `return Err(PlanError::not_implemented(format!(...)))`
/// boilerplate at every unmapped match arm.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)*) => {
        return Err($crate::PlanError::not_implemented(format!($($arg)*)))
    };
}

/// Adds `.context(...)` to any `Result`, wrapping the error with an additional message while
/// preserving it as the `source()`.
pub trait ResultExt<T> {
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|source| PlanError::Other {
            message: message.into(),
            source: Some(Box::new(source)),
        })
    }
}

/// Adds `.required(...)` to `Option<T>`, turning a missing value into a `PlanError`.
pub trait OptionExt<T> {
    fn required(self, what: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, what: &str) -> Result<T> {
        self.ok_or_else(|| PlanError::invalid_program(format!("missing required {what}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_preserves_source() {
        let parse_err: std::result::Result<i32, std::num::ParseIntError> = "x".parse();
        let wrapped = parse_err.context("parsing column ordinal");
        let err = wrapped.unwrap_err();
        assert_eq!(err.to_string(), "parsing column ordinal");
        assert!(err.source().is_some());
    }

    #[test]
    fn required_on_none() {
        let value: Option<i32> = None;
        let err = value.required("group table ref").unwrap_err();
        assert!(matches!(err, PlanError::InvalidProgram { .. }));
    }

    #[test]
    fn not_implemented_macro_shape() {
        fn inner() -> Result<()> {
            not_implemented!("join type {}", "FULL OUTER");
        }
        let err = inner().unwrap_err();
        assert!(matches!(err, PlanError::NotImplemented { .. }));
        assert_eq!(err.message(), "join type FULL OUTER");
    }
}
