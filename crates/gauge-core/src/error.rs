//! # Error Types
//!
//! Validation failures travel through the engine as data ([`Issue`]s inside
//! an `Outcome`). [`Error`] is reserved for the cases that abort a parse:
//!
//! - the top-level `parse` surfacing collected issues ([`ValidationError`]);
//! - the synchronous API being called on an async shape;
//! - a user callback failing with something other than validation issues.
//!
//! A callback that returns `Err(Error::Validation(..))` is *recognised*: its
//! issues are merged into the parse. Any other variant is fatal.

use std::fmt;

use thiserror::Error;

use crate::issue::Issue;

/// Top-level error type for gauge.
#[derive(Error, Debug)]
pub enum Error {
    /// The input did not conform to the shape.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The synchronous entry point was used on a shape that needs async
    /// evaluation.
    #[error("shape is async and cannot be applied synchronously; use the async entry points")]
    AsyncShape,

    /// A user callback failed with an unrecognised error.
    #[error("callback failed: {0}")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an arbitrary error raised inside a user callback.
    pub fn callback(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Callback(err.into())
    }

    /// A recognised validation error carrying `issues`.
    pub fn issues(issues: Vec<Issue>) -> Self {
        Self::Validation(ValidationError::new(issues))
    }

    /// The issues carried by a validation error, if this is one.
    pub fn validation_issues(&self) -> Option<&[Issue]> {
        match self {
            Self::Validation(e) => Some(e.issues()),
            _ => None,
        }
    }
}

/// Collection of issues raised by a failed parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    /// Wrap a list of issues.
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    /// Returns the number of issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Returns true if there are no issues.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns a slice of all issues.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed with {} issue(s):", self.issues.len())?;
        for issue in &self.issues {
            writeln!(f)?;
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{Code, PathKey};
    use crate::value::Value;

    #[test]
    fn test_validation_error_display_lists_issues() {
        let err = ValidationError::new(vec![
            Issue::new(Code::Type, Value::Null),
            Issue::new(Code::StringMinLength, Value::from("a"))
                .with_path(vec![PathKey::from("name")]),
        ]);
        let display = err.to_string();
        assert!(display.contains("2 issue(s)"));
        assert!(display.contains("(root): type"));
        assert!(display.contains("/name: stringMinLength"));
    }

    #[test]
    fn test_validation_issues_only_for_validation_variant() {
        let err = Error::issues(vec![Issue::new(Code::Type, Value::Null)]);
        assert_eq!(err.validation_issues().map(<[Issue]>::len), Some(1));
        assert!(Error::AsyncShape.validation_issues().is_none());
        assert!(Error::callback("boom").validation_issues().is_none());
    }

    #[test]
    fn test_callback_error_keeps_source() {
        let err = Error::callback(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(err.to_string().contains("disk"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
