//! # Issues and Outcomes
//!
//! An [`Issue`] describes one validation failure at a location in the input.
//! An [`Outcome`] is what applying a shape to a value produces: the value
//! was accepted as-is, accepted and replaced, or rejected with issues.
//!
//! ## Path Invariant
//!
//! Paths are built purely additively. A container only ever prepends the
//! one key or index it owns onto the paths of its children's issues
//! ([`prefix_path`]); nothing recomputes a path from scratch.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::value::Value;

/// Machine-readable issue code.
///
/// Serialized in camelCase (e.g. `stringMinLength`). `Custom` carries a
/// caller-chosen code for user refinements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Code {
    /// Input has the wrong type.
    Type,
    /// Input differs from the expected constant.
    Const,
    /// Input is not one of the enumerated values.
    Enum,
    /// Input equals a denied literal.
    Denied,
    /// A refinement predicate returned false.
    Predicate,
    /// String shorter than the minimum length.
    StringMinLength,
    /// String longer than the maximum length.
    StringMaxLength,
    /// String does not match the pattern.
    StringRegex,
    /// Number is not an integer.
    NumberInteger,
    /// Number is not finite.
    NumberFinite,
    /// Number is not greater than the exclusive minimum.
    NumberGreaterThan,
    /// Number is below the inclusive minimum.
    NumberGreaterThanOrEqual,
    /// Number is not less than the exclusive maximum.
    NumberLessThan,
    /// Number is above the inclusive maximum.
    NumberLessThanOrEqual,
    /// Number is not a multiple of the divisor.
    NumberMultipleOf,
    /// BigInt below the minimum.
    BigIntMin,
    /// BigInt above the maximum.
    BigIntMax,
    /// Array shorter than the minimum length.
    ArrayMinLength,
    /// Array longer than the maximum length.
    ArrayMaxLength,
    /// Set smaller than the minimum size.
    SetMinSize,
    /// Set larger than the maximum size.
    SetMaxSize,
    /// Date before the earliest allowed instant.
    DateMin,
    /// Date after the latest allowed instant.
    DateMax,
    /// Tuple length mismatch.
    Tuple,
    /// Unknown keys under exact key mode.
    UnknownKeys,
    /// No union branch accepted the input.
    Union,
    /// Intersection branch outputs could not be merged.
    Intersection,
    /// Caller-defined code.
    Custom(String),
}

impl Code {
    /// Wire name of the code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Type => "type",
            Self::Const => "const",
            Self::Enum => "enum",
            Self::Denied => "denied",
            Self::Predicate => "predicate",
            Self::StringMinLength => "stringMinLength",
            Self::StringMaxLength => "stringMaxLength",
            Self::StringRegex => "stringRegex",
            Self::NumberInteger => "numberInteger",
            Self::NumberFinite => "numberFinite",
            Self::NumberGreaterThan => "numberGreaterThan",
            Self::NumberGreaterThanOrEqual => "numberGreaterThanOrEqual",
            Self::NumberLessThan => "numberLessThan",
            Self::NumberLessThanOrEqual => "numberLessThanOrEqual",
            Self::NumberMultipleOf => "numberMultipleOf",
            Self::BigIntMin => "bigintMin",
            Self::BigIntMax => "bigintMax",
            Self::ArrayMinLength => "arrayMinLength",
            Self::ArrayMaxLength => "arrayMaxLength",
            Self::SetMinSize => "setMinSize",
            Self::SetMaxSize => "setMaxSize",
            Self::DateMin => "dateMin",
            Self::DateMax => "dateMax",
            Self::Tuple => "tuple",
            Self::UnknownKeys => "unknownKeys",
            Self::Union => "union",
            Self::Intersection => "intersection",
            Self::Custom(code) => code,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Code {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One step of an issue path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathKey {
    /// Array/tuple/set position.
    Index(usize),
    /// Object or record key.
    Key(String),
    /// Map key, which may be any value.
    Value(Value),
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(k) => f.write_str(k),
            Self::Value(v) => write!(f, "{v:?}"),
        }
    }
}

impl Serialize for PathKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Index(i) => serializer.serialize_u64(*i as u64),
            Self::Key(k) => serializer.serialize_str(k),
            Self::Value(v) => v.serialize(serializer),
        }
    }
}

impl From<usize> for PathKey {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl From<&str> for PathKey {
    fn from(k: &str) -> Self {
        Self::Key(k.to_string())
    }
}

impl From<String> for PathKey {
    fn from(k: String) -> Self {
        Self::Key(k)
    }
}

/// A single validation failure with its location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    /// What went wrong.
    pub code: Code,
    /// The value that was rejected.
    pub input: Value,
    /// Keys from the root of the document to the rejected value.
    pub path: Vec<PathKey>,
    /// Caller-supplied human-readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Code-specific parameter (bound, expected kind, unknown keys, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<Value>,
    /// Caller-supplied metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Issue {
    /// A new issue at the root path.
    pub fn new(code: Code, input: Value) -> Self {
        Self {
            code,
            input,
            path: Vec::new(),
            message: None,
            param: None,
            meta: None,
        }
    }

    /// Set the parameter.
    pub fn with_param(mut self, param: impl Into<Value>) -> Self {
        self.param = Some(param.into());
        self
    }

    /// Set the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the metadata.
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Set the path.
    pub fn with_path(mut self, path: Vec<PathKey>) -> Self {
        self.path = path;
        self
    }

    /// Render as a [`Value`] object, e.g. for nesting inside another
    /// issue's param.
    pub fn to_value(&self) -> Value {
        let mut entries = vec![
            ("code", Value::string(self.code.as_str())),
            ("input", self.input.clone()),
            (
                "path",
                Value::array(self.path.iter().map(|key| match key {
                    PathKey::Index(i) => Value::from(*i),
                    PathKey::Key(k) => Value::string(k.as_str()),
                    PathKey::Value(v) => v.clone(),
                })),
            ),
        ];
        if let Some(message) = &self.message {
            entries.push(("message", Value::string(message.as_str())));
        }
        if let Some(param) = &self.param {
            entries.push(("param", param.clone()));
        }
        if let Some(meta) = &self.meta {
            entries.push(("meta", meta.clone()));
        }
        Value::object(entries)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "  (root): {}", self.code)?;
        } else {
            let path: Vec<String> = self.path.iter().map(|k| k.to_string()).collect();
            write!(f, "  /{}: {}", path.join("/"), self.code)?;
        }
        if let Some(message) = &self.message {
            write!(f, " ({message})")?;
        }
        Ok(())
    }
}

/// Prepend `key` to the path of every issue.
pub fn prefix_path(issues: &mut [Issue], key: &PathKey) {
    for issue in issues {
        issue.path.insert(0, key.clone());
    }
}

/// Result of applying a shape to a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The input is valid and is returned as-is.
    Unchanged,
    /// The input is valid and was replaced by this value.
    Replaced(Value),
    /// The input is invalid. Never empty.
    Issues(Vec<Issue>),
}

impl Outcome {
    /// Collapse an issue list: empty becomes `Unchanged`.
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        if issues.is_empty() {
            Self::Unchanged
        } else {
            Self::Issues(issues)
        }
    }

    /// `Unchanged` if `output` is the same value as `input`, else
    /// `Replaced(output)`.
    pub fn from_output(input: &Value, output: Value) -> Self {
        if output.same(input) {
            Self::Unchanged
        } else {
            Self::Replaced(output)
        }
    }

    /// Whether the outcome is valid.
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Issues(_))
    }

    /// The resulting value given the original input, or the issues.
    pub fn into_value(self, input: &Value) -> Result<Value, Vec<Issue>> {
        match self {
            Self::Unchanged => Ok(input.clone()),
            Self::Replaced(value) => Ok(value),
            Self::Issues(issues) => Err(issues),
        }
    }
}

/// Non-throwing parse result.
#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    /// The parsed (possibly transformed) value.
    Valid(Value),
    /// Every captured issue.
    Invalid(Vec<Issue>),
}

impl Validated {
    /// Whether parsing succeeded.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> Result<Value, Vec<Issue>> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Invalid(issues) => Err(issues),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_issues_collapse_to_unchanged() {
        assert_eq!(Outcome::from_issues(Vec::new()), Outcome::Unchanged);
    }

    #[test]
    fn test_prefix_path_prepends() {
        let mut issues = vec![Issue::new(Code::Type, Value::Null).with_path(vec![PathKey::Index(2)])];
        prefix_path(&mut issues, &PathKey::from("items"));
        assert_eq!(
            issues[0].path,
            vec![PathKey::Key("items".into()), PathKey::Index(2)]
        );
    }

    #[test]
    fn test_issue_serializes_camel_case_code() {
        let issue = Issue::new(Code::StringMinLength, Value::from("a")).with_param(2);
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(
            json,
            json!({"code": "stringMinLength", "input": "a", "path": [], "param": 2})
        );
    }

    #[test]
    fn test_issue_display_root_and_nested() {
        let root = Issue::new(Code::Type, Value::Null);
        assert!(root.to_string().contains("(root): type"));

        let nested = Issue::new(Code::Type, Value::Null)
            .with_path(vec![PathKey::from("a"), PathKey::Index(0)]);
        assert!(nested.to_string().contains("/a/0: type"));
    }

    #[test]
    fn test_from_output_uses_identity() {
        let input = Value::array([]);
        assert_eq!(Outcome::from_output(&input, input.clone()), Outcome::Unchanged);
        assert!(matches!(
            Outcome::from_output(&input, Value::array([])),
            Outcome::Replaced(_)
        ));
    }

    #[test]
    fn test_issue_to_value_round_trips_fields() {
        let issue = Issue::new(Code::Custom("custom".into()), Value::from(1))
            .with_message("bad")
            .with_path(vec![PathKey::Index(1)]);
        let value = issue.to_value();
        assert_eq!(value.get("code"), Value::from("custom"));
        assert_eq!(value.get("message"), Value::from("bad"));
        assert_eq!(value.get("path"), Value::array([Value::from(1)]));
    }
}
