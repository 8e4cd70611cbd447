//! # Operation Pipeline
//!
//! Operations are the checks and alterations attached to a shape after its
//! type has been established. A shape stores them as an owned, ordered
//! slice of descriptors; one fold function ([`apply_operations`], or
//! [`apply_operations_async`] for shapes with async operations) walks the
//! slice for every parse.
//!
//! ## Fold Semantics
//!
//! - Operations run in declaration order against the current output.
//! - Once an issue has been recorded, fast mode returns immediately.
//!   Verbose mode continues but only runs *forced* checks; alterations never
//!   run on an invalid value.
//! - The fold ends by comparing the output with the input: the same value
//!   yields `Unchanged`, anything else `Replaced`.
//!
//! ## Callback Errors
//!
//! Callbacks return `Result<_, Error>`. `Error::Validation` is recognised
//! and its issues are merged into the parse; any other error is fatal and
//! propagates unchanged.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use regex::Regex;

use gauge_core::value::iso_string;
use gauge_core::{ApplyOptions, Code, Error, Issue, Outcome, Value};

/// Synchronous check: returns zero or more issues for the value.
pub type CheckFn =
    Arc<dyn Fn(&Value, &ApplyOptions) -> Result<Vec<Issue>, Error> + Send + Sync>;

/// Synchronous alteration: returns the replacement value.
pub type AlterFn = Arc<dyn Fn(Value, &ApplyOptions) -> Result<Value, Error> + Send + Sync>;

/// Predicate used by refinements.
pub type RefineFn = Arc<dyn Fn(&Value, &ApplyOptions) -> bool + Send + Sync>;

/// Asynchronous check.
pub type AsyncCheckFn = Arc<
    dyn Fn(Value, ApplyOptions) -> BoxFuture<'static, Result<Vec<Issue>, Error>> + Send + Sync,
>;

/// Asynchronous alteration.
pub type AsyncAlterFn =
    Arc<dyn Fn(Value, ApplyOptions) -> BoxFuture<'static, Result<Value, Error>> + Send + Sync>;

/// Whether an operation inspects or replaces the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// May raise issues; never changes the value.
    Check,
    /// Replaces the value; may raise issues.
    Alter,
}

/// Settings shared by every kind of operation.
#[derive(Debug, Clone, Default)]
pub struct OperationOptions {
    /// Run this check even after earlier operations failed (verbose mode).
    pub force: bool,
    /// Issue code override for constraints and refinements.
    pub code: Option<Code>,
    /// Message attached to raised issues.
    pub message: Option<String>,
    /// Metadata attached to raised issues.
    pub meta: Option<Value>,
    /// Parameter override for raised issues.
    pub param: Option<Value>,
}

impl OperationOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the operation as forced.
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Override the issue code.
    pub fn code(mut self, code: Code) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach metadata.
    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Override the issue parameter.
    pub fn param(mut self, param: impl Into<Value>) -> Self {
        self.param = Some(param.into());
        self
    }
}

/// Built-in constraints. Each one only inspects values of the kinds it
/// applies to and passes everything else.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Minimum string length (in chars) or array length.
    MinLength(usize),
    /// Maximum string length (in chars) or array length.
    MaxLength(usize),
    /// String must match the pattern.
    Regex(Regex),
    /// Number must be an integer.
    Integer,
    /// Number must be finite.
    Finite,
    /// Number must exceed the bound.
    GreaterThan(f64),
    /// Number must be at least the bound.
    GreaterThanOrEqual(f64),
    /// Number must be below the bound.
    LessThan(f64),
    /// Number must be at most the bound.
    LessThanOrEqual(f64),
    /// Number must be a multiple of the divisor.
    MultipleOf(f64),
    /// BigInt lower bound.
    MinBigInt(i128),
    /// BigInt upper bound.
    MaxBigInt(i128),
    /// Minimum set or map size.
    MinSize(usize),
    /// Maximum set or map size.
    MaxSize(usize),
    /// Earliest allowed date.
    MinDate(DateTime<Utc>),
    /// Latest allowed date.
    MaxDate(DateTime<Utc>),
}

impl Constraint {
    /// The issue code if `value` violates the constraint.
    pub fn violation(&self, value: &Value) -> Option<Code> {
        match (self, value) {
            (Self::MinLength(min), Value::String(s)) => {
                (s.chars().count() < *min).then_some(Code::StringMinLength)
            }
            (Self::MaxLength(max), Value::String(s)) => {
                (s.chars().count() > *max).then_some(Code::StringMaxLength)
            }
            (Self::MinLength(min), Value::Array(a)) => {
                (a.len() < *min).then_some(Code::ArrayMinLength)
            }
            (Self::MaxLength(max), Value::Array(a)) => {
                (a.len() > *max).then_some(Code::ArrayMaxLength)
            }
            (Self::Regex(re), Value::String(s)) => (!re.is_match(s)).then_some(Code::StringRegex),
            (Self::Integer, Value::Number(n)) => {
                (!n.is_finite() || n.fract() != 0.0).then_some(Code::NumberInteger)
            }
            (Self::Finite, Value::Number(n)) => (!n.is_finite()).then_some(Code::NumberFinite),
            (Self::GreaterThan(b), Value::Number(n)) => (n <= b).then_some(Code::NumberGreaterThan),
            (Self::GreaterThanOrEqual(b), Value::Number(n)) => {
                (n < b).then_some(Code::NumberGreaterThanOrEqual)
            }
            (Self::LessThan(b), Value::Number(n)) => (n >= b).then_some(Code::NumberLessThan),
            (Self::LessThanOrEqual(b), Value::Number(n)) => {
                (n > b).then_some(Code::NumberLessThanOrEqual)
            }
            (Self::MultipleOf(d), Value::Number(n)) => {
                (!is_multiple_of(*n, *d)).then_some(Code::NumberMultipleOf)
            }
            (Self::MinBigInt(min), Value::BigInt(n)) => (n < min).then_some(Code::BigIntMin),
            (Self::MaxBigInt(max), Value::BigInt(n)) => (n > max).then_some(Code::BigIntMax),
            (Self::MinSize(min), Value::Set(s)) => (s.len() < *min).then_some(Code::SetMinSize),
            (Self::MaxSize(max), Value::Set(s)) => (s.len() > *max).then_some(Code::SetMaxSize),
            (Self::MinSize(min), Value::Map(m)) => (m.len() < *min).then_some(Code::SetMinSize),
            (Self::MaxSize(max), Value::Map(m)) => (m.len() > *max).then_some(Code::SetMaxSize),
            (Self::MinDate(min), Value::Date(d)) => (d < min).then_some(Code::DateMin),
            (Self::MaxDate(max), Value::Date(d)) => (d > max).then_some(Code::DateMax),
            _ => None,
        }
    }

    /// The default issue parameter.
    pub fn param(&self) -> Value {
        match self {
            Self::MinLength(n) | Self::MaxLength(n) | Self::MinSize(n) | Self::MaxSize(n) => {
                Value::from(*n)
            }
            Self::Regex(re) => Value::from(re.as_str()),
            Self::Integer | Self::Finite => Value::Undefined,
            Self::GreaterThan(b)
            | Self::GreaterThanOrEqual(b)
            | Self::LessThan(b)
            | Self::LessThanOrEqual(b)
            | Self::MultipleOf(b) => Value::from(*b),
            Self::MinBigInt(n) | Self::MaxBigInt(n) => Value::bigint(*n),
            Self::MinDate(d) | Self::MaxDate(d) => Value::from(iso_string(d)),
        }
    }
}

fn is_multiple_of(value: f64, divisor: f64) -> bool {
    if divisor == 0.0 || !value.is_finite() {
        return false;
    }
    let quotient = value / divisor;
    (quotient - quotient.round()).abs() < 1e-9
}

#[derive(Clone)]
pub(crate) enum Callback {
    Constraint(Constraint),
    Refine(RefineFn),
    Check(CheckFn),
    Alter(AlterFn),
    CheckAsync(AsyncCheckFn),
    AlterAsync(AsyncAlterFn),
}

/// One operation attached to a shape.
#[derive(Clone)]
pub struct Operation {
    pub(crate) callback: Callback,
    pub(crate) options: OperationOptions,
}

impl Operation {
    pub(crate) fn new(callback: Callback, options: OperationOptions) -> Self {
        Self { callback, options }
    }

    /// Check or alter.
    pub fn kind(&self) -> OperationKind {
        match self.callback {
            Callback::Alter(_) | Callback::AlterAsync(_) => OperationKind::Alter,
            _ => OperationKind::Check,
        }
    }

    /// Whether the operation must be awaited.
    pub fn is_async(&self) -> bool {
        matches!(
            self.callback,
            Callback::CheckAsync(_) | Callback::AlterAsync(_)
        )
    }

    /// Whether the operation still runs after an earlier failure.
    fn runs_after_failure(&self) -> bool {
        self.options.force && self.kind() == OperationKind::Check
    }

    /// Build the issue raised by a failed constraint or refinement.
    fn issue(&self, default_code: Code, value: &Value, default_param: Value) -> Issue {
        let mut issue = Issue::new(
            self.options.code.clone().unwrap_or(default_code),
            value.clone(),
        );
        let param = self.options.param.clone().unwrap_or(default_param);
        if !param.is_undefined() {
            issue.param = Some(param);
        }
        issue.message = self.options.message.clone();
        issue.meta = self.options.meta.clone();
        issue
    }

    /// Run a synchronous operation.
    fn run(&self, output: &mut Value, options: &ApplyOptions, issues: &mut Vec<Issue>) -> Result<(), Error> {
        match &self.callback {
            Callback::Constraint(constraint) => {
                if let Some(code) = constraint.violation(output) {
                    issues.push(self.issue(code, output, constraint.param()));
                }
                Ok(())
            }
            Callback::Refine(predicate) => {
                if !predicate(output, options) {
                    issues.push(self.issue(Code::Predicate, output, Value::Undefined));
                }
                Ok(())
            }
            Callback::Check(check) => {
                let found = capture(check(output, options), issues)?;
                issues.extend(found.unwrap_or_default());
                Ok(())
            }
            Callback::Alter(alter) => {
                if let Some(value) = capture(alter(output.clone(), options), issues)? {
                    *output = value;
                }
                Ok(())
            }
            Callback::CheckAsync(_) | Callback::AlterAsync(_) => Err(Error::AsyncShape),
        }
    }

    /// Run any operation, awaiting async callbacks.
    async fn run_async(
        &self,
        output: &mut Value,
        options: &ApplyOptions,
        issues: &mut Vec<Issue>,
    ) -> Result<(), Error> {
        match &self.callback {
            Callback::CheckAsync(check) => {
                let found = capture(check(output.clone(), options.clone()).await, issues)?;
                issues.extend(found.unwrap_or_default());
                Ok(())
            }
            Callback::AlterAsync(alter) => {
                if let Some(value) = capture(alter(output.clone(), options.clone()).await, issues)? {
                    *output = value;
                }
                Ok(())
            }
            _ => self.run(output, options, issues),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let callback = match &self.callback {
            Callback::Constraint(c) => return f.debug_tuple("Operation").field(c).finish(),
            Callback::Refine(_) => "refine",
            Callback::Check(_) => "check",
            Callback::Alter(_) => "alter",
            Callback::CheckAsync(_) => "check_async",
            Callback::AlterAsync(_) => "alter_async",
        };
        f.debug_struct("Operation")
            .field("callback", &callback)
            .field("force", &self.options.force)
            .finish()
    }
}

/// Split a callback result into a value, captured issues, or a fatal error.
fn capture<T>(result: Result<T, Error>, issues: &mut Vec<Issue>) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::Validation(err)) => {
            issues.extend(err.into_issues());
            Ok(None)
        }
        Err(err) => {
            tracing::debug!(error = %err, "operation callback failed");
            Err(err)
        }
    }
}

/// Whether the type phase rejected the input itself rather than one of its
/// members. Member issues always carry a path.
fn rejects_type(issues: &[Issue]) -> bool {
    issues.iter().all(|issue| {
        issue.path.is_empty() && matches!(issue.code, Code::Type | Code::Tuple | Code::Const | Code::Enum)
    })
}

/// Starting state of the fold, or the outcome to return untouched.
///
/// Operations only ever see values of the shape's type: forced checks run
/// after member failures in verbose mode, never after a type rejection.
fn start(input: &Value, outcome: Outcome, options: &ApplyOptions) -> Result<(Value, Vec<Issue>), Outcome> {
    match outcome {
        Outcome::Unchanged => Ok((input.clone(), Vec::new())),
        Outcome::Replaced(value) => Ok((value, Vec::new())),
        Outcome::Issues(issues) if options.verbose && !rejects_type(&issues) => Ok((input.clone(), issues)),
        issues @ Outcome::Issues(_) => Err(issues),
    }
}

fn finish(input: &Value, output: Value, issues: Vec<Issue>) -> Outcome {
    if issues.is_empty() {
        Outcome::from_output(input, output)
    } else {
        Outcome::Issues(issues)
    }
}

/// Fold synchronous operations over the outcome of a shape's type phase.
pub(crate) fn apply_operations(
    operations: &[Operation],
    input: &Value,
    outcome: Outcome,
    options: &ApplyOptions,
) -> Result<Outcome, Error> {
    if operations.is_empty() {
        return Ok(outcome);
    }
    let (mut output, mut issues) = match start(input, outcome, options) {
        Ok(state) => state,
        Err(outcome) => return Ok(outcome),
    };
    for operation in operations {
        if !issues.is_empty() && !operation.runs_after_failure() {
            continue;
        }
        operation.run(&mut output, options, &mut issues)?;
        if !issues.is_empty() && !options.verbose {
            break;
        }
    }
    Ok(finish(input, output, issues))
}

/// Fold operations, awaiting async ones.
pub(crate) async fn apply_operations_async(
    operations: &[Operation],
    input: &Value,
    outcome: Outcome,
    options: &ApplyOptions,
) -> Result<Outcome, Error> {
    if operations.is_empty() {
        return Ok(outcome);
    }
    let (mut output, mut issues) = match start(input, outcome, options) {
        Ok(state) => state,
        Err(outcome) => return Ok(outcome),
    };
    for operation in operations {
        if !issues.is_empty() && !operation.runs_after_failure() {
            continue;
        }
        operation.run_async(&mut output, options, &mut issues).await?;
        if !issues.is_empty() && !options.verbose {
            break;
        }
    }
    Ok(finish(input, output, issues))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_core::PathKey;

    fn constraint(c: Constraint) -> Operation {
        Operation::new(Callback::Constraint(c), OperationOptions::default())
    }

    fn alter(f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Operation {
        Operation::new(
            Callback::Alter(Arc::new(move |v: Value, _: &ApplyOptions| Ok(f(v)))),
            OperationOptions::default(),
        )
    }

    #[test]
    fn test_constraint_codes_depend_on_value_kind() {
        let min = Constraint::MinLength(2);
        assert_eq!(min.violation(&Value::from("a")), Some(Code::StringMinLength));
        assert_eq!(
            min.violation(&Value::array([Value::Null])),
            Some(Code::ArrayMinLength)
        );
        assert_eq!(min.violation(&Value::from(1)), None);
    }

    #[test]
    fn test_multiple_of_tolerates_float_error() {
        assert!(is_multiple_of(0.3, 0.1));
        assert!(!is_multiple_of(0.35, 0.1));
        assert!(!is_multiple_of(1.0, 0.0));
    }

    #[test]
    fn test_fold_stops_at_first_issue_in_fast_mode() {
        let ops = vec![
            constraint(Constraint::MinLength(3)),
            constraint(Constraint::MaxLength(0)),
        ];
        let input = Value::from("ab");
        let outcome =
            apply_operations(&ops, &input, Outcome::Unchanged, &ApplyOptions::default()).unwrap();
        let Outcome::Issues(issues) = outcome else {
            panic!("expected issues");
        };
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, Code::StringMinLength);
        assert_eq!(issues[0].param, Some(Value::from(3)));
    }

    #[test]
    fn test_verbose_runs_only_forced_checks_after_failure() {
        let forced = Operation::new(
            Callback::Constraint(Constraint::MaxLength(0)),
            OperationOptions::new().force(),
        );
        let ops = vec![
            constraint(Constraint::MinLength(3)),
            constraint(Constraint::Regex(Regex::new("^z").unwrap())),
            forced,
        ];
        let options = ApplyOptions::new().verbose(true);
        let outcome = apply_operations(&ops, &Value::from("ab"), Outcome::Unchanged, &options).unwrap();
        let Outcome::Issues(issues) = outcome else {
            panic!("expected issues");
        };
        let codes: Vec<Code> = issues.into_iter().map(|i| i.code).collect();
        assert_eq!(codes, vec![Code::StringMinLength, Code::StringMaxLength]);
    }

    #[test]
    fn test_forced_checks_skip_type_rejections() {
        let forced = Operation::new(
            Callback::Check(Arc::new(|v: &Value, _: &ApplyOptions| {
                Ok(vec![Issue::new(Code::Custom("forced".into()), v.clone())])
            })),
            OperationOptions::new().force(),
        );
        let ops = vec![forced];
        let options = ApplyOptions::new().verbose(true);

        let rejected = Outcome::Issues(vec![Issue::new(Code::Type, Value::from(1)).with_param("string")]);
        let outcome = apply_operations(&ops, &Value::from(1), rejected.clone(), &options).unwrap();
        assert_eq!(outcome, rejected);

        let member = Issue::new(Code::Type, Value::from("x")).with_path(vec![PathKey::Index(0)]);
        let input = Value::array([Value::from("x")]);
        let outcome = apply_operations(&ops, &input, Outcome::Issues(vec![member]), &options).unwrap();
        let Outcome::Issues(issues) = outcome else {
            panic!("expected issues");
        };
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[1].code, Code::Custom("forced".into()));
    }

    #[test]
    fn test_alter_replaces_and_identity_is_unchanged() {
        let input = Value::from(2);
        let doubled = apply_operations(
            &[alter(|v| Value::from(v.as_f64().unwrap_or_default() * 2.0))],
            &input,
            Outcome::Unchanged,
            &ApplyOptions::default(),
        )
        .unwrap();
        assert_eq!(doubled, Outcome::Replaced(Value::from(4)));

        let same = apply_operations(&[alter(|v| v)], &input, Outcome::Unchanged, &ApplyOptions::default())
            .unwrap();
        assert_eq!(same, Outcome::Unchanged);
    }

    #[test]
    fn test_alters_skip_after_failure() {
        let ops = vec![alter(|_| Value::from("changed"))];
        let failed = Outcome::Issues(vec![Issue::new(Code::Type, Value::Null)]);
        let options = ApplyOptions::new().verbose(true);
        let outcome = apply_operations(&ops, &Value::Null, failed.clone(), &options).unwrap();
        assert_eq!(outcome, failed);
    }

    #[test]
    fn test_recognised_callback_issues_are_captured() {
        let check = Operation::new(
            Callback::Check(Arc::new(|v: &Value, _: &ApplyOptions| {
                Err(Error::issues(vec![Issue::new(Code::Custom("nope".into()), v.clone())]))
            })),
            OperationOptions::default(),
        );
        let outcome =
            apply_operations(&[check], &Value::from(1), Outcome::Unchanged, &ApplyOptions::default())
                .unwrap();
        assert!(matches!(outcome, Outcome::Issues(ref i) if i[0].code == Code::Custom("nope".into())));
    }

    #[test]
    fn test_unrecognised_callback_errors_are_fatal() {
        let check = Operation::new(
            Callback::Check(Arc::new(|_: &Value, _: &ApplyOptions| {
                Err(Error::callback("boom"))
            })),
            OperationOptions::default(),
        );
        let result =
            apply_operations(&[check], &Value::from(1), Outcome::Unchanged, &ApplyOptions::default());
        assert!(matches!(result, Err(Error::Callback(_))));
    }

    #[test]
    fn test_options_override_issue_fields() {
        let op = Operation::new(
            Callback::Refine(Arc::new(|_: &Value, _: &ApplyOptions| false)),
            OperationOptions::new()
                .code(Code::Custom("even".into()))
                .message("must be even")
                .param(2),
        );
        let outcome =
            apply_operations(&[op], &Value::from(3), Outcome::Unchanged, &ApplyOptions::default())
                .unwrap();
        let Outcome::Issues(issues) = outcome else {
            panic!("expected issues");
        };
        assert_eq!(issues[0].code, Code::Custom("even".into()));
        assert_eq!(issues[0].message.as_deref(), Some("must be even"));
        assert_eq!(issues[0].param, Some(Value::from(2)));
    }
}
