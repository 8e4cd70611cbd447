//! # Combinators
//!
//! Shapes that wrap another shape:
//!
//! - **replace** substitutes one literal input before the base shape runs;
//!   `optional`, `nullable` and `nullish` are replacements of `undefined`
//!   and `null`, with or without a default.
//! - **deny** rejects one literal, both as input and as output.
//! - **catch** turns any failure into a fallback value.
//! - **pipe** feeds the output of one shape into the next.
//! - **convert** replaces the value with the result of a function; it is
//!   the second half of [`Shape::transform`].

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use gauge_core::{ApplyOptions, Code, Error, Issue, Outcome, Value};

use crate::shape::{Shape, ShapeKind};

type FallbackFn = Arc<dyn Fn(&Value, &[Issue]) -> Value + Send + Sync>;
type ConvertFn = Arc<dyn Fn(Value, &ApplyOptions) -> Result<Value, Error> + Send + Sync>;
type AsyncConvertFn =
    Arc<dyn Fn(Value, ApplyOptions) -> BoxFuture<'static, Result<Value, Error>> + Send + Sync>;

/// Value used by a catch shape when its base fails.
#[derive(Clone)]
pub(crate) enum Fallback {
    Value(Value),
    With(FallbackFn),
}

impl Fallback {
    pub(crate) fn recover(&self, input: &Value, outcome: Outcome) -> Outcome {
        let Outcome::Issues(issues) = outcome else {
            return outcome;
        };
        let fallback = match self {
            Self::Value(value) => value.clone(),
            Self::With(fallback) => fallback(input, &issues),
        };
        Outcome::from_output(input, fallback)
    }
}

#[derive(Clone)]
pub(crate) enum Converter {
    Sync(ConvertFn),
    Async(AsyncConvertFn),
}

/// Map a converter result onto an outcome.
fn converted(input: &Value, result: Result<Value, Error>) -> Result<Outcome, Error> {
    match result {
        Ok(output) => Ok(Outcome::from_output(input, output)),
        Err(Error::Validation(err)) => Ok(Outcome::from_issues(err.into_issues())),
        Err(err) => {
            tracing::debug!(error = %err, "converter failed");
            Err(err)
        }
    }
}

impl Converter {
    pub(crate) fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }

    pub(crate) fn apply(&self, input: &Value, options: &ApplyOptions) -> Result<Outcome, Error> {
        match self {
            Self::Sync(convert) => converted(input, convert(input.clone(), options)),
            Self::Async(_) => Err(Error::AsyncShape),
        }
    }

    pub(crate) async fn apply_async(&self, input: &Value, options: &ApplyOptions) -> Result<Outcome, Error> {
        match self {
            Self::Sync(convert) => converted(input, convert(input.clone(), options)),
            Self::Async(convert) => converted(input, convert(input.clone(), options.clone()).await),
        }
    }
}

pub(crate) fn denied_issue(input: &Value, denied: &Value) -> Outcome {
    Outcome::Issues(vec![
        Issue::new(Code::Denied, input.clone()).with_param(denied.clone())
    ])
}

/// A base outcome whose output is the denied value becomes a denial.
pub(crate) fn deny_output(outcome: Outcome, denied: &Value) -> Outcome {
    match outcome {
        Outcome::Replaced(output) if output.same(denied) => denied_issue(&output, denied),
        other => other,
    }
}

impl Shape {
    /// Replace `search` with `replacement`; other inputs go to this shape.
    pub fn replace(&self, search: impl Into<Value>, replacement: impl Into<Value>) -> Shape {
        Shape::from_kind(ShapeKind::Replace {
            base: self.clone(),
            search: search.into(),
            replacement: replacement.into(),
        })
    }

    /// Also accept `undefined`.
    pub fn optional(&self) -> Shape {
        self.replace(Value::Undefined, Value::Undefined)
    }

    /// Replace `undefined` with `default`.
    pub fn optional_or(&self, default: impl Into<Value>) -> Shape {
        self.replace(Value::Undefined, default)
    }

    /// Also accept `null`.
    pub fn nullable(&self) -> Shape {
        self.replace(Value::Null, Value::Null)
    }

    /// Replace `null` with `default`.
    pub fn nullable_or(&self, default: impl Into<Value>) -> Shape {
        self.replace(Value::Null, default)
    }

    /// Also accept `null` and `undefined`.
    pub fn nullish(&self) -> Shape {
        self.optional().nullable()
    }

    /// Reject `denied` as input or output.
    pub fn deny(&self, denied: impl Into<Value>) -> Shape {
        Shape::from_kind(ShapeKind::Deny {
            base: self.clone(),
            denied: denied.into(),
        })
    }

    /// Reject `undefined`.
    pub fn non_optional(&self) -> Shape {
        self.deny(Value::Undefined)
    }

    /// Return `fallback` whenever this shape fails.
    pub fn catch(&self, fallback: impl Into<Value>) -> Shape {
        Shape::from_kind(ShapeKind::Catch {
            base: self.clone(),
            fallback: Fallback::Value(fallback.into()),
        })
    }

    /// Compute a fallback from the input and the issues.
    pub fn catch_with<F>(&self, fallback: F) -> Shape
    where
        F: Fn(&Value, &[Issue]) -> Value + Send + Sync + 'static,
    {
        Shape::from_kind(ShapeKind::Catch {
            base: self.clone(),
            fallback: Fallback::With(Arc::new(fallback)),
        })
    }

    /// Apply `next` to the output of this shape.
    pub fn pipe(&self, next: Shape) -> Shape {
        Shape::from_kind(ShapeKind::Pipe {
            input: self.clone(),
            output: next,
        })
    }

    /// Accepts any value and replaces it with the result of `convert`.
    pub fn convert<F>(convert: F) -> Shape
    where
        F: Fn(Value, &ApplyOptions) -> Result<Value, Error> + Send + Sync + 'static,
    {
        Shape::from_kind(ShapeKind::Convert(Converter::Sync(Arc::new(convert))))
    }

    /// Async [`Shape::convert`].
    pub fn convert_async<F, Fut>(convert: F) -> Shape
    where
        F: Fn(Value, ApplyOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        let convert: AsyncConvertFn = Arc::new(move |value, options| convert(value, options).boxed());
        Shape::from_kind(ShapeKind::Convert(Converter::Async(convert)))
    }

    /// Validate with this shape, then convert the output.
    pub fn transform<F>(&self, convert: F) -> Shape
    where
        F: Fn(Value, &ApplyOptions) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.pipe(Shape::convert(convert))
    }

    /// Validate with this shape, then convert the output asynchronously.
    pub fn transform_async<F, Fut>(&self, convert: F) -> Shape
    where
        F: Fn(Value, ApplyOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        self.pipe(Shape::convert_async(convert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_core::Nonce;

    fn run(shape: &Shape, input: &Value) -> Outcome {
        shape.apply(input, &ApplyOptions::default(), &Nonce::next()).unwrap()
    }

    #[test]
    fn test_optional_and_defaults() {
        assert_eq!(run(&Shape::string().optional(), &Value::Undefined), Outcome::Unchanged);
        assert_eq!(
            run(&Shape::string().optional_or("n/a"), &Value::Undefined),
            Outcome::Replaced(Value::from("n/a"))
        );
        assert!(!run(&Shape::string().optional(), &Value::Null).is_ok());
        assert_eq!(run(&Shape::string().nullish(), &Value::Null), Outcome::Unchanged);
        assert_eq!(
            run(&Shape::number().nullable_or(0), &Value::Null),
            Outcome::Replaced(Value::from(0))
        );
    }

    #[test]
    fn test_deny_checks_input_and_output() {
        let no_empty = Shape::string().deny("");
        let Outcome::Issues(issues) = run(&no_empty, &Value::from("")) else {
            panic!("expected issues");
        };
        assert_eq!(issues[0].code, Code::Denied);

        let blanked = Shape::string().alter(|_, _| Ok(Value::from(""))).deny("");
        assert!(!run(&blanked, &Value::from("x")).is_ok());

        let required = Shape::string().optional().non_optional();
        assert!(!run(&required, &Value::Undefined).is_ok());
    }

    #[test]
    fn test_catch_substitutes_fallback() {
        assert_eq!(
            run(&Shape::number().catch(0), &Value::from("x")),
            Outcome::Replaced(Value::from(0))
        );
        let counted = Shape::number().catch_with(|_, issues| Value::from(issues.len()));
        assert_eq!(run(&counted, &Value::Null), Outcome::Replaced(Value::from(1)));
        assert_eq!(run(&Shape::number().catch(0), &Value::from(5)), Outcome::Unchanged);
    }

    #[test]
    fn test_pipe_and_transform() {
        let length = Shape::string().transform(|v, _| {
            Ok(Value::from(v.as_str().map(str::len).unwrap_or_default()))
        });
        assert_eq!(run(&length, &Value::from("abc")), Outcome::Replaced(Value::from(3)));

        let positive_length = length.pipe(Shape::number().gt(0.0));
        assert!(!run(&positive_length, &Value::from("")).is_ok());
        assert!(!run(&positive_length, &Value::from(1)).is_ok());
    }

    #[test]
    fn test_converter_validation_errors_become_issues() {
        let parse_int = Shape::convert(|v, _| {
            v.as_str()
                .and_then(|s| s.parse::<i32>().ok())
                .map(Value::from)
                .ok_or_else(|| Error::issues(vec![Issue::new(Code::Custom("int".into()), v.clone())]))
        });
        assert_eq!(run(&parse_int, &Value::from("12")), Outcome::Replaced(Value::from(12)));
        let Outcome::Issues(issues) = run(&parse_int, &Value::from("x")) else {
            panic!("expected issues");
        };
        assert_eq!(issues[0].code, Code::Custom("int".into()));
    }

    #[test]
    fn test_async_converter_rejected_by_sync_apply() {
        let shape = Shape::convert_async(|v, _| async move { Ok(v) });
        assert!(shape.is_async());
        let result = shape.apply(&Value::Null, &ApplyOptions::default(), &Nonce::next());
        assert!(matches!(result, Err(Error::AsyncShape)));
    }
}
