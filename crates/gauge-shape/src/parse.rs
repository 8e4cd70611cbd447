//! # Parse API
//!
//! The public entry points. Each call allocates a fresh [`Nonce`] and
//! applies the shape once.
//!
//! | Entry point        | Invalid input                      |
//! |--------------------|------------------------------------|
//! | `parse`            | `Err(Error::Validation(..))`       |
//! | `try_parse`        | `Ok(Validated::Invalid(issues))`   |
//! | `accepts`          | `Ok(false)`                        |
//!
//! Every entry point returns `Err` for fatal callback errors, and the
//! synchronous ones return `Err(Error::AsyncShape)` for async shapes.

use gauge_core::{ApplyOptions, Error, Nonce, Outcome, Validated, Value};

use crate::shape::Shape;

fn validated(outcome: Outcome, input: Value) -> Validated {
    match outcome.into_value(&input) {
        Ok(value) => Validated::Valid(value),
        Err(issues) => Validated::Invalid(issues),
    }
}

fn into_result(validated: Validated) -> Result<Value, Error> {
    match validated {
        Validated::Valid(value) => Ok(value),
        Validated::Invalid(issues) => Err(Error::issues(issues)),
    }
}

impl Shape {
    /// Parse with default options, returning the output or an error.
    pub fn parse(&self, input: impl Into<Value>) -> Result<Value, Error> {
        self.parse_with(input, &ApplyOptions::default())
    }

    /// [`Shape::parse`] with explicit options.
    pub fn parse_with(&self, input: impl Into<Value>, options: &ApplyOptions) -> Result<Value, Error> {
        into_result(self.try_parse_with(input, options)?)
    }

    /// Parse with default options without turning issues into an error.
    pub fn try_parse(&self, input: impl Into<Value>) -> Result<Validated, Error> {
        self.try_parse_with(input, &ApplyOptions::default())
    }

    /// [`Shape::try_parse`] with explicit options.
    pub fn try_parse_with(&self, input: impl Into<Value>, options: &ApplyOptions) -> Result<Validated, Error> {
        let input = input.into();
        let outcome = self.apply(&input, options, &Nonce::next())?;
        Ok(validated(outcome, input))
    }

    /// Whether `input` is valid under default options.
    pub fn accepts(&self, input: &Value) -> Result<bool, Error> {
        Ok(self.apply(input, &ApplyOptions::default(), &Nonce::next())?.is_ok())
    }

    /// Parse a shape that may be async, with default options.
    pub async fn parse_async(&self, input: Value) -> Result<Value, Error> {
        self.parse_async_with(input, &ApplyOptions::default()).await
    }

    /// [`Shape::parse_async`] with explicit options.
    pub async fn parse_async_with(&self, input: Value, options: &ApplyOptions) -> Result<Value, Error> {
        into_result(self.try_parse_async_with(input, options).await?)
    }

    /// Async form of [`Shape::try_parse`].
    pub async fn try_parse_async(&self, input: Value) -> Result<Validated, Error> {
        self.try_parse_async_with(input, &ApplyOptions::default()).await
    }

    /// [`Shape::try_parse_async`] with explicit options.
    pub async fn try_parse_async_with(&self, input: Value, options: &ApplyOptions) -> Result<Validated, Error> {
        let nonce = Nonce::next();
        let outcome = self.apply_async(input.clone(), options, &nonce).await?;
        Ok(validated(outcome, input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_core::Code;

    #[test]
    fn test_parse_and_try_parse_agree() {
        let shape = Shape::number();
        assert_eq!(shape.parse(1).unwrap(), Value::from(1));
        assert!(matches!(shape.try_parse(1), Ok(Validated::Valid(_))));

        let err = shape.parse("x").unwrap_err();
        let issues = err.validation_issues().map(<[gauge_core::Issue]>::to_vec).unwrap_or_default();
        let Ok(Validated::Invalid(tried)) = shape.try_parse("x") else {
            panic!("expected invalid");
        };
        assert_eq!(issues, tried);
        assert_eq!(tried[0].code, Code::Type);
    }

    #[test]
    fn test_accepts() {
        assert_eq!(Shape::string().accepts(&Value::from("a")).ok(), Some(true));
        assert_eq!(Shape::string().accepts(&Value::Null).ok(), Some(false));
    }

    #[test]
    fn test_sync_entry_points_reject_async_shapes() {
        let shape = Shape::string().check_async(|_, _| async { Ok(Vec::new()) });
        assert!(matches!(shape.parse("a"), Err(Error::AsyncShape)));
        assert!(matches!(shape.try_parse("a"), Err(Error::AsyncShape)));
        assert!(matches!(shape.accepts(&Value::from("a")), Err(Error::AsyncShape)));
    }
}
