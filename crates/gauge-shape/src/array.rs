//! # Arrays and Tuples
//!
//! An array shape has an optional fixed head (tuple positions) and an
//! optional rest shape applied to every element past the head. `array(s)`
//! is a rest-only shape, `tuple([a, b])` is head-only.
//!
//! With coercion enabled, non-array inputs are first converted with
//! [`coerce::array`](gauge_core::coerce::array): sets become their members,
//! maps become pair arrays and anything else a singleton.

use futures::future::join_all;

use gauge_core::coerce;
use gauge_core::{ApplyOptions, Code, Error, Issue, Nonce, Outcome, Value, ValueKind};

use crate::cow::{assemble_items, Assembled};
use crate::inputs::Inputs;
use crate::leaf::CoerceMode;
use crate::shape::{type_issue, Shape, ShapeKind};

#[derive(Clone)]
pub(crate) struct ArrayKind {
    head: Vec<Shape>,
    rest: Option<Shape>,
    coerce: CoerceMode,
}

impl ArrayKind {
    pub(crate) fn with_coerce(&self, coerce: CoerceMode) -> Self {
        Self {
            coerce,
            ..self.clone()
        }
    }

    pub(crate) fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.head.iter().chain(&self.rest)
    }

    pub(crate) fn inputs(&self, coerce: bool) -> Inputs {
        if self.coerce.resolve(coerce) {
            Inputs::any()
        } else {
            Inputs::kinds([ValueKind::Array])
        }
    }

    fn member(&self, index: usize) -> Option<&Shape> {
        self.head.get(index).or(self.rest.as_ref())
    }

    /// The array to validate and its elements, or the outcome to return
    /// without visiting members.
    fn prepare(&self, input: &Value, options: &ApplyOptions) -> Result<(Value, Vec<Value>), Outcome> {
        let base = match input {
            Value::Array(_) => input.clone(),
            _ if self.coerce.enabled(options) => match coerce::array(input) {
                Some(coerced) => coerced,
                None => return Err(type_issue(input, "array")),
            },
            _ => return Err(type_issue(input, "array")),
        };
        let items = base.as_array().map(|a| a.to_vec()).unwrap_or_default();
        let too_short = items.len() < self.head.len();
        let too_long = self.rest.is_none() && items.len() > self.head.len();
        if too_short || too_long {
            let issue = match self.rest {
                None => Issue::new(Code::Tuple, input.clone()).with_param(self.head.len()),
                Some(_) => Issue::new(Code::Type, input.clone()).with_param("array"),
            };
            return Err(Outcome::Issues(vec![issue]));
        }
        Ok((base, items))
    }

    fn finish(input: &Value, base: Value, assembled: Assembled<Vec<Value>>) -> Outcome {
        match assembled {
            Assembled::Issues(issues) => Outcome::Issues(issues),
            Assembled::Unchanged => Outcome::from_output(input, base),
            Assembled::Changed(items) => Outcome::Replaced(Value::array(items)),
        }
    }

    pub(crate) fn apply(&self, input: &Value, options: &ApplyOptions, nonce: &Nonce) -> Result<Outcome, Error> {
        let (base, items) = match self.prepare(input, options) {
            Ok(prepared) => prepared,
            Err(outcome) => return Ok(outcome),
        };
        let results = items.iter().enumerate().map(|(index, item)| match self.member(index) {
            Some(shape) => shape.apply_sync(item, options, nonce),
            None => Ok(Outcome::Unchanged),
        });
        let assembled = assemble_items(&items, results, options)?;
        Ok(Self::finish(input, base, assembled))
    }

    pub(crate) async fn apply_async(
        &self,
        input: &Value,
        options: &ApplyOptions,
        nonce: &Nonce,
    ) -> Result<Outcome, Error> {
        let (base, items) = match self.prepare(input, options) {
            Ok(prepared) => prepared,
            Err(outcome) => return Ok(outcome),
        };
        let forks: Vec<Nonce> = items.iter().map(|_| nonce.fork()).collect();
        let pending = items.iter().zip(&forks).enumerate().map(|(index, (item, fork))| {
            let shape = self.member(index);
            let item = item.clone();
            async move {
                match shape {
                    Some(shape) => shape.apply_async(item, options, fork).await,
                    None => Ok(Outcome::Unchanged),
                }
            }
        });
        let results = join_all(pending).await;
        let assembled = assemble_items(&items, results.into_iter(), options)?;
        Ok(Self::finish(input, base, assembled))
    }
}

impl Shape {
    /// Arrays whose elements all match `item`.
    pub fn array(item: Shape) -> Shape {
        Shape::from_kind(ShapeKind::Array(ArrayKind {
            head: Vec::new(),
            rest: Some(item),
            coerce: CoerceMode::Default,
        }))
    }

    /// Fixed-length arrays with one shape per position.
    pub fn tuple(head: impl IntoIterator<Item = Shape>) -> Shape {
        Shape::from_kind(ShapeKind::Array(ArrayKind {
            head: head.into_iter().collect(),
            rest: None,
            coerce: CoerceMode::Default,
        }))
    }

    /// Tuples followed by any number of `rest` elements.
    pub fn tuple_with_rest(head: impl IntoIterator<Item = Shape>, rest: Shape) -> Shape {
        Shape::from_kind(ShapeKind::Array(ArrayKind {
            head: head.into_iter().collect(),
            rest: Some(rest),
            coerce: CoerceMode::Default,
        }))
    }
}
