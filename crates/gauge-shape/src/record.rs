//! # Records
//!
//! A record validates every property of an object against one value shape,
//! and optionally every key against a key shape. A key shape that replaces
//! a key renames the property in the output.

use futures::future::{join_all, OptionFuture};

use gauge_core::coerce;
use gauge_core::{ApplyOptions, Error, Nonce, Object, Outcome, PathKey, Value};

use crate::cow::{assemble_pairs, Assembled, PairResult};
use crate::shape::{type_issue, Shape, ShapeKind};

#[derive(Clone)]
pub(crate) struct RecordKind {
    key: Option<Shape>,
    value: Shape,
}

/// Property names are strings; a key shape that produced another kind of
/// value is stringified.
fn into_key(value: Value) -> String {
    match coerce::string(&value) {
        Some(Value::String(s)) => s.to_string(),
        _ => format!("{value:?}"),
    }
}

impl RecordKind {
    pub(crate) fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.key.iter().chain(std::iter::once(&self.value))
    }

    fn finish(assembled: Assembled<Vec<(String, Value)>>) -> Outcome {
        match assembled {
            Assembled::Issues(issues) => Outcome::Issues(issues),
            Assembled::Unchanged => Outcome::Unchanged,
            Assembled::Changed(entries) => Outcome::Replaced(Value::Object(Object::from_entries(entries))),
        }
    }

    pub(crate) fn apply(&self, input: &Value, options: &ApplyOptions, nonce: &Nonce) -> Result<Outcome, Error> {
        let Value::Object(object) = input else {
            return Ok(type_issue(input, "object"));
        };
        let entries = object.entries();
        let results = entries.iter().map(|(key, value)| -> PairResult {
            (
                self.key
                    .as_ref()
                    .map(|shape| shape.apply_sync(&Value::from(key.as_str()), options, nonce)),
                self.value.apply_sync(value, options, nonce),
            )
        });
        let assembled = assemble_pairs(&entries, results, |key| PathKey::Key(key.clone()), into_key, options)?;
        Ok(Self::finish(assembled))
    }

    pub(crate) async fn apply_async(
        &self,
        input: &Value,
        options: &ApplyOptions,
        nonce: &Nonce,
    ) -> Result<Outcome, Error> {
        let Value::Object(object) = input else {
            return Ok(type_issue(input, "object"));
        };
        let entries = object.entries();
        let forks: Vec<Nonce> = entries.iter().map(|_| nonce.fork()).collect();
        let pending = entries.iter().zip(&forks).map(|((key, value), fork)| {
            let key_future = OptionFuture::from(
                self.key
                    .as_ref()
                    .map(|shape| shape.apply_async(Value::from(key.as_str()), options, fork)),
            );
            let value_future = self.value.apply_async(value.clone(), options, fork);
            futures::future::join(key_future, value_future)
        });
        let results = join_all(pending).await;
        let assembled = assemble_pairs(
            &entries,
            results.into_iter(),
            |key| PathKey::Key(key.clone()),
            into_key,
            options,
        )?;
        Ok(Self::finish(assembled))
    }
}

impl Shape {
    /// Objects whose property values all match `value`.
    pub fn record(value: Shape) -> Shape {
        Shape::from_kind(ShapeKind::Record(RecordKind { key: None, value }))
    }

    /// Objects whose keys match `key` and values match `value`.
    pub fn record_with_key(key: Shape, value: Shape) -> Shape {
        Shape::from_kind(ShapeKind::Record(RecordKind {
            key: Some(key),
            value,
        }))
    }
}
