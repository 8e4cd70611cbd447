//! # Maps and Sets
//!
//! Map members are reported under a `PathKey::Value` holding the map key;
//! set members under their insertion index. A set rebuilt from altered
//! members is deduplicated again.

use futures::future::{join, join_all};

use gauge_core::coerce;
use gauge_core::{ApplyOptions, Error, Nonce, Outcome, PathKey, Value, ValueKind};

use crate::cow::{assemble_items, assemble_pairs, Assembled, PairResult};
use crate::inputs::Inputs;
use crate::leaf::CoerceMode;
use crate::shape::{type_issue, Shape, ShapeKind};

#[derive(Clone)]
pub(crate) struct MapKind {
    pub(crate) key: Shape,
    pub(crate) value: Shape,
    coerce: CoerceMode,
}

#[derive(Clone)]
pub(crate) struct SetKind {
    pub(crate) value: Shape,
    coerce: CoerceMode,
}

/// The input itself, its coerced form, or a type issue.
fn base(input: &Value, kind: ValueKind, enabled: bool, convert: fn(&Value) -> Option<Value>) -> Result<Value, Outcome> {
    if input.kind() == kind {
        return Ok(input.clone());
    }
    if enabled {
        if let Some(coerced) = convert(input) {
            return Ok(coerced);
        }
    }
    Err(type_issue(input, kind.as_str()))
}

impl MapKind {
    pub(crate) fn with_coerce(&self, coerce: CoerceMode) -> Self {
        Self {
            coerce,
            ..self.clone()
        }
    }

    pub(crate) fn inputs(&self, coerce: bool) -> Inputs {
        if self.coerce.resolve(coerce) {
            Inputs::kinds([ValueKind::Map, ValueKind::Array, ValueKind::Object])
        } else {
            Inputs::kinds([ValueKind::Map])
        }
    }

    fn prepare(&self, input: &Value, options: &ApplyOptions) -> Result<(Value, Vec<(Value, Value)>), Outcome> {
        let base = base(input, ValueKind::Map, self.coerce.enabled(options), coerce::map)?;
        let entries = match &base {
            Value::Map(map) => map.entries(),
            _ => Vec::new(),
        };
        Ok((base, entries))
    }

    fn finish(input: &Value, base: Value, assembled: Assembled<Vec<(Value, Value)>>) -> Outcome {
        match assembled {
            Assembled::Issues(issues) => Outcome::Issues(issues),
            Assembled::Unchanged => Outcome::from_output(input, base),
            Assembled::Changed(entries) => Outcome::Replaced(Value::map(entries)),
        }
    }

    pub(crate) fn apply(&self, input: &Value, options: &ApplyOptions, nonce: &Nonce) -> Result<Outcome, Error> {
        let (base, entries) = match self.prepare(input, options) {
            Ok(prepared) => prepared,
            Err(outcome) => return Ok(outcome),
        };
        let results = entries.iter().map(|(key, value)| -> PairResult {
            (
                Some(self.key.apply_sync(key, options, nonce)),
                self.value.apply_sync(value, options, nonce),
            )
        });
        let assembled = assemble_pairs(&entries, results, |key| PathKey::Value(key.clone()), |key| key, options)?;
        Ok(Self::finish(input, base, assembled))
    }

    pub(crate) async fn apply_async(
        &self,
        input: &Value,
        options: &ApplyOptions,
        nonce: &Nonce,
    ) -> Result<Outcome, Error> {
        let (base, entries) = match self.prepare(input, options) {
            Ok(prepared) => prepared,
            Err(outcome) => return Ok(outcome),
        };
        let forks: Vec<(Nonce, Nonce)> = entries.iter().map(|_| (nonce.fork(), nonce.fork())).collect();
        let pending = entries.iter().zip(&forks).map(|((key, value), (key_fork, value_fork))| {
            join(
                self.key.apply_async(key.clone(), options, key_fork),
                self.value.apply_async(value.clone(), options, value_fork),
            )
        });
        let results = join_all(pending)
            .await
            .into_iter()
            .map(|(key, value)| -> PairResult { (Some(key), value) });
        let assembled = assemble_pairs(&entries, results, |key| PathKey::Value(key.clone()), |key| key, options)?;
        Ok(Self::finish(input, base, assembled))
    }
}

impl SetKind {
    pub(crate) fn with_coerce(&self, coerce: CoerceMode) -> Self {
        Self {
            coerce,
            ..self.clone()
        }
    }

    pub(crate) fn inputs(&self, coerce: bool) -> Inputs {
        if self.coerce.resolve(coerce) {
            Inputs::any()
        } else {
            Inputs::kinds([ValueKind::Set])
        }
    }

    fn prepare(&self, input: &Value, options: &ApplyOptions) -> Result<(Value, Vec<Value>), Outcome> {
        let base = base(input, ValueKind::Set, self.coerce.enabled(options), coerce::set)?;
        let values = match &base {
            Value::Set(set) => set.values(),
            _ => Vec::new(),
        };
        Ok((base, values))
    }

    fn finish(input: &Value, base: Value, assembled: Assembled<Vec<Value>>) -> Outcome {
        match assembled {
            Assembled::Issues(issues) => Outcome::Issues(issues),
            Assembled::Unchanged => Outcome::from_output(input, base),
            Assembled::Changed(values) => Outcome::Replaced(Value::set(values)),
        }
    }

    pub(crate) fn apply(&self, input: &Value, options: &ApplyOptions, nonce: &Nonce) -> Result<Outcome, Error> {
        let (base, values) = match self.prepare(input, options) {
            Ok(prepared) => prepared,
            Err(outcome) => return Ok(outcome),
        };
        let results = values
            .iter()
            .map(|value| self.value.apply_sync(value, options, nonce));
        let assembled = assemble_items(&values, results, options)?;
        Ok(Self::finish(input, base, assembled))
    }

    pub(crate) async fn apply_async(
        &self,
        input: &Value,
        options: &ApplyOptions,
        nonce: &Nonce,
    ) -> Result<Outcome, Error> {
        let (base, values) = match self.prepare(input, options) {
            Ok(prepared) => prepared,
            Err(outcome) => return Ok(outcome),
        };
        let forks: Vec<Nonce> = values.iter().map(|_| nonce.fork()).collect();
        let pending = values
            .iter()
            .zip(&forks)
            .map(|(value, fork)| self.value.apply_async(value.clone(), options, fork));
        let results = join_all(pending).await;
        let assembled = assemble_items(&values, results.into_iter(), options)?;
        Ok(Self::finish(input, base, assembled))
    }
}

impl Shape {
    /// Maps whose keys match `key` and values match `value`.
    pub fn map(key: Shape, value: Shape) -> Shape {
        Shape::from_kind(ShapeKind::Map(MapKind {
            key,
            value,
            coerce: CoerceMode::Default,
        }))
    }

    /// Sets whose members all match `value`.
    pub fn set(value: Shape) -> Shape {
        Shape::from_kind(ShapeKind::Set(SetKind {
            value,
            coerce: CoerceMode::Default,
        }))
    }
}
