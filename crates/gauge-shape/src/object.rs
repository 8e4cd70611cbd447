//! # Object Shapes
//!
//! An object shape validates a fixed set of declared properties. Keys the
//! shape does not declare are handled according to its [`KeysMode`]:
//!
//! | Mode        | Unknown keys                                       |
//! |-------------|----------------------------------------------------|
//! | `Preserved` | kept (and validated against the rest shape if set) |
//! | `Stripped`  | dropped from the output                            |
//! | `Exact`     | reported once as a single `unknownKeys` issue      |
//!
//! Declared keys missing from the input are applied to `undefined`, so an
//! optional property with a default is written to the output while a plain
//! optional property stays absent.

use std::collections::HashSet;

use fixedbitset::FixedBitSet;
use futures::future::{join_all, OptionFuture};
use indexmap::IndexMap;

use gauge_core::{ApplyOptions, Code, Error, Issue, Nonce, Object, Outcome, PathKey, Value};

use crate::cow::{member_outcome, CowVec};
use crate::shape::{type_issue, Shape, ShapeKind};

/// Handling of keys an object shape does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeysMode {
    /// Keep unknown keys.
    #[default]
    Preserved,
    /// Drop unknown keys.
    Stripped,
    /// Reject unknown keys.
    Exact,
}

#[derive(Clone)]
pub(crate) struct ObjectKind {
    pub(crate) props: IndexMap<String, Shape>,
    mode: KeysMode,
    rest: Option<Shape>,
}

/// Where a visited member lives in the output.
#[derive(Clone, Copy)]
enum Slot {
    /// Index into the input entries.
    Entry(usize),
    /// Declared key absent from the input.
    Missing,
}

struct Member<'s> {
    key: String,
    value: Value,
    shape: Option<&'s Shape>,
    slot: Slot,
}

struct Plan<'s> {
    entries: Vec<(String, Value)>,
    members: Vec<Member<'s>>,
    /// Number of members that come from input entries.
    present: usize,
    unknown: Vec<String>,
}

impl ObjectKind {
    pub(crate) fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.props.values().chain(&self.rest)
    }

    pub(crate) fn prop(&self, key: &str) -> Option<&Shape> {
        self.props.get(key)
    }

    fn plan(&self, input: &Value) -> Result<Plan<'_>, Outcome> {
        let Value::Object(object) = input else {
            return Err(type_issue(input, "object"));
        };
        let entries = object.entries();
        let mut seen = FixedBitSet::with_capacity(self.props.len());
        let mut members = Vec::with_capacity(entries.len() + self.props.len());
        let mut unknown = Vec::new();
        for (index, (key, value)) in entries.iter().enumerate() {
            let shape = match self.props.get_index_of(key.as_str()) {
                Some(position) => {
                    seen.insert(position);
                    self.props.get_index(position).map(|(_, shape)| shape)
                }
                None => {
                    if self.mode == KeysMode::Exact {
                        unknown.push(key.clone());
                    }
                    match self.mode {
                        KeysMode::Preserved => self.rest.as_ref(),
                        KeysMode::Stripped | KeysMode::Exact => None,
                    }
                }
            };
            members.push(Member {
                key: key.clone(),
                value: value.clone(),
                shape,
                slot: Slot::Entry(index),
            });
        }
        let present = members.len();
        for (position, (key, shape)) in self.props.iter().enumerate() {
            if !seen.contains(position) {
                members.push(Member {
                    key: key.clone(),
                    value: Value::Undefined,
                    shape: Some(shape),
                    slot: Slot::Missing,
                });
            }
        }
        Ok(Plan {
            entries,
            members,
            present,
            unknown,
        })
    }

    fn retains(&self, key: &str) -> bool {
        self.mode != KeysMode::Stripped || self.props.contains_key(key)
    }

    /// Record the unknown-keys issue. Returns the outcome to stop with in
    /// fast mode.
    fn unknown_keys(
        &self,
        input: &Value,
        unknown: &[String],
        issues: &mut Vec<Issue>,
        options: &ApplyOptions,
    ) -> Option<Outcome> {
        if unknown.is_empty() {
            return None;
        }
        let issue = Issue::new(Code::UnknownKeys, input.clone())
            .with_param(Value::array(unknown.iter().map(|key| Value::from(key.as_str()))));
        if !options.verbose {
            return Some(Outcome::Issues(vec![issue]));
        }
        issues.push(issue);
        None
    }

    fn assemble(
        &self,
        input: &Value,
        plan: &Plan<'_>,
        results: impl Iterator<Item = Option<Result<Outcome, Error>>>,
        options: &ApplyOptions,
    ) -> Result<Outcome, Error> {
        let retain = |(key, _): &(String, Value)| self.retains(key);
        let mut cow = CowVec::new(&plan.entries);
        let mut issues = Vec::new();
        let mut unknown_checked = false;
        for (n, (member, result)) in plan.members.iter().zip(results).enumerate() {
            if n == plan.present {
                unknown_checked = true;
                if let Some(outcome) = self.unknown_keys(input, &plan.unknown, &mut issues, options) {
                    return Ok(outcome);
                }
            }
            let outcome = result.transpose()?.unwrap_or(Outcome::Unchanged);
            let path = || PathKey::Key(member.key.clone());
            let replaced = match member_outcome(outcome, path, &mut issues, options) {
                Ok(replaced) => replaced,
                Err(found) => return Ok(Outcome::Issues(found)),
            };
            match (member.slot, replaced) {
                (Slot::Entry(index), Some(value)) => {
                    cow.fork(index, retain).push((member.key.clone(), value));
                }
                (Slot::Entry(index), None) => {
                    if self.retains(&member.key) {
                        cow.keep(index);
                    } else {
                        cow.fork(index, retain);
                    }
                }
                (Slot::Missing, Some(value)) => {
                    cow.fork(plan.entries.len(), retain)
                        .push((member.key.clone(), value));
                }
                (Slot::Missing, None) => {}
            }
        }
        if !unknown_checked {
            if let Some(outcome) = self.unknown_keys(input, &plan.unknown, &mut issues, options) {
                return Ok(outcome);
            }
        }
        if !issues.is_empty() {
            return Ok(Outcome::Issues(issues));
        }
        Ok(match cow.finish() {
            Some(entries) => Outcome::Replaced(Value::Object(Object::from_entries(entries))),
            None => Outcome::Unchanged,
        })
    }

    pub(crate) fn apply(&self, input: &Value, options: &ApplyOptions, nonce: &Nonce) -> Result<Outcome, Error> {
        let plan = match self.plan(input) {
            Ok(plan) => plan,
            Err(outcome) => return Ok(outcome),
        };
        let results = plan
            .members
            .iter()
            .map(|member| member.shape.map(|shape| shape.apply_sync(&member.value, options, nonce)));
        self.assemble(input, &plan, results, options)
    }

    pub(crate) async fn apply_async(
        &self,
        input: &Value,
        options: &ApplyOptions,
        nonce: &Nonce,
    ) -> Result<Outcome, Error> {
        let plan = match self.plan(input) {
            Ok(plan) => plan,
            Err(outcome) => return Ok(outcome),
        };
        let forks: Vec<Nonce> = plan.members.iter().map(|_| nonce.fork()).collect();
        let pending = plan.members.iter().zip(&forks).map(|(member, fork)| {
            OptionFuture::from(
                member
                    .shape
                    .map(|shape| shape.apply_async(member.value.clone(), options, fork)),
            )
        });
        let results = join_all(pending).await;
        self.assemble(input, &plan, results.into_iter(), options)
    }

    fn with_props(&self, props: IndexMap<String, Shape>) -> Self {
        Self {
            props,
            mode: self.mode,
            rest: self.rest.clone(),
        }
    }
}

impl Shape {
    /// Objects with the given declared properties.
    pub fn object<K: Into<String>>(props: impl IntoIterator<Item = (K, Shape)>) -> Shape {
        Shape::from_kind(ShapeKind::Object(ObjectKind {
            props: props.into_iter().map(|(key, shape)| (key.into(), shape)).collect(),
            mode: KeysMode::Preserved,
            rest: None,
        }))
    }

    /// Rebuild an object shape; other shapes are returned as they are.
    fn map_object(&self, f: impl FnOnce(&ObjectKind) -> ObjectKind) -> Shape {
        match self.kind() {
            ShapeKind::Object(object) => self.with_kind(ShapeKind::Object(f(object))),
            _ => self.clone(),
        }
    }

    fn keys_mode(&self, mode: KeysMode) -> Shape {
        self.map_object(|object| ObjectKind {
            mode,
            rest: None,
            ..object.clone()
        })
    }

    /// Keep unknown keys.
    pub fn preserve(&self) -> Shape {
        self.keys_mode(KeysMode::Preserved)
    }

    /// Drop unknown keys from the output.
    pub fn strip(&self) -> Shape {
        self.keys_mode(KeysMode::Stripped)
    }

    /// Reject unknown keys.
    pub fn exact(&self) -> Shape {
        self.keys_mode(KeysMode::Exact)
    }

    /// Validate unknown keys against `rest` and keep them.
    pub fn rest(&self, rest: Shape) -> Shape {
        self.map_object(|object| ObjectKind {
            mode: KeysMode::Preserved,
            rest: Some(rest),
            ..object.clone()
        })
    }

    /// Make every declared property optional.
    pub fn partial(&self) -> Shape {
        self.map_object(|object| {
            object.with_props(
                object
                    .props
                    .iter()
                    .map(|(key, shape)| (key.clone(), shape.optional()))
                    .collect(),
            )
        })
    }

    /// Make every declared property reject `undefined`.
    pub fn required(&self) -> Shape {
        self.map_object(|object| {
            object.with_props(
                object
                    .props
                    .iter()
                    .map(|(key, shape)| (key.clone(), shape.non_optional()))
                    .collect(),
            )
        })
    }

    /// Keep only the named properties.
    pub fn pick<'k>(&self, keys: impl IntoIterator<Item = &'k str>) -> Shape {
        let keys: HashSet<&str> = keys.into_iter().collect();
        self.map_object(|object| {
            let mut props = object.props.clone();
            props.retain(|key, _| keys.contains(key.as_str()));
            object.with_props(props)
        })
    }

    /// Drop the named properties.
    pub fn omit<'k>(&self, keys: impl IntoIterator<Item = &'k str>) -> Shape {
        let keys: HashSet<&str> = keys.into_iter().collect();
        self.map_object(|object| {
            let mut props = object.props.clone();
            props.retain(|key, _| !keys.contains(key.as_str()));
            object.with_props(props)
        })
    }

    /// Add or replace properties.
    pub fn extend<K: Into<String>>(&self, props: impl IntoIterator<Item = (K, Shape)>) -> Shape {
        let extra: Vec<(String, Shape)> = props.into_iter().map(|(k, s)| (k.into(), s)).collect();
        self.map_object(|object| {
            let mut props = object.props.clone();
            props.extend(extra);
            object.with_props(props)
        })
    }

    /// An enum of the declared keys. Non-object shapes give `never`.
    pub fn keyof(&self) -> Shape {
        match self.kind() {
            ShapeKind::Object(object) => {
                Shape::enumeration(object.props.keys().map(|key| Value::from(key.as_str())))
            }
            _ => Shape::never(),
        }
    }
}
