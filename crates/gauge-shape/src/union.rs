//! # Unions
//!
//! A union accepts a value if any branch accepts it; the first accepting
//! branch in declaration order decides the output.
//!
//! ## Branch Lookup
//!
//! Trying every branch is wasteful, so each union builds (once per coerce
//! setting) a [`Lookup`]:
//!
//! - **By kind.** For every [`ValueKind`], the indices of the branches whose
//!   accepted inputs include that kind, in declaration order.
//! - **By discriminator.** When every branch is an object shape and some
//!   key's shape accepts only literals in every branch, with no literal
//!   shared between branches, the value at that key selects at most one
//!   candidate branch.
//!
//! The lookup only prunes branches that cannot accept the input, so the
//! result is the same as trying every branch in order.
//!
//! ## Failure
//!
//! When no branch accepts the input, a single `union` issue is raised. Its
//! param holds the accepted kind names and, under `issueGroups`, the issues
//! from every branch in declaration order.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use gauge_core::{ApplyOptions, Code, Error, Issue, Nonce, Outcome, Value, ValueKind};

use crate::inputs::Inputs;
use crate::shape::{Shape, ShapeKind};

#[derive(Clone)]
pub(crate) struct UnionKind {
    pub(crate) branches: Vec<Shape>,
    lookups: Arc<[OnceLock<Lookup>; 2]>,
}

/// Hashable form of a scalar literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LiteralKey {
    Undefined,
    Null,
    Bool(bool),
    Number(u64),
    BigInt(i128),
    String(Arc<str>),
}

impl LiteralKey {
    /// Keys agree exactly when the values are SameValueZero.
    fn of(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Undefined => Self::Undefined,
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) if n.is_nan() => Self::Number(f64::NAN.to_bits()),
            Value::Number(n) if *n == 0.0 => Self::Number(0.0f64.to_bits()),
            Value::Number(n) => Self::Number(n.to_bits()),
            Value::BigInt(n) => Self::BigInt(*n),
            Value::String(s) => Self::String(Arc::clone(s)),
            _ => return None,
        })
    }
}

#[derive(Debug)]
struct Discriminator {
    key: String,
    table: HashMap<LiteralKey, usize>,
}

#[derive(Debug)]
struct Lookup {
    by_kind: Vec<Vec<usize>>,
    discriminator: Option<Discriminator>,
    kind_names: Vec<&'static str>,
}

impl Lookup {
    fn build(branches: &[Shape], coerce: bool) -> Self {
        let inputs: Vec<Inputs> = branches.iter().map(|b| b.inputs(coerce)).collect();
        let by_kind = ValueKind::ALL
            .iter()
            .map(|kind| {
                (0..branches.len())
                    .filter(|&i| inputs[i].accepts_kind(*kind))
                    .collect()
            })
            .collect();
        let kind_names = Inputs::merge(inputs).kind_names();
        let discriminator = find_discriminator(branches, coerce);
        tracing::debug!(
            branches = branches.len(),
            coerce,
            discriminator = discriminator.as_ref().map(|d| d.key.as_str()),
            "built union lookup"
        );
        Self {
            by_kind,
            discriminator,
            kind_names,
        }
    }

    /// Indices of the branches that might accept `input`.
    fn candidates(&self, input: &Value) -> &[usize] {
        if let (Some(discriminator), Value::Object(object)) = (&self.discriminator, input) {
            let value = object.get(&discriminator.key).unwrap_or_default();
            return match LiteralKey::of(&value).and_then(|key| discriminator.table.get(&key)) {
                Some(index) => std::slice::from_ref(index),
                None => &[],
            };
        }
        &self.by_kind[input.kind().index()]
    }
}

/// The first declared key of the first branch whose shape accepts only
/// pairwise-disjoint scalar literals in every branch.
fn find_discriminator(branches: &[Shape], coerce: bool) -> Option<Discriminator> {
    if branches.len() < 2 {
        return None;
    }
    let objects: Vec<_> = branches
        .iter()
        .map(|branch| match branch.kind() {
            ShapeKind::Object(object) => Some(object),
            _ => None,
        })
        .collect::<Option<_>>()?;
    'keys: for key in objects[0].props.keys() {
        let mut table = HashMap::new();
        for (index, object) in objects.iter().enumerate() {
            let Some(literals) = object.prop(key).and_then(|s| s.inputs(coerce).literal_values()) else {
                continue 'keys;
            };
            for literal in &literals {
                let Some(literal_key) = LiteralKey::of(literal) else {
                    continue 'keys;
                };
                if let Some(previous) = table.insert(literal_key, index) {
                    if previous != index {
                        continue 'keys;
                    }
                }
            }
        }
        return Some(Discriminator {
            key: key.clone(),
            table,
        });
    }
    None
}

impl UnionKind {
    fn lookup(&self, options: &ApplyOptions) -> &Lookup {
        self.lookups[usize::from(options.coerce)]
            .get_or_init(|| Lookup::build(&self.branches, options.coerce))
    }

    fn union_issue(lookup: &Lookup, input: &Value, groups: Vec<Vec<Issue>>) -> Outcome {
        let groups = groups
            .iter()
            .map(|issues| Value::array(issues.iter().map(Issue::to_value)));
        let param = Value::object([
            (
                "inputs",
                Value::array(lookup.kind_names.iter().map(|name| Value::from(*name))),
            ),
            ("issueGroups", Value::array(groups)),
        ]);
        Outcome::Issues(vec![Issue::new(Code::Union, input.clone()).with_param(param)])
    }

    pub(crate) fn apply(&self, input: &Value, options: &ApplyOptions, nonce: &Nonce) -> Result<Outcome, Error> {
        let lookup = self.lookup(options);
        let mut failed: Vec<Option<Vec<Issue>>> = vec![None; self.branches.len()];
        for &index in lookup.candidates(input) {
            match self.branches[index].apply_sync(input, options, nonce)? {
                Outcome::Issues(issues) => failed[index] = Some(issues),
                accepted => return Ok(accepted),
            }
        }
        let mut groups = Vec::with_capacity(self.branches.len());
        for (branch, tried) in self.branches.iter().zip(failed) {
            let issues = match tried {
                Some(issues) => issues,
                None => match branch.apply_sync(input, options, nonce)? {
                    Outcome::Issues(issues) => issues,
                    accepted => return Ok(accepted),
                },
            };
            groups.push(issues);
        }
        Ok(Self::union_issue(lookup, input, groups))
    }

    pub(crate) async fn apply_async(
        &self,
        input: &Value,
        options: &ApplyOptions,
        nonce: &Nonce,
    ) -> Result<Outcome, Error> {
        let lookup = self.lookup(options);
        let mut failed: Vec<Option<Vec<Issue>>> = vec![None; self.branches.len()];
        for &index in lookup.candidates(input) {
            match self.branches[index].apply_async(input.clone(), options, nonce).await? {
                Outcome::Issues(issues) => failed[index] = Some(issues),
                accepted => return Ok(accepted),
            }
        }
        let mut groups = Vec::with_capacity(self.branches.len());
        for (branch, tried) in self.branches.iter().zip(failed) {
            let issues = match tried {
                Some(issues) => issues,
                None => match branch.apply_async(input.clone(), options, nonce).await? {
                    Outcome::Issues(issues) => issues,
                    accepted => return Ok(accepted),
                },
            };
            groups.push(issues);
        }
        Ok(Self::union_issue(lookup, input, groups))
    }
}

impl Shape {
    /// Values accepted by any of `branches`.
    pub fn union(branches: impl IntoIterator<Item = Shape>) -> Shape {
        Shape::from_kind(ShapeKind::Union(UnionKind {
            branches: branches.into_iter().collect(),
            lookups: Arc::new([OnceLock::new(), OnceLock::new()]),
        }))
    }

    /// The discriminator key a union uses, if it found one.
    pub fn discriminator(&self, options: &ApplyOptions) -> Option<String> {
        match self.kind() {
            ShapeKind::Union(union) => union
                .lookup(options)
                .discriminator
                .as_ref()
                .map(|d| d.key.clone()),
            _ => None,
        }
    }
}
