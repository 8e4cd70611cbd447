//! # Copy-on-Write Assembly
//!
//! Containers must return their input untouched when no member changed.
//! [`CowVec`] walks the members of a container and only allocates an output
//! buffer at the first change, backfilling the members seen so far.
//!
//! [`assemble_items`] and [`assemble_pairs`] fold member outcomes into a
//! container result: issues are prefixed with the member's path key, fast
//! mode stops at the first failing member and verbose mode keeps going.

use gauge_core::{prefix_path, ApplyOptions, Error, Issue, Outcome, PathKey, Value};

/// Lazily allocated copy of a slice.
pub(crate) struct CowVec<'a, T> {
    source: &'a [T],
    copy: Option<Vec<T>>,
}

impl<'a, T: Clone> CowVec<'a, T> {
    pub(crate) fn new(source: &'a [T]) -> Self {
        Self { source, copy: None }
    }

    /// Carry `source[index]` into the copy, if one exists.
    pub(crate) fn keep(&mut self, index: usize) {
        if let Some(copy) = &mut self.copy {
            copy.push(self.source[index].clone());
        }
    }

    /// Write `value` in place of `source[index]`.
    pub(crate) fn replace(&mut self, index: usize, value: T) {
        self.fork(index, |_| true).push(value);
    }

    /// The copy, creating it from `source[..index]` filtered by `retain` if
    /// it does not exist yet.
    pub(crate) fn fork(&mut self, index: usize, retain: impl Fn(&T) -> bool) -> &mut Vec<T> {
        let source = self.source;
        self.copy.get_or_insert_with(|| {
            let mut copy = Vec::with_capacity(source.len());
            copy.extend(source[..index].iter().filter(|item| retain(*item)).cloned());
            copy
        })
    }

    /// The copy, or `None` if nothing changed.
    pub(crate) fn finish(self) -> Option<Vec<T>> {
        self.copy
    }
}

/// Result of folding member outcomes.
#[derive(Debug)]
pub(crate) enum Assembled<T> {
    /// Every member was unchanged.
    Unchanged,
    /// At least one member changed; the new members.
    Changed(T),
    /// At least one member failed.
    Issues(Vec<Issue>),
}

/// Fold member outcomes for one member, recording issues under `key`.
///
/// Returns `Ok(Err(issues))` when the fold must stop (fast mode).
pub(crate) fn member_outcome(
    outcome: Outcome,
    key: impl FnOnce() -> PathKey,
    issues: &mut Vec<Issue>,
    options: &ApplyOptions,
) -> Result<Option<Value>, Vec<Issue>> {
    match outcome {
        Outcome::Unchanged => Ok(None),
        Outcome::Replaced(value) => Ok(Some(value)),
        Outcome::Issues(mut found) => {
            prefix_path(&mut found, &key());
            if !options.verbose {
                return Err(found);
            }
            issues.extend(found);
            Ok(None)
        }
    }
}

/// Fold the outcomes of sequence members (arrays, tuples, sets).
pub(crate) fn assemble_items(
    items: &[Value],
    results: impl Iterator<Item = Result<Outcome, Error>>,
    options: &ApplyOptions,
) -> Result<Assembled<Vec<Value>>, Error> {
    let mut cow = CowVec::new(items);
    let mut issues = Vec::new();
    for (index, result) in results.enumerate() {
        match member_outcome(result?, || PathKey::Index(index), &mut issues, options) {
            Ok(Some(value)) => cow.replace(index, value),
            Ok(None) => cow.keep(index),
            Err(found) => return Ok(Assembled::Issues(found)),
        }
    }
    Ok(finish(cow, issues))
}

/// Outcomes for one key/value member of a keyed container.
pub(crate) type PairResult = (Option<Result<Outcome, Error>>, Result<Outcome, Error>);

/// Fold the outcomes of keyed members (records, maps). The key outcome is
/// `None` when the container has no key shape.
pub(crate) fn assemble_pairs<K: Clone>(
    entries: &[(K, Value)],
    results: impl Iterator<Item = PairResult>,
    path_key: impl Fn(&K) -> PathKey,
    into_key: impl Fn(Value) -> K,
    options: &ApplyOptions,
) -> Result<Assembled<Vec<(K, Value)>>, Error> {
    let mut cow = CowVec::new(entries);
    let mut issues = Vec::new();
    for (index, (key_result, value_result)) in results.enumerate() {
        let (key, value) = &entries[index];
        let new_key = match key_result.transpose()? {
            Some(outcome) => match member_outcome(outcome, || path_key(key), &mut issues, options) {
                Ok(new_key) => new_key,
                Err(found) => return Ok(Assembled::Issues(found)),
            },
            None => None,
        };
        let new_value = match member_outcome(value_result?, || path_key(key), &mut issues, options) {
            Ok(new_value) => new_value,
            Err(found) => return Ok(Assembled::Issues(found)),
        };
        if new_key.is_none() && new_value.is_none() {
            cow.keep(index);
        } else {
            let key = new_key.map_or_else(|| key.clone(), &into_key);
            cow.replace(index, (key, new_value.unwrap_or_else(|| value.clone())));
        }
    }
    Ok(finish(cow, issues))
}

fn finish<T: Clone>(cow: CowVec<'_, T>, issues: Vec<Issue>) -> Assembled<Vec<T>> {
    if !issues.is_empty() {
        return Assembled::Issues(issues);
    }
    match cow.finish() {
        Some(copy) => Assembled::Changed(copy),
        None => Assembled::Unchanged,
    }
}
