//! # Intersections
//!
//! An intersection applies every branch to the same input. If all accept,
//! their outputs are merged pairwise, left to right:
//!
//! - the same value merges to itself;
//! - arrays of equal length merge element-wise;
//! - plain objects merge key-wise, recursing when both sides hold objects
//!   (or both hold arrays) and otherwise letting the later value win;
//! - dates with the same instant merge to the first;
//! - anything else cannot be merged and raises an `intersection` issue.

use futures::future::join_all;

use gauge_core::{ApplyOptions, Code, Error, Issue, Nonce, Object, Outcome, Value};

use crate::shape::{Shape, ShapeKind};

/// Merge two branch outputs, or `None` if they are incompatible.
pub fn merge_values(a: &Value, b: &Value) -> Option<Value> {
    if a.same(b) {
        return Some(a.clone());
    }
    match (a, b) {
        (Value::Array(left), Value::Array(right)) => {
            if left.len() != right.len() {
                return None;
            }
            let left = left.to_vec();
            let mut merged = Vec::with_capacity(left.len());
            let mut changed = false;
            for (l, r) in left.iter().zip(right.to_vec()) {
                let value = merge_values(l, &r)?;
                changed |= !value.same(l);
                merged.push(value);
            }
            Some(if changed { Value::array(merged) } else { a.clone() })
        }
        (Value::Object(left), Value::Object(right)) => {
            let mut entries = left.entries();
            for (key, value) in right.entries() {
                match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, existing)) => {
                        let both_objects = matches!((&*existing, &value), (Value::Object(_), Value::Object(_)));
                        let both_arrays = matches!((&*existing, &value), (Value::Array(_), Value::Array(_)));
                        *existing = if both_objects || both_arrays {
                            merge_values(existing, &value)?
                        } else {
                            value
                        };
                    }
                    None => entries.push((key, value)),
                }
            }
            Some(Value::Object(Object::from_entries(entries)))
        }
        _ => None,
    }
}

fn assemble(
    input: &Value,
    results: impl Iterator<Item = Result<Outcome, Error>>,
    options: &ApplyOptions,
) -> Result<Outcome, Error> {
    let mut issues = Vec::new();
    let mut outputs = Vec::new();
    for result in results {
        match result? {
            Outcome::Issues(found) => {
                if !options.verbose {
                    return Ok(Outcome::Issues(found));
                }
                issues.extend(found);
            }
            Outcome::Unchanged => outputs.push(None),
            Outcome::Replaced(value) => outputs.push(Some(value)),
        }
    }
    if !issues.is_empty() {
        return Ok(Outcome::Issues(issues));
    }
    if outputs.iter().all(Option::is_none) {
        return Ok(Outcome::Unchanged);
    }
    let mut outputs = outputs.into_iter().map(|output| output.unwrap_or_else(|| input.clone()));
    let Some(mut merged) = outputs.next() else {
        return Ok(Outcome::Unchanged);
    };
    for output in outputs {
        merged = match merge_values(&merged, &output) {
            Some(value) => value,
            None => {
                return Ok(Outcome::Issues(vec![Issue::new(Code::Intersection, input.clone())]));
            }
        };
    }
    Ok(Outcome::from_output(input, merged))
}

pub(crate) fn apply(
    branches: &[Shape],
    input: &Value,
    options: &ApplyOptions,
    nonce: &Nonce,
) -> Result<Outcome, Error> {
    let results = branches
        .iter()
        .map(|branch| branch.apply_sync(input, options, nonce));
    assemble(input, results, options)
}

pub(crate) async fn apply_async(
    branches: &[Shape],
    input: &Value,
    options: &ApplyOptions,
    nonce: &Nonce,
) -> Result<Outcome, Error> {
    let forks: Vec<Nonce> = branches.iter().map(|_| nonce.fork()).collect();
    let pending = branches
        .iter()
        .zip(&forks)
        .map(|(branch, fork)| branch.apply_async(input.clone(), options, fork));
    let results = join_all(pending).await;
    assemble(input, results.into_iter(), options)
}

impl Shape {
    /// Values accepted by every one of `branches`.
    pub fn intersection(branches: impl IntoIterator<Item = Shape>) -> Shape {
        Shape::from_kind(ShapeKind::Intersection(branches.into_iter().collect()))
    }

    /// Intersection of this shape and `other`.
    pub fn and(&self, other: Shape) -> Shape {
        Shape::intersection([self.clone(), other])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(shape: &Shape, input: &Value, options: &ApplyOptions) -> Outcome {
        shape.apply(input, options, &Nonce::next()).unwrap()
    }

    #[test]
    fn test_merge_objects_keywise() {
        let a = Value::object([("x", Value::from(1)), ("nested", Value::object([("a", Value::from(1))]))]);
        let b = Value::object([("y", Value::from(2)), ("nested", Value::object([("b", Value::from(2))]))]);
        let merged = merge_values(&a, &b).unwrap_or_default();
        assert_eq!(merged.get("x"), Value::from(1));
        assert_eq!(merged.get("y"), Value::from(2));
        assert_eq!(merged.get("nested").get("a"), Value::from(1));
        assert_eq!(merged.get("nested").get("b"), Value::from(2));
    }

    #[test]
    fn test_merge_later_scalar_wins_inside_objects() {
        let a = Value::object([("x", Value::from(1))]);
        let b = Value::object([("x", Value::from("one"))]);
        assert_eq!(merge_values(&a, &b).map(|v| v.get("x")), Some(Value::from("one")));
    }

    #[test]
    fn test_merge_rejects_mismatches() {
        assert!(merge_values(&Value::from(1), &Value::from(2)).is_none());
        let short = Value::array([Value::from(1)]);
        let long = Value::array([Value::from(1), Value::from(2)]);
        assert!(merge_values(&short, &long).is_none());
    }

    #[test]
    fn test_unchanged_branches_keep_input() {
        let shape = Shape::intersection([Shape::number().gte(0.0), Shape::number().lte(10.0)]);
        assert_eq!(run(&shape, &Value::from(5), &ApplyOptions::default()), Outcome::Unchanged);
        let Outcome::Issues(issues) = run(&shape, &Value::from(11), &ApplyOptions::default()) else {
            panic!("expected issues");
        };
        assert_eq!(issues[0].code, Code::NumberLessThanOrEqual);
    }

    #[test]
    fn test_incompatible_outputs_raise_intersection_issue() {
        let shape = Shape::intersection([
            Shape::any().alter(|_, _| Ok(Value::from(1))),
            Shape::any().alter(|_, _| Ok(Value::from(2))),
        ]);
        let Outcome::Issues(issues) = run(&shape, &Value::Null, &ApplyOptions::default()) else {
            panic!("expected issues");
        };
        assert_eq!(issues[0].code, Code::Intersection);
        assert!(issues[0].path.is_empty());
    }

    #[test]
    fn test_object_branches_merge_outputs() {
        let shape = Shape::object([("a", Shape::number())])
            .strip()
            .and(Shape::object([("b", Shape::string())]).strip());
        let input = Value::object([("a", Value::from(1)), ("b", Value::from("x"))]);
        let Outcome::Replaced(output) = run(&shape, &input, &ApplyOptions::default()) else {
            panic!("expected replacement");
        };
        assert_eq!(output.get("a"), Value::from(1));
        assert_eq!(output.get("b"), Value::from("x"));
    }
}
